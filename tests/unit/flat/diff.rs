use super::*;

fn flat(pixels: Vec<[f32; 4]>, width: u32) -> FlatImage {
    let height = pixels.len() as u32 / width;
    FlatImage::from_pixels(width, height, pixels)
}

#[test]
fn identical_images_report_no_difference() {
    let a = flat(vec![[0.1, 0.2, 0.3, 1.0]; 6], 3);
    let report = diff_flat_images(&a, &a.clone()).unwrap();
    assert!(report.is_identical());
    assert!(!report.differs(0.0));
    assert_eq!(report.max_abs, 0.0);
    assert_eq!(report.rms, 0.0);
    assert_eq!(report.pixel_count, 6);
}

#[test]
fn single_channel_change_is_located() {
    let a = flat(vec![[0.0; 4]; 4], 2);
    let mut pixels = vec![[0.0; 4]; 4];
    pixels[3][1] = 0.5;
    let b = flat(pixels, 2);

    let report = diff_flat_images(&a, &b).unwrap();
    assert_eq!(report.differing_pixels, 1);
    assert_eq!(report.max_abs, 0.5);
    assert!(report.differs(0.25));
    assert!(!report.differs(0.5));
    let expected_rms = (0.25f64 / 16.0).sqrt();
    assert!((report.rms - expected_rms).abs() < 1e-12);
}

#[test]
fn nan_counts_as_infinite_difference() {
    let a = flat(vec![[0.0; 4]], 1);
    let b = flat(vec![[f32::NAN, 0.0, 0.0, 0.0]], 1);
    let report = diff_flat_images(&a, &b).unwrap();
    assert_eq!(report.max_abs, f32::INFINITY);
    assert!(report.differs(1e9));
}

#[test]
fn size_mismatch_is_rejected() {
    let a = flat(vec![[0.0; 4]; 4], 2);
    let b = flat(vec![[0.0; 4]; 4], 4);
    assert!(matches!(
        diff_flat_images(&a, &b).unwrap_err(),
        DeepError::Validation(_)
    ));
}
