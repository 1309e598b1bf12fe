use super::*;

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "deepflat_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn gradient(width: u32, height: u32) -> FlatImage {
    let pixels = (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| {
                let fx = x as f32 / (width - 1).max(1) as f32;
                let fy = y as f32 / (height - 1).max(1) as f32;
                [fx, fy, 0.25, if (x + y) % 2 == 0 { 1.0 } else { 0.0 }]
            })
        })
        .collect();
    FlatImage::from_pixels(width, height, pixels)
}

#[test]
fn pixel_lookup_is_bounds_checked() {
    let img = gradient(3, 2);
    assert_eq!(img.pixel(2, 1).unwrap(), [1.0, 1.0, 0.25, 0.0]);
    assert!(matches!(
        img.pixel(3, 0).unwrap_err(),
        DeepError::OutOfRange { x: 3, y: 0, .. }
    ));
}

#[test]
fn transparent_image_is_all_zero() {
    let img = FlatImage::transparent(3, 2);
    assert_eq!(img.pixels().len(), 6);
    assert!(img.pixels().iter().all(|px| *px == [0.0; 4]));
}

#[test]
fn fingerprint_tracks_pixel_bits() {
    let a = gradient(4, 4);
    let mut pixels = a.pixels().to_vec();
    assert_eq!(a.fingerprint(), gradient(4, 4).fingerprint());
    pixels[5][2] = f32::from_bits(pixels[5][2].to_bits() + 1);
    let b = FlatImage::from_pixels(4, 4, pixels);
    assert_ne!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), gradient(2, 8).fingerprint());
}

#[test]
fn channel_selection_parses_cli_spellings() {
    assert_eq!("RGBA".parse::<ChannelSelection>().unwrap(), ChannelSelection::Rgba);
    assert_eq!("rgb".parse::<ChannelSelection>().unwrap(), ChannelSelection::Rgb);
    assert_eq!("a".parse::<ChannelSelection>().unwrap(), ChannelSelection::Alpha);
    assert_eq!("alpha".parse::<ChannelSelection>().unwrap(), ChannelSelection::Alpha);
    assert!("z".parse::<ChannelSelection>().is_err());
    assert_eq!(ChannelSelection::Alpha.to_string(), "a");
    assert_eq!(ChannelSelection::Rgb.channel_count(), 3);
}

#[test]
fn png_round_trip_quantizes_to_8_bits() {
    let tmp = temp_dir("raster_png");
    let path = tmp.join("out/flat.png");
    let img = gradient(5, 3);
    write_flat_image(&img, &path, ChannelSelection::Rgba).unwrap();

    let back = read_flat_image(&path).unwrap();
    assert_eq!((back.width(), back.height()), (5, 3));
    for (a, b) in img.pixels().iter().zip(back.pixels()) {
        for (ca, cb) in a.iter().zip(b) {
            assert!((ca - cb).abs() <= 0.5 / 255.0 + 1e-6, "{a:?} vs {b:?}");
        }
    }
    let _ = std::fs::remove_dir_all(&tmp);
}

#[test]
fn alpha_only_png_reads_back_as_gray() {
    let tmp = temp_dir("raster_alpha");
    let path = tmp.join("alpha.png");
    let img = gradient(2, 2);
    write_flat_image(&img, &path, ChannelSelection::Alpha).unwrap();

    let back = read_flat_image(&path).unwrap();
    assert_eq!(back.pixel(0, 0).unwrap(), [1.0, 1.0, 1.0, 1.0]);
    assert_eq!(back.pixel(1, 0).unwrap(), [0.0, 0.0, 0.0, 1.0]);
    let _ = std::fs::remove_dir_all(&tmp);
}

#[test]
fn exr_keeps_float_values() {
    let tmp = temp_dir("raster_exr");
    let path = tmp.join("flat.exr");
    let pixels = vec![[0.125, 2.5, 0.0, 0.5], [0.0, 0.0, 0.0, 0.0]];
    let img = FlatImage::from_pixels(2, 1, pixels.clone());
    write_flat_image(&img, &path, ChannelSelection::Rgba).unwrap();

    let back = read_flat_image(&path).unwrap();
    assert_eq!(back.pixels(), pixels.as_slice());
    let _ = std::fs::remove_dir_all(&tmp);
}

#[test]
fn unknown_extension_is_a_validation_error() {
    let err = write_flat_image(&gradient(1, 1), "flat.nope", ChannelSelection::Rgba).unwrap_err();
    assert!(matches!(err, DeepError::Validation(_)));
}
