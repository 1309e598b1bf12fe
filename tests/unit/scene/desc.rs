use super::*;

const TWO_SAMPLES: &str = r#"{
    "width": 2, "height": 1,
    "pixels": [ { "x": 0, "y": 0, "samples": [
        { "depth": 2.0, "color": [0, 1, 0], "alpha": 1.0 },
        { "depth": 1.0, "color": [1, 0, 0], "alpha": 0.5 }
    ] } ]
}"#;

#[test]
fn defaults_fill_channels_and_window() {
    let desc = SceneDesc::from_json_str(TWO_SAMPLES).unwrap();
    assert_eq!(desc.channels, vec!["R", "G", "B", "A"]);
    assert!(desc.data_window.is_none());

    let img = desc.build().unwrap();
    assert_eq!((img.width(), img.height()), (2, 1));
    let depths: Vec<f32> = img
        .samples_at(0, 0)
        .unwrap()
        .iter()
        .map(|s| s.depth)
        .collect();
    assert_eq!(depths, vec![1.0, 2.0]);
    assert!(img.samples_at(1, 0).unwrap().is_empty());
}

#[test]
fn alpha_only_samples_default_to_opaque_black() {
    let desc = SceneDesc::from_json_str(
        r#"{ "width": 1, "height": 1, "channels": ["A"],
             "pixels": [ { "x": 0, "y": 0, "samples": [ { "depth": 0.5 } ] } ] }"#,
    )
    .unwrap();
    let img = desc.build().unwrap();
    assert_eq!(
        img.samples_at(0, 0).unwrap(),
        &[Sample::new(0.5, [0.0; 3], 1.0)]
    );
}

#[test]
fn missing_aovs_become_zeros() {
    let desc = SceneDesc::from_json_str(
        r#"{ "width": 1, "height": 1, "channels": ["R", "G", "B", "A", "Z2", "id"],
             "pixels": [ { "x": 0, "y": 0, "samples": [
                 { "depth": 1.0, "aovs": [3.0, 7.0] },
                 { "depth": 2.0 } ] } ] }"#,
    )
    .unwrap();
    let img = desc.build().unwrap();
    assert_eq!(img.aovs_at(0, 0).unwrap(), &[3.0, 7.0, 0.0, 0.0]);
}

#[test]
fn data_window_is_honored() {
    let desc = SceneDesc::from_json_str(
        r#"{ "width": 4, "height": 4, "data_window": [1, 1, 3, 3],
             "pixels": [ { "x": 0, "y": 0, "samples": [ { "depth": 1.0 } ] } ] }"#,
    )
    .unwrap();
    assert!(matches!(
        desc.build().unwrap_err(),
        DeepError::OutOfRange { x: 0, y: 0, .. }
    ));
}

#[test]
fn bad_sample_reports_store_error() {
    let desc = SceneDesc::from_json_str(
        r#"{ "width": 1, "height": 1,
             "pixels": [ { "x": 0, "y": 0, "samples": [ { "depth": -1.0 } ] } ] }"#,
    )
    .unwrap();
    assert!(matches!(
        desc.build().unwrap_err(),
        DeepError::InvalidSample { .. }
    ));
}

#[test]
fn malformed_json_is_a_serde_error() {
    assert!(matches!(
        SceneDesc::from_json_str("{ \"width\": 1 ").unwrap_err(),
        DeepError::Serde(_)
    ));
    assert!(matches!(
        SceneDesc::from_json_str(r#"{ "height": 1 }"#).unwrap_err(),
        DeepError::Serde(_)
    ));
}

#[test]
fn describing_an_image_rebuilds_it() {
    let img = SceneDesc::from_json_str(TWO_SAMPLES).unwrap().build().unwrap();
    let desc = SceneDesc::from_image(&img);
    assert_eq!(desc.pixels.len(), 1);

    let json = desc.to_json_string().unwrap();
    let rebuilt = SceneDesc::from_json_str(&json).unwrap().build().unwrap();
    assert_eq!(rebuilt, img);
}

#[test]
fn missing_scene_file_reports_io_context() {
    let path = std::env::temp_dir().join(format!(
        "deepflat_missing_scene_{}.json",
        std::process::id()
    ));
    let err = SceneDesc::from_path(&path).unwrap_err();
    assert!(matches!(err, DeepError::Other(_)), "{err:?}");
    assert!(err.to_string().contains("open scene JSON"), "{err}");
}

#[test]
fn inverted_scene_window_is_rejected() {
    let desc = SceneDesc::from_json_str(
        r#"{ "width": 4, "height": 4, "data_window": [3, 0, 1, 1], "pixels": [] }"#,
    )
    .unwrap();
    assert!(matches!(desc.build().unwrap_err(), DeepError::Validation(_)));
}
