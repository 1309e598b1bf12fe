use super::*;
use crate::{
    deep::{sample::ChannelSet, store::DeepSampleStore},
    formats::{DeepFormat, write_deep_image},
};

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

/// One pixel whose depth encodes the frame number.
fn frame_image(frame: i32) -> DeepImage {
    let mut store = DeepSampleStore::new(1, 1, ChannelSet::rgba()).unwrap();
    store
        .add_sample(0, 0, frame as f32, [1.0, 1.0, 1.0], 1.0)
        .unwrap();
    store.finish()
}

fn write_frames(dir: &std::path::Path, frames: &[i32]) -> String {
    for &f in frames {
        let path = dir.join(format!("shot.{f:03}.dtex"));
        write_deep_image(&path, &frame_image(f), Some(DeepFormat::Dtex)).unwrap();
    }
    dir.join("shot.###.dtex").to_string_lossy().into_owned()
}

fn loaded_frame(image: &DeepImage) -> i32 {
    image.samples_at(0, 0).unwrap()[0].depth as i32
}

fn opts(first: i32, last: i32, policy: MissingFramePolicy) -> SequenceOptions {
    SequenceOptions {
        first,
        last,
        policy,
        ..SequenceOptions::default()
    }
}

#[test]
fn nearest_order_below_range_walks_up() {
    let order: Vec<i32> = nearest_frame_order(-5, 1, 4).collect();
    assert_eq!(order, vec![1, 2, 3, 4]);
    let order: Vec<i32> = nearest_frame_order(1, 1, 4).collect();
    assert_eq!(order, vec![1, 2, 3, 4]);
}

#[test]
fn nearest_order_above_range_walks_down() {
    let order: Vec<i32> = nearest_frame_order(10, 1, 4).collect();
    assert_eq!(order, vec![4, 3, 2, 1]);
}

#[test]
fn nearest_order_inside_range_alternates_outwards() {
    let order: Vec<i32> = nearest_frame_order(3, 1, 6).collect();
    assert_eq!(order, vec![3, 4, 2, 5, 1, 6]);
    let order: Vec<i32> = nearest_frame_order(2, 1, 6).collect();
    assert_eq!(order, vec![2, 3, 1, 4, 5, 6]);
}

#[test]
fn nearest_order_handles_extreme_ranges() {
    let order: Vec<i32> = nearest_frame_order(i32::MAX - 1, i32::MAX - 2, i32::MAX).collect();
    assert_eq!(order, vec![i32::MAX - 1, i32::MAX, i32::MAX - 2]);
}

#[test]
fn policy_parses_cli_spellings() {
    assert_eq!("error".parse::<MissingFramePolicy>().unwrap(), MissingFramePolicy::Error);
    assert_eq!(
        "Nearest".parse::<MissingFramePolicy>().unwrap(),
        MissingFramePolicy::NearestFrame
    );
    assert_eq!("black".parse::<MissingFramePolicy>().unwrap(), MissingFramePolicy::Black);
    assert!("skip".parse::<MissingFramePolicy>().is_err());
}

#[test]
fn inverted_range_is_rejected() {
    let err = SequenceReader::new("x.####.dtex", opts(5, 1, MissingFramePolicy::Error)).unwrap_err();
    assert!(matches!(err, DeepError::Validation(_)));
}

#[test]
fn error_policy_surfaces_missing_file() {
    let tmp = temp_dir("seq_error");
    std::fs::create_dir_all(&tmp).unwrap();
    let pattern = write_frames(&tmp, &[1]);

    let mut reader = SequenceReader::new(pattern, opts(1, 3, MissingFramePolicy::Error)).unwrap();
    let img = reader.read_frame(1).unwrap().unwrap();
    assert_eq!(loaded_frame(&img), 1);
    assert!(reader.read_frame(2).is_err());
    let _ = std::fs::remove_dir_all(&tmp);
}

#[test]
fn black_policy_returns_no_image() {
    let tmp = temp_dir("seq_black");
    std::fs::create_dir_all(&tmp).unwrap();
    let pattern = write_frames(&tmp, &[1]);

    let mut reader = SequenceReader::new(pattern, opts(1, 3, MissingFramePolicy::Black)).unwrap();
    assert!(reader.read_frame(2).unwrap().is_none());
    assert!(reader.read_frame(1).unwrap().is_some());
    let _ = std::fs::remove_dir_all(&tmp);
}

#[test]
fn nearest_policy_prefers_the_lower_neighbour_first() {
    let tmp = temp_dir("seq_nearest");
    std::fs::create_dir_all(&tmp).unwrap();
    let pattern = write_frames(&tmp, &[1, 4, 5]);

    let mut reader =
        SequenceReader::new(pattern, opts(1, 5, MissingFramePolicy::NearestFrame)).unwrap();
    // 3 is missing: 3, 4 -> 4.
    assert_eq!(loaded_frame(&reader.read_frame(3).unwrap().unwrap()), 4);
    // 2 is missing: 2, 3, 1 -> 1.
    assert_eq!(loaded_frame(&reader.read_frame(2).unwrap().unwrap()), 1);
    // Past the end walks down from `last`.
    assert_eq!(loaded_frame(&reader.read_frame(40).unwrap().unwrap()), 5);
    let _ = std::fs::remove_dir_all(&tmp);
}

#[test]
fn nearest_policy_fails_when_nothing_loads() {
    let tmp = temp_dir("seq_nearest_none");
    std::fs::create_dir_all(&tmp).unwrap();
    let pattern = tmp.join("shot.###.dtex").to_string_lossy().into_owned();

    let mut reader =
        SequenceReader::new(pattern, opts(1, 3, MissingFramePolicy::NearestFrame)).unwrap();
    assert!(reader.read_frame(2).is_err());
    let _ = std::fs::remove_dir_all(&tmp);
}

#[test]
fn repeated_path_is_served_from_cache_until_reload() {
    let tmp = temp_dir("seq_cache");
    std::fs::create_dir_all(&tmp).unwrap();
    let pattern = write_frames(&tmp, &[1]);

    let mut reader = SequenceReader::new(pattern, opts(1, 1, MissingFramePolicy::Error)).unwrap();
    let first = reader.read_frame(1).unwrap().unwrap();
    assert!(reader.cached_path().is_some());

    std::fs::remove_file(tmp.join("shot.001.dtex")).unwrap();
    let again = reader.read_frame(1).unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    reader.reload();
    assert!(reader.cached_path().is_none());
    assert!(reader.read_frame(1).is_err());
    let _ = std::fs::remove_dir_all(&tmp);
}
