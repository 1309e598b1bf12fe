use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        DeepError::format("x")
            .to_string()
            .contains("format error:")
    );
    assert!(
        DeepError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        DeepError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(
        DeepError::invalid_sample(1, 2, "nan depth")
            .to_string()
            .contains("invalid sample at (1, 2): nan depth")
    );
}

#[test]
fn structured_variants_render_their_fields() {
    let err = DeepError::TruncatedData {
        what: "header",
        offset: 4,
        needed: 8,
        available: 3,
    };
    assert_eq!(
        err.to_string(),
        "truncated data: header needs 8 bytes at offset 4, 3 available"
    );

    let err = DeepError::OutOfRange {
        x: -1,
        y: 0,
        width: 2,
        height: 2,
        context: "image bounds",
    };
    assert!(err.to_string().contains("(-1, 0)"));
    assert!(err.to_string().contains("2x2"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = DeepError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
