use std::path::PathBuf;

use gesture_config_compiler::{
    generate_from_path, parse_config_file, render_generated_config, validate_config,
    ConfigCompilerError,
};

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("missing tools dir")
        .parent()
        .expect("missing repo root")
        .to_path_buf()
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn repo_config_compiles() {
    let config = repo_root().join("config/gestures.toml");
    let generated = generate_from_path(&config).expect("repo config should compile");
    assert!(generated.contains("pub const MAX_GESTURE_POINTS: usize = 12;"));
    assert!(generated.contains("pub const DEFAULT_GESTURE_CONFIG: GestureConfig"));
}

#[test]
fn generation_is_deterministic_for_same_input() {
    let config = fixture("valid_default.toml");
    let first = generate_from_path(&config).expect("first generation failed");
    let second = generate_from_path(&config).expect("second generation failed");
    assert_eq!(first, second);
}

#[test]
fn tap_down_and_rail_ratio_render_when_changed() {
    let path = fixture("valid_tap_down_enabled.toml");
    let file = parse_config_file(&path).expect("fixture should parse");
    validate_config(&file).expect("fixture should validate");
    let rendered = render_generated_config(&file);

    for needle in ["tap_down_enabled: true,", "rail_dominance_x100: 100,"] {
        assert!(
            rendered.contains(needle),
            "rendered output missing `{needle}`"
        );
    }
}

#[test]
fn semantic_validation_rejects_invalid_ranges() {
    let cases = [
        (
            "invalid/max_tracked_too_small.toml",
            "points.max_tracked must be in 3..=32",
        ),
        (
            "invalid/smoothing_out_of_range.toml",
            "points.velocity_smoothing must be in (0, 1]",
        ),
        (
            "invalid/rail_ratio_below_parity.toml",
            "scroll.rail_dominance_x100 must be >= 100",
        ),
        (
            "invalid/swipe_angle_out_of_range.toml",
            "three_finger_swipe.max_angle_deg must be in (0, 180)",
        ),
        ("invalid/long_press_zero.toml", "tap.long_press_ms must be > 0"),
        (
            "invalid/slop_infinite.toml",
            "points.slop_px must be finite",
        ),
    ];

    for (fixture_name, expected_msg) in cases {
        let path = fixture(fixture_name);
        let err = generate_from_path(&path).expect_err("fixture should fail validation");
        match err {
            ConfigCompilerError::Validation(msg) => {
                assert!(
                    msg.contains(expected_msg),
                    "expected validation message containing `{expected_msg}`, got `{msg}`"
                );
            }
            other => panic!("expected validation error, got {other}"),
        }
    }
}

#[test]
fn parse_errors_are_reported_for_schema_mismatches() {
    let cases = [
        ("invalid/missing_pinch.toml", "pinch"),
        ("invalid/unknown_key.toml", "jitter_px"),
    ];

    for (fixture_name, needle) in cases {
        let err = generate_from_path(&fixture(fixture_name)).expect_err("fixture should fail parsing");
        match err {
            ConfigCompilerError::Parse(msg) => {
                assert!(
                    msg.contains(needle),
                    "expected parse error mentioning {needle}, got `{msg}`"
                );
            }
            other => panic!("expected parse error, got {other}"),
        }
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let err = generate_from_path(&fixture("does_not_exist.toml")).expect_err("should fail");
    assert!(matches!(err, ConfigCompilerError::Io(_)));
}
