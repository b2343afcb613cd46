//! Compiles `config/gestures.toml` into Rust constants for the recognizer.
//!
//! The root crate's build script calls [`generate_from_path`] and includes the
//! rendered source, so tuning changes never need a code edit.

use std::{fmt, fmt::Write as _, fs, path::Path};

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigCompilerError {
    Io(String),
    Parse(String),
    Validation(String),
}

impl fmt::Display for ConfigCompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "io error: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigCompilerError {}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GesturesFile {
    pub points: PointsSection,
    pub tap: TapSection,
    pub scroll: ScrollSection,
    pub pinch: PinchSection,
    pub three_finger_swipe: SwipeSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointsSection {
    pub max_tracked: u32,
    pub slop_px: f32,
    pub velocity_smoothing: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TapSection {
    #[serde(default)]
    pub tap_down_enabled: bool,
    pub long_press_ms: u64,
    pub double_tap_window_ms: u64,
    pub double_tap_slop_px: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrollSection {
    pub rail_dominance_x100: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinchSection {
    pub noise_px: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwipeSection {
    pub min_speed_px_s: f32,
    pub max_angle_deg: f32,
    pub min_magnitude_ratio_x100: u32,
}

pub fn parse_config_str(source: &str) -> Result<GesturesFile, ConfigCompilerError> {
    toml::from_str(source).map_err(|e| ConfigCompilerError::Parse(e.to_string()))
}

pub fn parse_config_file(path: &Path) -> Result<GesturesFile, ConfigCompilerError> {
    let source = fs::read_to_string(path)
        .map_err(|e| ConfigCompilerError::Io(format!("failed to read {}: {e}", path.display())))?;
    parse_config_str(&source)
}

pub fn validate_config(file: &GesturesFile) -> Result<(), ConfigCompilerError> {
    let fail = |msg: &str| Err(ConfigCompilerError::Validation(msg.to_string()));

    let floats = [
        ("points.slop_px", file.points.slop_px),
        ("points.velocity_smoothing", file.points.velocity_smoothing),
        ("tap.double_tap_slop_px", file.tap.double_tap_slop_px),
        ("pinch.noise_px", file.pinch.noise_px),
        (
            "three_finger_swipe.min_speed_px_s",
            file.three_finger_swipe.min_speed_px_s,
        ),
        (
            "three_finger_swipe.max_angle_deg",
            file.three_finger_swipe.max_angle_deg,
        ),
    ];
    // Rendered with `{:?}`; `inf` and `NaN` are not Rust literals.
    if let Some((name, _)) = floats.iter().find(|(_, value)| !value.is_finite()) {
        return Err(ConfigCompilerError::Validation(format!(
            "{name} must be finite"
        )));
    }

    if !(3..=32).contains(&file.points.max_tracked) {
        return fail("points.max_tracked must be in 3..=32");
    }
    if !(file.points.slop_px > 0.0) {
        return fail("points.slop_px must be > 0");
    }
    if !(file.points.velocity_smoothing > 0.0 && file.points.velocity_smoothing <= 1.0) {
        return fail("points.velocity_smoothing must be in (0, 1]");
    }
    if file.tap.long_press_ms == 0 {
        return fail("tap.long_press_ms must be > 0");
    }
    if file.tap.double_tap_window_ms == 0 {
        return fail("tap.double_tap_window_ms must be > 0");
    }
    if !(file.tap.double_tap_slop_px > 0.0) {
        return fail("tap.double_tap_slop_px must be > 0");
    }
    if file.scroll.rail_dominance_x100 < 100 {
        return fail("scroll.rail_dominance_x100 must be >= 100");
    }
    if !(file.pinch.noise_px >= 0.0) {
        return fail("pinch.noise_px must be >= 0");
    }

    let swipe = &file.three_finger_swipe;
    if !(swipe.min_speed_px_s >= 0.0) {
        return fail("three_finger_swipe.min_speed_px_s must be >= 0");
    }
    if !(swipe.max_angle_deg > 0.0 && swipe.max_angle_deg < 180.0) {
        return fail("three_finger_swipe.max_angle_deg must be in (0, 180)");
    }
    if !(1..=100).contains(&swipe.min_magnitude_ratio_x100) {
        return fail("three_finger_swipe.min_magnitude_ratio_x100 must be in 1..=100");
    }

    Ok(())
}

pub fn render_generated_config(file: &GesturesFile) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = render_into(&mut out, file);
    out
}

fn render_into(out: &mut String, file: &GesturesFile) -> fmt::Result {
    let points = &file.points;
    let tap = &file.tap;
    let swipe = &file.three_finger_swipe;

    writeln!(out, "// @generated by gesture_config_compiler. Do not edit.")?;
    writeln!(out)?;
    writeln!(
        out,
        "pub const MAX_GESTURE_POINTS: usize = {};",
        points.max_tracked
    )?;
    writeln!(out)?;
    writeln!(out, "pub const DEFAULT_GESTURE_CONFIG: GestureConfig = GestureConfig {{")?;
    writeln!(out, "    points: PointConfig {{")?;
    writeln!(out, "        slop_px: {:?},", points.slop_px)?;
    writeln!(
        out,
        "        velocity_smoothing: {:?},",
        points.velocity_smoothing
    )?;
    writeln!(out, "    }},")?;
    writeln!(out, "    tap: TapConfig {{")?;
    writeln!(out, "        tap_down_enabled: {},", tap.tap_down_enabled)?;
    writeln!(out, "        long_press_ms: {},", tap.long_press_ms)?;
    writeln!(
        out,
        "        double_tap_window_ms: {},",
        tap.double_tap_window_ms
    )?;
    writeln!(out, "        double_tap_slop_px: {:?},", tap.double_tap_slop_px)?;
    writeln!(out, "    }},")?;
    writeln!(out, "    scroll: ScrollConfig {{")?;
    writeln!(
        out,
        "        rail_dominance_x100: {},",
        file.scroll.rail_dominance_x100
    )?;
    writeln!(out, "    }},")?;
    writeln!(out, "    pinch: PinchConfig {{")?;
    writeln!(out, "        noise_px: {:?},", file.pinch.noise_px)?;
    writeln!(out, "    }},")?;
    writeln!(out, "    swipe: SwipeConfig {{")?;
    writeln!(out, "        min_speed_px_s: {:?},", swipe.min_speed_px_s)?;
    writeln!(out, "        max_angle_deg: {:?},", swipe.max_angle_deg)?;
    writeln!(
        out,
        "        min_magnitude_ratio_x100: {},",
        swipe.min_magnitude_ratio_x100
    )?;
    writeln!(out, "    }},")?;
    writeln!(out, "}};")?;
    Ok(())
}

pub fn generate_from_path(path: &Path) -> Result<String, ConfigCompilerError> {
    let file = parse_config_file(path)?;
    validate_config(&file)?;
    Ok(render_generated_config(&file))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[points]
max_tracked = 4
slop_px = 10
velocity_smoothing = 1.0

[tap]
long_press_ms = 500
double_tap_window_ms = 300
double_tap_slop_px = 12.5

[scroll]
rail_dominance_x100 = 100

[pinch]
noise_px = 0

[three_finger_swipe]
min_speed_px_s = 0
max_angle_deg = 45
min_magnitude_ratio_x100 = 100
"#;

    #[test]
    fn integer_literals_render_as_float_literals() {
        let file = parse_config_str(MINIMAL).expect("minimal config should parse");
        validate_config(&file).expect("minimal config should validate");
        let rendered = render_generated_config(&file);

        assert!(rendered.contains("pub const MAX_GESTURE_POINTS: usize = 4;"));
        assert!(rendered.contains("slop_px: 10.0,"));
        assert!(rendered.contains("noise_px: 0.0,"));
        assert!(rendered.contains("max_angle_deg: 45.0,"));
        assert!(rendered.contains("double_tap_slop_px: 12.5,"));
    }

    #[test]
    fn tap_down_defaults_to_disabled() {
        let file = parse_config_str(MINIMAL).expect("minimal config should parse");
        assert!(!file.tap.tap_down_enabled);
        assert!(render_generated_config(&file).contains("tap_down_enabled: false,"));
    }

    #[test]
    fn nan_slop_is_rejected() {
        let mut file = parse_config_str(MINIMAL).expect("minimal config should parse");
        file.points.slop_px = f32::NAN;
        assert_eq!(
            validate_config(&file),
            Err(ConfigCompilerError::Validation(
                "points.slop_px must be > 0".to_string()
            ))
        );
    }
}
