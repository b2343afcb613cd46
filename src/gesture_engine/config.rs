#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointConfig {
    /// Travel from the first-touch location before a point counts as moved.
    pub slop_px: f32,
    /// Weight of the newest sample in the velocity estimate, in (0, 1].
    pub velocity_smoothing: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TapConfig {
    pub tap_down_enabled: bool,
    pub long_press_ms: u64,
    pub double_tap_window_ms: u64,
    pub double_tap_slop_px: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollConfig {
    /// Major axis must exceed the minor axis by this ratio (x100) to lock a rail.
    pub rail_dominance_x100: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinchConfig {
    pub noise_px: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwipeConfig {
    pub min_speed_px_s: f32,
    pub max_angle_deg: f32,
    pub min_magnitude_ratio_x100: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureConfig {
    pub points: PointConfig,
    pub tap: TapConfig,
    pub scroll: ScrollConfig,
    pub pinch: PinchConfig,
    pub swipe: SwipeConfig,
}

include!(concat!(env!("OUT_DIR"), "/gesture_config.rs"));

pub fn active_config() -> &'static GestureConfig {
    &DEFAULT_GESTURE_CONFIG
}

impl Default for GestureConfig {
    fn default() -> Self {
        DEFAULT_GESTURE_CONFIG
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_defaults_are_usable() {
        let cfg = active_config();
        assert!(MAX_GESTURE_POINTS >= 3);
        assert!(cfg.points.slop_px > 0.0);
        assert!(cfg.points.velocity_smoothing > 0.0 && cfg.points.velocity_smoothing <= 1.0);
        assert!(cfg.tap.long_press_ms > 0);
        assert!(cfg.scroll.rail_dominance_x100 >= 100);
        assert!(cfg.swipe.min_magnitude_ratio_x100 <= 100);
    }

    #[test]
    fn default_matches_active_config() {
        assert_eq!(GestureConfig::default(), *active_config());
    }
}
