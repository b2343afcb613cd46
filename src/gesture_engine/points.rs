use super::{
    config::{PointConfig, MAX_GESTURE_POINTS},
    types::{TouchEvent, TouchKind, TouchPoint},
};

/// Kinematic state of one finger, keyed by its touch id.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GesturePoint {
    pub id: u8,
    pub first: TouchPoint,
    pub prev: TouchPoint,
    pub last: TouchPoint,
    pub first_ms: u64,
    pub prev_ms: u64,
    pub last_ms: u64,
    pub velocity_x: f32,
    pub velocity_y: f32,
    /// Set once the point travelled past the slop radius; never cleared.
    pub moved: bool,
}

impl GesturePoint {
    fn pressed(id: u8, at: TouchPoint, t_ms: u64) -> Self {
        Self {
            id,
            first: at,
            prev: at,
            last: at,
            first_ms: t_ms,
            prev_ms: t_ms,
            last_ms: t_ms,
            velocity_x: 0.0,
            velocity_y: 0.0,
            moved: false,
        }
    }

    fn advance(&mut self, at: TouchPoint, t_ms: u64, cfg: &PointConfig) {
        let dt_ms = t_ms.saturating_sub(self.last_ms);
        if dt_ms > 0 {
            let dx = i64::from(at.x) - i64::from(self.last.x);
            let dy = i64::from(at.y) - i64::from(self.last.y);
            let inst_x = dx as f32 * 1000.0 / dt_ms as f32;
            let inst_y = dy as f32 * 1000.0 / dt_ms as f32;
            let a = cfg.velocity_smoothing;
            self.velocity_x = self.velocity_x * (1.0 - a) + inst_x * a;
            self.velocity_y = self.velocity_y * (1.0 - a) + inst_y * a;
        }

        self.prev = self.last;
        self.prev_ms = self.last_ms;
        self.last = at;
        self.last_ms = t_ms.max(self.last_ms);

        if !self.moved && self.first.distance_to(at) > cfg.slop_px {
            self.moved = true;
        }
    }

    /// Offset from the first-touch location to the current one.
    pub fn displacement(&self) -> (i64, i64) {
        (
            i64::from(self.last.x) - i64::from(self.first.x),
            i64::from(self.last.y) - i64::from(self.first.y),
        )
    }

    pub fn speed(&self) -> f32 {
        libm::hypotf(self.velocity_x, self.velocity_y)
    }
}

/// Fixed-capacity slot table of live points.
#[derive(Clone, Debug)]
pub struct PointTable {
    slots: [Option<GesturePoint>; MAX_GESTURE_POINTS],
    count: usize,
}

impl Default for PointTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PointTable {
    pub const fn new() -> Self {
        Self {
            slots: [None; MAX_GESTURE_POINTS],
            count: 0,
        }
    }

    /// Applies `event` to the table and returns a snapshot of the affected point.
    ///
    /// Release and Cancel remove the point after the snapshot is taken. Returns
    /// `None` when the event cannot be tracked: a Press for a live id or onto a
    /// full table, or any other kind for an unknown id.
    pub fn touch(&mut self, event: &TouchEvent, cfg: &PointConfig) -> Option<GesturePoint> {
        let at = event.location();
        match event.kind {
            TouchKind::Press => {
                if self.slot_of(event.id).is_some() {
                    log::debug!("gesture: duplicate press id={}", event.id);
                    return None;
                }
                let Some(free) = self.slots.iter().position(Option::is_none) else {
                    log::debug!(
                        "gesture: point table full ({}), dropping id={}",
                        MAX_GESTURE_POINTS,
                        event.id
                    );
                    return None;
                };
                let point = GesturePoint::pressed(event.id, at, event.t_ms);
                self.slots[free] = Some(point);
                self.count += 1;
                Some(point)
            }
            TouchKind::Move => {
                let slot = self.known_slot(event)?;
                let point = self.slots[slot].as_mut()?;
                point.advance(at, event.t_ms, cfg);
                Some(*point)
            }
            TouchKind::Release => {
                let slot = self.known_slot(event)?;
                let mut point = self.slots[slot].take()?;
                self.count -= 1;
                point.advance(at, event.t_ms, cfg);
                Some(point)
            }
            TouchKind::Cancel => {
                let slot = self.known_slot(event)?;
                let point = self.slots[slot].take()?;
                self.count -= 1;
                Some(point)
            }
        }
    }

    pub fn get(&self, id: u8) -> Option<&GesturePoint> {
        self.iter().find(|point| point.id == id)
    }

    /// Live points in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &GesturePoint> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == MAX_GESTURE_POINTS
    }

    pub fn clear(&mut self) {
        self.slots = [None; MAX_GESTURE_POINTS];
        self.count = 0;
    }

    /// First two live points in slot order.
    pub fn first_pair(&self) -> Option<(GesturePoint, GesturePoint)> {
        let mut live = self.iter();
        let a = *live.next()?;
        let b = *live.next()?;
        Some((a, b))
    }

    fn slot_of(&self, id: u8) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.is_some_and(|point| point.id == id))
    }

    fn known_slot(&self, event: &TouchEvent) -> Option<usize> {
        let slot = self.slot_of(event.id);
        if slot.is_none() {
            log::debug!(
                "gesture: {:?} for unknown id={}, ignored",
                event.kind,
                event.id
            );
        }
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture_engine::config::active_config;

    fn cfg() -> PointConfig {
        PointConfig {
            slop_px: 10.0,
            velocity_smoothing: 1.0,
        }
    }

    fn ev(id: u8, kind: TouchKind, x: i32, y: i32, t_ms: u64) -> TouchEvent {
        TouchEvent::new(id, kind, x, y, t_ms)
    }

    #[test]
    fn press_seeds_point_at_rest() {
        let mut table = PointTable::new();
        let point = table
            .touch(&ev(4, TouchKind::Press, 30, 40, 100), &cfg())
            .expect("press should be tracked");

        assert_eq!(point.first, TouchPoint::new(30, 40));
        assert_eq!(point.last, point.first);
        assert_eq!(point.first_ms, 100);
        assert_eq!((point.velocity_x, point.velocity_y), (0.0, 0.0));
        assert!(!point.moved);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn move_updates_velocity_and_slop_flag() {
        let mut table = PointTable::new();
        table.touch(&ev(0, TouchKind::Press, 0, 0, 0), &cfg());

        let point = table
            .touch(&ev(0, TouchKind::Move, 5, 0, 10), &cfg())
            .expect("move should be tracked");
        assert!(!point.moved);
        assert!((point.velocity_x - 500.0).abs() < 1e-3);
        assert_eq!(point.prev, TouchPoint::new(0, 0));

        let point = table
            .touch(&ev(0, TouchKind::Move, 5, 20, 20), &cfg())
            .expect("move should be tracked");
        assert!(point.moved);
        assert!((point.velocity_y - 2000.0).abs() < 1e-3);
        assert_eq!(point.displacement(), (5, 20));

        // Returning inside the slop radius does not clear the flag.
        let point = table
            .touch(&ev(0, TouchKind::Move, 0, 0, 30), &cfg())
            .expect("move should be tracked");
        assert!(point.moved);
    }

    #[test]
    fn smoothing_blends_with_previous_velocity() {
        let half = PointConfig {
            slop_px: 10.0,
            velocity_smoothing: 0.5,
        };
        let mut table = PointTable::new();
        table.touch(&ev(0, TouchKind::Press, 0, 0, 0), &half);
        table.touch(&ev(0, TouchKind::Move, 10, 0, 10), &half);
        let point = table
            .touch(&ev(0, TouchKind::Move, 10, 0, 20), &half)
            .expect("move should be tracked");
        // 0.5 * 500 + 0.5 * 0
        assert!((point.velocity_x - 250.0).abs() < 1e-3);
    }

    #[test]
    fn zero_dt_keeps_velocity() {
        let mut table = PointTable::new();
        table.touch(&ev(0, TouchKind::Press, 0, 0, 0), &cfg());
        table.touch(&ev(0, TouchKind::Move, 10, 0, 10), &cfg());
        let point = table
            .touch(&ev(0, TouchKind::Move, 40, 0, 10), &cfg())
            .expect("move should be tracked");
        assert!((point.velocity_x - 1000.0).abs() < 1e-3);
        assert_eq!(point.last, TouchPoint::new(40, 0));
    }

    #[test]
    fn opposite_extremes_are_tracked_without_overflow() {
        let mut table = PointTable::new();
        table.touch(&ev(0, TouchKind::Press, i32::MIN, 0, 0), &cfg());
        let point = table
            .touch(&ev(0, TouchKind::Move, i32::MAX, i32::MIN, 1), &cfg())
            .expect("move should be tracked");

        assert!(point.moved);
        assert!(point.velocity_x > 4.0e12);
        assert!(point.velocity_y < -2.0e12);
        assert_eq!(
            point.displacement(),
            (i64::from(u32::MAX), i64::from(i32::MIN))
        );
    }

    #[test]
    fn release_returns_snapshot_and_removes() {
        let mut table = PointTable::new();
        table.touch(&ev(1, TouchKind::Press, 0, 0, 0), &cfg());
        let point = table
            .touch(&ev(1, TouchKind::Release, 3, 4, 10), &cfg())
            .expect("release should be tracked");

        assert_eq!(point.last, TouchPoint::new(3, 4));
        assert!(table.is_empty());
        assert!(table.get(1).is_none());
    }

    #[test]
    fn cancel_removes_without_updating() {
        let mut table = PointTable::new();
        table.touch(&ev(1, TouchKind::Press, 0, 0, 0), &cfg());
        let point = table
            .touch(&ev(1, TouchKind::Cancel, 300, 400, 10), &cfg())
            .expect("cancel should be tracked");

        assert_eq!(point.last, TouchPoint::new(0, 0));
        assert!(table.is_empty());
    }

    #[test]
    fn unknown_and_duplicate_ids_are_rejected() {
        let mut table = PointTable::new();
        assert!(table.touch(&ev(9, TouchKind::Move, 0, 0, 0), &cfg()).is_none());
        assert!(table.touch(&ev(9, TouchKind::Release, 0, 0, 0), &cfg()).is_none());
        assert!(table.touch(&ev(9, TouchKind::Cancel, 0, 0, 0), &cfg()).is_none());

        table.touch(&ev(2, TouchKind::Press, 0, 0, 0), &cfg());
        assert!(table.touch(&ev(2, TouchKind::Press, 50, 50, 5), &cfg()).is_none());
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(2).map(|p| p.first), Some(TouchPoint::new(0, 0)));
    }

    #[test]
    fn full_table_rejects_press() {
        let mut table = PointTable::new();
        for id in 0..MAX_GESTURE_POINTS as u8 {
            assert!(table
                .touch(&ev(id, TouchKind::Press, id as i32, 0, 0), &cfg())
                .is_some());
        }
        assert!(table.is_full());
        assert!(table
            .touch(&ev(200, TouchKind::Press, 0, 0, 0), &cfg())
            .is_none());
        assert_eq!(table.len(), MAX_GESTURE_POINTS);
    }

    #[test]
    fn freed_slot_is_reused_in_order() {
        let mut table = PointTable::new();
        let config = active_config().points;
        table.touch(&ev(10, TouchKind::Press, 0, 0, 0), &config);
        table.touch(&ev(11, TouchKind::Press, 0, 0, 0), &config);
        table.touch(&ev(10, TouchKind::Release, 0, 0, 1), &config);
        table.touch(&ev(12, TouchKind::Press, 0, 0, 2), &config);

        let ids: std::vec::Vec<u8> = table.iter().map(|p| p.id).collect();
        assert_eq!(ids, std::vec![12, 11]);
        let (a, b) = table.first_pair().expect("two live points");
        assert_eq!((a.id, b.id), (12, 11));
    }
}
