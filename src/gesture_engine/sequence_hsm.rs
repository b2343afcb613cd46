use statig::{blocking::IntoStateMachineExt as _, prelude::*};

use super::{
    config::GestureConfig,
    points::{GesturePoint, PointTable},
    timer::{DeadlineTimer, LongPressTimer, TimerCommand},
    types::{
        EventFlags, GestureEvent, GestureKind, GestureState, Gestures, ScrollType, TouchEvent,
        TouchKind, TouchPoint,
    },
};

#[derive(Clone, Copy, Debug)]
struct TouchInput {
    kind: TouchKind,
    point: GesturePoint,
    t_ms: u64,
}

#[derive(Clone, Copy, Debug)]
enum SequenceEvent {
    Touch(TouchInput),
    LongPressTimeout { now_ms: u64 },
}

#[derive(Clone, Copy, Debug)]
struct ClickRecord {
    t_ms: u64,
    at: TouchPoint,
}

/// Everything a transition reads or writes besides the session scalars.
struct DispatchContext {
    points: PointTable,
    config: GestureConfig,
    gestures: Gestures,
    timer: TimerCommand,
    flags: EventFlags,
    state: GestureState,
    scroll_type: Option<ScrollType>,
}

impl DispatchContext {
    fn new(config: GestureConfig) -> Self {
        Self {
            points: PointTable::new(),
            config,
            gestures: Gestures::new(),
            timer: TimerCommand::Keep,
            flags: EventFlags::empty(),
            state: GestureState::NoGesture,
            scroll_type: None,
        }
    }

    fn emit(&mut self, kind: GestureKind, t_ms: u64, at: TouchPoint) {
        let event = GestureEvent {
            kind,
            t_ms,
            x: at.x,
            y: at.y,
            touch_count: self.points.len().min(u8::MAX as usize) as u8,
            flags: self.flags,
        };
        if self.gestures.push(event).is_err() {
            log::warn!("gesture: output full, dropping {:?}", kind);
        }
    }
}

/// Recognizes gestures from one touch sequence at a time.
///
/// Feed every touch event through [`GestureSequence::process`] and call
/// [`GestureSequence::tick`] when no input arrives so a pending long-press can
/// fire. Both return the gestures recognized by that call, in order.
pub struct GestureSequence<T: LongPressTimer = DeadlineTimer> {
    machine: statig::blocking::StateMachine<SequenceHsm>,
    context: DispatchContext,
    timer: T,
}

impl Default for GestureSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureSequence {
    pub fn new() -> Self {
        Self::with_config(GestureConfig::default())
    }

    pub fn with_config(config: GestureConfig) -> Self {
        Self::with_timer(config, DeadlineTimer::new())
    }
}

impl<T: LongPressTimer> GestureSequence<T> {
    pub fn with_timer(config: GestureConfig, timer: T) -> Self {
        Self {
            machine: SequenceHsm::new().state_machine(),
            context: DispatchContext::new(config),
            timer,
        }
    }

    pub fn process(&mut self, event: &TouchEvent) -> Gestures {
        self.context.gestures.clear();
        // A deadline that passed before this event must be observed first.
        self.deliver_expired_timer(event.t_ms);

        self.context.flags = event.flags;
        if let Some(point) = self.context.points.touch(event, &self.context.config.points) {
            self.dispatch(&SequenceEvent::Touch(TouchInput {
                kind: event.kind,
                point,
                t_ms: event.t_ms,
            }));
        }

        core::mem::take(&mut self.context.gestures)
    }

    pub fn tick(&mut self, now_ms: u64) -> Gestures {
        self.context.gestures.clear();
        self.deliver_expired_timer(now_ms);
        core::mem::take(&mut self.context.gestures)
    }

    /// Abandons the current sequence and forgets the previous click.
    pub fn reset(&mut self) {
        self.timer.cancel();
        self.context = DispatchContext::new(self.context.config);
        self.machine = SequenceHsm::new().state_machine();
    }

    pub fn state(&self) -> GestureState {
        self.context.state
    }

    /// Rail of the active scroll, `None` outside of `GestureState::Scroll`.
    pub fn scroll_type(&self) -> Option<ScrollType> {
        self.context.scroll_type
    }

    pub fn points(&self) -> &PointTable {
        &self.context.points
    }

    pub fn point_count(&self) -> usize {
        self.context.points.len()
    }

    pub fn config(&self) -> &GestureConfig {
        &self.context.config
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    fn deliver_expired_timer(&mut self, now_ms: u64) {
        if self.timer.poll_expired(now_ms) {
            self.dispatch(&SequenceEvent::LongPressTimeout { now_ms });
        }
    }

    fn dispatch(&mut self, event: &SequenceEvent) {
        self.context.timer = TimerCommand::Keep;
        self.machine.handle_with_context(event, &mut self.context);
        core::mem::take(&mut self.context.timer).apply(&mut self.timer);
    }
}

struct SequenceHsm {
    pending_id: u8,
    press_flags: EventFlags,
    last_click: Option<ClickRecord>,
    scroll_id: u8,
    scroll_type: ScrollType,
    scroll_origin: TouchPoint,
    scroll_begun: bool,
    pinch_ids: [u8; 2],
    pinch_distance_start: f32,
    pinch_distance_current: f32,
    three_finger_swipe_has_fired: bool,
}

impl SequenceHsm {
    fn new() -> Self {
        Self {
            pending_id: 0,
            press_flags: EventFlags::empty(),
            last_click: None,
            scroll_id: 0,
            scroll_type: ScrollType::Free,
            scroll_origin: TouchPoint::default(),
            scroll_begun: false,
            pinch_ids: [0; 2],
            pinch_distance_start: 0.0,
            pinch_distance_current: 0.0,
            three_finger_swipe_has_fired: false,
        }
    }

    fn enter(&mut self, context: &mut DispatchContext, next: GestureState) -> Outcome<State> {
        if context.state != next {
            log::trace!("gesture: {:?} -> {:?}", context.state, next);
        }
        if next == GestureState::NoGesture && context.points.is_empty() {
            self.end_sequence();
        }
        context.state = next;
        context.scroll_type = (next == GestureState::Scroll).then_some(self.scroll_type);

        match next {
            GestureState::NoGesture => Transition(State::no_gesture()),
            GestureState::PendingSyntheticClick => Transition(State::pending_synthetic_click()),
            GestureState::Scroll => Transition(State::scroll()),
            GestureState::Pinch => Transition(State::pinch()),
            GestureState::ThreeFingerSwipe => Transition(State::three_finger_swipe()),
        }
    }

    fn end_sequence(&mut self) {
        self.scroll_type = ScrollType::Free;
        self.scroll_begun = false;
        self.pinch_distance_start = 0.0;
        self.pinch_distance_current = 0.0;
        self.three_finger_swipe_has_fired = false;
    }

    fn click(&mut self, context: &mut DispatchContext, input: &TouchInput) {
        let at = input.point.first;
        context.emit(GestureKind::Click, input.t_ms, at);

        let tap = context.config.tap;
        let is_double = self.last_click.is_some_and(|prev| {
            input.t_ms.saturating_sub(prev.t_ms) < tap.double_tap_window_ms
                && prev.at.distance_to(at) < tap.double_tap_slop_px
        });
        if is_double {
            context.emit(GestureKind::DoubleClick, input.t_ms, at);
            self.last_click = None;
        } else {
            self.last_click = Some(ClickRecord {
                t_ms: input.t_ms,
                at,
            });
        }
    }

    fn begin_scroll(&mut self, context: &mut DispatchContext, point: &GesturePoint, t_ms: u64) {
        let (dx, dy) = point.displacement();
        self.scroll_id = point.id;
        self.scroll_origin = point.first;
        self.scroll_type = rail_for(dx, dy, context.config.scroll.rail_dominance_x100);
        self.scroll_begun = true;
        context.emit(GestureKind::ScrollBegin, t_ms, point.first);
    }

    /// Scroll continues with a leftover finger; announced on its first move.
    fn resume_scroll(&mut self, point: &GesturePoint) {
        self.scroll_id = point.id;
        self.scroll_origin = point.last;
        self.scroll_type = ScrollType::Free;
        self.scroll_begun = false;
    }

    fn constrain(&self, at: TouchPoint) -> TouchPoint {
        match self.scroll_type {
            ScrollType::Free => at,
            ScrollType::Horizontal => TouchPoint::new(at.x, self.scroll_origin.y),
            ScrollType::Vertical => TouchPoint::new(self.scroll_origin.x, at.y),
        }
    }

    fn scroll_update(&mut self, context: &mut DispatchContext, input: &TouchInput) {
        let point = &input.point;
        let at = self.constrain(point.last);
        if !self.scroll_begun {
            self.scroll_begun = true;
            context.emit(GestureKind::ScrollBegin, input.t_ms, at);
        }

        let mut dx = point.last.x.saturating_sub(point.prev.x);
        let mut dy = point.last.y.saturating_sub(point.prev.y);
        match self.scroll_type {
            ScrollType::Free => {}
            ScrollType::Horizontal => dy = 0,
            ScrollType::Vertical => dx = 0,
        }
        context.emit(GestureKind::ScrollUpdate { dx, dy }, input.t_ms, at);
    }

    fn end_scroll(&mut self, context: &mut DispatchContext, input: &TouchInput) {
        if !self.scroll_begun {
            return;
        }
        let point = &input.point;
        let (velocity_x, velocity_y) = match self.scroll_type {
            ScrollType::Free => (point.velocity_x, point.velocity_y),
            ScrollType::Horizontal => (point.velocity_x, 0.0),
            ScrollType::Vertical => (0.0, point.velocity_y),
        };
        context.emit(
            GestureKind::ScrollEnd {
                velocity_x,
                velocity_y,
            },
            input.t_ms,
            self.constrain(point.last),
        );
    }

    fn is_pinch_point(&self, id: u8) -> bool {
        self.pinch_ids.contains(&id)
    }

    fn pinch_pair(&self, context: &DispatchContext) -> Option<(GesturePoint, GesturePoint)> {
        let a = context.points.get(self.pinch_ids[0])?;
        let b = context.points.get(self.pinch_ids[1])?;
        Some((*a, *b))
    }

    fn pinch_scale(&self) -> f32 {
        self.pinch_distance_current / self.pinch_distance_start
    }

    fn begin_pinch(&mut self, context: &mut DispatchContext, t_ms: u64) {
        let Some((a, b)) = context.points.first_pair() else {
            return;
        };
        let distance = a.last.distance_to(b.last).max(1.0);
        self.pinch_ids = [a.id, b.id];
        self.pinch_distance_start = distance;
        self.pinch_distance_current = distance;
        context.emit(
            GestureKind::PinchBegin { scale: 1.0 },
            t_ms,
            a.last.midpoint(b.last),
        );
    }

    fn pinch_update(&mut self, context: &mut DispatchContext, t_ms: u64) {
        let Some((a, b)) = self.pinch_pair(context) else {
            return;
        };
        let distance = a.last.distance_to(b.last);
        if (distance - self.pinch_distance_current).abs() <= context.config.pinch.noise_px {
            return;
        }
        self.pinch_distance_current = distance;
        context.emit(
            GestureKind::PinchUpdate {
                scale: distance / self.pinch_distance_start,
            },
            t_ms,
            a.last.midpoint(b.last),
        );
    }

    /// Picks a new pinch pair, rescaling the start so the reported scale does not jump.
    fn reanchor_pinch(&mut self, context: &DispatchContext) {
        let Some((a, b)) = context.points.first_pair() else {
            return;
        };
        let scale = self.pinch_scale().max(0.01);
        let distance = a.last.distance_to(b.last).max(1.0);
        self.pinch_ids = [a.id, b.id];
        self.pinch_distance_current = distance;
        self.pinch_distance_start = distance / scale;
    }

    /// A point left while a pinch was open; re-derive the state from what remains.
    fn pinch_point_left(
        &mut self,
        context: &mut DispatchContext,
        input: &TouchInput,
    ) -> Outcome<State> {
        if context.points.len() >= 2 {
            if self.is_pinch_point(input.point.id) {
                self.reanchor_pinch(context);
            }
            return self.enter(context, GestureState::Pinch);
        }

        let remaining = context.points.iter().next().copied();
        if input.kind == TouchKind::Release {
            let at = match remaining {
                Some(rest) => input.point.last.midpoint(rest.last),
                None => input.point.last,
            };
            context.emit(
                GestureKind::PinchEnd {
                    scale: self.pinch_scale(),
                },
                input.t_ms,
                at,
            );
        }

        match remaining {
            Some(rest) => {
                self.resume_scroll(&rest);
                self.enter(context, GestureState::Scroll)
            }
            None => self.enter(context, GestureState::NoGesture),
        }
    }

    fn try_three_finger_swipe(&mut self, context: &mut DispatchContext, t_ms: u64) {
        if self.three_finger_swipe_has_fired || context.points.len() != 3 {
            return;
        }
        let (a, b, c) = {
            let mut live = context.points.iter().copied();
            match (live.next(), live.next(), live.next()) {
                (Some(a), Some(b), Some(c)) => (a, b, c),
                _ => return,
            }
        };
        if !velocities_agree(&[a, b, c], &context.config) {
            return;
        }

        self.three_finger_swipe_has_fired = true;
        let mean = |p: i32, q: i32, r: i32| {
            ((i64::from(p) + i64::from(q) + i64::from(r)) / 3) as i32
        };
        let centroid = TouchPoint::new(
            mean(a.last.x, b.last.x, c.last.x),
            mean(a.last.y, b.last.y, c.last.y),
        );
        context.emit(
            GestureKind::ThreeFingerSwipe {
                velocity_x: (a.velocity_x + b.velocity_x + c.velocity_x) / 3.0,
                velocity_y: (a.velocity_y + b.velocity_y + c.velocity_y) / 3.0,
            },
            t_ms,
            centroid,
        );
    }
}

#[state_machine(initial = "State::no_gesture()")]
impl SequenceHsm {
    #[state]
    fn no_gesture(
        &mut self,
        context: &mut DispatchContext,
        event: &SequenceEvent,
    ) -> Outcome<State> {
        match event {
            SequenceEvent::Touch(input) => match input.kind {
                TouchKind::Press if context.points.len() == 1 => {
                    self.pending_id = input.point.id;
                    self.press_flags = context.flags;
                    context.timer = TimerCommand::Arm {
                        now_ms: input.t_ms,
                        duration_ms: context.config.tap.long_press_ms,
                    };
                    if context.config.tap.tap_down_enabled {
                        context.emit(GestureKind::TapDown, input.t_ms, input.point.first);
                    }
                    self.enter(context, GestureState::PendingSyntheticClick)
                }
                TouchKind::Release | TouchKind::Cancel if context.points.is_empty() => {
                    self.enter(context, GestureState::NoGesture)
                }
                _ => Handled,
            },
            SequenceEvent::LongPressTimeout { .. } => Handled,
        }
    }

    #[state]
    fn pending_synthetic_click(
        &mut self,
        context: &mut DispatchContext,
        event: &SequenceEvent,
    ) -> Outcome<State> {
        match event {
            SequenceEvent::Touch(input) => match input.kind {
                TouchKind::Move if input.point.id == self.pending_id && input.point.moved => {
                    context.timer = TimerCommand::Cancel;
                    self.begin_scroll(context, &input.point, input.t_ms);
                    self.enter(context, GestureState::Scroll)
                }
                TouchKind::Press if context.points.len() == 2 => {
                    context.timer = TimerCommand::Cancel;
                    self.begin_pinch(context, input.t_ms);
                    self.enter(context, GestureState::Pinch)
                }
                TouchKind::Release if context.points.is_empty() => {
                    context.timer = TimerCommand::Cancel;
                    if !input.point.moved {
                        self.click(context, input);
                    }
                    self.enter(context, GestureState::NoGesture)
                }
                TouchKind::Cancel if context.points.is_empty() => {
                    context.timer = TimerCommand::Cancel;
                    self.enter(context, GestureState::NoGesture)
                }
                _ => Handled,
            },
            SequenceEvent::LongPressTimeout { now_ms } => {
                if let Some(point) = context.points.get(self.pending_id).copied() {
                    context.flags = self.press_flags;
                    context.emit(GestureKind::LongPress, *now_ms, point.last);
                }
                // A held point is never classified as a tap afterwards.
                self.last_click = None;
                self.enter(context, GestureState::NoGesture)
            }
        }
    }

    #[state]
    fn scroll(&mut self, context: &mut DispatchContext, event: &SequenceEvent) -> Outcome<State> {
        match event {
            SequenceEvent::Touch(input) => match input.kind {
                TouchKind::Move if input.point.id == self.scroll_id => {
                    self.scroll_update(context, input);
                    Handled
                }
                TouchKind::Press if context.points.len() == 2 => {
                    self.begin_pinch(context, input.t_ms);
                    self.enter(context, GestureState::Pinch)
                }
                TouchKind::Release if context.points.is_empty() => {
                    self.end_scroll(context, input);
                    self.enter(context, GestureState::NoGesture)
                }
                TouchKind::Cancel if context.points.is_empty() => {
                    self.enter(context, GestureState::NoGesture)
                }
                _ => Handled,
            },
            SequenceEvent::LongPressTimeout { .. } => Handled,
        }
    }

    #[state]
    fn pinch(&mut self, context: &mut DispatchContext, event: &SequenceEvent) -> Outcome<State> {
        match event {
            SequenceEvent::Touch(input) => match input.kind {
                TouchKind::Move if self.is_pinch_point(input.point.id) => {
                    self.pinch_update(context, input.t_ms);
                    Handled
                }
                TouchKind::Press
                    if context.points.len() == 3 && !self.three_finger_swipe_has_fired =>
                {
                    self.enter(context, GestureState::ThreeFingerSwipe)
                }
                TouchKind::Release | TouchKind::Cancel => self.pinch_point_left(context, input),
                _ => Handled,
            },
            SequenceEvent::LongPressTimeout { .. } => Handled,
        }
    }

    #[state]
    fn three_finger_swipe(
        &mut self,
        context: &mut DispatchContext,
        event: &SequenceEvent,
    ) -> Outcome<State> {
        match event {
            SequenceEvent::Touch(input) => match input.kind {
                TouchKind::Move => {
                    self.try_three_finger_swipe(context, input.t_ms);
                    Handled
                }
                TouchKind::Release | TouchKind::Cancel if context.points.len() < 3 => {
                    self.pinch_point_left(context, input)
                }
                _ => Handled,
            },
            SequenceEvent::LongPressTimeout { .. } => Handled,
        }
    }
}

fn rail_for(dx: i64, dy: i64, dominance_x100: u32) -> ScrollType {
    let ax = dx.saturating_abs();
    let ay = dy.saturating_abs();
    let ratio = i64::from(dominance_x100);
    if ax.saturating_mul(100) >= ay.saturating_mul(ratio) && ax > 0 {
        ScrollType::Horizontal
    } else if ay.saturating_mul(100) >= ax.saturating_mul(ratio) && ay > 0 {
        ScrollType::Vertical
    } else {
        ScrollType::Free
    }
}

fn velocities_agree(points: &[GesturePoint; 3], config: &GestureConfig) -> bool {
    let swipe = config.swipe;
    let mut speeds = [0.0f32; 3];
    for (speed, point) in speeds.iter_mut().zip(points) {
        *speed = point.speed();
        if *speed < swipe.min_speed_px_s || *speed <= 0.0 {
            return false;
        }
    }

    let slowest = speeds.iter().copied().fold(f32::MAX, f32::min);
    let fastest = speeds.iter().copied().fold(0.0, f32::max);
    if slowest * 100.0 < fastest * swipe.min_magnitude_ratio_x100 as f32 {
        return false;
    }

    let cos_limit = libm::cosf(swipe.max_angle_deg.to_radians());
    for i in 0..3 {
        for j in (i + 1)..3 {
            let dot = points[i].velocity_x * points[j].velocity_x
                + points[i].velocity_y * points[j].velocity_y;
            if dot < cos_limit * speeds[i] * speeds[j] {
                return false;
            }
        }
    }
    true
}
