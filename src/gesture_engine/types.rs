use bitflags::bitflags;

bitflags! {
    /// Modifier state attached to a touch event and copied onto the gestures it produces.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EventFlags: u32 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
        const META = 1 << 3;
        const CAPS_LOCK = 1 << 4;
        const LEFT_BUTTON = 1 << 5;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TouchPoint {
    pub x: i32,
    pub y: i32,
}

impl TouchPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: TouchPoint) -> f32 {
        let dx = (i64::from(other.x) - i64::from(self.x)) as f32;
        let dy = (i64::from(other.y) - i64::from(self.y)) as f32;
        libm::hypotf(dx, dy)
    }

    pub fn midpoint(self, other: TouchPoint) -> TouchPoint {
        TouchPoint {
            x: ((i64::from(self.x) + i64::from(other.x)) / 2) as i32,
            y: ((i64::from(self.y) + i64::from(other.y)) / 2) as i32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchKind {
    Press,
    Move,
    Release,
    Cancel,
}

/// One raw touch occurrence as delivered by the windowing layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchEvent {
    pub id: u8,
    pub kind: TouchKind,
    pub x: i32,
    pub y: i32,
    pub t_ms: u64,
    pub flags: EventFlags,
}

impl TouchEvent {
    pub const fn new(id: u8, kind: TouchKind, x: i32, y: i32, t_ms: u64) -> Self {
        Self {
            id,
            kind,
            x,
            y,
            t_ms,
            flags: EventFlags::empty(),
        }
    }

    pub const fn with_flags(mut self, flags: EventFlags) -> Self {
        self.flags = flags;
        self
    }

    pub const fn location(&self) -> TouchPoint {
        TouchPoint::new(self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GestureState {
    #[default]
    NoGesture,
    PendingSyntheticClick,
    Scroll,
    Pinch,
    ThreeFingerSwipe,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrollType {
    #[default]
    Free,
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureKind {
    TapDown,
    Click,
    DoubleClick,
    LongPress,
    ScrollBegin,
    /// Per-move delta; the locked axis is always zero.
    ScrollUpdate { dx: i32, dy: i32 },
    /// Smoothed release velocity in px/s.
    ScrollEnd { velocity_x: f32, velocity_y: f32 },
    /// Always reports a scale of 1.0.
    PinchBegin { scale: f32 },
    /// Scale relative to the distance recorded at `PinchBegin`.
    PinchUpdate { scale: f32 },
    PinchEnd { scale: f32 },
    /// Averaged velocity of the three fingers in px/s.
    ThreeFingerSwipe { velocity_x: f32, velocity_y: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub t_ms: u64,
    pub x: i32,
    pub y: i32,
    pub touch_count: u8,
    pub flags: EventFlags,
}

impl GestureEvent {
    pub const fn location(&self) -> TouchPoint {
        TouchPoint::new(self.x, self.y)
    }
}

pub const MAX_GESTURES_PER_INPUT: usize = 4;

/// Gestures recognized from a single input, in emission order.
pub type Gestures = heapless::Vec<GestureEvent, MAX_GESTURES_PER_INPUT>;
