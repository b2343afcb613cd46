pub mod config;
pub mod pipeline;
pub mod points;
pub mod sequence_hsm;
pub mod timer;
pub mod types;

pub use config::{active_config, GestureConfig, MAX_GESTURE_POINTS};
pub use pipeline::{GesturePipeline, GestureSink, PipelineError, PipelineInput};
pub use points::{GesturePoint, PointTable};
pub use sequence_hsm::GestureSequence;
pub use timer::{DeadlineTimer, LongPressTimer, TimerCommand};
pub use types::{
    EventFlags, GestureEvent, GestureKind, GestureState, Gestures, ScrollType, TouchEvent,
    TouchKind, TouchPoint,
};
