#![cfg_attr(not(test), no_std)]

pub mod gesture_engine;

pub use gesture_engine::{
    GestureConfig, GestureEvent, GestureKind, GesturePipeline, GestureSequence, GestureState,
    TouchEvent, TouchKind,
};
