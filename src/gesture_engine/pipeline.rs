use core::fmt;

use heapless::Deque;

use super::{
    config::GestureConfig,
    sequence_hsm::GestureSequence,
    timer::{DeadlineTimer, LongPressTimer},
    types::{GestureEvent, TouchEvent},
};

pub const PIPELINE_QUEUE_CAPACITY: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PipelineInput {
    Touch(TouchEvent),
    Tick { now_ms: u64 },
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PipelineError {
    /// The queue is full; the rejected input is handed back.
    QueueFull(PipelineInput),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull(input) => {
                write!(f, "gesture pipeline queue full ({PIPELINE_QUEUE_CAPACITY}), rejected {input:?}")
            }
        }
    }
}

/// Consumer of recognized gestures.
pub trait GestureSink {
    fn deliver(&mut self, gesture: &GestureEvent);
}

impl<F> GestureSink for F
where
    F: FnMut(&GestureEvent),
{
    fn deliver(&mut self, gesture: &GestureEvent) {
        self(gesture)
    }
}

impl<const N: usize> GestureSink for heapless::Vec<GestureEvent, N> {
    fn deliver(&mut self, gesture: &GestureEvent) {
        if self.push(*gesture).is_err() {
            log::warn!("gesture: sink full ({}), dropping {:?}", N, gesture.kind);
        }
    }
}

/// Single consumer that serializes touch input, ticks and resets into one
/// [`GestureSequence`].
pub struct GesturePipeline<T: LongPressTimer = DeadlineTimer> {
    sequence: GestureSequence<T>,
    inputs: Deque<PipelineInput, PIPELINE_QUEUE_CAPACITY>,
}

impl Default for GesturePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl GesturePipeline {
    pub fn new() -> Self {
        Self::with_config(GestureConfig::default())
    }

    pub fn with_config(config: GestureConfig) -> Self {
        Self::with_sequence(GestureSequence::with_config(config))
    }
}

impl<T: LongPressTimer> GesturePipeline<T> {
    pub fn with_sequence(sequence: GestureSequence<T>) -> Self {
        Self {
            sequence,
            inputs: Deque::new(),
        }
    }

    /// Queues `input` behind everything already submitted.
    pub fn submit(&mut self, input: PipelineInput) -> Result<(), PipelineError> {
        // Never drop queued moves to make room; a gap would distort velocities.
        self.inputs.push_back(input).map_err(PipelineError::QueueFull)
    }

    /// Discards queued input and schedules a reset of the recognizer.
    pub fn request_reset(&mut self) {
        self.inputs.clear();
        let _ = self.inputs.push_back(PipelineInput::Reset);
    }

    /// Feeds every queued input through the recognizer, returning the number of
    /// gestures delivered to `sink`.
    pub fn drain<S: GestureSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let mut delivered = 0;
        while let Some(input) = self.inputs.pop_front() {
            let gestures = match input {
                PipelineInput::Touch(event) => self.sequence.process(&event),
                PipelineInput::Tick { now_ms } => self.sequence.tick(now_ms),
                PipelineInput::Reset => {
                    self.sequence.reset();
                    continue;
                }
            };
            for gesture in &gestures {
                sink.deliver(gesture);
            }
            delivered += gestures.len();
        }
        delivered
    }

    pub fn pending(&self) -> usize {
        self.inputs.len()
    }

    pub fn sequence(&self) -> &GestureSequence<T> {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut GestureSequence<T> {
        &mut self.sequence
    }
}
