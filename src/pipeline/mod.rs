//! Pipeline engine abstraction for framegrab
//!
//! The media engine is an opaque collaborator. This module describes the
//! narrow surface a [`crate::source::Source`] needs from it:
//! - Engine: turns a textual description into a pipeline
//! - Pipeline: state control, sink lookup and access to the message bus
//! - FrameSink: blocking pull of the next mapped buffer
//! - MessageBus: blocking delivery of bus messages to the streaming worker
//!
//! # Threading
//!
//! The sink is pulled from the caller's thread while the bus is consumed by
//! the streaming worker, so every handle must be `Send + Sync`. Thread safety
//! of the pipeline itself is the engine's own contract.

#[cfg(feature = "gst")]
pub mod gst;
#[cfg(test)]
pub(crate) mod synthetic;
pub mod types;

pub use types::FrameMeta;

use crate::error::{Error, ErrorDetail};

/// Builds pipelines from descriptions.
pub trait Engine: Send + Sync {
    /// Parse `description` and build a pipeline in its initial (stopped) state.
    fn launch(&self, description: &str) -> Result<Box<dyn Pipeline>, Error>;
}

/// A built pipeline, exclusively owned by one source.
pub trait Pipeline: Send + Sync {
    /// Look up the sink element named `name`.
    fn sink(&self, name: &str) -> Option<Box<dyn FrameSink>>;

    /// Get the message bus of this pipeline.
    fn bus(&self) -> Option<Box<dyn MessageBus>>;

    /// Move the pipeline to its playing state.
    fn play(&self) -> Result<(), Error>;

    /// Move the pipeline to its fully stopped state.
    ///
    /// Pending and future sink pulls must return instead of blocking.
    fn halt(&self) -> Result<(), Error>;
}

/// Terminal stage the frames are pulled from.
pub trait FrameSink: Send + Sync {
    /// Wait for the next sample.
    ///
    /// Returns `None` at end-of-stream or once the sink is shut down.
    fn pull(&self) -> Option<PulledFrame>;
}

/// Read-only mapped memory of one buffer.
///
/// Holds its own reference on the underlying buffer. Dropping the view
/// unmaps it and drops that reference.
pub trait FrameView: Send + Sync {
    fn as_slice(&self) -> &[u8];
}

/// A buffer taken out of the sink.
pub struct PulledFrame {
    pub view: Box<dyn FrameView>,
    pub meta: FrameMeta,
}

/// Message bus of a pipeline.
pub trait MessageBus: Send + Sync {
    /// Block until the next message arrives.
    fn next_message(&self) -> BusMessage;

    /// Pop a message that is already queued, without blocking.
    fn pop_pending(&self) -> Option<BusMessage>;

    /// Post a stop request that a blocked [`MessageBus::next_message`] will return.
    fn request_stop(&self) -> Result<(), Error>;
}

/// The bus messages the streaming worker distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusMessage {
    /// End of stream.
    Eos,
    /// Error reported by a pipeline element.
    Error(ErrorDetail),
    /// Stop request posted by [`MessageBus::request_stop`].
    Stop,
    /// Anything else.
    Other,
}
