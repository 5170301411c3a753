//! Pull-based frame source over a running pipeline
//!
//! A [`Source`] starts a pipeline on a dedicated streaming thread and lets the
//! caller pull frames from its sink with [`Source::grab`]. Errors reported on
//! the pipeline bus are recorded once (the first one wins) and returned by
//! every later grab, so a failed pipeline is reported instead of leaving the
//! caller blocked on a sink that will never deliver.
//!
//! # Teardown
//!
//! [`Source::destroy`] (or dropping the source) stops the streaming worker,
//! joins it and moves the pipeline to its stopped state before releasing the
//! sink, the pipeline, the bus and the error slot, in that order. Destroy
//! consumes the source while grabs borrow it, so the two can never overlap.

mod error_state;
mod frame;
pub mod registry;
mod state;
mod stats;
pub mod watcher;
pub mod worker;

pub use error_state::ErrorState;
pub use frame::Frame;
pub use state::SourceState;
pub use stats::{SourceStats, StatsSummary};

use crate::config::SourceOptions;
use crate::error::Error;
use crate::pipeline::{Engine, FrameSink, MessageBus, Pipeline};
use log::{debug, error, info, warn};
use registry::SinkClaim;
use std::sync::Arc;
use worker::StreamingWorker;

pub struct Source {
    // fields drop in declaration order, the worker is stopped by hand first
    worker: Option<StreamingWorker>,
    sink: Box<dyn FrameSink>,
    pipeline: Arc<dyn Pipeline>,
    bus: Arc<dyn MessageBus>,
    errors: Arc<ErrorState>,
    stats: SourceStats,
    claim: SinkClaim,
}

impl Source {
    /// Create a source from a gst-launch-1.0 description using the default options.
    ///
    /// The description must contain an appsink named
    /// [`crate::config::DEFAULT_SINK_NAME`].
    #[cfg(feature = "gst")]
    pub fn create(description: &str) -> Result<Self, Error> {
        let engine = crate::pipeline::gst::GstEngine::new()?;
        Self::create_with(&engine, description, &SourceOptions::default())
    }

    /// Build the pipeline described by `description` and start streaming.
    ///
    /// Every failure releases what was acquired so far: each step's value
    /// unwinds its own resource when an early return drops it.
    pub fn create_with(engine: &dyn Engine, description: &str, options: &SourceOptions) -> Result<Self, Error> {
        debug!("creating source: {}", description);

        let claim = SinkClaim::acquire(&options.sink_name)?;
        let pipeline: Arc<dyn Pipeline> = Arc::from(engine.launch(description)?);
        let sink = pipeline
            .sink(claim.name())
            .ok_or_else(|| Error::MissingSink(claim.name().to_owned()))?;
        let bus: Arc<dyn MessageBus> = Arc::from(pipeline.bus().ok_or(Error::Bus)?);
        let errors = Arc::new(ErrorState::new());

        let worker = StreamingWorker::spawn(
            claim.name(),
            Arc::clone(&pipeline),
            Arc::clone(&bus),
            Arc::clone(&errors),
        )
        .map_err(|e| {
            error!("cannot start streaming thread for '{}': {}", claim.name(), e);
            Error::WorkerStartFailed(e)
        })?;

        info!("source started on sink '{}'", claim.name());

        Ok(Source {
            worker: Some(worker),
            sink,
            pipeline,
            bus,
            errors,
            stats: SourceStats::new(),
            claim,
        })
    }

    /// Wait for the next frame.
    ///
    /// Returns the recorded pipeline error as soon as there is one, without
    /// touching the sink. Otherwise blocks until the sink delivers a frame or
    /// reaches end-of-stream, in which case [`Error::NoFrameAvailable`] is
    /// returned. That error is not fatal by itself.
    pub fn grab(&self) -> Result<Frame, Error> {
        if let Some(detail) = self.errors.snapshot() {
            return Err(Error::Pipeline(detail));
        }

        match self.sink.pull() {
            Some(pulled) => {
                let frame = Frame::new(pulled);
                self.stats.record_frame(frame.size());
                Ok(frame)
            }
            None => {
                self.stats.record_pull_failure();
                // the pipeline may have failed while we were waiting
                match self.errors.snapshot() {
                    Some(detail) => Err(Error::Pipeline(detail)),
                    None => Err(Error::NoFrameAvailable),
                }
            }
        }
    }

    pub fn state(&self) -> SourceState {
        if self.errors.is_set() {
            SourceState::Failed
        } else if self.stats.frames_grabbed() > 0 {
            SourceState::Running
        } else {
            SourceState::Started
        }
    }

    /// Copy of the recorded pipeline error, if any.
    pub fn error(&self) -> Option<crate::error::ErrorDetail> {
        self.errors.snapshot()
    }

    pub fn sink_name(&self) -> &str {
        self.claim.name()
    }

    pub fn stats(&self) -> &SourceStats {
        &self.stats
    }

    /// Stop streaming and release every resource.
    pub fn destroy(self) {
        drop(self);
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        let state = self.state();
        if let Some(worker) = self.worker.take() {
            worker.stop(self.bus.as_ref());
            if let Err(e) = self.pipeline.halt() {
                warn!("failed to stop pipeline of '{}': {}", self.claim.name(), e);
            }
        }
        debug_assert!(state.can_transition_to(&SourceState::Destroyed));
        info!(
            "source on sink '{}' destroyed ({} -> {}): {}",
            self.claim.name(),
            state,
            SourceState::Destroyed,
            self.stats.summary()
        );
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("sink", &self.claim.name())
            .field("state", &self.state())
            .finish()
    }
}
