//! Streaming worker thread

use super::watcher::{LoopControl, handle_message};
use super::ErrorState;
use crate::pipeline::{MessageBus, Pipeline};
use log::{debug, error, warn};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Dedicated thread that plays the pipeline and dispatches its bus messages.
///
/// Runs until end-of-stream, an error message, or [`StreamingWorker::stop`].
/// Its only observable effect besides the pipeline's own is the [`ErrorState`].
pub struct StreamingWorker {
    handle: JoinHandle<()>,
}

impl StreamingWorker {
    pub fn spawn(
        name: &str,
        pipeline: Arc<dyn Pipeline>,
        bus: Arc<dyn MessageBus>,
        errors: Arc<ErrorState>,
    ) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name(format!("framegrab:{}", name))
            .spawn(move || run(pipeline.as_ref(), bus.as_ref(), &errors))?;
        Ok(Self { handle })
    }

    /// Ask the loop to quit through `bus` and wait for the thread to finish.
    pub fn stop(self, bus: &dyn MessageBus) {
        if let Err(e) = bus.request_stop() {
            // the loop has already quit if the bus no longer accepts messages
            warn!("failed to post stop request: {}", e);
        }
        if self.handle.join().is_err() {
            error!("streaming worker panicked");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

fn run(pipeline: &dyn Pipeline, bus: &dyn MessageBus, errors: &ErrorState) {
    if let Err(e) = pipeline.play() {
        // elements post the actual cause before the state change reports failure
        while let Some(msg) = bus.pop_pending() {
            handle_message(&msg, errors);
        }
        errors.set_if_empty(e.detail());
        return;
    }

    loop {
        let msg = bus.next_message();
        debug!("bus message: {:?}", msg);
        if handle_message(&msg, errors) == LoopControl::Quit {
            break;
        }
    }
    debug!("streaming loop finished");
}
