//! Bus message handling for the streaming worker

use super::ErrorState;
use crate::pipeline::BusMessage;
use log::{debug, warn};

/// What the streaming loop should do after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Quit,
}

/// Handle one bus message. Never blocks and never fails.
///
/// The first error is recorded, later ones are only logged: errors raised
/// while the pipeline shuts down must not hide the original cause.
pub fn handle_message(msg: &BusMessage, errors: &ErrorState) -> LoopControl {
    match msg {
        BusMessage::Eos => {
            debug!("end of stream");
            LoopControl::Quit
        }
        BusMessage::Error(detail) => {
            if errors.set_if_empty(detail.clone()) {
                warn!(
                    "pipeline error from {} ({}): {} {}",
                    detail.domain,
                    detail.code,
                    detail.message,
                    detail.debug.as_deref().unwrap_or_default()
                );
            } else {
                debug!("discarding secondary pipeline error: {}", detail.message);
            }
            LoopControl::Quit
        }
        BusMessage::Stop => LoopControl::Quit,
        BusMessage::Other => LoopControl::Continue,
    }
}
