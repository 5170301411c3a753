//! Pull frames out of a running GStreamer pipeline.
//!
//! ```no_run
//! # fn main() -> Result<(), framegrab::Error> {
//! use framegrab::Source;
//!
//! let source = Source::create("videotestsrc num-buffers=10 ! jpegenc ! appsink name=framegrab_sink")?;
//! loop {
//!     match source.grab() {
//!         Ok(frame) => {
//!             println!("{} bytes", frame.size());
//!             frame.release();
//!         }
//!         Err(e) if e.is_pipeline_failure() => return Err(e),
//!         Err(_) => break,
//!     }
//! }
//! source.destroy();
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod source;

pub use error::{Error, ErrorDetail, ErrorKind};
pub use source::{Frame, Source, SourceState};
