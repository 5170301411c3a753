//! Error types shared by every layer of the crate.

use std::fmt;
use thiserror::Error;

/// Domain used for errors raised by framegrab itself.
pub const DOMAIN: &str = "framegrab";

/// Code used for errors raised by framegrab itself.
pub const INTERNAL_CODE: i32 = 1;

/// Owned description of a failure, as reported at the library boundary.
///
/// Errors reported by the pipeline engine keep their original domain and code.
/// Errors raised internally use [`DOMAIN`] and [`INTERNAL_CODE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub domain: String,
    pub code: i32,
    pub message: String,
    /// Extra diagnostics attached by the engine, if any.
    pub debug: Option<String>,
}

impl ErrorDetail {
    pub fn new(domain: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            code,
            message: message.into(),
            debug: None,
        }
    }

    /// An error raised by framegrab rather than by the engine.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(DOMAIN, INTERNAL_CODE, message)
    }

    pub fn with_debug(mut self, debug: Option<String>) -> Self {
        self.debug = debug;
        self
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(feature = "gst")]
impl From<&glib::Error> for ErrorDetail {
    fn from(err: &glib::Error) -> Self {
        use glib::translate::IntoGlib;
        use gstreamer as gst;

        let code = err
            .kind::<gst::CoreError>()
            .map(IntoGlib::into_glib)
            .or_else(|| err.kind::<gst::LibraryError>().map(IntoGlib::into_glib))
            .or_else(|| err.kind::<gst::ResourceError>().map(IntoGlib::into_glib))
            .or_else(|| err.kind::<gst::StreamError>().map(IntoGlib::into_glib))
            .or_else(|| err.kind::<gst::ParseError>().map(IntoGlib::into_glib))
            .unwrap_or(0);

        ErrorDetail::new(err.domain().as_str().to_string(), code, err.message())
    }
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source could not be built. Nothing was left behind.
    Construction,
    /// The running pipeline failed. Sticky until the source is destroyed.
    Runtime,
    /// No frame right now. The caller may retry.
    Pull,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to build pipeline: {0}")]
    Parse(ErrorDetail),
    #[error("pipeline doesn't have an appsink named '{0}'")]
    MissingSink(String),
    #[error("sink name '{0}' is already claimed by another source")]
    SinkNameInUse(String),
    #[error("failed to get the pipeline bus")]
    Bus,
    #[error("cannot start a new thread: {0}")]
    WorkerStartFailed(#[source] std::io::Error),
    #[error("{0}")]
    Engine(ErrorDetail),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Pipeline(ErrorDetail),
    #[error("cannot grab next frame")]
    NoFrameAvailable,
    #[error("frame has {frame} bytes but the destination holds {dst}")]
    FrameSize { frame: usize, dst: usize },
    #[error("cannot decode frame: {0}")]
    Decode(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(_)
            | Error::MissingSink(_)
            | Error::SinkNameInUse(_)
            | Error::Bus
            | Error::WorkerStartFailed(_)
            | Error::Engine(_)
            | Error::Config(_) => ErrorKind::Construction,
            Error::Pipeline(_) => ErrorKind::Runtime,
            Error::NoFrameAvailable | Error::FrameSize { .. } | Error::Decode(_) => ErrorKind::Pull,
        }
    }

    /// Domain, code and message of this error for callers across an FFI boundary.
    pub fn detail(&self) -> ErrorDetail {
        match self {
            Error::Parse(detail) | Error::Engine(detail) | Error::Pipeline(detail) => detail.clone(),
            other => ErrorDetail::internal(other.to_string()),
        }
    }

    /// Returns true when this is the sticky pipeline failure.
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(self, Error::Pipeline(_))
    }
}

#[cfg(feature = "gst")]
impl From<glib::Error> for Error {
    fn from(err: glib::Error) -> Self {
        Error::Engine(ErrorDetail::from(&err))
    }
}

#[cfg(feature = "gst")]
impl From<glib::BoolError> for Error {
    fn from(err: glib::BoolError) -> Self {
        Error::Engine(ErrorDetail::internal(err.to_string()))
    }
}

#[cfg(feature = "gst")]
impl From<gstreamer::StateChangeError> for Error {
    fn from(err: gstreamer::StateChangeError) -> Self {
        Error::Engine(ErrorDetail::internal(err.to_string()))
    }
}
