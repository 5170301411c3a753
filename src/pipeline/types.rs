//! Metadata attached to pulled frames

use std::time::Duration;

/// What the engine knows about a pulled buffer.
///
/// Every field is optional: engines fill in what the negotiated caps
/// and the buffer carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameMeta {
    /// Presentation timestamp
    pub pts: Option<Duration>,

    /// Frame width in pixels (video only)
    pub width: Option<u32>,

    /// Frame height in pixels (video only)
    pub height: Option<u32>,

    /// Raw pixel format (e.g. `BGR`) or media type (e.g. `image/jpeg`)
    pub format: Option<String>,
}

impl FrameMeta {
    /// Resolution as `(width, height)` when both are known.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }
}

impl std::fmt::Display for FrameMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.resolution() {
            Some((w, h)) => write!(f, "{}x{}", w, h)?,
            None => write!(f, "?x?")?,
        }
        if let Some(format) = &self.format {
            write!(f, " {}", format)?;
        }
        if let Some(pts) = self.pts {
            write!(f, " @{:?}", pts)?;
        }
        Ok(())
    }
}
