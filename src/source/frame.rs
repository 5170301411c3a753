use crate::error::Error;
use crate::pipeline::{FrameMeta, FrameView, PulledFrame};
use std::fmt;

/// One frame grabbed from a [`super::Source`].
///
/// Owns a reference on the underlying buffer and its read-only mapping, taken
/// when the frame was grabbed. Both are given back exactly once, by
/// [`Frame::release`] or when the frame is dropped. A released frame is moved,
/// so it can be neither read nor released again:
///
/// ```compile_fail
/// # fn twice(frame: framegrab::source::Frame) {
/// frame.release();
/// frame.release();
/// # }
/// ```
pub struct Frame {
    view: Box<dyn FrameView>,
    meta: FrameMeta,
}

impl Frame {
    pub(crate) fn new(pulled: PulledFrame) -> Self {
        Self {
            view: pulled.view,
            meta: pulled.meta,
        }
    }

    /// Number of bytes in the frame.
    pub fn size(&self) -> usize {
        self.view.as_slice().len()
    }

    /// The mapped bytes.
    pub fn as_slice(&self) -> &[u8] {
        self.view.as_slice()
    }

    /// Copy the frame into `dst`, which must hold exactly [`Frame::size`] bytes.
    pub fn copy_to(&self, dst: &mut [u8]) -> Result<(), Error> {
        let src = self.view.as_slice();
        if dst.len() != src.len() {
            return Err(Error::FrameSize {
                frame: src.len(),
                dst: dst.len(),
            });
        }
        dst.copy_from_slice(src);
        Ok(())
    }

    pub fn meta(&self) -> &FrameMeta {
        &self.meta
    }

    /// Unmap the frame and drop its buffer reference.
    pub fn release(self) {
        drop(self);
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("size", &self.size())
            .field("meta", &self.meta)
            .finish()
    }
}
