//! Image capture on top of a [`Source`]

use crate::config::{CaptureConfig, FrameFormat};
use crate::error::Error;
use crate::pipeline::Engine;
use crate::source::Source;
use bytes::Bytes;
use image::{ImageFormat, ImageReader};
use log::{debug, info};
use std::io::Cursor;
use std::time::Duration;

/// One captured image, detached from the pipeline.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
    /// Only set for raw frames
    pub color_model: Option<String>,
    pub pts: Option<Duration>,
}

/// Pulls frames from a source and copies them out as [`CapturedImage`]s.
///
/// For jpeg frames with no configured size, width and height are read from
/// the first frame. Every frame is assumed to have that same size.
#[derive(Debug)]
pub struct Capture {
    source: Source,
    format: FrameFormat,
    color_model: Option<String>,
    width: u32,
    height: u32,
}

impl Capture {
    #[cfg(feature = "gst")]
    pub fn open(config: &CaptureConfig) -> Result<Self, Error> {
        let engine = crate::pipeline::gst::GstEngine::new()?;
        Self::open_with(&engine, config)
    }

    pub fn open_with(engine: &dyn Engine, config: &CaptureConfig) -> Result<Self, Error> {
        let description = config.description()?;
        let source = Source::create_with(engine, &description, &config.options())?;
        let (width, height) = config.dimensions();

        info!("capturing {} frames: {}", config.format(), description);

        Ok(Self {
            source,
            format: config.format(),
            color_model: config.color_model(),
            width,
            height,
        })
    }

    /// Grab the next frame and copy it out of the pipeline.
    pub fn next_image(&mut self) -> Result<CapturedImage, Error> {
        let frame = self.source.grab()?;
        let mut data = vec![0u8; frame.size()];
        frame.copy_to(&mut data)?;
        let pts = frame.meta().pts;
        frame.release();

        if self.format == FrameFormat::Jpeg && (self.width == 0 || self.height == 0) {
            let (width, height) = jpeg_dimensions(&data)?;
            debug!("detected jpeg frame size {}x{}", width, height);
            self.width = width;
            self.height = height;
        }

        Ok(CapturedImage {
            data: Bytes::from(data),
            width: self.width,
            height: self.height,
            format: self.format,
            color_model: self.color_model.clone(),
            pts,
        })
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Stop capturing and destroy the source.
    pub fn close(self) {
        self.source.destroy();
    }
}

fn jpeg_dimensions(data: &[u8]) -> Result<(u32, u32), Error> {
    ImageReader::with_format(Cursor::new(data), ImageFormat::Jpeg)
        .into_dimensions()
        .map_err(|e| Error::Decode(e.to_string()))
}
