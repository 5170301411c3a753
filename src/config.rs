//! Source configuration
//!
//! Besides the options of a [`crate::source::Source`] itself, this module
//! turns the two supported capture setups into pipeline descriptions:
//! - `raw`: a user supplied gst-launch-1.0 pipeline ending with `appsink`
//! - `nvcamera`: the Jetson camera module, with the pipeline built here

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Name the sink element is looked up by when none is configured.
pub const DEFAULT_SINK_NAME: &str = "framegrab_sink";

fn default_sink_name() -> String {
    DEFAULT_SINK_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOptions {
    /// Name of the appsink element frames are pulled from. Unique per process.
    #[serde(default = "default_sink_name")]
    pub sink_name: String,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            sink_name: default_sink_name(),
        }
    }
}

/// Encoding of the frames delivered by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    Raw,
    Jpeg,
}

impl FrameFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameFormat::Raw => "raw",
            FrameFormat::Jpeg => "jpeg",
        }
    }

    /// File extension used when frames are written to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            FrameFormat::Raw => "raw",
            FrameFormat::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user supplied pipeline.
///
/// ```text
/// videotestsrc ! video/x-raw,format=BGR,width=640,height=480,framerate=30/1 ! appsink
/// ```
///
/// When the format is jpeg, width and height are detected from the first frame
/// if not given. For raw frames they are required, as is the color model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSourceOptions {
    pub pipeline: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub format: FrameFormat,
    /// RGB layout of raw frames (e.g. `BGR`, `RGBA`)
    #[serde(default)]
    pub color_model: Option<String>,
}

impl RawSourceOptions {
    pub fn validate(&self) -> Result<(), Error> {
        if !ends_with_appsink(&self.pipeline) {
            return Err(Error::Config("pipeline must end with appsink".into()));
        }
        if self.format == FrameFormat::Raw {
            if self.width == 0 || self.height == 0 {
                return Err(Error::Config(
                    "width and height must be specified when the format is raw".into(),
                ));
            }
            if self.color_model.as_deref().is_none_or(str::is_empty) {
                return Err(Error::Config("color_model is required when the format is raw".into()));
            }
        }
        Ok(())
    }
}

/// Options of the Jetson camera module (`nvcamerasrc`).
///
/// Values are not validated deeply, GStreamer does that when the pipeline is
/// built. When the format is raw the pipeline is
///
/// ```text
/// nvcamerasrc !
/// video/x-raw(memory:NVMM),format=I420,width={width},height={height},framerate={framerate} !
/// nvvidconv flip-method={flip_method} !
/// video/x-raw ! videoconvert ! video/x-raw,format={COLOR_MODEL} !
/// appsink
/// ```
///
/// and for jpeg the conversion stages are replaced by `nvjpegenc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NvCameraOptions {
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
    /// `bgr` or `rgb`, only used for raw frames
    pub color_model: String,
    /// GStreamer fraction, e.g. `30/1`
    pub framerate: String,
    /// `nvvidconv flip-method`. 2 suits the default camera mounting.
    pub flip_method: u32,
}

impl Default for NvCameraOptions {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            format: FrameFormat::Jpeg,
            color_model: "bgr".into(),
            framerate: "10/1".into(),
            flip_method: 2,
        }
    }
}

impl NvCameraOptions {
    pub fn pipeline_description(&self) -> Result<String, Error> {
        let mut stages = vec![
            "nvcamerasrc".to_string(),
            format!(
                "video/x-raw(memory:NVMM),format=I420,width={},height={},framerate={}",
                self.width, self.height, self.framerate
            ),
            format!("nvvidconv flip-method={}", self.flip_method),
        ];

        match self.format {
            FrameFormat::Jpeg => stages.push("nvjpegenc".into()),
            FrameFormat::Raw => {
                let color_model = match self.color_model.as_str() {
                    "rgb" | "bgr" => self.color_model.to_uppercase(),
                    other => return Err(Error::Config(format!("unsupported color_model: {other}"))),
                };
                stages.push("video/x-raw".into());
                stages.push("videoconvert".into());
                stages.push(format!("video/x-raw,format={color_model}"));
            }
        }
        stages.push("appsink".into());

        Ok(stages.join(" ! "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Raw(RawSourceOptions),
    NvCamera(NvCameraOptions),
}

/// Everything needed to open a [`crate::capture::Capture`].
///
/// ```json
/// { "type": "raw", "pipeline": "videotestsrc ! jpegenc ! appsink", "format": "jpeg" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(flatten)]
    pub source: SourceConfig,
    #[serde(default = "default_sink_name")]
    pub sink_name: String,
}

impl CaptureConfig {
    pub fn new(source: SourceConfig) -> Self {
        Self {
            source,
            sink_name: default_sink_name(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), Error> {
        match &self.source {
            SourceConfig::Raw(raw) => raw.validate(),
            SourceConfig::NvCamera(cam) => cam.pipeline_description().map(|_| ()),
        }
    }

    /// The pipeline description, with the trailing appsink named after
    /// [`CaptureConfig::effective_sink_name`].
    pub fn description(&self) -> Result<String, Error> {
        self.validate()?;
        let pipeline = match &self.source {
            SourceConfig::Raw(raw) => raw.pipeline.clone(),
            SourceConfig::NvCamera(cam) => cam.pipeline_description()?,
        };
        name_sink(&pipeline, self.effective_sink_name())
    }

    /// Name the source looks the sink up by.
    ///
    /// An appsink that already carries a `name=` in a raw pipeline keeps it,
    /// and that name overrides [`CaptureConfig::sink_name`].
    pub fn effective_sink_name(&self) -> &str {
        match &self.source {
            SourceConfig::Raw(raw) => sink_name_in(&raw.pipeline).unwrap_or(self.sink_name.as_str()),
            SourceConfig::NvCamera(_) => self.sink_name.as_str(),
        }
    }

    pub fn options(&self) -> SourceOptions {
        SourceOptions {
            sink_name: self.effective_sink_name().to_owned(),
        }
    }

    pub fn format(&self) -> FrameFormat {
        match &self.source {
            SourceConfig::Raw(raw) => raw.format,
            SourceConfig::NvCamera(cam) => cam.format,
        }
    }

    /// Configured `(width, height)`, zero when unknown.
    pub fn dimensions(&self) -> (u32, u32) {
        match &self.source {
            SourceConfig::Raw(raw) => (raw.width, raw.height),
            SourceConfig::NvCamera(cam) => (cam.width, cam.height),
        }
    }

    /// Color model of raw frames.
    pub fn color_model(&self) -> Option<String> {
        if self.format() != FrameFormat::Raw {
            return None;
        }
        match &self.source {
            SourceConfig::Raw(raw) => raw.color_model.clone(),
            SourceConfig::NvCamera(cam) => Some(cam.color_model.clone()),
        }
    }
}

fn last_stage(pipeline: &str) -> &str {
    pipeline.rsplit('!').next().unwrap_or_default().trim()
}

fn ends_with_appsink(pipeline: &str) -> bool {
    last_stage(pipeline).split_whitespace().next() == Some("appsink")
}

/// Name given to the trailing appsink by a `name=` property, if any.
fn sink_name_in(pipeline: &str) -> Option<&str> {
    last_stage(pipeline)
        .split_whitespace()
        .find_map(|prop| prop.strip_prefix("name="))
        .map(|name| name.trim_matches(|c: char| c == '"' || c == '\''))
        .filter(|name| !name.is_empty())
}

/// Give the trailing appsink of `pipeline` the name `sink_name`.
///
/// A sink that is already named keeps its name.
pub fn name_sink(pipeline: &str, sink_name: &str) -> Result<String, Error> {
    if !ends_with_appsink(pipeline) {
        return Err(Error::Config("pipeline must end with appsink".into()));
    }
    if sink_name_in(pipeline).is_some() {
        return Ok(pipeline.trim().to_string());
    }
    Ok(format!("{} name={}", pipeline.trim(), sink_name))
}
