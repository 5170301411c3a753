//! GStreamer backed engine

use super::{BusMessage, Engine, FrameMeta, FrameSink, FrameView, MessageBus, Pipeline, PulledFrame};
use crate::error::{Error, ErrorDetail};
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use std::time::Duration;

/// Name of the application message used to wake the streaming worker.
const STOP_MESSAGE: &str = "framegrab-stop";

/// Engine parsing gst-launch-1.0 style descriptions.
#[derive(Debug, Clone, Copy)]
pub struct GstEngine(());

impl GstEngine {
    /// Initialize GStreamer. Safe to call more than once.
    pub fn new() -> Result<Self, Error> {
        gst::init()?;
        Ok(GstEngine(()))
    }
}

impl Engine for GstEngine {
    fn launch(&self, description: &str) -> Result<Box<dyn Pipeline>, Error> {
        let element = gst::parse::launch(description).map_err(|e| Error::Parse(ErrorDetail::from(&e)))?;
        let pipeline = element.downcast::<gst::Pipeline>().map_err(|_| {
            Error::Parse(ErrorDetail::internal(format!(
                "'{}' doesn't describe a pipeline",
                description
            )))
        })?;
        Ok(Box::new(GstPipeline { pipeline }))
    }
}

pub struct GstPipeline {
    pipeline: gst::Pipeline,
}

impl Pipeline for GstPipeline {
    fn sink(&self, name: &str) -> Option<Box<dyn FrameSink>> {
        let app_sink = self
            .pipeline
            .by_name(name)
            .and_then(|elem| elem.downcast::<gst_app::AppSink>().ok())?;
        Some(Box::new(GstSink { app_sink }))
    }

    fn bus(&self) -> Option<Box<dyn MessageBus>> {
        let bus = self.pipeline.bus()?;
        Some(Box::new(GstBus { bus }))
    }

    fn play(&self) -> Result<(), Error> {
        self.pipeline.set_state(gst::State::Playing)?;
        Ok(())
    }

    fn halt(&self) -> Result<(), Error> {
        self.pipeline.set_state(gst::State::Null)?;
        Ok(())
    }
}

impl Drop for GstPipeline {
    fn drop(&mut self) {
        // dropping a pipeline that is not in Null leaks its streaming threads
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            log::warn!("failed to stop pipeline on drop: {}", e);
        }
    }
}

struct GstSink {
    app_sink: gst_app::AppSink,
}

impl FrameSink for GstSink {
    fn pull(&self) -> Option<PulledFrame> {
        // fails on EOS and while flushing
        let sample = self.app_sink.pull_sample().ok()?;
        let meta = sample_meta(&sample);
        // the owned buffer is a new reference, independent from the sample
        let buffer = sample.buffer_owned()?;
        let mapped = buffer.into_mapped_buffer_readable().ok()?;
        Some(PulledFrame {
            view: Box::new(GstFrameView(mapped)),
            meta,
        })
    }
}

fn sample_meta(sample: &gst::Sample) -> FrameMeta {
    let pts = sample
        .buffer()
        .and_then(|buffer| buffer.pts())
        .map(|pts| Duration::from_nanos(pts.nseconds()));

    let Some(s) = sample.caps().and_then(|caps| caps.structure(0)) else {
        return FrameMeta {
            pts,
            ..Default::default()
        };
    };

    FrameMeta {
        pts,
        width: s.get::<i32>("width").ok().and_then(|w| u32::try_from(w).ok()),
        height: s.get::<i32>("height").ok().and_then(|h| u32::try_from(h).ok()),
        format: s
            .get::<String>("format")
            .ok()
            .or_else(|| Some(s.name().to_string())),
    }
}

struct GstFrameView(gst::MappedBuffer<gst::buffer::Readable>);

impl FrameView for GstFrameView {
    fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }
}

struct GstBus {
    bus: gst::Bus,
}

impl GstBus {
    fn translate(msg: &gst::Message) -> BusMessage {
        match msg.view() {
            gst::MessageView::Eos(_) => BusMessage::Eos,
            gst::MessageView::Error(err) => {
                let detail = ErrorDetail::from(&err.error()).with_debug(err.debug().map(|d| d.to_string()));
                BusMessage::Error(detail)
            }
            gst::MessageView::Application(app)
                if app.structure().is_some_and(|s| s.has_name(STOP_MESSAGE)) =>
            {
                BusMessage::Stop
            }
            _ => BusMessage::Other,
        }
    }
}

impl MessageBus for GstBus {
    fn next_message(&self) -> BusMessage {
        match self.bus.timed_pop(gst::ClockTime::NONE) {
            Some(msg) => Self::translate(&msg),
            // only happens while the bus is flushing
            None => BusMessage::Stop,
        }
    }

    fn pop_pending(&self) -> Option<BusMessage> {
        self.bus.pop().map(|msg| Self::translate(&msg))
    }

    fn request_stop(&self) -> Result<(), Error> {
        let msg = gst::message::Application::new(gst::Structure::new_empty(STOP_MESSAGE));
        self.bus.post(msg)?;
        Ok(())
    }
}
