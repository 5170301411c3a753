//! In-memory engine used by the test-suite
//!
//! Understands a tiny gst-launch-like grammar, stages separated by `!`:
//! - `testsrc frames=N size=N` queues N frames of N bytes when played
//! - `fail message=TEXT` posts an error after the frames
//! - `live` never reaches end-of-stream
//! - `refuse` makes the transition to playing fail
//! - `appsink name=NAME` declares a sink (default name `appsink0`)
//!
//! Every pipeline, sink, bus and mapped buffer is counted in a [`Tracker`]
//! so tests can assert that nothing outlives its source.

use super::{BusMessage, Engine, FrameMeta, FrameSink, FrameView, MessageBus, Pipeline, PulledFrame};
use crate::error::{Error, ErrorDetail};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

const DOMAIN: &str = "synthetic";

#[derive(Debug, Default)]
pub(crate) struct Tracker {
    pub pipelines: AtomicUsize,
    pub sinks: AtomicUsize,
    pub buses: AtomicUsize,
    pub buffers: AtomicUsize,
}

impl Tracker {
    pub fn live(&self) -> usize {
        self.pipelines.load(Ordering::SeqCst)
            + self.sinks.load(Ordering::SeqCst)
            + self.buses.load(Ordering::SeqCst)
            + self.buffers.load(Ordering::SeqCst)
    }

    pub fn buffers(&self) -> usize {
        self.buffers.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub(crate) struct SyntheticEngine {
    pub tracker: Arc<Tracker>,
    payload: Option<Vec<u8>>,
}

impl SyntheticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every frame carries `payload` instead of a generated pattern.
    pub fn with_payload(payload: Vec<u8>) -> Self {
        Self {
            tracker: Arc::default(),
            payload: Some(payload),
        }
    }
}

impl Engine for SyntheticEngine {
    fn launch(&self, description: &str) -> Result<Box<dyn Pipeline>, Error> {
        let mut script = Script::parse(description)?;
        if let Some(payload) = &self.payload {
            script.payload = Some(payload.clone());
        }
        self.tracker.pipelines.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticPipeline {
            script,
            shared: Arc::new(Shared::default()),
            tracker: Arc::clone(&self.tracker),
        }))
    }
}

#[derive(Debug, Default)]
struct Script {
    frames: usize,
    size: usize,
    payload: Option<Vec<u8>>,
    errors: Vec<String>,
    sinks: Vec<String>,
    live: bool,
    refuse: bool,
}

impl Script {
    fn parse(description: &str) -> Result<Self, Error> {
        let mut script = Script {
            size: 16,
            ..Default::default()
        };

        for stage in description.split('!') {
            let mut tokens = stage.split_whitespace();
            let Some(element) = tokens.next() else {
                return Err(parse_error("empty pipeline stage"));
            };
            let props = tokens
                .map(|t| t.split_once('=').ok_or_else(|| parse_error(&format!("bad property '{t}'"))))
                .collect::<Result<Vec<_>, _>>()?;

            match element {
                "testsrc" => {
                    for (key, value) in props {
                        let n = value
                            .parse::<usize>()
                            .map_err(|_| parse_error(&format!("bad value '{value}'")))?;
                        match key {
                            "frames" => script.frames = n,
                            "size" => script.size = n,
                            _ => return Err(parse_error(&format!("no property \"{key}\""))),
                        }
                    }
                }
                "fail" => {
                    let message = props
                        .iter()
                        .find(|(k, _)| *k == "message")
                        .map_or("internal data stream error", |(_, v)| *v);
                    script.errors.push(message.to_string());
                }
                "live" => script.live = true,
                "refuse" => script.refuse = true,
                "appsink" => {
                    let name = props
                        .iter()
                        .find(|(k, _)| *k == "name")
                        .map_or_else(|| format!("appsink{}", script.sinks.len()), |(_, v)| v.to_string());
                    if script.sinks.contains(&name) {
                        return Err(parse_error(&format!("duplicate element name '{name}'")));
                    }
                    script.sinks.push(name);
                }
                other => return Err(parse_error(&format!("no element \"{other}\""))),
            }
        }
        Ok(script)
    }

    fn frame(&self, index: usize) -> Vec<u8> {
        match &self.payload {
            Some(payload) => payload.clone(),
            None => (0..self.size).map(|i| (index + i) as u8).collect(),
        }
    }
}

fn parse_error(message: &str) -> Error {
    Error::Parse(ErrorDetail::new(DOMAIN, 0, message))
}

#[derive(Default)]
struct SinkQueue {
    frames: VecDeque<Vec<u8>>,
    eos: bool,
    flushing: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<SinkQueue>,
    queue_ready: Condvar,
    messages: Mutex<VecDeque<BusMessage>>,
    message_posted: Condvar,
}

impl Shared {
    fn post(&self, msg: BusMessage) {
        let mut messages = self.messages.lock().unwrap();
        messages.push_back(msg);
        self.message_posted.notify_all();
    }
}

struct SyntheticPipeline {
    script: Script,
    shared: Arc<Shared>,
    tracker: Arc<Tracker>,
}

impl Pipeline for SyntheticPipeline {
    fn sink(&self, name: &str) -> Option<Box<dyn FrameSink>> {
        if !self.script.sinks.iter().any(|s| s == name) {
            return None;
        }
        self.tracker.sinks.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(SyntheticSink {
            shared: Arc::clone(&self.shared),
            tracker: Arc::clone(&self.tracker),
        }))
    }

    fn bus(&self) -> Option<Box<dyn MessageBus>> {
        self.tracker.buses.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(SyntheticBus {
            shared: Arc::clone(&self.shared),
            tracker: Arc::clone(&self.tracker),
        }))
    }

    fn play(&self) -> Result<(), Error> {
        if self.script.refuse {
            self.shared.post(BusMessage::Error(ErrorDetail::new(
                DOMAIN,
                3,
                "could not open resource",
            )));
            return Err(Error::Engine(ErrorDetail::internal("state change failed")));
        }

        let mut queue = self.shared.queue.lock().unwrap();
        queue.frames.extend((0..self.script.frames).map(|i| self.script.frame(i)));
        for message in &self.script.errors {
            self.shared.post(BusMessage::Error(ErrorDetail::new(DOMAIN, 1, message.as_str())));
        }
        if !self.script.live {
            queue.eos = true;
            if self.script.errors.is_empty() {
                self.shared.post(BusMessage::Eos);
            }
        }
        self.shared.queue_ready.notify_all();
        Ok(())
    }

    fn halt(&self) -> Result<(), Error> {
        let mut queue = self.shared.queue.lock().unwrap();
        queue.flushing = true;
        queue.frames.clear();
        self.shared.queue_ready.notify_all();
        Ok(())
    }
}

impl Drop for SyntheticPipeline {
    fn drop(&mut self) {
        self.tracker.pipelines.fetch_sub(1, Ordering::SeqCst);
    }
}

struct SyntheticSink {
    shared: Arc<Shared>,
    tracker: Arc<Tracker>,
}

impl FrameSink for SyntheticSink {
    fn pull(&self) -> Option<PulledFrame> {
        let mut queue = self.shared.queue.lock().unwrap();
        loop {
            if queue.flushing {
                return None;
            }
            if let Some(data) = queue.frames.pop_front() {
                self.tracker.buffers.fetch_add(1, Ordering::SeqCst);
                let meta = FrameMeta {
                    width: Some(data.len() as u32),
                    height: Some(1),
                    format: Some("GRAY8".into()),
                    ..Default::default()
                };
                return Some(PulledFrame {
                    view: Box::new(SyntheticBuffer {
                        data,
                        tracker: Arc::clone(&self.tracker),
                    }),
                    meta,
                });
            }
            if queue.eos {
                return None;
            }
            queue = self.shared.queue_ready.wait(queue).unwrap();
        }
    }
}

impl Drop for SyntheticSink {
    fn drop(&mut self) {
        self.tracker.sinks.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) struct SyntheticBuffer {
    data: Vec<u8>,
    tracker: Arc<Tracker>,
}

impl SyntheticBuffer {
    /// A standalone buffer, already counted in `tracker`.
    pub fn counted(data: Vec<u8>, tracker: &Arc<Tracker>) -> Self {
        tracker.buffers.fetch_add(1, Ordering::SeqCst);
        Self {
            data,
            tracker: Arc::clone(tracker),
        }
    }
}

impl FrameView for SyntheticBuffer {
    fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for SyntheticBuffer {
    fn drop(&mut self) {
        self.tracker.buffers.fetch_sub(1, Ordering::SeqCst);
    }
}

struct SyntheticBus {
    shared: Arc<Shared>,
    tracker: Arc<Tracker>,
}

impl MessageBus for SyntheticBus {
    fn next_message(&self) -> BusMessage {
        let mut messages = self.shared.messages.lock().unwrap();
        loop {
            if let Some(msg) = messages.pop_front() {
                return msg;
            }
            messages = self.shared.message_posted.wait(messages).unwrap();
        }
    }

    fn pop_pending(&self) -> Option<BusMessage> {
        self.shared.messages.lock().unwrap().pop_front()
    }

    fn request_stop(&self) -> Result<(), Error> {
        self.shared.post(BusMessage::Stop);
        Ok(())
    }
}

impl Drop for SyntheticBus {
    fn drop(&mut self) {
        self.tracker.buses.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = Script::parse("testsrc frames=3 size=4 ! fail message=boom ! appsink name=out").unwrap();
        assert_eq!(script.frames, 3);
        assert_eq!(script.size, 4);
        assert_eq!(script.errors, vec!["boom".to_string()]);
        assert_eq!(script.sinks, vec!["out".to_string()]);
    }

    #[test]
    fn test_parse_rejects_unknown_elements() {
        assert!(matches!(Script::parse("bogus ! appsink"), Err(Error::Parse(_))));
        assert!(matches!(Script::parse("testsrc ! ! appsink"), Err(Error::Parse(_))));
        assert!(matches!(
            Script::parse("appsink name=a ! appsink name=a"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_default_sink_names() {
        let script = Script::parse("testsrc ! appsink ! appsink").unwrap();
        assert_eq!(script.sinks, vec!["appsink0".to_string(), "appsink1".to_string()]);
    }
}
