use anyhow::{Context, Result, bail};
use clap::{Arg, ArgMatches, Command};
use framegrab::capture::Capture;
use framegrab::config::{CaptureConfig, DEFAULT_SINK_NAME, FrameFormat, RawSourceOptions, SourceConfig};
use framegrab::error::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::{fs, panic, process};

fn command() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("pipeline")
                .short('p')
                .long("pipeline")
                .value_name("DESCRIPTION")
                .help("gst-launch-1.0 pipeline ending with appsink.")
                .required_unless_present("config")
                .conflicts_with("config"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON capture configuration (raw or nvcamera source)."),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Format of the frames produced by --pipeline.")
                .value_parser(["jpeg", "raw"])
                .default_value("jpeg"),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .value_parser(clap::value_parser!(u32))
                .default_value("0"),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .value_parser(clap::value_parser!(u32))
                .default_value("0"),
        )
        .arg(
            Arg::new("color-model")
                .long("color-model")
                .value_name("MODEL")
                .help("RGB layout of raw frames (e.g. BGR)."),
        )
        .arg(
            Arg::new("sink-name")
                .long("sink-name")
                .value_name("NAME")
                .default_value(DEFAULT_SINK_NAME),
        )
        .arg(
            Arg::new("count")
                .short('n')
                .long("count")
                .value_name("FRAMES")
                .help("Stop after this many frames.")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("dump")
                .short('d')
                .long("dump")
                .value_name("DIR")
                .help("Write every frame to DIR (a timestamped directory when omitted).")
                .num_args(0..=1)
                .default_missing_value(""),
        )
}

fn capture_config(matches: &ArgMatches) -> Result<CaptureConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => CaptureConfig::load(path)?,
        None => {
            let pipeline = matches
                .get_one::<String>("pipeline")
                .context("either --pipeline or --config is required")?;
            let format = match matches.get_one::<String>("format").map(String::as_str) {
                Some("raw") => FrameFormat::Raw,
                _ => FrameFormat::Jpeg,
            };
            CaptureConfig::new(SourceConfig::Raw(RawSourceOptions {
                pipeline: pipeline.clone(),
                width: matches.get_one::<u32>("width").copied().unwrap_or_default(),
                height: matches.get_one::<u32>("height").copied().unwrap_or_default(),
                format,
                color_model: matches.get_one::<String>("color-model").cloned(),
            }))
        }
    };

    if matches.value_source("sink-name") == Some(clap::parser::ValueSource::CommandLine)
        || matches.get_one::<String>("config").is_none()
    {
        if let Some(name) = matches.get_one::<String>("sink-name") {
            config.sink_name = name.clone();
        }
    }
    config.validate()?;
    Ok(config)
}

fn dump_dir(matches: &ArgMatches) -> Result<Option<PathBuf>> {
    let Some(dir) = matches.get_one::<String>("dump") else {
        return Ok(None);
    };
    let dir = if dir.is_empty() {
        PathBuf::from(chrono::Local::now().format("capture-%Y%m%d-%H%M%S").to_string())
    } else {
        PathBuf::from(dir)
    };
    fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
    Ok(Some(dir))
}

fn run() -> Result<()> {
    let matches = command().get_matches();
    let config = capture_config(&matches)?;
    let dump = dump_dir(&matches)?;
    let count = matches.get_one::<u64>("count").copied();

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    // gracefully close the capture on SIGINT, SIGTERM, or SIGHUP
    ctrlc::set_handler(move || {
        if stop_handler.swap(true, Ordering::SeqCst) {
            process::exit(130);
        }
    })
    .context("Error setting Ctrl-C handler")?;

    let mut capture = Capture::open(&config).context("cannot create a pipeline")?;

    let mut grabbed = 0u64;
    while !stop.load(Ordering::SeqCst) && count.is_none_or(|n| grabbed < n) {
        let image = match capture.next_image() {
            Ok(image) => image,
            Err(e) if e.kind() == ErrorKind::Pull && !matches!(e, framegrab::Error::Decode(_)) => {
                log::info!("no more frames: {}", e);
                break;
            }
            Err(e) => {
                let summary = capture.source().stats().summary();
                capture.close();
                bail!("capture failed after {}: {}", summary, e);
            }
        };

        if let Some(dir) = &dump {
            let path = dir.join(format!("frame-{:06}.{}", grabbed, image.format.extension()));
            fs::write(&path, &image.data).with_context(|| format!("cannot write {}", path.display()))?;
        }
        log::debug!(
            "frame {}: {} bytes, {}x{}",
            grabbed,
            image.data.len(),
            image.width,
            image.height
        );
        grabbed += 1;
    }

    println!("{}", capture.source().stats().summary());
    capture.close();
    Ok(())
}

fn main() {
    tracing_subscriber::fmt::init();

    // kill the process as soon as the streaming thread panics
    let orig_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        process::exit(105);
    }));

    if let Err(e) = run() {
        log::error!("{:#}", e);
        process::exit(1);
    }
}
