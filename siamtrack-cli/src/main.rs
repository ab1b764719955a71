use clap::Parser;
use serde::{Deserialize, Serialize};
use siamtrack::io::load_rgb_image;
use siamtrack::{BoundingBox, PixelCorrelation, SiamTracker, TrackerConfig};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "SiamTrack CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    /// Explicit frame list, used as-is.
    frames: Vec<PathBuf>,
    /// Directory scanned for frames when `frames` is empty.
    frames_dir: Option<PathBuf>,
    frame_extension: String,
    /// Initial target as 1-indexed `[x, y, width, height]`.
    init_box: Option<[f64; 4]>,
    /// Named tracker parameter overrides.
    tracker: BTreeMap<String, f64>,
    output_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            frames_dir: None,
            frame_extension: "jpg".to_string(),
            init_box: None,
            tracker: BTreeMap::new(),
            output_path: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    boxes: Vec<[f64; 4]>,
    times: Vec<f64>,
    fps: f64,
}

fn collect_frames(config: &Config) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    if !config.frames.is_empty() {
        return Ok(config.frames.clone());
    }
    let Some(dir) = &config.frames_dir else {
        return Err("either frames or frames_dir must be set in the config".into());
    };
    let mut frames: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&config.frame_extension))
        })
        .collect();
    frames.sort();
    Ok(frames)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("siamtrack=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    let init_box = config
        .init_box
        .map(BoundingBox::from_array)
        .ok_or("init_box must be set in the config")?;
    let frames = collect_frames(&config)?;
    if frames.is_empty() {
        return Err("no frames found".into());
    }

    let tracker_cfg =
        TrackerConfig::from_overrides(config.tracker.iter().map(|(k, v)| (k.as_str(), *v)))?;
    let scorer = PixelCorrelation::from_config(&tracker_cfg)?;
    let mut tracker = SiamTracker::new(scorer, tracker_cfg)?;

    tracing::info!(frames = frames.len(), "tracking sequence");
    let result = tracker.track(frames.iter().map(load_rgb_image), init_box)?;

    let total: f64 = result.latencies.iter().sum();
    let fps = if total > 0.0 {
        result.latencies.len() as f64 / total
    } else {
        0.0
    };
    let output = Output {
        boxes: result.boxes.iter().map(|b| b.to_array()).collect(),
        times: result.latencies,
        fps,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
