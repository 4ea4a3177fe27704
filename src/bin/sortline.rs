//! Replays a synthetic two-lane conveyor through the full sorting pipeline.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nalgebra::Vector2;
use sortline::{
    Actuator, BlobDetector, Detection, DetectionBuilder, FrameSource, NullActuator, Rect,
    SorterConfig, SortingPipeline, SourceError, WriterActuator,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to generate
    #[arg(long, default_value_t = 900)]
    frames: u64,

    /// Frames between two objects entering the same lane
    #[arg(long, default_value_t = 20)]
    spacing: u64,

    /// Upward speed of the belt in pixels per frame
    #[arg(long, default_value_t = 18.0)]
    speed: f32,

    /// Override the worker pool size
    #[arg(short, long)]
    workers: Option<usize>,

    /// Device or file that receives actuation bytes
    #[arg(long)]
    actuator: Option<PathBuf>,
}

/// Object centroids visible in one synthetic frame.
type Scene = Vec<Vector2<f32>>;

struct Conveyor {
    frame: u64,
    total: u64,
    spacing: u64,
    speed: f32,
    lanes: [Rect; 2],
}

impl FrameSource for Conveyor {
    type Image = Scene;

    fn next_frame(&mut self) -> Result<Option<Scene>, SourceError> {
        if self.frame >= self.total {
            return Ok(None);
        }
        let t = self.frame;
        self.frame += 1;

        let mut scene = Scene::new();
        for lane in &self.lanes {
            let bottom = lane.y + lane.height;
            let x = lane.x + lane.width / 2.0;
            for spawn in (0..=t).step_by(self.spacing.max(1) as usize) {
                let y = bottom - 1.0 - self.speed * (t - spawn) as f32;
                if y >= lane.y - 40.0 {
                    scene.push(Vector2::new(x, y));
                }
            }
        }
        Ok(Some(scene))
    }
}

/// Reports every object as a square blob.
struct SceneDetector {
    half_size: f32,
}

impl BlobDetector for SceneDetector {
    type Image = Scene;
    type Error = std::convert::Infallible;

    fn detect(&self, scene: &Scene, region: &Rect) -> Result<Vec<Detection>, Self::Error> {
        let side = self.half_size * 2.0;
        Ok(scene
            .iter()
            .filter(|c| region.contains(c))
            .enumerate()
            .map(|(label, c)| {
                DetectionBuilder::new()
                    .label(label as u32 + 1)
                    .tlwh(c.x - self.half_size, c.y - self.half_size, side, side)
                    .centroid(c.x, c.y)
                    .build()
            })
            .collect())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SorterConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SorterConfig::default(),
    };
    if args.workers.is_some() {
        config.worker_count = args.workers;
    }

    let mut actuator: Box<dyn Actuator> = match &args.actuator {
        Some(path) => {
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .with_context(|| format!("opening actuator {}", path.display()))?;
            Box::new(WriterActuator::new(file))
        }
        None => Box::new(NullActuator),
    };

    let source = Conveyor {
        frame: 0,
        total: args.frames,
        spacing: args.spacing,
        speed: args.speed,
        lanes: [config.channel_a.region, config.channel_b.region],
    };
    let detector = SceneDetector { half_size: 30.0 };
    let pipeline = SortingPipeline::new(detector, config)?;

    let summary = pipeline.run(source, &mut *actuator, |report| {
        for exit in &report.exits {
            tracing::debug!(
                frame = report.sequence_id,
                channel = %exit.channel,
                number = exit.assigned_number,
                "exit"
            );
        }
        if report.degraded {
            tracing::warn!(frame = report.sequence_id, "frame tracked without detections");
        }
    })?;

    println!("{}", serde_json::to_string_pretty(&summary.summaries)?);
    Ok(())
}
