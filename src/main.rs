use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;

use firewatch::detection::onnx::OnnxDetector;
use firewatch::video::opencv::{OpenCvSink, OpenCvSource};
use firewatch::{
    FrameSource, ModelDispatcher, Pipeline, PipelineConfig, ProgressObserver, RunStatus,
};

#[derive(Parser)]
#[command(name = "firewatch")]
#[command(about = "Detect objects in video, routing each frame to a color- or gray-tuned model")]
struct Cli {
    /// Path to input video file
    #[arg(value_name = "VIDEO")]
    input: PathBuf,

    /// Path for the annotated output video (default: OUT_<input>.mp4 next to the input)
    #[arg(short, long, value_name = "VIDEO")]
    output: Option<PathBuf>,

    /// Path to the color-tuned ONNX model
    #[arg(long, value_name = "MODEL")]
    color_model: PathBuf,

    /// Path to the grayscale-tuned ONNX model
    #[arg(long, value_name = "MODEL")]
    gray_model: PathBuf,

    /// Largest per-channel difference a pixel may show and still count as uniform
    #[arg(long, default_value_t = 15)]
    channel_threshold: u8,

    /// Largest percentage of colorful pixels for a frame to still count as grayscale
    #[arg(long, default_value_t = 5.0)]
    area_threshold: f32,

    /// Minimum confidence for the color model
    #[arg(long, default_value_t = 0.25)]
    color_confidence: f32,

    /// Minimum confidence for the gray model
    #[arg(long, default_value_t = 0.25)]
    gray_confidence: f32,

    /// Comma-separated class names, used when the model metadata carries none
    #[arg(long, default_value = "fire,smoke")]
    class_names: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Launch the graphical front-end instead of processing directly
    #[cfg(feature = "gui")]
    #[arg(long)]
    gui: bool,
}

/// Prints a single self-overwriting progress line.
struct ConsoleProgress {
    // held across notifications so the final status line starts fresh
    stdout: Mutex<std::io::Stdout>,
}

impl ConsoleProgress {
    fn new() -> Self {
        Self {
            stdout: Mutex::new(std::io::stdout()),
        }
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, frames_done: u64, total_frames: Option<u64>, status: RunStatus) {
        let mut out = self.stdout.lock().unwrap();
        match status {
            RunStatus::Running => {
                match total_frames {
                    Some(total) => {
                        let _ = write!(out, "\rProcessing frame {frames_done}/{total}...");
                    }
                    None => {
                        let _ = write!(out, "\rProcessing frame {frames_done}...");
                    }
                }
                let _ = out.flush();
            }
            RunStatus::Completed | RunStatus::Failed => {
                let _ = writeln!(out);
            }
        }
    }
}

fn default_output_path(input: &PathBuf) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    input.with_file_name(format!("OUT_{stem}.mp4"))
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    #[cfg(feature = "gui")]
    if args.gui {
        return firewatch::gui::run().map_err(|e| anyhow::anyhow!("GUI failed: {e}"));
    }

    let output = args.output.unwrap_or_else(|| default_output_path(&args.input));
    let class_names: Vec<String> = args
        .class_names
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let config = PipelineConfig {
        channel_threshold: args.channel_threshold,
        area_percent_threshold: args.area_threshold,
        color_confidence: args.color_confidence,
        gray_confidence: args.gray_confidence,
    };

    let color = OnnxDetector::from_file(&args.color_model, "color", class_names.clone())?;
    let gray = OnnxDetector::from_file(&args.gray_model, "gray", class_names)?;
    let dispatcher = ModelDispatcher::new(Box::new(color), Box::new(gray), &config);

    let source = OpenCvSource::open(&args.input)?;
    let meta = source.meta();
    let sink = OpenCvSink::open(&output, meta.fps, meta.width, meta.height)?;

    let pipeline = Pipeline::new(Box::new(source), Box::new(sink), dispatcher, config)?
        .with_observer(Box::new(ConsoleProgress::new()));

    let summary = pipeline.run()?;

    println!("\n=== Detection Results ===");
    println!("Frames processed: {}", summary.frames);
    println!(
        "Grayscale frames: {} / color frames: {}",
        summary.grayscale_frames, summary.color_frames
    );
    println!("Total detections: {}", summary.detections);
    println!("Processed video saved to {}", output.display());

    Ok(())
}
