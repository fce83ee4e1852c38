use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use iced::widget::{button, column, container, row, text};
use iced::{Application, Command, Element, Length, Subscription, Theme};

use super::{AppState, Message, Phase, WorkerEvent};
use crate::detection::onnx::OnnxDetector;
use crate::video::opencv::{OpenCvSink, OpenCvSource};
use crate::{
    CancelToken, FrameSource, ModelDispatcher, Pipeline, PipelineConfig, ProgressObserver,
    RunStatus, RunSummary,
};

pub struct FirewatchApp {
    state: AppState,
}

impl Application for FirewatchApp {
    type Executor = iced::executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = ();

    fn new(_flags: ()) -> (Self, Command<Message>) {
        (
            Self {
                state: AppState::default(),
            },
            Command::none(),
        )
    }

    fn title(&self) -> String {
        "Firewatch - Adaptive Video Detection".to_string()
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::PickInput => {
                if let Some(path) = pick_video("Select Input Video") {
                    // derive the output name from the input, as a convenience
                    if self.state.output_path.is_none() {
                        self.state.output_path = Some(default_output_path(&path));
                    }
                    self.state.input_path = Some(path);
                }
            }
            Message::PickOutput => {
                if let Some(path) = rfd::FileDialog::new()
                    .set_title("Select Output Video")
                    .add_filter("MP4 Files", &["mp4"])
                    .save_file()
                {
                    self.state.output_path = Some(path);
                }
            }
            Message::PickColorModel => {
                if let Some(path) = pick_model("Select Color Model") {
                    self.state.color_model = Some(path);
                }
            }
            Message::PickGrayModel => {
                if let Some(path) = pick_model("Select Grayscale Model") {
                    self.state.gray_model = Some(path);
                }
            }
            Message::Start => {
                if self.state.ready_to_start() {
                    let cancel = CancelToken::new();
                    let events = spawn_worker(
                        self.state.input_path.clone().unwrap(),
                        self.state.output_path.clone().unwrap(),
                        self.state.color_model.clone().unwrap(),
                        self.state.gray_model.clone().unwrap(),
                        self.state.config,
                        cancel.clone(),
                    );
                    self.state.cancel = Some(cancel);
                    self.state.events = Some(events);
                    self.state.phase = Phase::Running {
                        frames_done: 0,
                        total_frames: None,
                    };
                }
            }
            Message::Cancel => {
                if let Some(cancel) = &self.state.cancel {
                    cancel.cancel();
                }
            }
            Message::Tick => self.drain_worker_events(),
        }
        Command::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        if self.state.events.is_some() {
            iced::time::every(Duration::from_millis(100)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn view(&self) -> Element<Message> {
        let running = matches!(self.state.phase, Phase::Running { .. });

        let path_row = |label: &str, path: &Option<PathBuf>, pick: Message| {
            row![
                text(format!(
                    "{label}: {}",
                    path.as_deref()
                        .map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
                ))
                .width(Length::Fill),
                button("Browse").on_press(pick),
            ]
            .spacing(10)
        };

        let mut start = button("Start Processing");
        if self.state.ready_to_start() {
            start = start.on_press(Message::Start);
        }
        let mut cancel = button("Cancel");
        if running {
            cancel = cancel.on_press(Message::Cancel);
        }

        let status = match &self.state.phase {
            Phase::Idle => "Select paths and press start.".to_string(),
            Phase::Running {
                frames_done,
                total_frames,
            } => match total_frames {
                Some(total) => format!("Processing frame {frames_done}/{total}..."),
                None => format!("Processing frame {frames_done}..."),
            },
            Phase::Done(summary) => format!(
                "Processing complete! {} frames ({} grayscale, {} color), {} detections.",
                summary.frames, summary.grayscale_frames, summary.color_frames, summary.detections
            ),
            Phase::Failed(reason) => format!("Error occurred: {reason}"),
        };

        let content = column![
            text("Firewatch").size(32),
            path_row("Input Video", &self.state.input_path, Message::PickInput),
            path_row("Output Video", &self.state.output_path, Message::PickOutput),
            path_row("Color Model", &self.state.color_model, Message::PickColorModel),
            path_row("Gray Model", &self.state.gray_model, Message::PickGrayModel),
            row![start, cancel].spacing(10),
            text(status),
        ]
        .spacing(20)
        .padding(20);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x()
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

impl FirewatchApp {
    fn drain_worker_events(&mut self) {
        let Some(events) = &self.state.events else {
            return;
        };
        let mut finished = false;
        while let Ok(event) = events.try_recv() {
            match event {
                WorkerEvent::Progress {
                    frames_done,
                    total_frames,
                } => {
                    self.state.phase = Phase::Running {
                        frames_done,
                        total_frames,
                    };
                }
                WorkerEvent::Finished(result) => {
                    self.state.phase = match result {
                        Ok(summary) => Phase::Done(summary),
                        Err(reason) => Phase::Failed(reason),
                    };
                    finished = true;
                }
            }
        }
        if finished {
            self.state.events = None;
            self.state.cancel = None;
        }
    }
}

fn pick_video(title: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title(title)
        .add_filter("Video Files", &["mp4", "avi", "mov"])
        .pick_file()
}

fn pick_model(title: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title(title)
        .add_filter("ONNX Models", &["onnx"])
        .pick_file()
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    input.with_file_name(format!("OUT_{stem}.mp4"))
}

/// Forwards pipeline progress onto the worker channel; send failures mean the
/// UI is gone, which the pipeline ignores.
struct ChannelObserver(Sender<WorkerEvent>);

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, frames_done: u64, total_frames: Option<u64>, status: RunStatus) {
        if status == RunStatus::Running {
            let _ = self.0.send(WorkerEvent::Progress {
                frames_done,
                total_frames,
            });
        }
    }
}

/// Run the whole pipeline as one unit of work on a background thread.
fn spawn_worker(
    input: PathBuf,
    output: PathBuf,
    color_model: PathBuf,
    gray_model: PathBuf,
    config: PipelineConfig,
    cancel: CancelToken,
) -> Receiver<WorkerEvent> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let result = run_pipeline(
            &input,
            &output,
            &color_model,
            &gray_model,
            config,
            tx.clone(),
            cancel,
        );
        let _ = tx.send(WorkerEvent::Finished(result.map_err(|e| e.to_string())));
    });
    rx
}

fn run_pipeline(
    input: &Path,
    output: &Path,
    color_model: &Path,
    gray_model: &Path,
    config: PipelineConfig,
    events: Sender<WorkerEvent>,
    cancel: CancelToken,
) -> Result<RunSummary, crate::PipelineError> {
    let color = OnnxDetector::from_file(color_model, "color", Vec::new())?;
    let gray = OnnxDetector::from_file(gray_model, "gray", Vec::new())?;
    let dispatcher = ModelDispatcher::new(Box::new(color), Box::new(gray), &config);

    let source = OpenCvSource::open(input)?;
    let meta = source.meta();
    let sink = OpenCvSink::open(output, meta.fps, meta.width, meta.height)?;

    Pipeline::new(Box::new(source), Box::new(sink), dispatcher, config)?
        .with_observer(Box::new(ChannelObserver(events)))
        .with_cancel_token(cancel)
        .run()
}
