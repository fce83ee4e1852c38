use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use crate::{CancelToken, PipelineConfig, RunSummary};

/// Event sent from the worker thread to the UI loop.
#[derive(Debug)]
pub enum WorkerEvent {
    Progress {
        frames_done: u64,
        total_frames: Option<u64>,
    },
    Finished(Result<RunSummary, String>),
}

/// Where the app currently is.
#[derive(Debug, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running {
        frames_done: u64,
        total_frames: Option<u64>,
    },
    Done(RunSummary),
    Failed(String),
}

pub struct AppState {
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub color_model: Option<PathBuf>,
    pub gray_model: Option<PathBuf>,
    pub config: PipelineConfig,
    pub phase: Phase,
    pub events: Option<Receiver<WorkerEvent>>,
    pub cancel: Option<CancelToken>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            input_path: None,
            output_path: None,
            color_model: None,
            gray_model: None,
            // the interactive deployment runs the gray model at a lower
            // confidence floor than batch runs
            config: PipelineConfig {
                gray_confidence: 0.05,
                ..PipelineConfig::default()
            },
            phase: Phase::Idle,
            events: None,
            cancel: None,
        }
    }
}

impl AppState {
    pub fn ready_to_start(&self) -> bool {
        self.input_path.is_some()
            && self.output_path.is_some()
            && self.color_model.is_some()
            && self.gray_model.is_some()
            && !matches!(self.phase, Phase::Running { .. })
    }
}
