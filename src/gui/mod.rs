pub mod app;
pub mod message;
pub mod state;

pub use app::FirewatchApp;
pub use message::Message;
pub use state::{AppState, Phase, WorkerEvent};

use iced::{Application, Settings};

/// Launch the graphical front-end.
pub fn run() -> iced::Result {
    FirewatchApp::run(Settings::default())
}
