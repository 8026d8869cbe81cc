// src/lib.rs
pub mod config;
pub mod data;
pub mod dwell;
pub mod error;
pub mod gestures;
pub mod landmarks;
pub mod levels;
pub mod progress;
pub mod quiz;
pub mod recognizer;
pub mod regions;
pub mod scene;
pub mod session;

pub use config::AppConfig;
pub use error::{QuizError, Result};
pub use landmarks::{FrameObservations, HandObservation, HandSide};
pub use recognizer::LandmarkSource;
pub use session::{Page, Session, SessionSink};
