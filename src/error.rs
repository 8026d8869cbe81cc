// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("hand observation has {actual} landmarks, expected {expected}")]
    InvalidLandmarkCount { expected: usize, actual: usize },

    #[error("unknown selection region: {0}")]
    UnknownRegion(String),

    #[error("unknown page: {0}")]
    UnknownPage(String),

    #[error("quiz has no questions")]
    EmptyQuiz,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("camera unavailable: {0}")]
    Camera(String),

    #[error("landmark source unavailable: {0}")]
    Recognizer(String),
}

pub type Result<T> = std::result::Result<T, QuizError>;
