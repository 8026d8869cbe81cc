// src/quiz.rs - Multiple-choice quiz progression
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{QuizError, Result};
use crate::progress::{FeedbackGuard, FeedbackKind, ProgressEvent, ProgressState, Progression};
use crate::regions::{Bounds, RegionId, RegionLayout, SelectionRegion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerOption {
    A,
    B,
    C,
}

impl AnswerOption {
    /// Hit-test priority order.
    pub const ALL: [AnswerOption; 3] = [AnswerOption::A, AnswerOption::B, AnswerOption::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
        }
    }

    pub fn region_id(&self) -> RegionId {
        RegionId::new(self.as_str())
    }

    pub fn from_region(region: &RegionId) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|option| option.as_str() == region.as_str())
    }

    fn slot(&self) -> usize {
        match self {
            AnswerOption::A => 0,
            AnswerOption::B => 1,
            AnswerOption::C => 2,
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    /// Labels for A, B and C in that order.
    pub options: [String; 3],
    pub correct: AnswerOption,
}

impl Question {
    pub fn new(prompt: &str, options: [&str; 3], correct: AnswerOption) -> Self {
        Self {
            prompt: prompt.to_string(),
            options: options.map(str::to_string),
            correct,
        }
    }

    pub fn option_text(&self, option: AnswerOption) -> &str {
        &self.options[option.slot()]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    pub feedback_window_ms: u64,
    pub questions: Vec<Question>,
    /// Answer areas in stage pixels. Must contain exactly A, B and C.
    pub regions: Vec<SelectionRegion>,
    pub finish_message: String,
    pub finish_target: String,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            feedback_window_ms: 1500,
            questions: default_questions(),
            regions: vec![
                SelectionRegion::new("A", Bounds::new([160.0, 560.0], [700.0, 950.0])),
                SelectionRegion::new("B", Bounds::new([760.0, 1160.0], [700.0, 950.0])),
                SelectionRegion::new("C", Bounds::new([1360.0, 1760.0], [700.0, 950.0])),
            ],
            finish_message: "Quiz complete, well done!".to_string(),
            finish_target: "home".to_string(),
        }
    }
}

fn default_questions() -> Vec<Question> {
    vec![
        Question::new(
            "How many landmarks describe one tracked hand?",
            ["5", "21", "42"],
            AnswerOption::B,
        ),
        Question::new(
            "Which two fingertips make a pinch?",
            ["Thumb and index", "Index and middle", "Ring and pinky"],
            AnswerOption::A,
        ),
        Question::new(
            "In image space, which direction does y grow?",
            ["Up", "Into the screen", "Down"],
            AnswerOption::C,
        ),
        Question::new(
            "How long do you hold a pinch over an answer to pick it?",
            ["Half a second", "Two seconds", "Five seconds"],
            AnswerOption::B,
        ),
    ]
}

impl QuizConfig {
    pub fn validate(&self) -> Result<()> {
        if self.questions.is_empty() {
            return Err(QuizError::EmptyQuiz);
        }
        for option in AnswerOption::ALL {
            let count = self
                .regions
                .iter()
                .filter(|region| region.id == option.region_id())
                .count();
            if count != 1 {
                return Err(QuizError::InvalidConfig(format!(
                    "quiz needs exactly one region for option {}, found {}",
                    option, count
                )));
            }
        }
        if let Some(extra) = self
            .regions
            .iter()
            .find(|region| AnswerOption::from_region(&region.id).is_none())
        {
            return Err(QuizError::UnknownRegion(extra.id.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct QuizProgress {
    questions: Vec<Question>,
    layout: RegionLayout,
    index: usize,
    finished: bool,
    guard: FeedbackGuard,
    score: usize,
    attempts: usize,
    finish_message: String,
    finish_target: String,
}

impl QuizProgress {
    pub fn new(config: &QuizConfig) -> Result<Self> {
        config.validate()?;

        // Hit-test order is always A, B, C whatever order the file lists them in.
        let mut regions = config.regions.clone();
        regions.sort_by_key(|region| {
            AnswerOption::from_region(&region.id).map(|option| option.slot())
        });

        Ok(Self {
            questions: config.questions.clone(),
            layout: RegionLayout::new(regions)?,
            index: 0,
            finished: false,
            guard: FeedbackGuard::new(config.feedback_window_ms),
            score: 0,
            attempts: 0,
            finish_message: config.finish_message.clone(),
            finish_target: config.finish_target.clone(),
        })
    }

    pub fn current_question(&self) -> Option<&Question> {
        if self.finished {
            None
        } else {
            self.questions.get(self.index)
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn feedback(&self, now_ms: u64) -> Option<FeedbackKind> {
        self.guard.active(now_ms)
    }
}

impl Progression for QuizProgress {
    fn state(&self) -> ProgressState {
        if self.finished {
            ProgressState::Finished
        } else {
            ProgressState::AwaitingInput(self.index)
        }
    }

    fn regions(&self) -> &RegionLayout {
        &self.layout
    }

    fn on_selection(&mut self, region: &RegionId, now_ms: u64) -> ProgressEvent {
        if self.finished {
            return ProgressEvent::Ignored;
        }
        if self.guard.is_busy(now_ms) {
            debug!("Selection {} ignored while feedback is showing", region);
            return ProgressEvent::Ignored;
        }
        let Some(option) = AnswerOption::from_region(region) else {
            warn!("Selection on unknown quiz region {}", region);
            return ProgressEvent::Ignored;
        };
        let Some(question) = self.questions.get(self.index) else {
            return ProgressEvent::Ignored;
        };

        self.attempts += 1;

        if option != question.correct {
            debug!("Question {}: {} is wrong", self.index, option);
            self.guard.show(FeedbackKind::Incorrect, now_ms);
            return ProgressEvent::Retry { index: self.index };
        }

        self.score += 1;
        self.guard.show(FeedbackKind::Correct, now_ms);

        let from = self.index;
        self.index += 1;
        if self.index == self.questions.len() {
            self.finished = true;
            info!(
                "Quiz finished: {} questions in {} attempts",
                self.score, self.attempts
            );
            ProgressEvent::Finished
        } else {
            debug!("Question {}: {} is correct", from, option);
            ProgressEvent::Advanced {
                from,
                to: self.index,
            }
        }
    }

    fn len(&self) -> usize {
        self.questions.len()
    }

    fn finish_message(&self) -> &str {
        &self.finish_message
    }

    fn finish_target(&self) -> &str {
        &self.finish_target
    }
}
