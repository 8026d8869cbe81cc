// src/levels.rs - Spatial level navigation: drag the pinch into each level's target
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{QuizError, Result};
use crate::progress::{ProgressEvent, ProgressState, Progression};
use crate::regions::{Bounds, RegionId, RegionLayout, SelectionRegion};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub name: String,
    /// Play area the pointer must stay within while working towards the target.
    pub bound: Bounds,
    pub target: Bounds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub levels: Vec<LevelSpec>,
    pub finish_message: String,
    pub finish_target: String,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            levels: vec![
                LevelSpec {
                    name: "level-1".to_string(),
                    bound: Bounds::new([100.0, 1820.0], [100.0, 980.0]),
                    target: Bounds::from_rect(1500.0, 200.0, 250.0, 250.0),
                },
                LevelSpec {
                    name: "level-2".to_string(),
                    bound: Bounds::new([100.0, 1820.0], [100.0, 980.0]),
                    target: Bounds::from_rect(200.0, 650.0, 200.0, 200.0),
                },
                LevelSpec {
                    name: "level-3".to_string(),
                    bound: Bounds::new([600.0, 1320.0], [100.0, 980.0]),
                    target: Bounds::from_rect(860.0, 150.0, 200.0, 150.0),
                },
            ],
            finish_message: "All levels cleared!".to_string(),
            finish_target: "home".to_string(),
        }
    }
}

impl LevelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(QuizError::InvalidConfig("no levels configured".to_string()));
        }
        for level in &self.levels {
            if !level.bound.is_valid() || !level.target.is_valid() {
                return Err(QuizError::InvalidConfig(format!(
                    "level {} has inverted bounds",
                    level.name
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LevelProgress {
    levels: Vec<LevelSpec>,
    layouts: Vec<RegionLayout>,
    finished_layout: RegionLayout,
    index: usize,
    finished: bool,
    inside_bound: bool,
    rejections: usize,
    finish_message: String,
    finish_target: String,
}

impl LevelProgress {
    pub fn new(config: &LevelConfig) -> Result<Self> {
        config.validate()?;

        // Each level exposes exactly one region: its target.
        let layouts = config
            .levels
            .iter()
            .map(|level| {
                RegionLayout::new(vec![SelectionRegion::new(
                    RegionId::new(level.name.clone()),
                    level.target,
                )])
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            levels: config.levels.clone(),
            layouts,
            finished_layout: RegionLayout::default(),
            index: 0,
            finished: false,
            inside_bound: false,
            rejections: 0,
            finish_message: config.finish_message.clone(),
            finish_target: config.finish_target.clone(),
        })
    }

    pub fn current_level(&self) -> Option<&LevelSpec> {
        if self.finished {
            None
        } else {
            self.levels.get(self.index)
        }
    }

    pub fn rejections(&self) -> usize {
        self.rejections
    }
}

impl Progression for LevelProgress {
    fn state(&self) -> ProgressState {
        if self.finished {
            ProgressState::Finished
        } else {
            ProgressState::AwaitingInput(self.index)
        }
    }

    fn regions(&self) -> &RegionLayout {
        if self.finished {
            &self.finished_layout
        } else {
            &self.layouts[self.index]
        }
    }

    fn on_selection(&mut self, region: &RegionId, _now_ms: u64) -> ProgressEvent {
        let Some(level) = self.current_level() else {
            return ProgressEvent::Ignored;
        };
        if region.as_str() != level.name {
            return ProgressEvent::Ignored;
        }

        let from = self.index;
        self.index += 1;
        self.inside_bound = false;

        if self.index == self.levels.len() {
            self.finished = true;
            info!("All {} levels cleared", self.levels.len());
            ProgressEvent::Finished
        } else {
            info!("Level {} cleared, starting level {}", from + 1, self.index + 1);
            ProgressEvent::Advanced {
                from,
                to: self.index,
            }
        }
    }

    fn observe_pointer(&mut self, pointer: Option<&Point2<f64>>) -> Option<ProgressEvent> {
        let level = self.current_level()?;

        let Some(pointer) = pointer else {
            self.inside_bound = false;
            return None;
        };

        let inside = level.bound.contains(pointer);
        let left_bound = self.inside_bound && !inside;
        self.inside_bound = inside;

        if left_bound {
            debug!("Pointer left the bound of level {}", self.index + 1);
            self.rejections += 1;
            Some(ProgressEvent::Rejected { index: self.index })
        } else {
            None
        }
    }

    fn len(&self) -> usize {
        self.levels.len()
    }

    fn finish_message(&self) -> &str {
        &self.finish_message
    }

    fn finish_target(&self) -> &str {
        &self.finish_target
    }
}
