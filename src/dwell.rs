// src/dwell.rs - Dwell-to-select state machine, polled once per frame
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::regions::RegionId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellConfig {
    /// Continuous pointing time needed before a region is selected.
    pub dwell_ms: u64,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self { dwell_ms: 2000 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DwellState {
    /// Nothing is being pointed at.
    Idle,
    /// Continuously pointing at `region` since `since_ms`.
    Pointing { region: RegionId, since_ms: u64 },
    /// `region` was selected; stays latched until the pointer leaves it.
    Fired { region: RegionId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionStyle {
    #[default]
    Neutral,
    Selecting,
    Selected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DwellEvent {
    Started(RegionId),
    Cancelled(RegionId),
    Fired(RegionId),
}

/// Turns "pointing at region R this frame" into at most one selection per
/// continuous dwell. Only one region can be dwelling at a time.
///
/// Elapsed time is compared against the stored start on every poll, so there
/// are no independently scheduled callbacks that could act on a dwell that was
/// already reset.
#[derive(Debug, Clone)]
pub struct DwellTracker {
    config: DwellConfig,
    state: DwellState,
    styles: HashMap<RegionId, RegionStyle>,
}

impl DwellTracker {
    pub fn new(config: DwellConfig) -> Self {
        Self {
            config,
            state: DwellState::Idle,
            styles: HashMap::new(),
        }
    }

    /// Advance with the region the pinching pointer is over this frame, or
    /// `None` when not pinching or outside every region.
    pub fn update(&mut self, now_ms: u64, target: Option<&RegionId>) -> Vec<DwellEvent> {
        let mut events = Vec::new();

        let Some(target) = target else {
            self.go_idle(&mut events);
            return events;
        };

        match &self.state {
            DwellState::Pointing { region, since_ms } if region == target => {
                let elapsed = now_ms.saturating_sub(*since_ms);
                if elapsed >= self.config.dwell_ms {
                    debug!("Dwell on {} complete after {} ms", target, elapsed);
                    self.styles.clear();
                    self.styles.insert(target.clone(), RegionStyle::Selected);
                    self.state = DwellState::Fired {
                        region: target.clone(),
                    };
                    events.push(DwellEvent::Fired(target.clone()));
                }
            }
            DwellState::Fired { region } if region == target => {}
            _ => {
                if let DwellState::Pointing { region, .. } = &self.state {
                    debug!("Dwell on {} superseded by {}", region, target);
                    events.push(DwellEvent::Cancelled(region.clone()));
                }
                self.styles.clear();
                self.styles.insert(target.clone(), RegionStyle::Selecting);
                self.state = DwellState::Pointing {
                    region: target.clone(),
                    since_ms: now_ms,
                };
                debug!("Dwell started on {}", target);
                events.push(DwellEvent::Started(target.clone()));
            }
        }

        events
    }

    /// Drop any in-flight dwell and neutralize every region's styling.
    pub fn reset(&mut self) {
        self.state = DwellState::Idle;
        self.styles.clear();
    }

    fn go_idle(&mut self, events: &mut Vec<DwellEvent>) {
        if let DwellState::Pointing { region, .. } = &self.state {
            debug!("Dwell on {} cancelled", region);
            events.push(DwellEvent::Cancelled(region.clone()));
        }
        self.reset();
    }

    pub fn state(&self) -> &DwellState {
        &self.state
    }

    pub fn style(&self, region: &RegionId) -> RegionStyle {
        self.styles.get(region).copied().unwrap_or_default()
    }

    /// Fraction of the dwell completed, for progress rings in the overlay.
    pub fn progress(&self, now_ms: u64) -> Option<(RegionId, f64)> {
        match &self.state {
            DwellState::Pointing { region, since_ms } => {
                let fraction = if self.config.dwell_ms == 0 {
                    1.0
                } else {
                    now_ms.saturating_sub(*since_ms) as f64 / self.config.dwell_ms as f64
                };
                Some((region.clone(), fraction.min(1.0)))
            }
            _ => None,
        }
    }
}
