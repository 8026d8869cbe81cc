// src/session.rs - One page's worth of state, advanced once per video frame
use nalgebra::Point2;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::data::SessionRecorder;
use crate::dwell::{DwellEvent, DwellTracker};
use crate::error::{QuizError, Result};
use crate::gestures::{GateStatus, GestureClassifier, ThumbsUpGate};
use crate::landmarks::{FrameObservations, HandSide};
use crate::levels::LevelProgress;
use crate::progress::{ProgressEvent, ProgressState, Progression};
use crate::quiz::QuizProgress;
use crate::regions::{RegionId, RegionLayout};
use crate::scene::{ArScene, OverlayScene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Home,
    Quiz,
    Levels,
    Ar,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Home, Page::Quiz, Page::Levels, Page::Ar];

    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::Quiz => "quiz",
            Page::Levels => "levels",
            Page::Ar => "ar",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Page {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self> {
        Page::ALL
            .into_iter()
            .find(|page| page.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QuizError::UnknownPage(s.to_string()))
    }
}

/// Where a held thumbs-up on the home page leads.
pub const HOME_GATE_TARGET: Page = Page::Quiz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Correct,
    Incorrect,
    Finished,
}

/// Side effects requested by a session. Implementations must not fail the
/// frame: audio or display problems are theirs to log.
pub trait SessionSink {
    fn play_cue(&mut self, cue: Cue);
    fn show_message(&mut self, message: &str);
    fn navigate(&mut self, target: &str);
}

pub enum Activity {
    Home(ThumbsUpGate),
    Quiz(QuizProgress),
    Levels(LevelProgress),
    Ar(ArScene<OverlayScene>),
}

impl Activity {
    fn progression(&self) -> Option<&dyn Progression> {
        match self {
            Activity::Quiz(quiz) => Some(quiz),
            Activity::Levels(levels) => Some(levels),
            _ => None,
        }
    }
}

/// What happened during one tick, for the overlay.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub timestamp_ms: u64,
    /// Frame was not newer than the previous one and was skipped.
    pub stale: bool,
    pub pinching: usize,
    pub thumbs_up: usize,
    /// Stage-pixel position of the pointing hand's index fingertip.
    pub pointer: Option<Point2<f64>>,
    pub pointer_side: Option<HandSide>,
    pub target: Option<RegionId>,
    pub dwell_events: Vec<DwellEvent>,
    pub progress_events: Vec<ProgressEvent>,
    pub gate: Option<GateStatus>,
}

pub struct Session {
    page: Page,
    classifier: GestureClassifier,
    dwell: DwellTracker,
    activity: Activity,
    stage: (f64, f64),
    recorder: SessionRecorder,
    last_timestamp: Option<u64>,
    pointer_side: Option<HandSide>,
    navigated: bool,
}

impl Session {
    pub fn new(page: Page, config: &AppConfig) -> Result<Self> {
        let activity = match page {
            Page::Home => Activity::Home(ThumbsUpGate::new(config.gestures.thumbs_up_hold_ms)),
            Page::Quiz => Activity::Quiz(QuizProgress::new(&config.quiz)?),
            Page::Levels => Activity::Levels(LevelProgress::new(&config.levels)?),
            Page::Ar => {
                let mut scene = ArScene::new(OverlayScene::new(), config.scene.clone());
                scene.load_configured()?;
                Activity::Ar(scene)
            }
        };

        let recorder = SessionRecorder::new(None);
        info!("Starting {} session {}", page, recorder.session_name());

        Ok(Self {
            page,
            classifier: GestureClassifier::new(config.gestures.clone()),
            dwell: DwellTracker::new(config.dwell.clone()),
            activity,
            stage: config.video.stage(),
            recorder,
            last_timestamp: None,
            pointer_side: None,
            navigated: false,
        })
    }

    pub fn tick(&mut self, frame: &FrameObservations, sink: &mut dyn SessionSink) -> TickReport {
        let now = frame.timestamp_ms;
        let mut report = TickReport {
            timestamp_ms: now,
            ..Default::default()
        };

        if let Some(last) = self.last_timestamp {
            if now <= last {
                warn!("Skipping frame at {} ms, not after {} ms", now, last);
                report.stale = true;
                return report;
            }
        }
        self.last_timestamp = Some(now);
        self.recorder.observe_frame(now);

        report.pinching = self.classifier.count_pinching(&frame.hands);
        report.thumbs_up = self.classifier.count_thumbs_up(&frame.hands);
        let pointing = self.classifier.pointer_hand(frame, self.pointer_side);
        self.pointer_side = pointing.map(|hand| hand.side);
        report.pointer_side = self.pointer_side;
        report.pointer = pointing.map(|hand| hand.pointer(self.stage.0, self.stage.1));

        if self.navigated {
            return report;
        }

        let page = self.page;
        match &mut self.activity {
            Activity::Home(gate) => {
                let status = gate.update(now, report.thumbs_up > 0);
                if status == GateStatus::Triggered {
                    info!("Thumbs-up held, leaving home");
                    self.navigated = true;
                    sink.navigate(HOME_GATE_TARGET.as_str());
                }
                report.gate = Some(status);
            }
            Activity::Ar(scene) => {
                scene.sync(frame);
                scene.render();
            }
            Activity::Quiz(quiz) => {
                let mut step = Step {
                    page,
                    dwell: &mut self.dwell,
                    recorder: &mut self.recorder,
                    navigated: &mut self.navigated,
                };
                step.advance(quiz, now, sink, &mut report);
            }
            Activity::Levels(levels) => {
                let mut step = Step {
                    page,
                    dwell: &mut self.dwell,
                    recorder: &mut self.recorder,
                    navigated: &mut self.navigated,
                };
                step.advance(levels, now, sink, &mut report);
            }
        }

        report
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn dwell(&self) -> &DwellTracker {
        &self.dwell
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }

    pub fn stage(&self) -> (f64, f64) {
        self.stage
    }

    /// Regions selectable right now, `None` on pages without a progression.
    pub fn regions(&self) -> Option<&RegionLayout> {
        self.activity.progression().map(|p| p.regions())
    }

    /// Region centres, for scripted landmark sources.
    pub fn targets(&self) -> Vec<Point2<f64>> {
        self.regions()
            .map(|layout| layout.iter().map(|region| region.bounds.center()).collect())
            .unwrap_or_default()
    }

    pub fn is_navigated(&self) -> bool {
        self.navigated
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }
}

/// Borrowed session state needed to feed one frame into a progression.
struct Step<'a> {
    page: Page,
    dwell: &'a mut DwellTracker,
    recorder: &'a mut SessionRecorder,
    navigated: &'a mut bool,
}

impl Step<'_> {
    fn advance(
        &mut self,
        progression: &mut dyn Progression,
        now: u64,
        sink: &mut dyn SessionSink,
        report: &mut TickReport,
    ) {
        let activity = self.page.as_str();

        if let Some(event) = progression.observe_pointer(report.pointer.as_ref()) {
            if let ProgressEvent::Rejected { index } = event {
                self.recorder.record(now, activity, index, "", &event);
            }
            report.progress_events.push(event);
        }

        report.target = report
            .pointer
            .and_then(|p| progression.regions().hit_test(&p).cloned());
        report.dwell_events = self.dwell.update(now, report.target.as_ref());

        let fired: Vec<RegionId> = report
            .dwell_events
            .iter()
            .filter_map(|event| match event {
                DwellEvent::Fired(region) => Some(region.clone()),
                _ => None,
            })
            .collect();

        for region in fired {
            let step = match progression.state() {
                ProgressState::AwaitingInput(index) => index,
                ProgressState::Finished => progression.len(),
            };
            let event = progression.on_selection(&region, now);
            self.recorder.record(now, activity, step, region.as_str(), &event);
            report.progress_events.push(event);

            match event {
                ProgressEvent::Advanced { .. } => {
                    sink.play_cue(Cue::Correct);
                    sink.show_message("Correct!");
                    // The next level exposes a different target.
                    if self.page == Page::Levels {
                        self.dwell.reset();
                    }
                }
                ProgressEvent::Retry { .. } => {
                    sink.play_cue(Cue::Incorrect);
                    sink.show_message("Not quite, try again");
                }
                ProgressEvent::Finished => {
                    self.dwell.reset();
                    sink.play_cue(Cue::Finished);
                    sink.show_message(progression.finish_message());
                    if !*self.navigated {
                        *self.navigated = true;
                        info!(
                            "{} finished, navigating to {}",
                            self.page,
                            progression.finish_target()
                        );
                        sink.navigate(progression.finish_target());
                    }
                }
                ProgressEvent::Ignored | ProgressEvent::Rejected { .. } => {
                    debug!("Selection of {} had no effect", region);
                }
            }
        }
    }
}
