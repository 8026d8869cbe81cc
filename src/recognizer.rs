// src/recognizer.rs - Landmark sources: simulated hands and recorded replays
use image::DynamicImage;
use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{QuizError, Result};
use crate::landmarks::{index, HandObservation, HandSide, Landmark, LANDMARK_COUNT};

/// Per-frame hand detector. Called at most once per displayed frame with
/// strictly increasing timestamps; returns an empty list when no hand is seen.
pub trait LandmarkSource {
    fn recognize(
        &mut self,
        frame: Option<&DynamicImage>,
        timestamp_ms: u64,
    ) -> Result<Vec<HandObservation>>;

    /// Screen targets the current page offers, in stage pixels. Only
    /// scripted sources care.
    fn retarget(&mut self, _targets: &[Point2<f64>]) {}
}

/// Admits a frame only when its timestamp is after the last admitted one,
/// so a source never sees a repeated or backwards timestamp.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_ms: Option<u64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, now_ms: u64) -> bool {
        match self.last_ms {
            Some(last) if now_ms <= last => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pose {
    Open,
    Pinch,
    ThumbsUp,
}

/// Build a plausible 21-point hand whose index fingertip sits at `pointer`
/// (normalized image coordinates).
pub fn synth_hand(side: HandSide, pointer: Point2<f64>, pose: Pose) -> HandObservation {
    let (x, y) = (pointer.x, pointer.y);
    let mut points = [Vector3::zeros(); LANDMARK_COUNT];

    let base_y = match pose {
        Pose::ThumbsUp => y,
        _ => y + 0.12,
    };
    let bases = [
        Vector3::new(x, base_y, 0.0),
        Vector3::new(x + 0.03, base_y, 0.0),
        Vector3::new(x + 0.06, base_y + 0.01, 0.0),
        Vector3::new(x + 0.09, base_y + 0.02, 0.0),
    ];
    let wrist = Vector3::new(x + 0.04, base_y + 0.16, 0.0);

    let thumb_tip = match pose {
        Pose::Open => Vector3::new(x - 0.09, base_y + 0.04, -0.01),
        Pose::Pinch => Vector3::new(x + 0.02, y + 0.01, -0.02),
        Pose::ThumbsUp => Vector3::new(x - 0.03, y - 0.12, -0.02),
    };

    points[index::WRIST] = wrist;
    fill_chain(
        &mut points,
        wrist,
        thumb_tip,
        &[index::THUMB_CMC, index::THUMB_MCP, index::THUMB_IP, index::THUMB_TIP],
    );

    let fingers = [
        (index::INDEX_MCP, [index::INDEX_PIP, index::INDEX_DIP, index::INDEX_TIP]),
        (index::MIDDLE_MCP, [index::MIDDLE_PIP, index::MIDDLE_DIP, index::MIDDLE_TIP]),
        (index::RING_MCP, [index::RING_PIP, index::RING_DIP, index::RING_TIP]),
        (index::PINKY_MCP, [index::PINKY_PIP, index::PINKY_DIP, index::PINKY_TIP]),
    ];
    for (finger, (base_idx, joints)) in fingers.iter().enumerate() {
        let base = bases[finger];
        let tip = match (pose, finger) {
            // Curled into a fist.
            (Pose::ThumbsUp, _) => base + Vector3::new(0.02, 0.06, -0.02),
            (_, 0) => Vector3::new(x, y, -0.02),
            _ => base - Vector3::new(0.0, 0.11 - 0.01 * finger as f64, 0.02),
        };
        points[*base_idx] = base;
        fill_chain(&mut points, base, tip, joints);
    }

    HandObservation::from_array(side, 0.95, points)
}

/// Spread `joints` evenly along `start -> tip`; the last joint lands on `tip`.
fn fill_chain(points: &mut [Landmark; LANDMARK_COUNT], start: Landmark, tip: Landmark, joints: &[usize]) {
    for (step, &idx) in joints.iter().enumerate() {
        points[idx] = if step + 1 == joints.len() {
            tip
        } else {
            start + (tip - start) * ((step + 1) as f64 / joints.len() as f64)
        };
    }
}

/// Scripted user: travels to each target, pinches long enough to select it,
/// releases, moves on. With no targets it holds a thumbs-up.
#[derive(Debug, Clone)]
pub struct SimulatedHands {
    stage: (f64, f64),
    targets: Vec<Point2<f64>>,
    cycle_ms: u64,
    travel_ms: u64,
    release_ms: u64,
    with_left_hand: bool,
}

impl SimulatedHands {
    pub fn new(stage: (f64, f64)) -> Self {
        Self {
            stage,
            targets: Vec::new(),
            cycle_ms: 4000,
            travel_ms: 1000,
            release_ms: 400,
            with_left_hand: false,
        }
    }

    /// Also report a slowly circling left hand (for model placement pages).
    pub fn with_left_hand(mut self, enabled: bool) -> Self {
        self.with_left_hand = enabled;
        self
    }

    fn normalized(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::new(p.x / self.stage.0, p.y / self.stage.1)
    }

    fn pointer_hand(&self, timestamp_ms: u64) -> HandObservation {
        if self.targets.is_empty() {
            return synth_hand(HandSide::Right, Point2::new(0.6, 0.45), Pose::ThumbsUp);
        }

        let step = (timestamp_ms / self.cycle_ms) as usize;
        let phase = timestamp_ms % self.cycle_ms;
        let target = self.normalized(self.targets[step % self.targets.len()]);
        let previous = self.normalized(
            self.targets[(step + self.targets.len() - 1) % self.targets.len()],
        );

        if phase < self.travel_ms {
            let t = phase as f64 / self.travel_ms as f64;
            let pos = previous + (target - previous) * t;
            synth_hand(HandSide::Right, pos, Pose::Open)
        } else if phase < self.cycle_ms - self.release_ms {
            synth_hand(HandSide::Right, target, Pose::Pinch)
        } else {
            synth_hand(HandSide::Right, target, Pose::Open)
        }
    }

    fn left_hand(&self, timestamp_ms: u64) -> HandObservation {
        let angle = timestamp_ms as f64 / 1000.0;
        let pointer = Point2::new(0.3 + 0.1 * angle.cos(), 0.45 + 0.1 * angle.sin());
        synth_hand(HandSide::Left, pointer, Pose::Open)
    }
}

impl LandmarkSource for SimulatedHands {
    fn recognize(
        &mut self,
        _frame: Option<&DynamicImage>,
        timestamp_ms: u64,
    ) -> Result<Vec<HandObservation>> {
        let mut hands = vec![self.pointer_hand(timestamp_ms)];
        if self.with_left_hand {
            hands.push(self.left_hand(timestamp_ms));
        }
        Ok(hands)
    }

    fn retarget(&mut self, targets: &[Point2<f64>]) {
        self.targets = targets.to_vec();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedHand {
    pub side: HandSide,
    #[serde(default = "default_score")]
    pub score: f64,
    pub landmarks: Vec<[f64; 3]>,
}

fn default_score() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub timestamp_ms: u64,
    #[serde(default)]
    pub hands: Vec<RecordedHand>,
}

impl RecordedHand {
    pub fn from_observation(hand: &HandObservation) -> Self {
        Self {
            side: hand.side,
            score: hand.score,
            landmarks: hand.landmarks().iter().map(|lm| [lm.x, lm.y, lm.z]).collect(),
        }
    }

    fn to_observation(&self) -> Result<HandObservation> {
        let landmarks: Vec<Landmark> = self
            .landmarks
            .iter()
            .map(|lm| Vector3::new(lm[0], lm[1], lm[2]))
            .collect();
        HandObservation::new(self.side, self.score, &landmarks)
    }
}

/// Plays back a JSON-lines recording, one `RecordedFrame` per line. Replay
/// time starts at the first `recognize` call.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    frames: Vec<RecordedFrame>,
    cursor: usize,
    origin_ms: Option<u64>,
    looping: bool,
}

impl ReplaySource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let source = Self::from_reader(BufReader::new(file))?;
        info!("Loaded {} recorded frames from {}", source.frames.len(), path.display());
        Ok(source)
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut frames = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            frames.push(serde_json::from_str::<RecordedFrame>(&line)?);
        }
        if frames.is_empty() {
            return Err(QuizError::Recognizer("recording contains no frames".to_string()));
        }
        frames.sort_by_key(|frame| frame.timestamp_ms);

        Ok(Self {
            frames,
            cursor: 0,
            origin_ms: None,
            looping: false,
        })
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn duration_ms(&self) -> u64 {
        let first = self.frames.first().map_or(0, |f| f.timestamp_ms);
        let last = self.frames.last().map_or(0, |f| f.timestamp_ms);
        last - first
    }
}

impl LandmarkSource for ReplaySource {
    fn recognize(
        &mut self,
        _frame: Option<&DynamicImage>,
        timestamp_ms: u64,
    ) -> Result<Vec<HandObservation>> {
        let origin = *self.origin_ms.get_or_insert(timestamp_ms);
        let first = self.frames[0].timestamp_ms;
        let mut elapsed = timestamp_ms.saturating_sub(origin);

        if self.looping {
            let span = self.duration_ms() + 1;
            elapsed %= span;
            if first + elapsed < self.frames[self.cursor].timestamp_ms {
                self.cursor = 0;
            }
        } else if elapsed > self.duration_ms() {
            return Ok(Vec::new());
        }

        let target = first + elapsed;
        while self.cursor + 1 < self.frames.len() && self.frames[self.cursor + 1].timestamp_ms <= target {
            self.cursor += 1;
        }

        let frame = &self.frames[self.cursor];
        let hands = frame
            .hands
            .iter()
            .filter_map(|hand| match hand.to_observation() {
                Ok(observation) => Some(observation),
                Err(e) => {
                    warn!("Dropping recorded hand at {} ms: {}", frame.timestamp_ms, e);
                    None
                }
            })
            .collect();
        Ok(hands)
    }
}
