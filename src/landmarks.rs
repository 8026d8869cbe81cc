// src/landmarks.rs - Hand landmark types delivered by the landmark source
use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{QuizError, Result};

/// Number of keypoints in one detected hand.
pub const LANDMARK_COUNT: usize = 21;

/// MediaPipe hand landmark indices
pub mod index {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;

    /// Bases of the four non-thumb fingers.
    pub const FINGER_BASES: [usize; 4] = [INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];
}

/// Bone connections used when drawing a hand skeleton.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (17, 18), (18, 19), (19, 20),
    (0, 17),
];

/// A normalized image-space keypoint: x/y in [0, 1], z relative depth.
pub type Landmark = Vector3<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandSide {
    Left,
    Right,
}

impl HandSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandSide::Left => "Left",
            HandSide::Right => "Right",
        }
    }
    pub fn other(&self) -> HandSide {
        match self {
            HandSide::Left => HandSide::Right,
            HandSide::Right => HandSide::Left,
        }
    }
}

impl fmt::Display for HandSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected hand for one frame. Carries no identity across frames.
#[derive(Debug, Clone, PartialEq)]
pub struct HandObservation {
    pub side: HandSide,
    pub score: f64,
    landmarks: [Landmark; LANDMARK_COUNT],
}

impl HandObservation {
    pub fn new(side: HandSide, score: f64, landmarks: &[Landmark]) -> Result<Self> {
        let landmarks: [Landmark; LANDMARK_COUNT] =
            landmarks
                .try_into()
                .map_err(|_| QuizError::InvalidLandmarkCount {
                    expected: LANDMARK_COUNT,
                    actual: landmarks.len(),
                })?;

        Ok(Self {
            side,
            score,
            landmarks,
        })
    }

    pub fn from_array(side: HandSide, score: f64, landmarks: [Landmark; LANDMARK_COUNT]) -> Self {
        Self {
            side,
            score,
            landmarks,
        }
    }

    pub fn landmarks(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.landmarks
    }

    pub fn landmark(&self, idx: usize) -> Landmark {
        self.landmarks[idx]
    }

    pub fn wrist(&self) -> Landmark {
        self.landmarks[index::WRIST]
    }

    pub fn thumb_tip(&self) -> Landmark {
        self.landmarks[index::THUMB_TIP]
    }

    pub fn index_tip(&self) -> Landmark {
        self.landmarks[index::INDEX_TIP]
    }

    /// Index fingertip scaled into a pixel space of the given size.
    pub fn pointer(&self, width: f64, height: f64) -> Point2<f64> {
        let tip = self.index_tip();
        Point2::new(tip.x * width, tip.y * height)
    }

    pub fn set_landmark(&mut self, idx: usize, landmark: Landmark) {
        self.landmarks[idx] = landmark;
    }
}

/// Everything the landmark source reported for one video frame.
#[derive(Debug, Clone, Default)]
pub struct FrameObservations {
    pub timestamp_ms: u64,
    pub hands: Vec<HandObservation>,
}

impl FrameObservations {
    pub fn new(timestamp_ms: u64, hands: Vec<HandObservation>) -> Self {
        Self { timestamp_ms, hands }
    }

    /// First hand of the requested side; extra hands of that side are ignored.
    pub fn hand(&self, side: HandSide) -> Option<&HandObservation> {
        self.hands.iter().find(|hand| hand.side == side)
    }
}

#[cfg(test)]
pub(crate) fn flat_hand(side: HandSide) -> HandObservation {
    let landmarks = vec![Vector3::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
    HandObservation::new(side, 0.9, &landmarks).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_landmark_count() {
        let landmarks = vec![Vector3::zeros(); 20];
        let err = HandObservation::new(HandSide::Left, 1.0, &landmarks).unwrap_err();
        assert!(matches!(
            err,
            QuizError::InvalidLandmarkCount { expected: 21, actual: 20 }
        ));
    }

    #[test]
    fn pointer_scales_index_tip() {
        let mut hand = flat_hand(HandSide::Right);
        hand.set_landmark(index::INDEX_TIP, Vector3::new(0.25, 0.5, 0.1));
        let p = hand.pointer(1920.0, 1080.0);
        assert!((p.x - 480.0).abs() < 1e-9);
        assert!((p.y - 540.0).abs() < 1e-9);
    }

    #[test]
    fn hand_lookup_filters_by_side_not_order() {
        let frame = FrameObservations::new(
            10,
            vec![flat_hand(HandSide::Left), flat_hand(HandSide::Left)],
        );
        assert!(frame.hand(HandSide::Right).is_none());
        assert_eq!(frame.hand(HandSide::Left).map(|h| h.side), Some(HandSide::Left));
    }

    #[test]
    fn side_parses_from_handedness_label() {
        let side: HandSide = serde_json::from_str("\"Right\"").unwrap();
        assert_eq!(side, HandSide::Right);
        assert_eq!(side.to_string(), "Right");
    }
}
