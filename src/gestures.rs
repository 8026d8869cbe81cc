// src/gestures.rs - Pinch and thumbs-up classification from raw landmarks
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::landmarks::{index, FrameObservations, HandObservation, HandSide, Landmark};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Thumb-tip to index-tip distance (normalized units) below which a hand pinches.
    pub pinch_threshold: f64,
    /// How long a thumbs-up has to be held on the home page.
    pub thumbs_up_hold_ms: u64,
    /// Side that points when both hands pinch and neither was pointing before.
    pub pointer_hand: HandSide,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pinch_threshold: 0.05,
            thumbs_up_hold_ms: 5000,
            pointer_hand: HandSide::Right,
        }
    }
}

/// Plain 3D euclidean distance, all axes weighted alike.
pub fn distance(a: &Landmark, b: &Landmark) -> f64 {
    (a - b).norm()
}

#[derive(Debug, Clone)]
pub struct GestureClassifier {
    config: GestureConfig,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig) -> Self {
        Self { config }
    }

    pub fn is_pinching(&self, hand: &HandObservation) -> bool {
        distance(&hand.thumb_tip(), &hand.index_tip()) < self.config.pinch_threshold
    }

    /// Thumb tip strictly above (smaller y) every non-thumb finger base.
    ///
    /// No orientation normalization: a hand held sideways or upside down
    /// can satisfy or miss this test regardless of the actual pose.
    pub fn is_thumbs_up(&self, hand: &HandObservation) -> bool {
        let thumb_y = hand.thumb_tip().y;
        index::FINGER_BASES
            .iter()
            .all(|&base| thumb_y < hand.landmark(base).y)
    }

    /// Pinching hand that drives the pointer, chosen by side and never by
    /// the order hands were reported in. The side that pointed last keeps
    /// the pointer while it still pinches.
    pub fn pointer_hand<'a>(
        &self,
        frame: &'a FrameObservations,
        last_side: Option<HandSide>,
    ) -> Option<&'a HandObservation> {
        let first = last_side.unwrap_or(self.config.pointer_hand);
        [first, first.other()]
            .into_iter()
            .filter_map(|side| frame.hand(side))
            .find(|hand| self.is_pinching(hand))
    }

    pub fn count_pinching(&self, hands: &[HandObservation]) -> usize {
        hands.iter().filter(|hand| self.is_pinching(hand)).count()
    }

    pub fn count_thumbs_up(&self, hands: &[HandObservation]) -> usize {
        hands.iter().filter(|hand| self.is_thumbs_up(hand)).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateStatus {
    Idle,
    Holding { elapsed_ms: u64 },
    Triggered,
}

/// Hold-to-continue gate: fires once after a thumbs-up is held long enough.
#[derive(Debug, Clone)]
pub struct ThumbsUpGate {
    hold_ms: u64,
    started_at: Option<u64>,
    triggered: bool,
}

impl ThumbsUpGate {
    pub fn new(hold_ms: u64) -> Self {
        Self {
            hold_ms,
            started_at: None,
            triggered: false,
        }
    }

    pub fn update(&mut self, now_ms: u64, thumbs_up: bool) -> GateStatus {
        if self.triggered {
            return GateStatus::Idle;
        }

        if !thumbs_up {
            if self.started_at.take().is_some() {
                debug!("Thumbs-up released, hold timer reset");
            }
            return GateStatus::Idle;
        }

        let started = *self.started_at.get_or_insert(now_ms);
        let elapsed_ms = now_ms.saturating_sub(started);

        if elapsed_ms >= self.hold_ms {
            info!("Thumbs-up held for {} ms", elapsed_ms);
            self.started_at = None;
            self.triggered = true;
            GateStatus::Triggered
        } else {
            GateStatus::Holding { elapsed_ms }
        }
    }

    pub fn elapsed_secs(&self, now_ms: u64) -> f64 {
        self.started_at
            .map(|start| now_ms.saturating_sub(start) as f64 / 1000.0)
            .unwrap_or(0.0)
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{flat_hand, HandSide};
    use nalgebra::Vector3;

    fn pinch_hand(gap: f64) -> HandObservation {
        let mut hand = flat_hand(HandSide::Right);
        hand.set_landmark(index::THUMB_TIP, Vector3::new(0.4, 0.6, 0.0));
        hand.set_landmark(index::INDEX_TIP, Vector3::new(0.4 + gap, 0.6, 0.0));
        hand
    }

    fn thumbs_hand(thumb_y: f64, bases_y: [f64; 4]) -> HandObservation {
        let mut hand = flat_hand(HandSide::Left);
        hand.set_landmark(index::THUMB_TIP, Vector3::new(0.5, thumb_y, 0.0));
        hand.set_landmark(index::INDEX_TIP, Vector3::new(0.9, 0.9, 0.0));
        for (base, y) in index::FINGER_BASES.iter().zip(bases_y) {
            hand.set_landmark(*base, Vector3::new(0.5, y, 0.0));
        }
        hand
    }

    #[test]
    fn pinch_threshold_is_strict() {
        let classifier = GestureClassifier::new(GestureConfig::default());
        assert!(classifier.is_pinching(&pinch_hand(0.0499)));
        assert!(!classifier.is_pinching(&pinch_hand(0.0501)));

        // Exactly at the threshold is not a pinch; 0.5 keeps the arithmetic exact.
        let strict = GestureClassifier::new(GestureConfig {
            pinch_threshold: 0.5,
            ..GestureConfig::default()
        });
        let mut hand = flat_hand(HandSide::Right);
        hand.set_landmark(index::THUMB_TIP, Vector3::new(0.25, 0.5, 0.25));
        hand.set_landmark(index::INDEX_TIP, Vector3::new(0.25, 0.5, 0.75));
        assert_eq!(distance(&hand.thumb_tip(), &hand.index_tip()), 0.5);
        assert!(!strict.is_pinching(&hand));
    }

    #[test]
    fn depth_counts_like_other_axes() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let depth = distance(&a, &Vector3::new(0.0, 0.0, 0.3));
        let width = distance(&a, &Vector3::new(0.3, 0.0, 0.0));
        assert!((depth - 0.3).abs() < 1e-12);
        assert_eq!(depth, width);
    }

    #[test]
    fn thumbs_up_needs_thumb_above_every_base() {
        let classifier = GestureClassifier::new(GestureConfig::default());
        assert!(classifier.is_thumbs_up(&thumbs_hand(0.2, [0.5, 0.5, 0.6, 0.6])));
        // A single base level with the thumb breaks it.
        assert!(!classifier.is_thumbs_up(&thumbs_hand(0.2, [0.5, 0.2, 0.6, 0.6])));
        assert!(!classifier.is_thumbs_up(&thumbs_hand(0.7, [0.5, 0.5, 0.6, 0.6])));
    }

    #[test]
    fn counters_report_each_hand() {
        let classifier = GestureClassifier::new(GestureConfig::default());
        let hands = vec![
            pinch_hand(0.01),
            pinch_hand(0.2),
            thumbs_hand(0.1, [0.5; 4]),
        ];
        assert_eq!(classifier.count_pinching(&hands), 1);
        assert_eq!(classifier.count_thumbs_up(&hands), 1);
    }

    #[test]
    fn default_threshold_boundary() {
        let classifier = GestureClassifier::new(GestureConfig::default());
        let mut hand = flat_hand(HandSide::Right);
        hand.set_landmark(index::THUMB_TIP, Vector3::new(0.0, 0.0, 0.0));
        hand.set_landmark(index::INDEX_TIP, Vector3::new(0.05, 0.0, 0.0));
        assert_eq!(distance(&hand.thumb_tip(), &hand.index_tip()), 0.05);
        assert!(!classifier.is_pinching(&hand));
        assert!(classifier.is_pinching(&pinch_hand(0.0499)));
        assert!(!classifier.is_pinching(&pinch_hand(0.0501)));
    }

    #[test]
    fn pointer_hand_ignores_report_order() {
        let classifier = GestureClassifier::new(GestureConfig::default());
        let mut left = pinch_hand(0.01);
        left.side = HandSide::Left;
        let right = pinch_hand(0.01);

        let frames = [
            FrameObservations::new(0, vec![left.clone(), right.clone()]),
            FrameObservations::new(1, vec![right.clone(), left.clone()]),
        ];
        for frame in &frames {
            let hand = classifier.pointer_hand(frame, None).unwrap();
            assert_eq!(hand.side, HandSide::Right);
            let hand = classifier.pointer_hand(frame, Some(HandSide::Left)).unwrap();
            assert_eq!(hand.side, HandSide::Left);
        }

        // The other side takes over once the pointing hand lets go.
        let released = FrameObservations::new(2, vec![pinch_hand(0.2), left.clone()]);
        let hand = classifier.pointer_hand(&released, Some(HandSide::Right)).unwrap();
        assert_eq!(hand.side, HandSide::Left);
        assert!(classifier
            .pointer_hand(&FrameObservations::new(3, vec![pinch_hand(0.2)]), None)
            .is_none());
    }

    #[test]
    fn gate_fires_once_after_continuous_hold() {
        let mut gate = ThumbsUpGate::new(5000);
        assert_eq!(gate.update(0, true), GateStatus::Holding { elapsed_ms: 0 });
        assert_eq!(gate.update(4999, true), GateStatus::Holding { elapsed_ms: 4999 });
        assert_eq!(gate.update(5000, true), GateStatus::Triggered);
        assert_eq!(gate.update(9000, true), GateStatus::Idle);
        assert!(gate.is_triggered());
    }

    #[test]
    fn gate_resets_when_pose_lost() {
        let mut gate = ThumbsUpGate::new(5000);
        gate.update(0, true);
        gate.update(4000, false);
        assert_eq!(gate.elapsed_secs(4000), 0.0);
        assert_eq!(gate.update(4500, true), GateStatus::Holding { elapsed_ms: 0 });
        assert_eq!(gate.update(9000, true), GateStatus::Holding { elapsed_ms: 4500 });
    }
}
