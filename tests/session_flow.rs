use nalgebra::{Point2, Vector3};

use pinch_quiz::dwell::DwellEvent;
use pinch_quiz::gestures::{GestureClassifier, GestureConfig};
use pinch_quiz::landmarks::{index, LANDMARK_COUNT};
use pinch_quiz::progress::ProgressEvent;
use pinch_quiz::recognizer::{synth_hand, Pose};
use pinch_quiz::scene::place_on_hand;
use pinch_quiz::session::{Activity, Cue, Session, SessionSink};
use pinch_quiz::{AppConfig, FrameObservations, HandObservation, HandSide, Page};

#[derive(Default)]
struct ScriptedSink {
    cues: Vec<Cue>,
    messages: Vec<String>,
    navigations: Vec<String>,
}

impl SessionSink for ScriptedSink {
    fn play_cue(&mut self, cue: Cue) {
        self.cues.push(cue);
    }

    fn show_message(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn navigate(&mut self, target: &str) {
        self.navigations.push(target.to_string());
    }
}

struct Driver {
    session: Session,
    sink: ScriptedSink,
    stage: (f64, f64),
    progress: Vec<(u64, ProgressEvent)>,
    fired: Vec<u64>,
}

impl Driver {
    fn new(page: Page, tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig::default();
        tweak(&mut config);

        Self {
            session: Session::new(page, &config).unwrap(),
            sink: ScriptedSink::default(),
            stage: config.video.stage(),
            progress: Vec::new(),
            fired: Vec::new(),
        }
    }

    fn frame(&mut self, t: u64, hands: Vec<HandObservation>) {
        let report = self
            .session
            .tick(&FrameObservations::new(t, hands), &mut self.sink);
        for event in report.progress_events {
            self.progress.push((t, event));
        }
        self.fired.extend(
            report
                .dwell_events
                .iter()
                .filter(|e| matches!(e, DwellEvent::Fired(_)))
                .map(|_| t),
        );
    }

    fn hand(&self, at: Point2<f64>, pose: Pose) -> HandObservation {
        synth_hand(
            HandSide::Right,
            Point2::new(at.x / self.stage.0, at.y / self.stage.1),
            pose,
        )
    }

    /// Pinch over `at` on every 100 ms tick in `[from, to]`.
    fn pinch(&mut self, at: Point2<f64>, from: u64, to: u64) {
        let hand = self.hand(at, Pose::Pinch);
        let mut t = from;
        while t <= to {
            self.frame(t, vec![hand.clone()]);
            t += 100;
        }
    }

    fn release(&mut self, at: Point2<f64>, t: u64) {
        let hand = self.hand(at, Pose::Open);
        self.frame(t, vec![hand]);
    }

    fn events(&self) -> Vec<ProgressEvent> {
        self.progress.iter().map(|(_, e)| *e).collect()
    }
}

fn answer_centers(config: &AppConfig) -> [Point2<f64>; 3] {
    [0, 1, 2].map(|i| config.quiz.regions[i].bounds.center())
}

fn hand_with_tips(thumb: Vector3<f64>, tip: Vector3<f64>) -> HandObservation {
    let mut landmarks = vec![Vector3::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
    landmarks[index::THUMB_TIP] = thumb;
    landmarks[index::INDEX_TIP] = tip;
    HandObservation::new(HandSide::Right, 1.0, &landmarks).unwrap()
}

fn hand_with_gap(gap: f64) -> HandObservation {
    hand_with_tips(Vector3::new(0.3, 0.5, 0.0), Vector3::new(0.3 + gap, 0.5, 0.0))
}

#[test]
fn pinch_threshold_boundary() {
    let classifier = GestureClassifier::new(GestureConfig::default());
    assert!(classifier.is_pinching(&hand_with_gap(0.0499)));
    assert!(!classifier.is_pinching(&hand_with_tips(
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(0.05, 0.0, 0.0)
    )));
    assert!(!classifier.is_pinching(&hand_with_gap(0.0501)));
}

#[test]
fn dwell_fires_once_after_full_duration() {
    let config = AppConfig::default();
    let [_, b, _] = answer_centers(&config);
    let mut driver = Driver::new(Page::Quiz, |_| {});

    driver.pinch(b, 0, 1900);
    assert!(driver.fired.is_empty());

    driver.pinch(b, 2000, 6000);
    assert_eq!(driver.fired, vec![2000]);
    assert_eq!(driver.events(), vec![ProgressEvent::Advanced { from: 0, to: 1 }]);
}

#[test]
fn leaving_one_ms_early_restarts_the_dwell() {
    let config = AppConfig::default();
    let [_, b, _] = answer_centers(&config);
    let mut driver = Driver::new(Page::Quiz, |_| {});
    let pinch = driver.hand(b, Pose::Pinch);

    driver.frame(1000, vec![pinch.clone()]);
    driver.frame(2999, vec![pinch.clone()]);
    driver.release(b, 3000);
    driver.frame(3001, vec![pinch.clone()]);
    driver.frame(4999, vec![pinch.clone()]);
    assert!(driver.fired.is_empty());

    driver.frame(5001, vec![pinch]);
    assert_eq!(driver.fired, vec![5001]);
}

#[test]
fn second_pinching_hand_does_not_steal_the_dwell() {
    let config = AppConfig::default();
    let [_, b, _] = answer_centers(&config);
    let mut driver = Driver::new(Page::Quiz, |_| {});
    let right = driver.hand(b, Pose::Pinch);
    let left = synth_hand(HandSide::Left, Point2::new(0.1, 0.1), Pose::Pinch);

    let mut t = 0;
    while t <= 6000 {
        let hands = if (t / 100) % 2 == 0 {
            vec![right.clone(), left.clone()]
        } else {
            vec![left.clone(), right.clone()]
        };
        driver.frame(t, hands);
        t += 100;
    }

    assert_eq!(driver.fired, vec![2000]);
    assert_eq!(driver.events(), vec![ProgressEvent::Advanced { from: 0, to: 1 }]);
}

#[test]
fn wrong_answer_then_selection_inside_feedback_window_is_ignored() {
    let config = AppConfig::default();
    let [a, b, _] = answer_centers(&config);
    let mut driver = Driver::new(Page::Quiz, |config| config.dwell.dwell_ms = 500);

    // A is wrong for the first question.
    driver.pinch(a, 0, 500);
    // B fires at 1100, still inside the 1500 ms window opened at 500.
    driver.pinch(b, 600, 1100);
    driver.release(b, 1200);
    driver.pinch(b, 2100, 2600);

    assert_eq!(
        driver.events(),
        vec![
            ProgressEvent::Retry { index: 0 },
            ProgressEvent::Ignored,
            ProgressEvent::Advanced { from: 0, to: 1 },
        ]
    );
    assert_eq!(driver.sink.cues, vec![Cue::Incorrect, Cue::Correct]);
}

#[test]
fn answering_everything_finishes_exactly_once() {
    let config = AppConfig::default();
    let [a, b, c] = answer_centers(&config);
    let mut driver = Driver::new(Page::Quiz, |_| {});

    let mut t = 0;
    for target in [b, a, c, b] {
        driver.pinch(target, t, t + 2000);
        driver.release(target, t + 2100);
        t += 4000;
    }
    assert_eq!(driver.sink.navigations, vec!["home".to_string()]);
    assert!(driver
        .sink
        .messages
        .iter()
        .any(|m| m == &config.quiz.finish_message));

    // Nothing after the end is processed.
    driver.pinch(b, t, t + 5000);
    let finished = driver
        .events()
        .iter()
        .filter(|e| **e == ProgressEvent::Finished)
        .count();
    assert_eq!(finished, 1);
    assert_eq!(driver.events().len(), 4);
    assert_eq!(driver.sink.navigations.len(), 1);
    assert_eq!(driver.session.recorder().summary().accepted, 4);
}

#[test]
fn levels_reject_leaving_the_bound_and_advance_on_target() {
    let config = AppConfig::default();
    let targets: Vec<Point2<f64>> = config
        .levels
        .levels
        .iter()
        .map(|level| level.target.center())
        .collect();
    let mut driver = Driver::new(Page::Levels, |_| {});

    driver.pinch(Point2::new(960.0, 540.0), 0, 0);
    driver.pinch(Point2::new(1900.0, 540.0), 100, 100);
    assert_eq!(driver.events(), vec![ProgressEvent::Rejected { index: 0 }]);

    let mut t = 1000;
    for target in &targets {
        driver.pinch(*target, t, t + 2000);
        t += 3000;
    }

    let events = driver.events();
    assert_eq!(
        &events[1..],
        &[
            ProgressEvent::Advanced { from: 0, to: 1 },
            ProgressEvent::Advanced { from: 1, to: 2 },
            ProgressEvent::Finished,
        ]
    );
    assert_eq!(driver.sink.navigations, vec!["home".to_string()]);
}

#[test]
fn model_visibility_follows_hand_without_bleed_through() {
    let mut driver = Driver::new(Page::Ar, |_| {});
    let first = synth_hand(HandSide::Right, Point2::new(0.3, 0.3), Pose::Open);
    let second = synth_hand(HandSide::Right, Point2::new(0.7, 0.6), Pose::Pinch);

    let right_model = |driver: &Driver| {
        let Activity::Ar(scene) = driver.session.activity() else {
            panic!("AR page expected");
        };
        let model = scene
            .models()
            .iter()
            .find(|m| m.spec.hand == HandSide::Right)
            .cloned()
            .unwrap();
        (model, scene.config().clone())
    };

    driver.frame(10, vec![first.clone()]);
    let (model, scene_config) = right_model(&driver);
    assert!(model.visible);
    assert_eq!(model.placement, Some(place_on_hand(&first, &scene_config)));

    driver.frame(20, vec![]);
    let (model, _) = right_model(&driver);
    assert!(!model.visible);
    assert_eq!(model.placement, None);

    driver.frame(30, vec![second.clone()]);
    let (model, scene_config) = right_model(&driver);
    assert!(model.visible);
    assert_eq!(model.placement, Some(place_on_hand(&second, &scene_config)));
}

#[test]
fn thumbs_up_on_home_leads_to_quiz() {
    let mut driver = Driver::new(Page::Home, |_| {});
    let thumbs = synth_hand(HandSide::Right, Point2::new(0.5, 0.5), Pose::ThumbsUp);
    let open = synth_hand(HandSide::Right, Point2::new(0.5, 0.5), Pose::Open);

    // Dropping the pose resets the hold.
    driver.frame(0, vec![thumbs.clone()]);
    driver.frame(4000, vec![thumbs.clone()]);
    driver.frame(4100, vec![open]);
    driver.frame(4200, vec![thumbs.clone()]);
    driver.frame(9100, vec![thumbs.clone()]);
    assert!(driver.sink.navigations.is_empty());

    driver.frame(9200, vec![thumbs]);
    assert_eq!(driver.sink.navigations, vec!["quiz".to_string()]);
}
