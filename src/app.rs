// src/app.rs
use crate::ui::{self as paint, StageTransform, Theme};
use crate::video::CameraFeed;

use eframe::egui;
use nalgebra::Point2;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{error, info, warn};

use pinch_quiz::config::AppConfig;
use pinch_quiz::progress::{FeedbackKind, Progression};
use pinch_quiz::quiz::{AnswerOption, QuizProgress};
use pinch_quiz::regions::SelectionRegion;
use pinch_quiz::recognizer::FrameClock;
use pinch_quiz::scene::unproject_to_plane;
use pinch_quiz::session::{Activity, Cue, Page, Session, SessionSink, TickReport};
use pinch_quiz::{FrameObservations, HandObservation, LandmarkSource};

const MESSAGE_MS: u64 = 1500;

#[derive(Default)]
struct PendingEffects {
    message: Option<String>,
    navigation: Option<String>,
}

impl SessionSink for PendingEffects {
    fn play_cue(&mut self, cue: Cue) {
        // No audio device is driven; the cue is only logged.
        info!("Cue: {:?}", cue);
    }

    fn show_message(&mut self, message: &str) {
        self.message = Some(message.to_string());
    }

    fn navigate(&mut self, target: &str) {
        self.navigation = Some(target.to_string());
    }
}

#[derive(Clone, Default)]
struct PerformanceMetrics {
    avg_fps: f32,
    frame_times: VecDeque<f32>,
}

impl PerformanceMetrics {
    fn push(&mut self, dt: f32) {
        self.frame_times.push_back(dt);
        if self.frame_times.len() > 60 {
            self.frame_times.pop_front();
        }
        let total: f32 = self.frame_times.iter().sum();
        if total > 0.0 {
            self.avg_fps = self.frame_times.len() as f32 / total;
        }
    }
}

pub struct PinchQuizApp {
    config: AppConfig,
    session: Session,
    camera: Option<CameraFeed>,
    source: Box<dyn LandmarkSource + Send>,
    theme: Theme,
    texture: Option<egui::TextureHandle>,
    clock: Instant,
    frame_clock: FrameClock,
    last_frame: Option<Instant>,
    hands: Vec<HandObservation>,
    report: TickReport,
    message: Option<(String, u64)>,
    metrics: PerformanceMetrics,
}

impl PinchQuizApp {
    pub fn new(
        config: AppConfig,
        session: Session,
        camera: Option<CameraFeed>,
        source: Box<dyn LandmarkSource + Send>,
    ) -> Self {
        Self {
            config,
            session,
            camera,
            source,
            theme: Theme::default(),
            texture: None,
            clock: Instant::now(),
            frame_clock: FrameClock::new(),
            last_frame: None,
            hands: Vec::new(),
            report: TickReport::default(),
            message: None,
            metrics: PerformanceMetrics::default(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.clock.elapsed().as_millis() as u64
    }

    fn step(&mut self, ctx: &egui::Context) {
        // Repaints can land within the same millisecond.
        let now = self.now_ms();
        if !self.frame_clock.admit(now) {
            return;
        }

        let frame = match self.camera.as_mut().map(CameraFeed::read_frame) {
            Some(Ok(frame)) => Some(frame),
            Some(Err(e)) => {
                warn!("Camera frame dropped: {}", e);
                None
            }
            None => None,
        };
        if let Some(frame) = &frame {
            paint::upload_frame(ctx, &mut self.texture, frame);
        }

        self.source.retarget(&self.session.targets());
        self.hands = match self.source.recognize(frame.as_ref(), now) {
            Ok(hands) => hands,
            Err(e) => {
                warn!("Landmark source failed at {} ms: {}", now, e);
                Vec::new()
            }
        };

        let observations = FrameObservations::new(now, self.hands.clone());
        let mut effects = PendingEffects::default();
        self.report = self.session.tick(&observations, &mut effects);

        if let Some(message) = effects.message {
            self.message = Some((message, now));
        }
        if let Some(target) = effects.navigation {
            self.navigate(&target);
        }
    }

    fn navigate(&mut self, target: &str) {
        let page = match target.parse::<Page>() {
            Ok(page) => page,
            Err(e) => {
                warn!("Ignoring navigation: {}", e);
                return;
            }
        };

        self.export_session();
        match Session::new(page, &self.config) {
            Ok(session) => {
                info!("Navigated to {}", page);
                self.session = session;
            }
            Err(e) => error!("Failed to start {} session: {}", page, e),
        }
    }

    fn export_session(&self) {
        match self.session.recorder().export(self.config.output_dir.as_deref()) {
            Ok(Some(dir)) => info!("Session saved to {}", dir.display()),
            Ok(None) => {}
            Err(e) => warn!("Failed to export session: {}", e),
        }
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Pinch Quiz");
                ui.separator();

                let mut requested = None;
                for page in Page::ALL {
                    if ui
                        .selectable_label(self.session.page() == page, page.as_str())
                        .clicked()
                    {
                        requested = Some(page);
                    }
                }
                if let Some(page) = requested.filter(|p| *p != self.session.page()) {
                    self.navigate(page.as_str());
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("{:.0} fps", self.metrics.avg_fps));
                    ui.separator();
                    ui.label(format!("Thumbs up: {}", self.report.thumbs_up));
                    ui.label(format!("Pinching: {}", self.report.pinching));
                });
            });
        });
    }

    fn render_stage(&self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let stage = StageTransform::fit(ui.available_rect_before_wrap(), self.session.stage());
            let painter = ui.painter_at(stage.rect);
            let now = self.now_ms();

            paint::draw_frame(&painter, &stage, self.texture.as_ref(), &self.theme);

            match self.session.activity() {
                Activity::Home(gate) => self.paint_home(&painter, &stage, gate.elapsed_secs(now)),
                Activity::Quiz(quiz) => self.paint_quiz(&painter, &stage, quiz, now),
                Activity::Levels(levels) => {
                    if let Some(level) = levels.current_level() {
                        paint::draw_bound(&painter, &stage, &level.bound, &self.theme);
                        self.paint_banner(&painter, &stage, &format!("Move the pinch into {}", level.name));
                    }
                    self.paint_regions(&painter, &stage, levels, now, |region| region.id.to_string());
                }
                Activity::Ar(scene) => {
                    for model in scene.graph().models() {
                        paint::draw_model_proxy(&painter, &stage, model, &self.theme);
                    }
                    if let Some(pointer) = self.report.pointer {
                        let world = unproject_to_plane(pointer, self.session.stage(), &scene.config().camera);
                        if let Some(world) = world {
                            self.paint_banner(
                                &painter,
                                &stage,
                                &format!("Pinch at world ({:.2}, {:.2})", world.x, world.y),
                            );
                        }
                    }
                }
            }

            for hand in &self.hands {
                paint::draw_hand(&painter, &stage, hand);
            }

            let tracked = match self.report.pointer_side {
                Some(side) => self.hands.iter().find(|hand| hand.side == side),
                None => self.hands.first(),
            };
            if let Some(hand) = tracked {
                let tip = hand.index_tip();
                let pinching = self.session.classifier().is_pinching(hand);
                paint::draw_tracker_dot(&painter, stage.normalized_to_screen(tip.x, tip.y), pinching);
            }

            if let Some((message, since)) = &self.message {
                if now.saturating_sub(*since) < MESSAGE_MS {
                    painter.text(
                        stage.rect.center(),
                        egui::Align2::CENTER_CENTER,
                        message,
                        egui::FontId::proportional(48.0),
                        self.theme.text_primary,
                    );
                }
            }
        });
    }

    fn paint_home(&self, painter: &egui::Painter, stage: &StageTransform, held_secs: f64) {
        let hold = self.config.gestures.thumbs_up_hold_ms as f64 / 1000.0;
        let text = if held_secs > 0.0 {
            format!("Keep it up... {:.1} / {:.0} s", held_secs, hold)
        } else {
            format!("Hold a thumbs-up for {:.0} seconds to start", hold)
        };
        self.paint_banner(painter, stage, &text);
    }

    fn paint_quiz(&self, painter: &egui::Painter, stage: &StageTransform, quiz: &QuizProgress, now: u64) {
        let Some(question) = quiz.current_question() else {
            return;
        };
        self.paint_banner(
            painter,
            stage,
            &format!(
                "{}/{}  {}    Score: {}",
                quiz.index() + 1,
                quiz.len(),
                question.prompt,
                quiz.score()
            ),
        );
        self.paint_regions(painter, stage, quiz, now, |region| {
            match AnswerOption::from_region(&region.id) {
                Some(option) => format!("{}: {}", option, question.option_text(option)),
                None => region.id.to_string(),
            }
        });

        if let Some(kind) = quiz.feedback(now) {
            let (text, color) = match kind {
                FeedbackKind::Correct => ("Correct", self.theme.success),
                FeedbackKind::Incorrect => ("Incorrect", self.theme.error),
            };
            painter.text(
                stage.rect.center_bottom() - egui::vec2(0.0, 40.0),
                egui::Align2::CENTER_BOTTOM,
                text,
                egui::FontId::proportional(32.0),
                color,
            );
        }
    }

    fn paint_regions(
        &self,
        painter: &egui::Painter,
        stage: &StageTransform,
        progression: &dyn Progression,
        now: u64,
        label: impl Fn(&SelectionRegion) -> String,
    ) {
        let dwell = self.session.dwell();
        let progress = dwell.progress(now);
        for region in progression.regions().iter() {
            let fraction = progress
                .as_ref()
                .filter(|(id, _)| *id == region.id)
                .map(|(_, f)| *f);
            paint::draw_region(
                painter,
                stage,
                region,
                &label(region),
                dwell.style(&region.id),
                fraction,
                &self.theme,
            );
        }
    }

    fn paint_banner(&self, painter: &egui::Painter, stage: &StageTransform, text: &str) {
        let pos = stage.stage_to_screen(&Point2::new(self.session.stage().0 / 2.0, 80.0));
        painter.text(
            pos,
            egui::Align2::CENTER_CENTER,
            text,
            egui::FontId::proportional(30.0),
            self.theme.text_primary,
        );
    }
}

impl eframe::App for PinchQuizApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        if let Some(last) = self.last_frame.replace(now) {
            self.metrics.push(now.duration_since(last).as_secs_f32());
        }

        self.step(ctx);

        self.render_header(ctx);
        self.render_stage(ctx);

        // Frames are polled, so keep the loop running.
        ctx.request_repaint();
    }
}

impl Drop for PinchQuizApp {
    fn drop(&mut self) {
        self.export_session();
    }
}
