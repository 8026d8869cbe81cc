// src/ui.rs - Theme and overlay painters
use eframe::egui::{self, Color32, Pos2, Rect, Stroke, Vec2};
use image::DynamicImage;
use nalgebra::Point2;

use pinch_quiz::dwell::RegionStyle;
use pinch_quiz::landmarks::{HandObservation, HandSide, HAND_CONNECTIONS};
use pinch_quiz::regions::{Bounds, SelectionRegion};
use pinch_quiz::scene::OverlayModel;

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color32,
    pub background: Color32,
    pub surface: Color32,
    pub error: Color32,
    pub warning: Color32,
    pub success: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color32::from_rgb(70, 130, 240),
            background: Color32::from_rgb(20, 20, 25),
            surface: Color32::from_rgb(30, 30, 35),
            error: Color32::from_rgb(244, 67, 54),
            warning: Color32::from_rgb(255, 152, 0),
            success: Color32::from_rgb(76, 175, 80),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

impl Theme {
    pub fn region_fill(&self, style: RegionStyle) -> Color32 {
        match style {
            RegionStyle::Neutral => {
                Color32::from_rgba_unmultiplied(self.surface.r(), self.surface.g(), self.surface.b(), 190)
            }
            RegionStyle::Selecting => Color32::from_rgba_unmultiplied(255, 152, 0, 170),
            RegionStyle::Selected => Color32::from_rgba_unmultiplied(76, 175, 80, 200),
        }
    }
}

pub fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(30, 30, 35);
    visuals.widgets.inactive.bg_fill = Color32::from_rgb(45, 45, 52);
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(55, 55, 65);
    visuals.widgets.active.bg_fill = Color32::from_rgb(70, 130, 240);

    visuals.widgets.noninteractive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.inactive.rounding = egui::Rounding::same(8.0);
    visuals.window_rounding = egui::Rounding::same(12.0);

    visuals
}

#[derive(Debug, Clone, Copy)]
pub struct StageTransform {
    pub rect: Rect,
    scale: f32,
}

impl StageTransform {
    pub fn fit(available: Rect, stage: (f64, f64)) -> Self {
        let (w, h) = (stage.0 as f32, stage.1 as f32);
        let scale = (available.width() / w).min(available.height() / h);
        let rect = Rect::from_center_size(available.center(), Vec2::new(w * scale, h * scale));
        Self { rect, scale }
    }

    pub fn stage_to_screen(&self, p: &Point2<f64>) -> Pos2 {
        Pos2::new(
            self.rect.left() + p.x as f32 * self.scale,
            self.rect.top() + p.y as f32 * self.scale,
        )
    }

    pub fn normalized_to_screen(&self, x: f64, y: f64) -> Pos2 {
        Pos2::new(
            self.rect.left() + x as f32 * self.rect.width(),
            self.rect.top() + y as f32 * self.rect.height(),
        )
    }

    pub fn bounds_to_screen(&self, bounds: &Bounds) -> Rect {
        Rect::from_min_max(
            self.stage_to_screen(&Point2::new(bounds.left[0], bounds.top[0])),
            self.stage_to_screen(&Point2::new(bounds.left[1], bounds.top[1])),
        )
    }
}

pub fn upload_frame(ctx: &egui::Context, texture: &mut Option<egui::TextureHandle>, frame: &DynamicImage) {
    let size = [frame.width() as usize, frame.height() as usize];
    let rgba = frame.to_rgba8();
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_flat_samples().as_slice());

    match texture {
        Some(handle) => handle.set(color_image, Default::default()),
        None => {
            *texture = Some(ctx.load_texture("camera_frame", color_image, Default::default()));
        }
    }
}

pub fn draw_frame(painter: &egui::Painter, stage: &StageTransform, texture: Option<&egui::TextureHandle>, theme: &Theme) {
    match texture {
        Some(texture) => {
            painter.image(
                texture.id(),
                stage.rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }
        None => {
            painter.rect_filled(stage.rect, egui::Rounding::same(4.0), theme.background);
            painter.text(
                stage.rect.center(),
                egui::Align2::CENTER_CENTER,
                "No Video Signal",
                egui::FontId::proportional(16.0),
                Color32::from_rgb(150, 150, 155),
            );
        }
    }
}

pub fn draw_hand(painter: &egui::Painter, stage: &StageTransform, hand: &HandObservation) {
    let (connector, point) = match hand.side {
        HandSide::Left => (Color32::from_rgb(128, 0, 128), Color32::from_rgb(255, 165, 0)),
        HandSide::Right => (Color32::from_rgb(255, 255, 0), Color32::BLACK),
    };
    let landmarks = hand.landmarks();

    // Draw connections
    for (from, to) in HAND_CONNECTIONS {
        let a = stage.normalized_to_screen(landmarks[from].x, landmarks[from].y);
        let b = stage.normalized_to_screen(landmarks[to].x, landmarks[to].y);
        painter.line_segment([a, b], Stroke::new(3.0, connector));
    }
    for landmark in landmarks {
        painter.circle_filled(stage.normalized_to_screen(landmark.x, landmark.y), 4.0, point);
    }
}

pub fn draw_region(
    painter: &egui::Painter,
    stage: &StageTransform,
    region: &SelectionRegion,
    label: &str,
    style: RegionStyle,
    progress: Option<f64>,
    theme: &Theme,
) {
    let rect = stage.bounds_to_screen(&region.bounds);
    painter.rect_filled(rect, egui::Rounding::same(8.0), theme.region_fill(style));
    painter.rect_stroke(rect, egui::Rounding::same(8.0), Stroke::new(2.0, theme.text_secondary));
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        label,
        egui::FontId::proportional(22.0),
        theme.text_primary,
    );

    // Dwell progress arc
    if let Some(fraction) = progress {
        let center = Pos2::new(rect.right() - 24.0, rect.top() + 24.0);
        let end = (fraction as f32) * std::f32::consts::TAU;
        draw_arc(painter, center, 14.0, -std::f32::consts::FRAC_PI_2, end - std::f32::consts::FRAC_PI_2, theme.text_primary, 4.0);
    }
}

pub fn draw_bound(painter: &egui::Painter, stage: &StageTransform, bounds: &Bounds, theme: &Theme) {
    painter.rect_stroke(
        stage.bounds_to_screen(bounds),
        egui::Rounding::same(4.0),
        Stroke::new(2.0, theme.warning),
    );
}

pub fn draw_tracker_dot(painter: &egui::Painter, pos: Pos2, pinching: bool) {
    let color = if pinching {
        Color32::from_rgb(0, 200, 0)
    } else {
        Color32::from_rgb(220, 0, 0)
    };
    painter.circle_filled(pos, 12.0, color);
    painter.circle_stroke(pos, 14.0, Stroke::new(2.0, Color32::WHITE));
}

pub fn draw_model_proxy(painter: &egui::Painter, stage: &StageTransform, model: &OverlayModel, theme: &Theme) {
    if !model.visible {
        return;
    }
    // Scene x/y in [-1, 1], y up.
    let center = stage.normalized_to_screen(model.position.x / 2.0 + 0.5, -model.position.y / 2.0 + 0.5);
    let length = (model.scale.x as f32 * stage.rect.width() * 4.0).clamp(12.0, 240.0);
    let angle = -(model.rotation.z as f32) - std::f32::consts::FRAC_PI_2;
    let tip = center + Vec2::new(angle.cos(), angle.sin()) * length;

    painter.line_segment([center, tip], Stroke::new(6.0, theme.primary));
    painter.circle_filled(center, 8.0, theme.primary);
    painter.text(
        tip + Vec2::new(0.0, -10.0),
        egui::Align2::CENTER_BOTTOM,
        &model.asset,
        egui::FontId::proportional(14.0),
        theme.text_primary,
    );
}

fn draw_arc(
    painter: &egui::Painter,
    center: Pos2,
    radius: f32,
    start_angle: f32,
    end_angle: f32,
    color: Color32,
    thickness: f32,
) {
    let points_count = (((end_angle - start_angle).abs() * 20.0) as usize).max(1);
    let points: Vec<Pos2> = (0..=points_count)
        .map(|i| {
            let t = i as f32 / points_count as f32;
            let angle = start_angle + (end_angle - start_angle) * t;
            Pos2::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect();

    painter.add(egui::Shape::line(points, Stroke::new(thickness, color)));
}
