// src/scene.rs - Mapping hand landmarks onto 3D model placements
use nalgebra::{Point2, Vector3};
use nalgebra_glm as glm;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::landmarks::{FrameObservations, HandObservation, HandSide};

pub type ModelHandle = usize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub asset: String,
    pub hand: HandSide,
    pub scale: [f64; 3],
    #[serde(default)]
    pub position: [f64; 3],
    #[serde(default)]
    pub rotation: [f64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveCamera {
    pub fov_deg: f64,
    pub near: f64,
    pub far: f64,
    pub position: [f64; 3],
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            fov_deg: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 0.0, 5.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub models: Vec<ModelSpec>,
    /// Multiplier applied to the negated palm depth.
    pub depth_scale: f64,
    /// Model scale per unit of thumb-to-index distance.
    pub scale_factor: f64,
    /// Added to the in-plane hand angle so the model's "up" follows the fingers.
    pub rotation_offset: f64,
    pub camera: PerspectiveCamera,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            models: vec![
                ModelSpec {
                    asset: "beer_bottle/scene.gltf".to_string(),
                    hand: HandSide::Right,
                    scale: [0.02, 0.02, 0.02],
                    position: [0.0, 0.0, 0.0],
                    rotation: [0.0, 0.0, 0.0],
                },
                ModelSpec {
                    asset: "birbs/scene.gltf".to_string(),
                    hand: HandSide::Left,
                    scale: [0.005, 0.005, 0.005],
                    position: [0.5, 0.0, 0.0],
                    rotation: [0.0, 0.0, 0.0],
                },
            ],
            depth_scale: 2.0,
            scale_factor: 0.1,
            rotation_offset: -std::f64::consts::FRAC_PI_2,
            camera: PerspectiveCamera::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPlacement {
    pub position: Vector3<f64>,
    /// Rotation around the depth axis only.
    pub rotation_z: f64,
    pub scale: f64,
}

/// Place a model on a hand: palm base gives the position, the palm-to-pinch
/// direction gives an in-plane rotation, and pinch width gives the scale.
///
/// This is a 2D proxy for hand pose. Tilt around x/y is not estimated.
pub fn place_on_hand(hand: &HandObservation, config: &SceneConfig) -> ModelPlacement {
    let palm = hand.wrist();
    let thumb = hand.thumb_tip();
    let index = hand.index_tip();

    // [0, 1] image space to [-1, 1], y up, depth towards the camera.
    let position = Vector3::new(
        (palm.x - 0.5) * 2.0,
        -(palm.y - 0.5) * 2.0,
        -palm.z * config.depth_scale,
    );

    let mid_x = (thumb.x + index.x) / 2.0;
    let mid_y = (thumb.y + index.y) / 2.0;
    let rotation_z = -(mid_y - palm.y).atan2(mid_x - palm.x) + config.rotation_offset;

    let spread = ((thumb.x - index.x).powi(2) + (thumb.y - index.y).powi(2)).sqrt();

    ModelPlacement {
        position,
        rotation_z,
        scale: spread * config.scale_factor,
    }
}

/// The 3D renderer. Setters on a handle that was never loaded are no-ops.
pub trait SceneGraph {
    fn load_model(&mut self, spec: &ModelSpec) -> Result<ModelHandle>;
    fn set_position(&mut self, handle: ModelHandle, position: Vector3<f64>);
    fn set_rotation(&mut self, handle: ModelHandle, rotation: Vector3<f64>);
    fn set_scale(&mut self, handle: ModelHandle, scale: Vector3<f64>);
    fn set_visible(&mut self, handle: ModelHandle, visible: bool);
    fn render(&mut self);
}

#[derive(Debug, Clone)]
pub struct Model3D {
    pub spec: ModelSpec,
    pub handle: ModelHandle,
    pub visible: bool,
    /// Placement computed this frame; cleared whenever the model is hidden.
    pub placement: Option<ModelPlacement>,
}

pub struct ArScene<G: SceneGraph> {
    graph: G,
    models: Vec<Model3D>,
    config: SceneConfig,
}

impl<G: SceneGraph> ArScene<G> {
    pub fn new(graph: G, config: SceneConfig) -> Self {
        Self {
            graph,
            models: Vec::new(),
            config,
        }
    }

    /// Load every model listed in the config.
    pub fn load_configured(&mut self) -> Result<()> {
        for spec in self.config.models.clone() {
            self.add_model(spec)?;
        }
        Ok(())
    }

    pub fn add_model(&mut self, spec: ModelSpec) -> Result<ModelHandle> {
        let handle = self.graph.load_model(&spec)?;
        self.graph
            .set_scale(handle, Vector3::from(spec.scale));
        self.graph
            .set_position(handle, Vector3::from(spec.position));
        self.graph
            .set_rotation(handle, Vector3::from(spec.rotation));
        self.graph.set_visible(handle, false);
        info!("Loaded model {} for {} hand", spec.asset, spec.hand);

        self.models.push(Model3D {
            spec,
            handle,
            visible: false,
            placement: None,
        });
        Ok(handle)
    }

    /// Show and snap each model to the first observed hand of its side; hide
    /// the rest. No smoothing, every frame starts from scratch.
    pub fn sync(&mut self, frame: &FrameObservations) {
        for model in &mut self.models {
            match frame.hand(model.spec.hand) {
                Some(hand) => {
                    let placement = place_on_hand(hand, &self.config);
                    self.graph.set_visible(model.handle, true);
                    self.graph.set_position(model.handle, placement.position);
                    self.graph.set_rotation(
                        model.handle,
                        Vector3::new(0.0, 0.0, placement.rotation_z),
                    );
                    self.graph.set_scale(
                        model.handle,
                        Vector3::repeat(placement.scale),
                    );
                    if !model.visible {
                        debug!("{} hand found, showing {}", model.spec.hand, model.spec.asset);
                    }
                    model.visible = true;
                    model.placement = Some(placement);
                }
                None => {
                    if model.visible {
                        debug!("{} hand lost, hiding {}", model.spec.hand, model.spec.asset);
                    }
                    self.graph.set_visible(model.handle, false);
                    model.visible = false;
                    model.placement = None;
                }
            }
        }
    }

    pub fn render(&mut self) {
        self.graph.render();
    }

    pub fn models(&self) -> &[Model3D] {
        &self.models
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }
}

/// Model state as last set through [`SceneGraph`], drawn by the overlay as 2D
/// proxies.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayModel {
    pub asset: String,
    pub position: Vector3<f64>,
    pub rotation: Vector3<f64>,
    pub scale: Vector3<f64>,
    pub visible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayScene {
    models: Vec<OverlayModel>,
    frames_rendered: u64,
}

impl OverlayScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn models(&self) -> &[OverlayModel] {
        &self.models
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

impl SceneGraph for OverlayScene {
    fn load_model(&mut self, spec: &ModelSpec) -> Result<ModelHandle> {
        self.models.push(OverlayModel {
            asset: spec.asset.clone(),
            position: Vector3::zeros(),
            rotation: Vector3::zeros(),
            scale: Vector3::repeat(1.0),
            visible: false,
        });
        Ok(self.models.len() - 1)
    }

    fn set_position(&mut self, handle: ModelHandle, position: Vector3<f64>) {
        if let Some(model) = self.models.get_mut(handle) {
            model.position = position;
        }
    }

    fn set_rotation(&mut self, handle: ModelHandle, rotation: Vector3<f64>) {
        if let Some(model) = self.models.get_mut(handle) {
            model.rotation = rotation;
        }
    }

    fn set_scale(&mut self, handle: ModelHandle, scale: Vector3<f64>) {
        if let Some(model) = self.models.get_mut(handle) {
            model.scale = scale;
        }
    }

    fn set_visible(&mut self, handle: ModelHandle, visible: bool) {
        if let Some(model) = self.models.get_mut(handle) {
            model.visible = visible;
        }
    }

    fn render(&mut self) {
        self.frames_rendered += 1;
    }
}

/// Cast a ray from the camera through a screen pixel and intersect it with
/// the `z = 0` world plane. `None` when the ray runs parallel to the plane.
pub fn unproject_to_plane(
    screen: Point2<f64>,
    viewport: (f64, f64),
    camera: &PerspectiveCamera,
) -> Option<Vector3<f64>> {
    let (width, height) = viewport;
    if width <= 0.0 || height <= 0.0 {
        return None;
    }

    let eye = glm::vec3(camera.position[0], camera.position[1], camera.position[2]);
    let view = glm::look_at(&eye, &glm::vec3(eye.x, eye.y, 0.0), &glm::vec3(0.0, 1.0, 0.0));
    let proj = glm::perspective(
        width / height,
        camera.fov_deg.to_radians(),
        camera.near,
        camera.far,
    );

    // Window y runs bottom-up in GL convention.
    let win = glm::vec3(screen.x, height - screen.y, 0.5);
    let on_ray = glm::unproject(&win, &view, &proj, glm::vec4(0.0, 0.0, width, height));

    let dir = (on_ray - eye).normalize();
    if dir.z.abs() < f64::EPSILON {
        return None;
    }
    let distance = -eye.z / dir.z;
    Some(eye + dir * distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{flat_hand, index};

    fn hand(side: HandSide, palm: [f64; 3], thumb: [f64; 2], tip: [f64; 2]) -> HandObservation {
        let mut hand = flat_hand(side);
        hand.set_landmark(index::WRIST, Vector3::from(palm));
        hand.set_landmark(index::THUMB_TIP, Vector3::new(thumb[0], thumb[1], 0.0));
        hand.set_landmark(index::INDEX_TIP, Vector3::new(tip[0], tip[1], 0.0));
        hand
    }

    #[test]
    fn palm_maps_to_symmetric_range() {
        let config = SceneConfig::default();
        let placement = place_on_hand(&hand(HandSide::Right, [0.75, 0.25, 0.1], [0.7, 0.1], [0.8, 0.1]), &config);
        assert!((placement.position.x - 0.5).abs() < 1e-12);
        assert!((placement.position.y - 0.5).abs() < 1e-12);
        assert!((placement.position.z + 0.2).abs() < 1e-12);
    }

    #[test]
    fn fingers_straight_up_give_zero_rotation() {
        let config = SceneConfig::default();
        // Pinch midpoint directly above the palm in image space.
        let placement = place_on_hand(&hand(HandSide::Right, [0.5, 0.8, 0.0], [0.45, 0.4], [0.55, 0.4]), &config);
        assert!(placement.rotation_z.abs() < 1e-12);
    }

    #[test]
    fn scale_follows_pinch_width() {
        let config = SceneConfig::default();
        let narrow = place_on_hand(&hand(HandSide::Right, [0.5, 0.8, 0.0], [0.45, 0.4], [0.55, 0.4]), &config);
        let wide = place_on_hand(&hand(HandSide::Right, [0.5, 0.8, 0.0], [0.35, 0.4], [0.65, 0.4]), &config);
        assert!((narrow.scale - 0.01).abs() < 1e-12);
        assert!((wide.scale - 0.03).abs() < 1e-12);
    }

    #[test]
    fn models_follow_their_own_hand() {
        let mut scene = ArScene::new(OverlayScene::new(), SceneConfig::default());
        scene.load_configured().unwrap();

        let right = hand(HandSide::Right, [0.2, 0.5, 0.0], [0.2, 0.3], [0.3, 0.3]);
        scene.sync(&FrameObservations::new(0, vec![right.clone()]));
        assert!(scene.graph().models()[0].visible);
        assert!(!scene.graph().models()[1].visible);

        scene.sync(&FrameObservations::new(1, vec![]));
        assert!(scene.models().iter().all(|m| !m.visible && m.placement.is_none()));

        // Re-entry uses fresh values, not what was shown before.
        let moved = hand(HandSide::Right, [0.9, 0.1, 0.0], [0.9, 0.05], [0.95, 0.05]);
        scene.sync(&FrameObservations::new(2, vec![moved.clone()]));
        let expected = place_on_hand(&moved, scene.config());
        assert_eq!(scene.models()[0].placement, Some(expected));
        assert_eq!(scene.graph().models()[0].position, expected.position);
    }

    #[test]
    fn extra_hands_of_other_side_are_ignored() {
        let mut scene = ArScene::new(OverlayScene::new(), SceneConfig::default());
        scene.load_configured().unwrap();
        let left = hand(HandSide::Left, [0.5, 0.5, 0.0], [0.4, 0.3], [0.5, 0.3]);
        scene.sync(&FrameObservations::new(0, vec![left.clone(), left.clone(), left]));
        assert!(!scene.models()[0].visible);
        assert!(scene.models()[1].visible);
        scene.render();
        assert_eq!(scene.graph().frames_rendered(), 1);
    }

    #[test]
    fn screen_center_unprojects_to_origin() {
        let camera = PerspectiveCamera::default();
        let point = unproject_to_plane(Point2::new(960.0, 540.0), (1920.0, 1080.0), &camera).unwrap();
        assert!(point.norm() < 1e-9);

        let right = unproject_to_plane(Point2::new(1920.0, 540.0), (1920.0, 1080.0), &camera).unwrap();
        assert!(right.x > 0.0);
        assert!(right.y.abs() < 1e-9);
        assert!(right.z.abs() < 1e-9);
    }
}
