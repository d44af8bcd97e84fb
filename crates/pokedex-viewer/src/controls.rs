//! Orbit camera controls

use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use pokedex_core::ViewerConfig;

use crate::ViewerSet;

/// Elevation limit, just short of straight up or down
const MAX_ELEVATION: f32 = 1.5;

pub struct OrbitControlsPlugin;

impl Plugin for OrbitControlsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewportInput>()
            .add_systems(Update, orbit_input.in_set(ViewerSet::Input));
    }
}

/// Whether the pointer is currently over the viewer viewport
///
/// Set by the host each frame; controllers ignore input otherwise.
#[derive(Debug, Clone, Copy, Default, Resource)]
pub struct ViewportInput {
    pub pointer_over: bool,
}

/// Damped orbit around a focus point, Y up
///
/// Input moves the `target_*` goals. [`OrbitController::integrate`] eases
/// the actual values toward them.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct OrbitController {
    pub azimuth: f32,
    pub elevation: f32,
    pub distance: f32,
    pub focus: Vec3,
    pub target_azimuth: f32,
    pub target_elevation: f32,
    pub target_distance: f32,
    pub target_focus: Vec3,
    pub damping: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub enable_pan: bool,
    pub enable_zoom: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
}

impl OrbitController {
    /// Controller whose camera sits at `position` looking at `focus`
    pub fn from_position(position: Vec3, focus: Vec3, config: &ViewerConfig) -> Self {
        let offset = position - focus;
        let distance = offset
            .length()
            .clamp(config.min_distance, config.max_distance);
        let elevation = if offset.length() > f32::EPSILON {
            (offset.y / offset.length())
                .asin()
                .clamp(-MAX_ELEVATION, MAX_ELEVATION)
        } else {
            0.0
        };
        let azimuth = offset.x.atan2(offset.z);

        Self {
            azimuth,
            elevation,
            distance,
            focus,
            target_azimuth: azimuth,
            target_elevation: elevation,
            target_distance: distance,
            target_focus: focus,
            damping: config.damping.clamp(0.0, 1.0),
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            enable_pan: config.enable_pan,
            enable_zoom: config.enable_zoom,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            pan_speed: 0.002,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::from_position(Vec3::from_array(config.camera_position), Vec3::ZERO, config)
    }

    /// Rotate by a pointer delta in pixels
    pub fn rotate(&mut self, delta: Vec2) {
        self.target_azimuth -= delta.x * self.rotate_speed;
        self.target_elevation = (self.target_elevation + delta.y * self.rotate_speed)
            .clamp(-MAX_ELEVATION, MAX_ELEVATION);
    }

    /// Move the focus in the camera plane by a pointer delta in pixels
    pub fn pan(&mut self, delta: Vec2) {
        if !self.enable_pan {
            return;
        }
        let right = Vec3::new(self.azimuth.cos(), 0.0, -self.azimuth.sin());
        let up = Vec3::Y;
        let speed = self.distance * self.pan_speed;
        self.target_focus += (-right * delta.x + up * delta.y) * speed;
    }

    /// Zoom by wheel lines; positive moves closer
    pub fn zoom(&mut self, scroll: f32) {
        if !self.enable_zoom {
            return;
        }
        let factor = (1.0 - scroll * self.zoom_speed).max(0.1);
        self.target_distance =
            (self.target_distance * factor).clamp(self.min_distance, self.max_distance);
    }

    /// Ease toward the goals; `damping` is the share of the remaining motion
    /// covered per 60 Hz frame
    pub fn integrate(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let factor = 1.0 - (1.0 - self.damping).powf(dt * 60.0);

        self.azimuth += (self.target_azimuth - self.azimuth) * factor;
        self.elevation += (self.target_elevation - self.elevation) * factor;
        self.distance += (self.target_distance - self.distance) * factor;
        self.focus += (self.target_focus - self.focus) * factor;

        self.elevation = self.elevation.clamp(-MAX_ELEVATION, MAX_ELEVATION);
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
    }

    pub fn position(&self) -> Vec3 {
        let horizontal = self.distance * self.elevation.cos();
        self.focus
            + Vec3::new(
                horizontal * self.azimuth.sin(),
                self.distance * self.elevation.sin(),
                horizontal * self.azimuth.cos(),
            )
    }

    pub fn camera_transform(&self) -> Transform {
        Transform::from_translation(self.position()).looking_at(self.focus, Vec3::Y)
    }
}

fn orbit_input(
    input: Res<ViewportInput>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut controllers: Query<&mut OrbitController>,
) {
    let mut motion = Vec2::ZERO;
    for event in mouse_motion.read() {
        motion += event.delta;
    }
    let mut scroll = 0.0;
    for event in mouse_wheel.read() {
        scroll += event.y;
    }

    if !input.pointer_over {
        return;
    }

    for mut controller in &mut controllers {
        if mouse_button.pressed(MouseButton::Left) {
            controller.rotate(motion);
        }
        if mouse_button.pressed(MouseButton::Right) {
            controller.pan(motion);
        }
        if scroll != 0.0 {
            controller.zoom(scroll);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> OrbitController {
        OrbitController::from_config(&ViewerConfig::default())
    }

    #[test]
    fn test_starts_at_configured_position() {
        let c = controller();
        assert!((c.position() - Vec3::new(0.0, 1.0, 5.0)).length() < 1e-4);
        assert!((c.distance - 26.0_f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_zoom_is_bounded() {
        let mut c = controller();
        for _ in 0..100 {
            c.zoom(3.0);
        }
        assert_eq!(c.target_distance, 2.0);
        for _ in 0..100 {
            c.zoom(-3.0);
        }
        assert_eq!(c.target_distance, 10.0);
    }

    #[test]
    fn test_integrate_converges() {
        let mut c = controller();
        c.zoom(-2.0);
        let goal = c.target_distance;
        let start = c.distance;

        c.integrate(1.0 / 60.0);
        // One 60 Hz frame covers `damping` of the gap
        let expected = start + (goal - start) * 0.05;
        assert!((c.distance - expected).abs() < 1e-4);

        for _ in 0..600 {
            c.integrate(1.0 / 60.0);
        }
        assert!((c.distance - goal).abs() < 1e-3);
    }

    #[test]
    fn test_zero_delta_does_not_move() {
        let mut c = controller();
        c.rotate(Vec2::new(200.0, 0.0));
        let before = c.clone();
        c.integrate(0.0);
        assert_eq!(c, before);
    }

    #[test]
    fn test_elevation_clamped() {
        let mut c = controller();
        c.rotate(Vec2::new(0.0, 10_000.0));
        assert_eq!(c.target_elevation, 1.5);
        c.rotate(Vec2::new(0.0, -100_000.0));
        assert_eq!(c.target_elevation, -1.5);
    }

    #[test]
    fn test_pan_and_zoom_can_be_disabled() {
        let config = ViewerConfig {
            enable_pan: false,
            enable_zoom: false,
            ..Default::default()
        };
        let mut c = OrbitController::from_config(&config);
        c.pan(Vec2::new(50.0, 50.0));
        c.zoom(1.0);
        assert_eq!(c.target_focus, Vec3::ZERO);
        assert_eq!(c.target_distance, c.distance);
    }
}
