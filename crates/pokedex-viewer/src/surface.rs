//! Host surface the session camera renders into

use bevy::camera::Viewport;
use bevy::prelude::*;

/// Rectangle of the window, in physical pixels, owned by the viewer
///
/// The host keeps this up to date while the viewer is visible. Writes
/// should go through `set_if_neq` so an unchanged rectangle does not raise
/// a resize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Resource)]
pub struct ViewerSurface {
    pub position: UVec2,
    pub size: UVec2,
}

impl ViewerSurface {
    pub fn new(position: UVec2, size: UVec2) -> Self {
        Self { position, size }
    }

    /// A zero-sized surface cannot back a renderer
    pub fn is_drawable(&self) -> bool {
        self.size.x > 0 && self.size.y > 0
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.size.y == 0 {
            return 1.0;
        }
        self.size.x as f32 / self.size.y as f32
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            physical_position: self.position,
            physical_size: self.size,
            ..default()
        }
    }
}

/// Raised whenever the host changes [`ViewerSurface`]
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceResized {
    pub surface: ViewerSurface,
}

pub(crate) fn signal_surface_resize(
    surface: Res<ViewerSurface>,
    mut resized: MessageWriter<SurfaceResized>,
) {
    if surface.is_changed() && !surface.is_added() {
        resized.write(SurfaceResized { surface: *surface });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawable() {
        assert!(!ViewerSurface::default().is_drawable());
        assert!(!ViewerSurface::new(UVec2::ZERO, UVec2::new(640, 0)).is_drawable());
        assert!(ViewerSurface::new(UVec2::ZERO, UVec2::new(640, 480)).is_drawable());
    }

    #[test]
    fn test_aspect_and_viewport() {
        let surface = ViewerSurface::new(UVec2::new(100, 50), UVec2::new(800, 400));
        assert_eq!(surface.aspect_ratio(), 2.0);
        let viewport = surface.viewport();
        assert_eq!(viewport.physical_position, UVec2::new(100, 50));
        assert_eq!(viewport.physical_size, UVec2::new(800, 400));
        assert_eq!(ViewerSurface::default().aspect_ratio(), 1.0);
    }
}
