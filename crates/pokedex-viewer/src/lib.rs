//! Pokédex Viewer - 3D model viewer sessions
//!
//! A session renders one Pokémon's model into a rectangle of the host window.
//! The host publishes that rectangle as [`ViewerSurface`], asks for a session
//! with [`OpenViewer`] and dismisses it with [`CloseViewer`]. Everything a
//! session allocates is released on dismissal.

pub mod animation;
pub mod controls;
pub mod fit;
pub mod frame;
pub mod lighting;
pub mod loader;
pub mod session;
pub mod surface;

use bevy::prelude::*;
use pokedex_core::{ModelRegistry, ViewerConfig};

/// Plugin that sets up everything a viewer session needs
pub struct PokeViewerPlugin;

impl Plugin for PokeViewerPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(session::SessionLifecyclePlugin)
            .add_plugins(loader::ModelAssetsPlugin)
            .add_plugins(controls::OrbitControlsPlugin);
    }
}

/// Model table used to resolve Pokémon ids
#[derive(Debug, Clone, Default, Resource, Deref)]
pub struct ModelCatalog(pub ModelRegistry);

/// Camera, controller and background settings for new sessions
#[derive(Debug, Clone, Default, Resource, Deref)]
pub struct ViewerSettings(pub ViewerConfig);

/// Ordering of viewer systems within `Update`
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerSet {
    /// Pointer input feeding the orbit controllers
    Input,
    /// Open, close and resize handling
    Lifecycle,
    /// Asset requests, completions, normalization and animation start
    Load,
    /// Per-frame work for live sessions
    Frame,
}

pub use controls::{OrbitController, ViewportInput};
pub use loader::{LoadedModel, ModelLoadFinished, ModelRequest};
pub use session::{ActiveViewer, CloseViewer, OpenViewer, SessionId, TeardownStep, ViewerSession};
pub use surface::{SurfaceResized, ViewerSurface};
