//! Asset loading for viewer sessions

use bevy::asset::LoadState;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use pokedex_core::{Liveness, ViewerError};
use thiserror::Error;

use crate::animation::{start_animations, PendingAnimations};
use crate::fit::{fit_loaded_models, PendingFit};
use crate::session::{SessionId, ViewerSession};
use crate::ViewerSet;

pub struct ModelAssetsPlugin;

impl Plugin for ModelAssetsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (request_model_assets, poll_model_loads)
                .chain()
                .in_set(ViewerSet::Load)
                .before(apply_model_loads),
        )
        .add_systems(
            Update,
            (fit_loaded_models, start_animations)
                .in_set(ViewerSet::Load)
                .after(apply_model_loads),
        );
    }
}

/// Asset a session is waiting for, inserted on the session root
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub path: String,
}

/// What a successful load hands to the session
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub scene: Handle<Scene>,
    pub clips: Vec<Handle<AnimationClip>>,
}

/// Completion of a session's single load attempt
#[derive(Message, Debug, Clone)]
pub struct ModelLoadFinished {
    pub session: SessionId,
    pub root: Entity,
    /// Liveness of the session when the load was issued
    pub liveness: Liveness,
    pub path: String,
    pub outcome: Result<LoadedModel, ModelLoadError>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelLoadError {
    #[error("asset server reported: {0}")]
    Asset(String),
    #[error("glTF file contains no scenes")]
    NoScene,
}

impl ModelLoadError {
    pub fn into_viewer_error(self, path: &str) -> ViewerError {
        ViewerError::LoadFailed {
            path: path.to_string(),
            reason: self.to_string(),
        }
    }
}

/// Start loading for sessions that just recorded a request
fn request_model_assets(
    asset_server: Res<AssetServer>,
    mut sessions: Query<(&mut ViewerSession, &ModelRequest), Added<ModelRequest>>,
) {
    for (mut session, request) in &mut sessions {
        tracing::info!(
            session = %session.id(),
            pokemon_id = session.pokemon_id(),
            path = %request.path,
            "Loading 3D model"
        );
        let handle: Handle<Gltf> = asset_server.load(&request.path);
        session.attach_asset(handle);
    }
}

/// Check load state of requested assets and report terminal outcomes
fn poll_model_loads(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
    sessions: Query<(Entity, &ViewerSession, &ModelRequest)>,
    mut finished: MessageWriter<ModelLoadFinished>,
) {
    for (root, session, request) in &sessions {
        let Some(handle) = session.asset() else {
            continue;
        };

        let outcome = match asset_server.get_load_state(handle.id()) {
            Some(LoadState::Loaded) => match gltf_assets.get(handle) {
                Some(gltf) => {
                    let scene = gltf
                        .default_scene
                        .clone()
                        .or_else(|| gltf.scenes.first().cloned());
                    match scene {
                        Some(scene) => Ok(LoadedModel {
                            scene,
                            clips: gltf.animations.clone(),
                        }),
                        None => Err(ModelLoadError::NoScene),
                    }
                }
                // Reported loaded but not yet in the asset collection
                None => continue,
            },
            Some(LoadState::Failed(err)) => Err(ModelLoadError::Asset(err.to_string())),
            state => {
                tracing::trace!(session = %session.id(), ?state, "Model still loading");
                continue;
            }
        };

        finished.write(ModelLoadFinished {
            session: session.id(),
            root,
            liveness: session.liveness().clone(),
            path: request.path.clone(),
            outcome,
        });
        commands.entity(root).remove::<ModelRequest>();
    }
}

/// Apply load completions to the sessions that issued them
///
/// Completions for sessions that have been torn down or replaced are dropped.
pub(crate) fn apply_model_loads(
    mut commands: Commands,
    mut finished: MessageReader<ModelLoadFinished>,
    mut sessions: Query<&mut ViewerSession>,
) {
    for msg in finished.read() {
        if !msg.liveness.is_alive() {
            tracing::debug!(session = %msg.session, "Dropping load completion for closed session");
            continue;
        }
        let Ok(mut session) = sessions.get_mut(msg.root) else {
            tracing::debug!(session = %msg.session, "Dropping load completion for missing session");
            continue;
        };
        if session.id() != msg.session {
            tracing::debug!(session = %msg.session, "Dropping load completion for replaced session");
            continue;
        }

        match &msg.outcome {
            Ok(loaded) => {
                let mut model = commands.spawn((
                    Name::new(format!("Pokémon #{} model", session.pokemon_id())),
                    SceneRoot(loaded.scene.clone()),
                    Transform::default(),
                    PendingFit,
                    ChildOf(msg.root),
                ));
                if !loaded.clips.is_empty() {
                    model.insert(PendingAnimations {
                        clips: loaded.clips.clone(),
                    });
                }
                let model = model.id();

                if let Err(e) = session.model_ready(model) {
                    tracing::warn!(session = %msg.session, "Ignoring load completion: {}", e);
                    commands.entity(model).despawn();
                    continue;
                }
                tracing::info!(
                    session = %msg.session,
                    path = %msg.path,
                    channels = loaded.clips.len(),
                    "3D model ready"
                );
            }
            Err(err) => {
                tracing::error!(
                    session = %msg.session,
                    path = %msg.path,
                    "Error loading 3D model: {}",
                    err
                );
                let error = err.clone().into_viewer_error(&msg.path);
                if let Err(e) = session.model_failed(error) {
                    tracing::warn!(session = %msg.session, "Ignoring load failure: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_maps_to_viewer_error() {
        let err = ModelLoadError::Asset("404 Not Found".into()).into_viewer_error("models/pikachu.glb");
        match &err {
            ViewerError::LoadFailed { path, reason } => {
                assert_eq!(path, "models/pikachu.glb");
                assert!(reason.contains("404"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(err.user_message(), "Error loading the 3D model");
    }
}
