//! Viewer session lifecycle
//!
//! A session is a single [`ViewerSession`] component on a root entity. The
//! component owns every handle the session allocates: the camera entity
//! (the renderer, bound to the host surface), the light rig and model under
//! the root, the glTF and animation-graph handles, and the frame ticket.
//! Teardown releases all of it in a fixed order and is safe to repeat.

use bevy::gltf::Gltf;
use bevy::prelude::*;
use pokedex_core::{Liveness, SessionState, SessionStatus, TransitionError, ViewerError};
use std::fmt;

use crate::animation::AnimationDriver;
use crate::controls::OrbitController;
use crate::frame::{drive_frames, FrameClock, FrameTicket};
use crate::lighting;
use crate::loader::{apply_model_loads, ModelLoadFinished, ModelRequest};
use crate::surface::{signal_surface_resize, SurfaceResized, ViewerSurface};
use crate::{ModelCatalog, ViewerSet, ViewerSettings};

pub struct SessionLifecyclePlugin;

impl Plugin for SessionLifecyclePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ModelCatalog>()
            .init_resource::<ViewerSettings>()
            .init_resource::<ViewerSurface>()
            .init_resource::<ActiveViewer>()
            .add_message::<OpenViewer>()
            .add_message::<CloseViewer>()
            .add_message::<SurfaceResized>()
            .add_message::<ModelLoadFinished>()
            .configure_sets(
                Update,
                (
                    ViewerSet::Input,
                    ViewerSet::Lifecycle,
                    ViewerSet::Load,
                    ViewerSet::Frame,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    close_sessions,
                    open_sessions,
                    signal_surface_resize,
                    apply_surface_resize,
                )
                    .chain()
                    .in_set(ViewerSet::Lifecycle),
            )
            .add_systems(Update, apply_model_loads.in_set(ViewerSet::Load))
            .add_systems(Update, drive_frames.in_set(ViewerSet::Frame));
    }
}

/// Request a session for a Pokémon, replacing any open one
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenViewer {
    pub pokemon_id: u32,
}

/// Tear down the open session, if any
#[derive(Message, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseViewer;

/// Unique per session, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The mounted session, as seen by the host
#[derive(Debug, Default, Resource)]
pub struct ActiveViewer {
    session: Option<Entity>,
    rejected: Option<ViewerError>,
    next_id: u64,
}

impl ActiveViewer {
    /// Root entity of the mounted session
    pub fn session(&self) -> Option<Entity> {
        self.session
    }

    /// Why the last open request was refused, if it was
    pub fn rejected(&self) -> Option<&ViewerError> {
        self.rejected.as_ref()
    }

    fn allocate_id(&mut self) -> SessionId {
        self.next_id += 1;
        SessionId(self.next_id)
    }
}

/// Teardown steps, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    UnsubscribeResize,
    CancelFrames,
    DisposeControls,
    DetachSurface,
    ReleaseRenderer,
    ClearScene,
}

/// One interactive render of one Pokémon's model
#[derive(Component, Debug)]
pub struct ViewerSession {
    id: SessionId,
    pokemon_id: u32,
    root: Entity,
    status: SessionStatus,
    liveness: Liveness,
    ticket: FrameTicket,
    clock: FrameClock,
    frames_rendered: u64,
    surface: ViewerSurface,
    resize_subscribed: bool,
    camera: Option<Entity>,
    controls_attached: bool,
    surface_attached: bool,
    scene_live: bool,
    asset: Option<Handle<Gltf>>,
    model: Option<Entity>,
    animation: Option<AnimationDriver>,
}

impl ViewerSession {
    fn new(id: SessionId, pokemon_id: u32, root: Entity, surface: ViewerSurface) -> Self {
        Self {
            id,
            pokemon_id,
            root,
            status: SessionStatus::new(),
            liveness: Liveness::new(),
            ticket: FrameTicket::new(),
            clock: FrameClock::default(),
            frames_rendered: 0,
            surface,
            resize_subscribed: false,
            camera: None,
            controls_attached: false,
            surface_attached: false,
            scene_live: true,
            asset: None,
            model: None,
            animation: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn pokemon_id(&self) -> u32 {
        self.pokemon_id
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn state(&self) -> SessionState {
        self.status.state()
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    pub fn ticket(&self) -> &FrameTicket {
        &self.ticket
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Frames driven since construction
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn surface(&self) -> ViewerSurface {
        self.surface
    }

    pub fn is_resize_subscribed(&self) -> bool {
        self.resize_subscribed
    }

    pub fn camera(&self) -> Option<Entity> {
        self.camera
    }

    pub fn asset(&self) -> Option<&Handle<Gltf>> {
        self.asset.as_ref()
    }

    pub fn model(&self) -> Option<Entity> {
        self.model
    }

    pub fn animation(&self) -> Option<&AnimationDriver> {
        self.animation.as_ref()
    }

    pub(crate) fn record_frame(&mut self, dt: f32) {
        self.clock.tick(dt);
        self.frames_rendered += 1;
    }

    pub(crate) fn attach_asset(&mut self, handle: Handle<Gltf>) {
        self.asset = Some(handle);
    }

    pub(crate) fn attach_animation(&mut self, driver: AnimationDriver) {
        self.animation = Some(driver);
    }

    pub(crate) fn model_ready(&mut self, model: Entity) -> Result<(), TransitionError> {
        self.status.mark_ready()?;
        self.model = Some(model);
        Ok(())
    }

    pub(crate) fn model_failed(&mut self, error: ViewerError) -> Result<(), TransitionError> {
        self.status.mark_failed(error)
    }

    /// Release everything the session owns
    ///
    /// Liveness is revoked first so late callbacks see a dead session. Each
    /// step is skipped if its resource is already gone; the returned list
    /// names the steps that did something. A second call returns nothing.
    pub fn teardown(
        &mut self,
        commands: &mut Commands,
        cameras: &mut Query<&mut Camera>,
        players: &mut Query<&mut AnimationPlayer>,
    ) -> Vec<TeardownStep> {
        let mut steps = Vec::new();
        self.liveness.revoke();

        if self.resize_subscribed {
            self.resize_subscribed = false;
            steps.push(TeardownStep::UnsubscribeResize);
        }

        if self.ticket.cancel() {
            if let Some(driver) = &self.animation {
                if let Ok(mut player) = players.get_mut(driver.player) {
                    player.pause_all();
                }
            }
            steps.push(TeardownStep::CancelFrames);
        }

        if self.controls_attached {
            self.controls_attached = false;
            if let Some(camera) = self.camera {
                if let Ok(mut entity) = commands.get_entity(camera) {
                    entity.remove::<OrbitController>();
                }
            }
            steps.push(TeardownStep::DisposeControls);
        }

        if self.surface_attached {
            self.surface_attached = false;
            if let Some(camera) = self.camera {
                if let Ok(mut camera) = cameras.get_mut(camera) {
                    camera.is_active = false;
                    camera.viewport = None;
                }
            }
            steps.push(TeardownStep::DetachSurface);
        }

        if let Some(camera) = self.camera.take() {
            if let Ok(mut entity) = commands.get_entity(camera) {
                entity.despawn();
            }
            steps.push(TeardownStep::ReleaseRenderer);
        }

        if self.scene_live {
            self.scene_live = false;
            self.animation = None;
            self.model = None;
            self.asset = None;
            if let Ok(mut root) = commands.get_entity(self.root) {
                root.despawn();
            }
            steps.push(TeardownStep::ClearScene);
        }

        if self.status.destroy() {
            tracing::info!(
                session = %self.id,
                pokemon_id = self.pokemon_id,
                frames = self.frames_rendered,
                "Viewer session torn down"
            );
        }

        steps
    }
}

fn teardown_all(
    commands: &mut Commands,
    active: &mut ActiveViewer,
    sessions: &mut Query<&mut ViewerSession>,
    cameras: &mut Query<&mut Camera>,
    players: &mut Query<&mut AnimationPlayer>,
) {
    for mut session in sessions.iter_mut() {
        let steps = session.teardown(commands, cameras, players);
        if !steps.is_empty() {
            tracing::debug!(session = %session.id(), ?steps, "Teardown steps");
        }
    }
    active.session = None;
}

fn close_sessions(
    mut commands: Commands,
    mut requests: MessageReader<CloseViewer>,
    mut active: ResMut<ActiveViewer>,
    mut sessions: Query<&mut ViewerSession>,
    mut cameras: Query<&mut Camera>,
    mut players: Query<&mut AnimationPlayer>,
) {
    if requests.read().count() == 0 {
        return;
    }
    active.rejected = None;
    teardown_all(
        &mut commands,
        &mut active,
        &mut sessions,
        &mut cameras,
        &mut players,
    );
}

#[allow(clippy::too_many_arguments)]
fn open_sessions(
    mut commands: Commands,
    mut requests: MessageReader<OpenViewer>,
    mut active: ResMut<ActiveViewer>,
    surface: Res<ViewerSurface>,
    catalog: Res<ModelCatalog>,
    settings: Res<ViewerSettings>,
    mut sessions: Query<&mut ViewerSession>,
    mut cameras: Query<&mut Camera>,
    mut players: Query<&mut AnimationPlayer>,
) {
    // Only the latest request of a frame matters; earlier ones would be
    // replaced immediately
    let Some(request) = requests.read().last().copied() else {
        return;
    };

    teardown_all(
        &mut commands,
        &mut active,
        &mut sessions,
        &mut cameras,
        &mut players,
    );

    if !surface.is_drawable() {
        let error = ViewerError::SurfaceNotDrawable {
            width: surface.size.x,
            height: surface.size.y,
        };
        tracing::error!(pokemon_id = request.pokemon_id, "Refusing to open viewer: {}", error);
        active.rejected = Some(error);
        return;
    }
    active.rejected = None;

    let id = active.allocate_id();
    let root = commands.spawn_empty().id();
    let mut session = ViewerSession::new(id, request.pokemon_id, root, *surface);

    let controller = OrbitController::from_config(&settings);
    let [r, g, b] = settings.background;
    let camera = commands
        .spawn((
            Name::new(format!("Viewer camera {}", id)),
            Camera3d::default(),
            Camera {
                order: settings.session_camera_order,
                viewport: Some(surface.viewport()),
                clear_color: ClearColorConfig::Custom(Color::srgb_u8(r, g, b)),
                ..default()
            },
            Projection::Perspective(PerspectiveProjection {
                fov: settings.fov_degrees.to_radians(),
                aspect_ratio: surface.aspect_ratio(),
                near: settings.near,
                far: settings.far,
            }),
            controller.camera_transform(),
            controller,
            lighting::ambient_light(),
        ))
        .id();
    session.camera = Some(camera);
    session.controls_attached = true;
    session.surface_attached = true;
    session.resize_subscribed = true;

    lighting::spawn_light_rig(&mut commands, root);

    let model_path = catalog.model_path(request.pokemon_id).map(str::to_string);
    let mut root_commands = commands.entity(root);
    root_commands.insert((
        Name::new(format!("Viewer session {}", id)),
        Transform::default(),
        Visibility::default(),
    ));

    match model_path {
        Some(path) => {
            if let Err(e) = session.status.begin_loading() {
                tracing::warn!(session = %id, "{}", e);
            }
            root_commands.insert(ModelRequest { path });
        }
        None => {
            if let Err(e) = session.status.mark_unavailable(request.pokemon_id) {
                tracing::warn!(session = %id, "{}", e);
            }
            tracing::info!(
                session = %id,
                pokemon_id = request.pokemon_id,
                "No 3D model registered"
            );
        }
    }

    root_commands.insert(session);
    active.session = Some(root);
    tracing::info!(session = %id, pokemon_id = request.pokemon_id, "Viewer session opened");
}

fn apply_surface_resize(
    mut resized: MessageReader<SurfaceResized>,
    mut sessions: Query<&mut ViewerSession>,
    mut cameras: Query<(&mut Camera, &mut Projection)>,
) {
    let Some(latest) = resized.read().last().copied() else {
        return;
    };
    let surface = latest.surface;

    for mut session in &mut sessions {
        if !session.resize_subscribed {
            continue;
        }
        if !surface.is_drawable() {
            tracing::debug!(session = %session.id(), "Ignoring resize to an empty surface");
            continue;
        }
        session.surface = surface;

        let Some(camera) = session.camera else {
            continue;
        };
        if let Ok((mut camera, mut projection)) = cameras.get_mut(camera) {
            if let Projection::Perspective(perspective) = projection.as_mut() {
                perspective.aspect_ratio = surface.aspect_ratio();
            }
            camera.viewport = Some(surface.viewport());
        }
    }
}
