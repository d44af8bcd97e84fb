//! Bevy application setup

use bevy::prelude::*;
use bevy_egui::{EguiGlobalSettings, EguiPlugin, PrimaryEguiContext};
use bevy_picking::{prelude::MeshPickingPlugin, DefaultPickingPlugins};
use pokedex_core::{ApiEndpoints, NamedResource, Pager, PokedexConfig, Pokemon, TypeFilter};
use pokedex_viewer::{ModelCatalog, PokeViewerPlugin, ViewerSettings};
use std::collections::{HashMap, HashSet};

use crate::network::NetworkPlugin;
use crate::ui::UiPlugin;

/// Configuration compiled into the binary
pub const EMBEDDED_CONFIG: &str = include_str!("../pokedex.toml");

/// Page background behind every panel
pub const PAGE_BACKGROUND: Color = Color::srgb(0.07, 0.07, 0.11);

/// Render order of the camera that draws egui, above any viewer session
const UI_CAMERA_ORDER: isize = 10;

/// Map a configured level name to a tracing level
pub fn log_level(name: &str) -> tracing::Level {
    match name.trim().to_ascii_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::WARN,
    }
}

/// Listing, type filter and page cursor for the list view
#[derive(Debug, Clone, Resource)]
pub struct Catalog {
    pub endpoints: ApiEndpoints,
    pub filter: TypeFilter,
    pub pager: Pager,
}

impl Catalog {
    pub fn new(config: &PokedexConfig) -> Self {
        let endpoints = config.endpoints();
        Self {
            filter: TypeFilter::new(&endpoints),
            pager: Pager::new(config.list.per_page),
            endpoints,
        }
    }

    /// Entries of the filtered listing, empty until it has been fetched
    pub fn listing(&self) -> &[NamedResource] {
        self.filter.filtered().unwrap_or(&[])
    }

    /// Entries on the current page
    pub fn page(&self) -> &[NamedResource] {
        self.pager.slice(self.listing())
    }

    pub fn page_count(&self) -> usize {
        self.pager.page_count(self.listing().len())
    }
}

/// Pokémon shown in the detail panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Resource)]
pub struct SelectedPokemon(pub Option<u32>);

/// Fetched Pokémon records and outstanding requests
#[derive(Debug, Default, Resource)]
pub struct PokemonDetails {
    pub records: HashMap<u32, Pokemon>,
    pub pending: HashSet<u32>,
    pub failed: HashMap<u32, String>,
}

impl PokemonDetails {
    pub fn get(&self, id: u32) -> Option<&Pokemon> {
        self.records.get(&id)
    }

    /// Whether a fetch for `id` should be issued now
    pub fn needs_fetch(&self, id: u32) -> bool {
        !self.records.contains_key(&id)
            && !self.pending.contains(&id)
            && !self.failed.contains_key(&id)
    }
}

/// Viewer modal visibility and which Pokémon its session shows
#[derive(Debug, Clone, Copy, Default, Resource)]
pub struct ViewerModal {
    pub open: bool,
    /// Pokémon the current session was requested for
    pub showing: Option<u32>,
}

/// Progress and errors of PokeAPI requests, for the status line
#[derive(Debug, Clone, Default, Resource)]
pub struct ApiStatus {
    pub listing_loaded: bool,
    pub types_loaded: bool,
    pub loading_type: Option<String>,
    pub last_error: Option<String>,
}

fn setup_cameras(mut commands: Commands) {
    // Clears the window; viewer sessions render above it
    commands.spawn((
        Name::new("Backdrop camera"),
        Camera2d,
        Camera {
            order: -1,
            clear_color: ClearColorConfig::Custom(PAGE_BACKGROUND),
            ..default()
        },
    ));

    // Draws egui over everything, including the viewer viewport
    commands.spawn((
        Name::new("UI camera"),
        Camera2d,
        Camera {
            order: UI_CAMERA_ORDER,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        PrimaryEguiContext,
    ));
}

/// Run the Bevy application
pub fn run(config: PokedexConfig) {
    tracing::info!(
        api = %config.api.base_url,
        models = config.model_registry().len(),
        "Starting Pokédex"
    );

    App::new()
        .insert_resource(ClearColor(PAGE_BACKGROUND))
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Pokédex 3D".to_string(),
                        canvas: Some("#pokedex-canvas".to_string()),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: false,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    // Models are served next to the page under /models
                    file_path: "".to_string(),
                    // Don't look for .meta files - server doesn't have them
                    meta_check: bevy::asset::AssetMetaCheck::Never,
                    ..default()
                }),
        )
        // These must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        // The egui context lives on a dedicated camera, see setup_cameras
        .insert_resource(EguiGlobalSettings {
            auto_create_primary_context: false,
            ..default()
        })
        .insert_resource(ModelCatalog(config.model_registry()))
        .insert_resource(ViewerSettings(config.viewer.clone()))
        .insert_resource(Catalog::new(&config))
        .init_resource::<SelectedPokemon>()
        .init_resource::<PokemonDetails>()
        .init_resource::<ViewerModal>()
        .init_resource::<ApiStatus>()
        .add_plugins(PokeViewerPlugin)
        .add_plugins(NetworkPlugin)
        .add_plugins(UiPlugin)
        .add_systems(Startup, setup_cameras)
        .run();
}
