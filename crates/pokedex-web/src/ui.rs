//! UI overlays using bevy_egui

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use pokedex_core::{NamedResource, Pokemon, Route, SessionStatus, ViewerError};
use pokedex_viewer::{
    ActiveViewer, CloseViewer, OpenViewer, ViewerSession, ViewerSurface, ViewportInput,
};

use crate::app::{ApiStatus, Catalog, PokemonDetails, SelectedPokemon, ViewerModal};
use crate::network::{fetch_type_members, PendingApi};

const VIEWER_HINT: &str = "Use the mouse to rotate, zoom and pan the camera.";
const LOADING_MODEL: &str = "Loading 3D model...";

/// Highest base stat, for scaling the stat bars
const MAX_BASE_STAT: f32 = 255.0;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HashRoute>()
            .add_systems(Update, (read_hash_route, write_hash_route).chain())
            // Main UI system runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
            .add_systems(EguiPrimaryContextPass, ui_system);
    }
}

/// Route last read from or written to the location hash
#[derive(Debug, Default, Resource)]
struct HashRoute(Option<Route>);

#[cfg(target_arch = "wasm32")]
fn current_hash() -> Option<String> {
    web_sys::window().and_then(|w| w.location().hash().ok())
}

#[cfg(not(target_arch = "wasm32"))]
fn current_hash() -> Option<String> {
    None
}

#[cfg(target_arch = "wasm32")]
fn set_hash(hash: &str) {
    if let Some(window) = web_sys::window() {
        if let Err(e) = window.location().set_hash(hash) {
            tracing::warn!("Failed to update location hash: {:?}", e);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn set_hash(_hash: &str) {}

/// Follow navigation (initial URL, back and forward) into the selection
fn read_hash_route(mut last: ResMut<HashRoute>, mut selected: ResMut<SelectedPokemon>) {
    let Some(hash) = current_hash() else {
        return;
    };
    let route = Route::parse(&hash);
    if last.0 == Some(route) {
        return;
    }
    tracing::debug!("Route changed to {}", route);
    last.0 = Some(route);
    selected.set_if_neq(SelectedPokemon(route.pokemon_id()));
}

/// Mirror selection changes made in the UI into the location hash
fn write_hash_route(mut last: ResMut<HashRoute>, selected: Res<SelectedPokemon>) {
    if !selected.is_changed() {
        return;
    }
    let route = match selected.0 {
        Some(id) => Route::Detail(id),
        None => Route::Home,
    };
    if last.0 == Some(route) {
        return;
    }
    last.0 = Some(route);
    set_hash(&route.to_hash());
}

/// Everything the UI needs to host a viewer session
#[derive(SystemParam)]
struct ViewerHost<'w, 's> {
    surface: ResMut<'w, ViewerSurface>,
    input: ResMut<'w, ViewportInput>,
    active: Res<'w, ActiveViewer>,
    sessions: Query<'w, 's, &'static ViewerSession>,
    windows: Query<'w, 's, &'static Window, With<PrimaryWindow>>,
    open: MessageWriter<'w, OpenViewer>,
    close: MessageWriter<'w, CloseViewer>,
}

#[allow(clippy::too_many_arguments)]
fn ui_system(
    mut contexts: EguiContexts,
    mut catalog: ResMut<Catalog>,
    mut selected: ResMut<SelectedPokemon>,
    details: Res<PokemonDetails>,
    mut status: ResMut<ApiStatus>,
    pending: Res<PendingApi>,
    mut modal: ResMut<ViewerModal>,
    mut viewer: ViewerHost,
) {
    // Get the egui context - early return if not available
    let Ok(ctx) = contexts.ctx_mut() else { return };

    if modal.open {
        match selected.0 {
            Some(id) => draw_viewer_modal(ctx, id, &details, &mut modal, &mut viewer),
            None => close_viewer(&mut modal, &mut viewer),
        }
        return;
    }
    viewer.input.pointer_over = false;

    egui::SidePanel::left("catalog_panel")
        .default_width(320.0)
        .resizable(true)
        .show(ctx, |ui| {
            if let Some(id) = draw_catalog_panel(ui, &mut catalog, selected.0, &mut status, &pending) {
                selected.set_if_neq(SelectedPokemon(Some(id)));
            }
        });

    egui::CentralPanel::default().show(ctx, |ui| {
        let Some(id) = selected.0 else {
            ui.centered_and_justified(|ui| {
                ui.label("Select a Pokémon to see its details");
            });
            return;
        };

        if let Some(pokemon) = details.get(id) {
            egui::ScrollArea::vertical().show(ui, |ui| {
                if draw_detail(ui, pokemon) {
                    tracing::info!(pokemon_id = id, "Summoning 3D model");
                    modal.open = true;
                    modal.showing = None;
                }
            });
        } else if let Some(error) = details.failed.get(&id) {
            ui.colored_label(
                egui::Color32::from_rgb(230, 80, 80),
                format!("Could not load Pokémon {}: {}", format_number(id), error),
            );
        } else {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(format!("Loading {}...", format_number(id)));
            });
        }
    });
}

/// Draw filter, pagination and cards; returns the card clicked, if any
fn draw_catalog_panel(
    ui: &mut egui::Ui,
    catalog: &mut Catalog,
    selected: Option<u32>,
    status: &mut ApiStatus,
    pending: &PendingApi,
) -> Option<u32> {
    ui.heading("Pokédex");
    ui.separator();

    // Type filter
    let mut chosen: Option<NamedResource> = None;
    let current = catalog.filter.selected().name.clone();
    egui::ComboBox::from_label("Type")
        .selected_text(display_name(&current))
        .show_ui(ui, |ui| {
            for category in catalog.filter.types() {
                let is_current = category.name == current;
                if ui
                    .selectable_label(is_current, display_name(&category.name))
                    .clicked()
                    && !is_current
                {
                    chosen = Some(category.clone());
                }
            }
        });

    if let Some(category) = chosen {
        catalog.pager.reset();
        match catalog.filter.select(category) {
            Some(query) => {
                status.loading_type = Some(query.type_name.clone());
                fetch_type_members(pending, query);
            }
            None => status.loading_type = None,
        }
    }

    // Status line
    if !status.listing_loaded {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Loading Pokémon...");
        });
    } else if let Some(type_name) = &status.loading_type {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label(format!("Loading {} Pokémon...", display_name(type_name)));
        });
    } else {
        ui.label(format!("{} Pokémon", catalog.listing().len()));
    }
    if let Some(error) = &status.last_error {
        ui.colored_label(egui::Color32::from_rgb(230, 80, 80), error);
    }

    ui.separator();

    // Pagination
    let total = catalog.listing().len();
    let page = catalog.pager.page();
    let page_count = catalog.page_count();
    let mut previous = false;
    let mut next = false;
    ui.horizontal(|ui| {
        previous = ui
            .add_enabled(page > 1, egui::Button::new("◀ Previous"))
            .clicked();
        ui.label(format!("Page {} of {}", page, page_count));
        next = ui
            .add_enabled(page < page_count, egui::Button::new("Next ▶"))
            .clicked();
    });

    ui.separator();

    // Cards
    let mut clicked = None;
    egui::ScrollArea::vertical().show(ui, |ui| {
        ui.horizontal_wrapped(|ui| {
            for entry in catalog.page() {
                let Some(id) = entry.pokemon_id() else {
                    continue;
                };
                let text = format!("{}\n{}", format_number(id), display_name(&entry.name));
                let card = egui::Button::new(text)
                    .min_size(egui::vec2(136.0, 48.0))
                    .selected(selected == Some(id));
                if ui.add(card).clicked() {
                    clicked = Some(id);
                }
            }
        });
    });

    if previous {
        catalog.pager.previous();
    }
    if next {
        catalog.pager.next(total);
    }
    clicked
}

/// Draw the detail view; returns whether "Summon 3D model" was clicked
fn draw_detail(ui: &mut egui::Ui, pokemon: &Pokemon) -> bool {
    let accent = pokemon
        .primary_type()
        .map(type_color)
        .unwrap_or(egui::Color32::GRAY);

    ui.horizontal(|ui| {
        ui.heading(egui::RichText::new(display_name(&pokemon.name)).strong().size(28.0));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(egui::RichText::new(format_number(pokemon.id)).size(20.0));
        });
    });

    if let Some(url) = pokemon.artwork_url() {
        ui.hyperlink_to("Artwork", url);
    }

    // Type chips
    ui.horizontal(|ui| {
        for t in &pokemon.types {
            egui::Frame::new()
                .fill(type_color(&t.kind.name))
                .corner_radius(10.0)
                .inner_margin(egui::Margin::symmetric(10, 3))
                .show(ui, |ui| {
                    ui.label(
                        egui::RichText::new(display_name(&t.kind.name))
                            .color(egui::Color32::WHITE)
                            .strong(),
                    );
                });
        }
    });

    ui.add_space(8.0);
    ui.label(egui::RichText::new("About").color(accent).strong().size(18.0));
    egui::Grid::new("about_grid")
        .num_columns(2)
        .spacing([24.0, 4.0])
        .show(ui, |ui| {
            ui.label("Height");
            ui.label(format!("{:.1} m", pokemon.height_m()));
            ui.end_row();

            ui.label("Weight");
            ui.label(format!("{:.1} kg", pokemon.weight_kg()));
            ui.end_row();

            ui.label("Abilities");
            let abilities: Vec<String> = pokemon
                .abilities
                .iter()
                .map(|a| {
                    if a.is_hidden {
                        format!("{} (hidden)", display_name(&a.ability.name))
                    } else {
                        display_name(&a.ability.name)
                    }
                })
                .collect();
            ui.label(abilities.join(", "));
            ui.end_row();

            if let Some(experience) = pokemon.base_experience {
                ui.label("Base experience");
                ui.label(experience.to_string());
                ui.end_row();
            }
        });

    ui.add_space(8.0);
    ui.label(egui::RichText::new("Base Stats").color(accent).strong().size(18.0));
    egui::Grid::new("stats_grid")
        .num_columns(3)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            for stat in &pokemon.stats {
                ui.label(egui::RichText::new(stat_label(&stat.stat.name)).strong());
                ui.label(format!("{:03}", stat.base_stat));
                ui.add(
                    egui::ProgressBar::new((stat.base_stat as f32 / MAX_BASE_STAT).min(1.0))
                        .fill(accent)
                        .desired_width(220.0),
                );
                ui.end_row();
            }
        });

    ui.add_space(16.0);
    ui.add(
        egui::Button::new(egui::RichText::new("Summon 3D model").size(18.0).strong())
            .fill(accent)
            .min_size(egui::vec2(220.0, 40.0)),
    )
    .clicked()
}

/// What to paint over the viewer viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlay {
    Loading,
    Error(&'static str),
}

/// Overlay for the session showing `pokemon_id`
///
/// `session` is the mounted session's Pokémon and status, if one exists.
fn overlay_for(
    pokemon_id: u32,
    session: Option<(u32, &SessionStatus)>,
    rejected: Option<&ViewerError>,
) -> Option<Overlay> {
    if let Some(error) = rejected {
        return Some(Overlay::Error(error.user_message()));
    }
    match session {
        Some((id, status)) if id == pokemon_id => {
            if let Some(error) = status.error() {
                Some(Overlay::Error(error.user_message()))
            } else if status.is_loading() {
                Some(Overlay::Loading)
            } else {
                None
            }
        }
        // Requested but not mounted yet
        _ => Some(Overlay::Loading),
    }
}

/// Convert an egui rect (logical points) to a surface in physical pixels,
/// clamped to the window
fn surface_from_rect(rect: egui::Rect, pixels_per_point: f32, window: UVec2) -> ViewerSurface {
    let to_physical = |v: f32, limit: u32| ((v * pixels_per_point).round().max(0.0) as u32).min(limit);

    let min = UVec2::new(
        to_physical(rect.min.x, window.x),
        to_physical(rect.min.y, window.y),
    );
    let max = UVec2::new(
        to_physical(rect.max.x, window.x),
        to_physical(rect.max.y, window.y),
    );
    ViewerSurface::new(min, max.saturating_sub(min))
}

/// Whether a refused open request for `pokemon_id` should be sent again
fn should_retry(
    modal: &ViewerModal,
    pokemon_id: u32,
    rejected: Option<&ViewerError>,
    surface: &ViewerSurface,
) -> bool {
    modal.showing == Some(pokemon_id) && rejected.is_some() && surface.is_drawable()
}

fn close_viewer(modal: &mut ViewerModal, viewer: &mut ViewerHost) {
    modal.open = false;
    modal.showing = None;
    viewer.input.pointer_over = false;
    viewer.close.write(CloseViewer);
}

fn draw_viewer_modal(
    ctx: &egui::Context,
    pokemon_id: u32,
    details: &PokemonDetails,
    modal: &mut ViewerModal,
    viewer: &mut ViewerHost,
) {
    let title = match details.get(pokemon_id) {
        Some(pokemon) => format!("{} {}", format_number(pokemon_id), display_name(&pokemon.name)),
        None => format_number(pokemon_id),
    };

    let overlay = if modal.showing == Some(pokemon_id) {
        let session = viewer
            .active
            .session()
            .and_then(|root| viewer.sessions.get(root).ok())
            .map(|s| (s.pokemon_id(), s.status()));
        overlay_for(pokemon_id, session, viewer.active.rejected())
    } else {
        Some(Overlay::Loading)
    };

    let mut close = ctx.input(|i| i.key_pressed(egui::Key::Escape));

    egui::TopBottomPanel::top("viewer_header").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.heading(title);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("✕").on_hover_text("Close").clicked() {
                    close = true;
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("viewer_footer").show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.label(VIEWER_HINT);
        });
    });

    // No fill: the session camera renders underneath this panel
    let (rect, hovered) = egui::CentralPanel::default()
        .frame(egui::Frame::NONE)
        .show(ctx, |ui| {
            let rect = ui.available_rect_before_wrap();
            let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());

            match overlay {
                Some(Overlay::Loading) => {
                    ui.painter()
                        .rect_filled(rect, 0.0, egui::Color32::from_black_alpha(120));
                    let spinner = egui::Rect::from_center_size(
                        rect.center() - egui::vec2(0.0, 24.0),
                        egui::vec2(32.0, 32.0),
                    );
                    ui.put(spinner, egui::Spinner::new().size(32.0));
                    ui.painter().text(
                        rect.center() + egui::vec2(0.0, 16.0),
                        egui::Align2::CENTER_CENTER,
                        LOADING_MODEL,
                        egui::FontId::proportional(18.0),
                        egui::Color32::WHITE,
                    );
                }
                Some(Overlay::Error(message)) => {
                    ui.painter()
                        .rect_filled(rect, 0.0, egui::Color32::from_black_alpha(160));
                    ui.painter().text(
                        rect.center(),
                        egui::Align2::CENTER_CENTER,
                        message,
                        egui::FontId::proportional(18.0),
                        egui::Color32::from_rgb(255, 120, 120),
                    );
                }
                None => {}
            }

            (rect, response.hovered() || response.dragged())
        })
        .inner;

    if close {
        close_viewer(modal, viewer);
        return;
    }

    viewer.input.pointer_over = hovered;

    if let Ok(window) = viewer.windows.single() {
        let size = UVec2::new(window.physical_width(), window.physical_height());
        let surface = surface_from_rect(rect, ctx.pixels_per_point(), size);
        viewer.surface.set_if_neq(surface);
    }

    // A request refused for an undrawable surface is sent again once
    if should_retry(modal, pokemon_id, viewer.active.rejected(), &viewer.surface) {
        tracing::debug!(pokemon_id, "Viewer surface is drawable again, retrying");
        modal.showing = None;
    }

    // A new selection while the modal is open replaces the session
    if modal.showing != Some(pokemon_id) {
        viewer.open.write(OpenViewer { pokemon_id });
        modal.showing = Some(pokemon_id);
    }
}

/// Chip colour for a Pokémon type
fn type_color(name: &str) -> egui::Color32 {
    let (r, g, b) = match name {
        "normal" => (0xA8, 0xA7, 0x7A),
        "fire" => (0xEE, 0x81, 0x30),
        "water" => (0x63, 0x90, 0xF0),
        "electric" => (0xF7, 0xD0, 0x2C),
        "grass" => (0x7A, 0xC7, 0x4C),
        "ice" => (0x96, 0xD9, 0xD6),
        "fighting" => (0xC2, 0x2E, 0x28),
        "poison" => (0xA3, 0x3E, 0xA1),
        "ground" => (0xE2, 0xBF, 0x65),
        "flying" => (0xA9, 0x8F, 0xF3),
        "psychic" => (0xF9, 0x55, 0x87),
        "bug" => (0xA6, 0xB9, 0x1A),
        "rock" => (0xB6, 0xA1, 0x36),
        "ghost" => (0x73, 0x57, 0x97),
        "dragon" => (0x6F, 0x35, 0xFC),
        "dark" => (0x70, 0x57, 0x46),
        "steel" => (0xB7, 0xB7, 0xCE),
        "fairy" => (0xD6, 0x85, 0xAD),
        _ => (0x77, 0x77, 0x77),
    };
    egui::Color32::from_rgb(r, g, b)
}

fn stat_label(name: &str) -> String {
    match name {
        "hp" => "HP".to_string(),
        "attack" => "ATK".to_string(),
        "defense" => "DEF".to_string(),
        "special-attack" => "SpA".to_string(),
        "special-defense" => "SpD".to_string(),
        "speed" => "SPD".to_string(),
        other => display_name(other),
    }
}

fn format_number(id: u32) -> String {
    format!("#{:03}", id)
}

/// "mr-mime" -> "Mr Mime"
fn display_name(name: &str) -> String {
    name.split('-')
        .filter(|part| !part.is_empty())
        .map(capitalize_first)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(display_name("pikachu"), "Pikachu");
        assert_eq!(display_name("mr-mime"), "Mr Mime");
        assert_eq!(display_name("All"), "All");
        assert_eq!(format_number(25), "#025");
        assert_eq!(format_number(1010), "#1010");
        assert_eq!(stat_label("special-attack"), "SpA");
        assert_eq!(stat_label("accuracy"), "Accuracy");
    }

    #[test]
    fn test_type_colors() {
        assert_eq!(type_color("fire"), egui::Color32::from_rgb(0xEE, 0x81, 0x30));
        assert_eq!(type_color("unknown"), egui::Color32::from_rgb(0x77, 0x77, 0x77));
    }

    #[test]
    fn test_surface_from_rect() {
        let rect = egui::Rect::from_min_max(egui::pos2(10.0, 40.0), egui::pos2(410.0, 340.0));
        let surface = surface_from_rect(rect, 2.0, UVec2::new(1600, 1200));
        assert_eq!(surface.position, UVec2::new(20, 80));
        assert_eq!(surface.size, UVec2::new(800, 600));

        // Clamped to the window
        let surface = surface_from_rect(rect, 2.0, UVec2::new(500, 500));
        assert_eq!(surface.position, UVec2::new(20, 80));
        assert_eq!(surface.size, UVec2::new(480, 420));

        let empty = egui::Rect::from_min_max(egui::pos2(900.0, 900.0), egui::pos2(950.0, 950.0));
        assert!(!surface_from_rect(empty, 1.0, UVec2::new(800, 600)).is_drawable());
    }

    #[test]
    fn test_overlay() {
        let mut status = SessionStatus::new();
        assert_eq!(overlay_for(25, None, None), Some(Overlay::Loading));
        assert_eq!(overlay_for(25, Some((25, &status)), None), Some(Overlay::Loading));
        // A session for another Pokémon is about to be replaced
        assert_eq!(overlay_for(6, Some((25, &status)), None), Some(Overlay::Loading));

        status.begin_loading().unwrap();
        status.mark_ready().unwrap();
        assert_eq!(overlay_for(25, Some((25, &status)), None), None);

        let mut missing = SessionStatus::new();
        missing.mark_unavailable(999).unwrap();
        assert_eq!(
            overlay_for(999, Some((999, &missing)), None),
            Some(Overlay::Error("3D model not available for this Pokémon"))
        );

        let rejected = ViewerError::SurfaceNotDrawable { width: 0, height: 0 };
        assert_eq!(
            overlay_for(25, None, Some(&rejected)),
            Some(Overlay::Error("The 3D viewer could not be displayed"))
        );
    }

    #[test]
    fn test_retry_after_rejected_surface() {
        let modal = ViewerModal {
            open: true,
            showing: Some(25),
        };
        let rejected = ViewerError::SurfaceNotDrawable { width: 0, height: 0 };
        let empty = ViewerSurface::default();
        let drawable = ViewerSurface::new(UVec2::ZERO, UVec2::new(640, 480));

        // Still undrawable: keep showing the error
        assert!(!should_retry(&modal, 25, Some(&rejected), &empty));
        assert!(should_retry(&modal, 25, Some(&rejected), &drawable));
        // Nothing was refused
        assert!(!should_retry(&modal, 25, None, &drawable));
        // A different Pokémon is requested anyway
        assert!(!should_retry(&modal, 6, Some(&rejected), &drawable));
    }
}
