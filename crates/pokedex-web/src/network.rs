//! PokeAPI client
//!
//! Requests run as browser futures and push their results into
//! [`PendingApi`]; `process_api_events` drains it once per frame.

use bevy::prelude::*;
use pokedex_core::{Pokemon, PokemonPage, TypeDetail, TypeIndex, TypeQuery};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};

use crate::app::{ApiStatus, Catalog, PokemonDetails, SelectedPokemon};

pub struct NetworkPlugin;

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingApi>()
            .add_systems(Startup, fetch_initial_data)
            .add_systems(Update, (process_api_events, request_selected_details).chain());
    }
}

/// Which request an event answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    Listing,
    Types,
    TypeMembers { type_name: String, revision: u64 },
    Pokemon(u32),
}

#[derive(Debug)]
pub enum ApiEvent {
    Listing(PokemonPage),
    Types(TypeIndex),
    TypeMembers { revision: u64, detail: TypeDetail },
    Pokemon(Box<Pokemon>),
    Failed { request: ApiRequest, error: String },
}

/// Results deposited by in-flight requests
#[derive(Resource, Default, Clone)]
pub struct PendingApi(pub Arc<Mutex<Vec<ApiEvent>>>);

impl PendingApi {
    fn push(&self, event: ApiEvent) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push(event);
        }
    }

    fn drain(&self) -> Vec<ApiEvent> {
        if let Ok(mut queue) = self.0.lock() {
            std::mem::take(&mut *queue)
        } else {
            Vec::new()
        }
    }
}

/// Check the HTTP status and decode a JSON body
pub fn decode_response<T: DeserializeOwned>(url: &str, status: u16, body: &str) -> anyhow::Result<T> {
    use anyhow::Context;

    if !(200..300).contains(&status) {
        anyhow::bail!("GET {} returned HTTP {}", url, status);
    }
    serde_json::from_str(body).with_context(|| format!("Failed to decode response from {}", url))
}

#[cfg(target_arch = "wasm32")]
async fn fetch_json<T: DeserializeOwned>(url: &str) -> anyhow::Result<T> {
    let response = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("GET {} failed: {}", url, e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read response from {}: {}", url, e))?;
    decode_response(url, status, &body)
}

/// Fetch `url` in the background and queue the mapped result
fn spawn_fetch<T, F>(pending: &PendingApi, url: String, request: ApiRequest, on_success: F)
where
    T: DeserializeOwned + 'static,
    F: FnOnce(T) -> ApiEvent + 'static,
{
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let pending = pending.clone();

        spawn_local(async move {
            tracing::debug!("Fetching {}", url);

            let event = match fetch_json::<T>(&url).await {
                Ok(value) => on_success(value),
                Err(e) => {
                    tracing::error!("{:#}", e);
                    ApiEvent::Failed {
                        request,
                        error: e.to_string(),
                    }
                }
            };
            pending.push(event);
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (pending, request, on_success);
        tracing::info!("HTTP fetch of {} not available in native mode", url);
    }
}

fn fetch_initial_data(pending: Res<PendingApi>, catalog: Res<Catalog>) {
    spawn_fetch(
        &pending,
        catalog.endpoints.all_pokemon_url(),
        ApiRequest::Listing,
        ApiEvent::Listing,
    );
    spawn_fetch(
        &pending,
        catalog.endpoints.types_url(),
        ApiRequest::Types,
        ApiEvent::Types,
    );
}

/// Resolve the members of a selected type
pub fn fetch_type_members(pending: &PendingApi, query: TypeQuery) {
    let revision = query.revision;
    spawn_fetch(
        pending,
        query.url,
        ApiRequest::TypeMembers {
            type_name: query.type_name,
            revision,
        },
        move |detail| ApiEvent::TypeMembers { revision, detail },
    );
}

/// Fetch one Pokémon record
pub fn fetch_pokemon(pending: &PendingApi, url: String, id: u32) {
    spawn_fetch(pending, url, ApiRequest::Pokemon(id), |pokemon: Pokemon| {
        ApiEvent::Pokemon(Box::new(pokemon))
    });
}

/// Request the record of the selected Pokémon if we don't have it
fn request_selected_details(
    selected: Res<SelectedPokemon>,
    catalog: Res<Catalog>,
    pending: Res<PendingApi>,
    mut details: ResMut<PokemonDetails>,
) {
    let Some(id) = selected.0 else {
        return;
    };
    if !details.needs_fetch(id) {
        return;
    }
    details.pending.insert(id);
    fetch_pokemon(&pending, catalog.endpoints.pokemon_url(id), id);
}

fn process_api_events(
    pending: Res<PendingApi>,
    mut catalog: ResMut<Catalog>,
    mut details: ResMut<PokemonDetails>,
    mut status: ResMut<ApiStatus>,
) {
    for event in pending.drain() {
        apply_event(event, &mut catalog, &mut details, &mut status);
    }
}

fn apply_event(
    event: ApiEvent,
    catalog: &mut Catalog,
    details: &mut PokemonDetails,
    status: &mut ApiStatus,
) {
    match event {
        ApiEvent::Listing(page) => {
            tracing::info!("Loaded {} of {} Pokémon", page.results.len(), page.count);
            catalog.filter.set_all(page.results);
            status.listing_loaded = true;
        }
        ApiEvent::Types(index) => {
            tracing::info!("Loaded {} types", index.results.len());
            catalog.filter.set_types(index.results);
            status.types_loaded = true;
        }
        ApiEvent::TypeMembers { revision, detail } => {
            let name = detail.name.clone();
            if catalog.filter.apply_type_members(revision, detail.members()) {
                tracing::info!(
                    "Type {} has {} Pokémon",
                    name,
                    catalog.listing().len()
                );
                catalog.pager.reset();
                status.loading_type = None;
            } else {
                tracing::debug!("Dropping stale members of type {}", name);
            }
        }
        ApiEvent::Pokemon(pokemon) => {
            details.pending.remove(&pokemon.id);
            details.records.insert(pokemon.id, *pokemon);
        }
        ApiEvent::Failed { request, error } => {
            match &request {
                ApiRequest::Pokemon(id) => {
                    details.pending.remove(id);
                    details.failed.insert(*id, error.clone());
                }
                ApiRequest::TypeMembers { revision, .. } => {
                    // A failure for a superseded selection is not worth reporting
                    if *revision != catalog.filter.revision() {
                        return;
                    }
                    status.loading_type = None;
                }
                ApiRequest::Listing | ApiRequest::Types => {}
            }
            status.last_error = Some(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokedex_core::{NamedResource, PokedexConfig};

    fn resource(name: &str, id: u32) -> NamedResource {
        NamedResource::new(name, format!("https://pokeapi.co/api/v2/pokemon/{}/", id))
    }

    fn state() -> (Catalog, PokemonDetails, ApiStatus) {
        (
            Catalog::new(&PokedexConfig::default()),
            PokemonDetails::default(),
            ApiStatus::default(),
        )
    }

    #[test]
    fn test_decode_response() {
        let page: PokemonPage = decode_response(
            "https://pokeapi.co/api/v2/pokemon",
            200,
            r#"{"count": 1, "results": [{"name": "pikachu", "url": "https://pokeapi.co/api/v2/pokemon/25/"}]}"#,
        )
        .unwrap();
        assert_eq!(page.results[0].pokemon_id(), Some(25));

        let err = decode_response::<PokemonPage>("https://pokeapi.co/api/v2/pokemon", 404, "")
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 404"));

        let err = decode_response::<PokemonPage>("https://pokeapi.co/api/v2/pokemon", 200, "<html>")
            .unwrap_err();
        assert!(err.to_string().contains("Failed to decode"));
    }

    #[test]
    fn test_listing_event() {
        let (mut catalog, mut details, mut status) = state();
        let page = PokemonPage {
            count: 2,
            results: vec![resource("bulbasaur", 1), resource("ivysaur", 2)],
        };
        apply_event(ApiEvent::Listing(page), &mut catalog, &mut details, &mut status);
        assert!(status.listing_loaded);
        assert_eq!(catalog.listing().len(), 2);
    }

    #[test]
    fn test_stale_type_members_are_dropped() {
        let (mut catalog, mut details, mut status) = state();
        catalog.filter.set_all(vec![resource("bulbasaur", 1)]);

        let fire = catalog
            .filter
            .select(NamedResource::new("fire", "https://pokeapi.co/api/v2/type/10/"))
            .unwrap();
        let water = catalog
            .filter
            .select(NamedResource::new("water", "https://pokeapi.co/api/v2/type/11/"))
            .unwrap();

        let detail = |name: &str, ids: &[u32]| -> TypeDetail {
            serde_json::from_value(serde_json::json!({
                "name": name,
                "pokemon": ids.iter().map(|id| serde_json::json!({
                    "slot": 1,
                    "pokemon": {"name": format!("mon-{}", id), "url": format!("https://pokeapi.co/api/v2/pokemon/{}/", id)}
                })).collect::<Vec<_>>()
            }))
            .unwrap()
        };

        apply_event(
            ApiEvent::TypeMembers { revision: water.revision, detail: detail("water", &[7, 8]) },
            &mut catalog,
            &mut details,
            &mut status,
        );
        apply_event(
            ApiEvent::TypeMembers { revision: fire.revision, detail: detail("fire", &[4, 5, 6]) },
            &mut catalog,
            &mut details,
            &mut status,
        );
        assert_eq!(catalog.listing().len(), 2);
        assert_eq!(catalog.listing()[0].pokemon_id(), Some(7));

        // Failures for the superseded request are not reported either
        apply_event(
            ApiEvent::Failed {
                request: ApiRequest::TypeMembers { type_name: "fire".into(), revision: fire.revision },
                error: "timeout".into(),
            },
            &mut catalog,
            &mut details,
            &mut status,
        );
        assert!(status.last_error.is_none());
    }

    #[test]
    fn test_pokemon_failure_is_recorded() {
        let (mut catalog, mut details, mut status) = state();
        details.pending.insert(25);
        apply_event(
            ApiEvent::Failed {
                request: ApiRequest::Pokemon(25),
                error: "GET https://pokeapi.co/api/v2/pokemon/25 returned HTTP 500".into(),
            },
            &mut catalog,
            &mut details,
            &mut status,
        );
        assert!(details.pending.is_empty());
        assert!(details.failed.contains_key(&25));
        assert!(status.last_error.is_some());
        assert!(!details.needs_fetch(25));
    }

    #[test]
    fn test_pending_queue_drains() {
        let pending = PendingApi::default();
        pending.push(ApiEvent::Failed {
            request: ApiRequest::Types,
            error: "offline".into(),
        });
        assert_eq!(pending.drain().len(), 1);
        assert!(pending.drain().is_empty());
    }
}
