//! Pokédex Core - Data types, catalog state, and viewer session primitives
//!
//! This crate provides the engine-independent pieces of the Pokédex:
//! - PokeAPI record types and endpoint construction
//! - Type filter and pagination state for the list view
//! - The Pokémon id to 3D asset table
//! - Viewer session state machine, errors, and liveness flags
//! - Hash routing and TOML configuration

pub mod api;
pub mod catalog;
pub mod config;
pub mod models;
pub mod route;
pub mod session;

pub use api::{ApiEndpoints, NamedResource, Pokemon, PokemonPage, TypeDetail, TypeIndex};
pub use catalog::{Pager, TypeFilter, TypeQuery};
pub use config::{ConfigError, PokedexConfig, ViewerConfig};
pub use models::{ModelEntry, ModelRegistry};
pub use route::Route;
pub use session::{Liveness, SessionState, SessionStatus, TransitionError, ViewerError};
