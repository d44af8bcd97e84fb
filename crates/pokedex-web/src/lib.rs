//! Pokédex Web - browser Pokédex with a 3D model viewer
//!
//! This crate provides the WebAssembly entry point, PokeAPI access and the
//! egui interface around the viewer sessions from `pokedex-viewer`.

mod app;
mod network;
mod ui;

use pokedex_core::PokedexConfig;
use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    // Set panic hook for better error messages
    console_error_panic_hook::set_once();

    let parsed = PokedexConfig::from_toml(app::EMBEDDED_CONFIG);
    let level = parsed
        .as_ref()
        .map(|config| app::log_level(&config.logging.level))
        .unwrap_or(tracing::Level::WARN);

    // Initialize logging with filtering to reduce wgpu noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(level)
            .build(),
    );

    let config = parsed.unwrap_or_else(|e| {
        tracing::warn!("Invalid embedded configuration, using defaults: {}", e);
        PokedexConfig::default()
    });

    // Run the Bevy app
    app::run(config);
}
