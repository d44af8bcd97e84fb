//! PokeAPI v2 record types
//!
//! Only the fields the Pokédex displays are modelled; everything else in the
//! upstream JSON is ignored by serde.

use serde::{Deserialize, Serialize};

/// Default PokeAPI base URL
pub const DEFAULT_API_BASE: &str = "https://pokeapi.co/api/v2";

/// Listing size used to fetch every Pokémon in one request
pub const FULL_LISTING_LIMIT: u32 = 10_000;

/// A `{ name, url }` pair, the link type used throughout PokeAPI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

impl NamedResource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Numeric id from the last path segment (`.../pokemon/25/` -> 25)
    pub fn pokemon_id(&self) -> Option<u32> {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse().ok())
    }
}

/// Response of `/pokemon?limit=..&offset=..`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PokemonPage {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub results: Vec<NamedResource>,
}

/// Response of `/type`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeIndex {
    #[serde(default)]
    pub results: Vec<NamedResource>,
}

/// Response of `/type/{name}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDetail {
    pub name: String,
    #[serde(default)]
    pub pokemon: Vec<TypeMember>,
}

impl TypeDetail {
    /// Members of the type, in API order
    pub fn members(&self) -> Vec<NamedResource> {
        self.pokemon.iter().map(|m| m.pokemon.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeMember {
    #[serde(default)]
    pub slot: u8,
    pub pokemon: NamedResource,
}

/// Response of `/pokemon/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    /// Height in decimetres
    #[serde(default)]
    pub height: u32,
    /// Weight in hectograms
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub base_experience: Option<u32>,
    #[serde(default)]
    pub types: Vec<PokemonType>,
    #[serde(default)]
    pub stats: Vec<PokemonStat>,
    #[serde(default)]
    pub abilities: Vec<PokemonAbility>,
    #[serde(default)]
    pub sprites: Sprites,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PokemonType {
    pub slot: u8,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PokemonStat {
    pub base_stat: u32,
    #[serde(default)]
    pub effort: u32,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PokemonAbility {
    pub ability: NamedResource,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub slot: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sprites {
    #[serde(default)]
    pub front_default: Option<String>,
    #[serde(default)]
    pub other: Option<OtherSprites>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtherSprites {
    #[serde(default)]
    pub dream_world: Option<SpriteSet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpriteSet {
    #[serde(default)]
    pub front_default: Option<String>,
}

impl Pokemon {
    /// Name of the slot-1 type, used to pick the detail background
    pub fn primary_type(&self) -> Option<&str> {
        self.types
            .iter()
            .min_by_key(|t| t.slot)
            .map(|t| t.kind.name.as_str())
    }

    /// Dream-world artwork if present, otherwise the default front sprite
    pub fn artwork_url(&self) -> Option<&str> {
        self.sprites
            .other
            .as_ref()
            .and_then(|o| o.dream_world.as_ref())
            .and_then(|d| d.front_default.as_deref())
            .or(self.sprites.front_default.as_deref())
    }

    pub fn height_m(&self) -> f32 {
        self.height as f32 / 10.0
    }

    pub fn weight_kg(&self) -> f32 {
        self.weight as f32 / 10.0
    }

    /// Base value of a stat by its API name (e.g. "hp", "special-attack")
    pub fn stat(&self, name: &str) -> Option<u32> {
        self.stats
            .iter()
            .find(|s| s.stat.name == name)
            .map(|s| s.base_stat)
    }
}

/// URL builder for the PokeAPI endpoints the app uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    base_url: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl ApiEndpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every Pokémon in one listing
    pub fn all_pokemon_url(&self) -> String {
        format!(
            "{}/pokemon?limit={}&offset=0",
            self.base_url, FULL_LISTING_LIMIT
        )
    }

    pub fn types_url(&self) -> String {
        format!("{}/type", self.base_url)
    }

    pub fn pokemon_url(&self, id: u32) -> String {
        format!("{}/pokemon/{}", self.base_url, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIKACHU: &str = r#"{
        "id": 25,
        "name": "pikachu",
        "height": 4,
        "weight": 60,
        "base_experience": 112,
        "types": [{"slot": 1, "type": {"name": "electric", "url": "https://pokeapi.co/api/v2/type/13/"}}],
        "stats": [
            {"base_stat": 35, "effort": 0, "stat": {"name": "hp", "url": "https://pokeapi.co/api/v2/stat/1/"}},
            {"base_stat": 90, "effort": 2, "stat": {"name": "speed", "url": "https://pokeapi.co/api/v2/stat/6/"}}
        ],
        "abilities": [
            {"ability": {"name": "static", "url": "https://pokeapi.co/api/v2/ability/9/"}, "is_hidden": false, "slot": 1},
            {"ability": {"name": "lightning-rod", "url": "https://pokeapi.co/api/v2/ability/31/"}, "is_hidden": true, "slot": 3}
        ],
        "sprites": {
            "front_default": "https://example.com/front/25.png",
            "other": {"dream_world": {"front_default": "https://example.com/dream/25.svg"}}
        },
        "moves": [{"move": {"name": "thunder", "url": "x"}}]
    }"#;

    #[test]
    fn test_parse_pokemon() {
        let pokemon: Pokemon = serde_json::from_str(PIKACHU).unwrap();
        assert_eq!(pokemon.id, 25);
        assert_eq!(pokemon.primary_type(), Some("electric"));
        assert_eq!(pokemon.artwork_url(), Some("https://example.com/dream/25.svg"));
        assert_eq!(pokemon.stat("speed"), Some(90));
        assert_eq!(pokemon.stat("attack"), None);
        assert!((pokemon.height_m() - 0.4).abs() < f32::EPSILON);
        assert!((pokemon.weight_kg() - 6.0).abs() < f32::EPSILON);
        assert!(pokemon.abilities[1].is_hidden);
    }

    #[test]
    fn test_artwork_falls_back_to_front_sprite() {
        let pokemon: Pokemon = serde_json::from_str(
            r#"{"id": 10001, "name": "deoxys-attack", "sprites": {"front_default": "front.png", "other": {"dream_world": {"front_default": null}}}}"#,
        )
        .unwrap();
        assert_eq!(pokemon.artwork_url(), Some("front.png"));
        assert_eq!(pokemon.primary_type(), None);
    }

    #[test]
    fn test_named_resource_id() {
        let r = NamedResource::new("pikachu", "https://pokeapi.co/api/v2/pokemon/25/");
        assert_eq!(r.pokemon_id(), Some(25));

        let r = NamedResource::new("bulbasaur", "https://pokeapi.co/api/v2/pokemon/1");
        assert_eq!(r.pokemon_id(), Some(1));

        let r = NamedResource::new("odd", "https://pokeapi.co/api/v2/pokemon/");
        assert_eq!(r.pokemon_id(), None);
    }

    #[test]
    fn test_type_detail_members() {
        let detail: TypeDetail = serde_json::from_str(
            r#"{"name": "fire", "pokemon": [
                {"slot": 1, "pokemon": {"name": "charmander", "url": "https://pokeapi.co/api/v2/pokemon/4/"}},
                {"slot": 1, "pokemon": {"name": "charmeleon", "url": "https://pokeapi.co/api/v2/pokemon/5/"}}
            ]}"#,
        )
        .unwrap();
        let members = detail.members();
        assert_eq!(members.len(), 2);
        assert_eq!(members[1].name, "charmeleon");
    }

    #[test]
    fn test_endpoints() {
        let api = ApiEndpoints::new("https://pokeapi.co/api/v2/");
        assert_eq!(
            api.all_pokemon_url(),
            "https://pokeapi.co/api/v2/pokemon?limit=10000&offset=0"
        );
        assert_eq!(api.types_url(), "https://pokeapi.co/api/v2/type");
        assert_eq!(api.pokemon_url(6), "https://pokeapi.co/api/v2/pokemon/6");
    }
}
