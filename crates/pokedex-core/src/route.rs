//! Hash routes (`#/` and `#/<id>`)

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Home,
    Detail(u32),
}

impl Route {
    /// Parse a location hash; anything unrecognised is `Home`
    pub fn parse(hash: &str) -> Self {
        let path = hash.trim_start_matches('#').trim_matches('/');
        match path.parse::<u32>() {
            Ok(id) if id > 0 => Route::Detail(id),
            _ => Route::Home,
        }
    }

    pub fn to_hash(self) -> String {
        self.to_string()
    }

    pub fn pokemon_id(self) -> Option<u32> {
        match self {
            Route::Home => None,
            Route::Detail(id) => Some(id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => write!(f, "#/"),
            Route::Detail(id) => write!(f, "#/{}", id),
        }
    }
}
