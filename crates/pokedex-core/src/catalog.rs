//! List view state: type filter and pagination
//!
//! The filter keeps the full listing and the currently filtered listing side
//! by side. Selecting a concrete type hands back a [`TypeQuery`] that the
//! caller resolves over HTTP; answers are tagged with the revision they were
//! issued for so a slow response cannot overwrite a newer selection.

use crate::api::{ApiEndpoints, NamedResource};

/// Name of the synthetic category that shows every Pokémon
pub const ALL_TYPES: &str = "All";

/// Default number of cards per page
pub const DEFAULT_PER_PAGE: usize = 12;

/// A type-member lookup the host must perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeQuery {
    pub type_name: String,
    pub url: String,
    pub revision: u64,
}

/// Categories, selection, and filtered listing
#[derive(Debug, Clone)]
pub struct TypeFilter {
    types: Vec<NamedResource>,
    selected: NamedResource,
    all: Option<Vec<NamedResource>>,
    filtered: Option<Vec<NamedResource>>,
    revision: u64,
}

impl TypeFilter {
    pub fn new(endpoints: &ApiEndpoints) -> Self {
        let all = NamedResource::new(ALL_TYPES, endpoints.all_pokemon_url());
        Self {
            types: vec![all.clone()],
            selected: all,
            all: None,
            filtered: None,
            revision: 0,
        }
    }

    /// Categories for the selector, "All" first
    pub fn types(&self) -> &[NamedResource] {
        &self.types
    }

    pub fn selected(&self) -> &NamedResource {
        &self.selected
    }

    /// Listing for the current selection, `None` until it has been fetched
    pub fn filtered(&self) -> Option<&[NamedResource]> {
        self.filtered.as_deref()
    }

    /// Bumped on every selection change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_all_selected(&self) -> bool {
        self.selected.name == ALL_TYPES
    }

    /// Append the fetched type index after the "All" entry
    pub fn set_types(&mut self, types: Vec<NamedResource>) {
        self.types.truncate(1);
        self.types
            .extend(types.into_iter().filter(|t| t.name != ALL_TYPES));
    }

    /// Store the full listing; it becomes visible if "All" is selected
    pub fn set_all(&mut self, pokemon: Vec<NamedResource>) {
        if self.is_all_selected() {
            self.filtered = Some(pokemon.clone());
        }
        self.all = Some(pokemon);
    }

    /// Change the selected category
    ///
    /// Returns the lookup to perform for a concrete type, or `None` when the
    /// full listing can be shown straight away.
    pub fn select(&mut self, category: NamedResource) -> Option<TypeQuery> {
        self.revision += 1;
        self.selected = category;

        if self.is_all_selected() {
            self.filtered = self.all.clone();
            return None;
        }

        Some(TypeQuery {
            type_name: self.selected.name.clone(),
            url: self.selected.url.clone(),
            revision: self.revision,
        })
    }

    /// Apply the members of a type; ignored unless `revision` is current
    pub fn apply_type_members(&mut self, revision: u64, members: Vec<NamedResource>) -> bool {
        if revision != self.revision {
            tracing::debug!(
                revision,
                current = self.revision,
                "Dropping stale type listing"
            );
            return false;
        }
        self.filtered = Some(members);
        true
    }
}

/// 1-based page cursor over a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    per_page: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE)
    }
}

impl Pager {
    pub fn new(per_page: usize) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.per_page).max(1)
    }

    /// Items on the current page
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = ((self.page - 1) * self.per_page).min(items.len());
        let end = (start + self.per_page).min(items.len());
        &items[start..end]
    }

    pub fn next(&mut self, total: usize) {
        self.page = (self.page + 1).min(self.page_count(total));
    }

    pub fn previous(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(n: u32) -> Vec<NamedResource> {
        (1..=n)
            .map(|i| {
                NamedResource::new(
                    format!("mon-{}", i),
                    format!("https://pokeapi.co/api/v2/pokemon/{}/", i),
                )
            })
            .collect()
    }

    #[test]
    fn test_all_is_first_category() {
        let mut filter = TypeFilter::new(&ApiEndpoints::default());
        filter.set_types(vec![
            NamedResource::new("normal", "https://pokeapi.co/api/v2/type/1/"),
            NamedResource::new("fire", "https://pokeapi.co/api/v2/type/10/"),
        ]);
        let names: Vec<_> = filter.types().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["All", "normal", "fire"]);

        // Refreshing the index does not duplicate entries
        filter.set_types(vec![NamedResource::new("water", "https://pokeapi.co/api/v2/type/11/")]);
        assert_eq!(filter.types().len(), 2);
    }

    #[test]
    fn test_select_type_then_all() {
        let mut filter = TypeFilter::new(&ApiEndpoints::default());
        filter.set_all(listing(30));
        assert_eq!(filter.filtered().unwrap().len(), 30);

        let fire = NamedResource::new("fire", "https://pokeapi.co/api/v2/type/10/");
        let query = filter.select(fire).unwrap();
        assert_eq!(query.url, "https://pokeapi.co/api/v2/type/10/");
        assert!(filter.apply_type_members(query.revision, listing(3)));
        assert_eq!(filter.filtered().unwrap().len(), 3);

        let all = filter.types()[0].clone();
        assert!(filter.select(all).is_none());
        assert_eq!(filter.filtered().unwrap().len(), 30);
    }

    #[test]
    fn test_stale_type_listing_is_ignored() {
        let mut filter = TypeFilter::new(&ApiEndpoints::default());
        filter.set_all(listing(10));

        let slow = filter
            .select(NamedResource::new("fire", "https://pokeapi.co/api/v2/type/10/"))
            .unwrap();
        let fast = filter
            .select(NamedResource::new("water", "https://pokeapi.co/api/v2/type/11/"))
            .unwrap();

        assert!(filter.apply_type_members(fast.revision, listing(2)));
        assert!(!filter.apply_type_members(slow.revision, listing(7)));
        assert_eq!(filter.filtered().unwrap().len(), 2);
        assert_eq!(filter.selected().name, "water");
    }

    #[test]
    fn test_full_listing_arriving_late_keeps_type_selection() {
        let mut filter = TypeFilter::new(&ApiEndpoints::default());
        let query = filter
            .select(NamedResource::new("grass", "https://pokeapi.co/api/v2/type/12/"))
            .unwrap();
        filter.apply_type_members(query.revision, listing(4));
        filter.set_all(listing(50));
        assert_eq!(filter.filtered().unwrap().len(), 4);
    }

    #[test]
    fn test_pager_slices() {
        let items: Vec<u32> = (1..=30).collect();
        let mut pager = Pager::new(12);
        assert_eq!(pager.slice(&items), &items[0..12]);
        assert_eq!(pager.page_count(items.len()), 3);

        pager.next(items.len());
        assert_eq!(pager.slice(&items), &items[12..24]);

        pager.next(items.len());
        assert_eq!(pager.slice(&items), &items[24..30]);

        // Clamped at the last page
        pager.next(items.len());
        assert_eq!(pager.page(), 3);

        pager.reset();
        pager.previous();
        assert_eq!(pager.page(), 1);
    }

    #[test]
    fn test_pager_empty_listing() {
        let items: Vec<u32> = Vec::new();
        let pager = Pager::default();
        assert!(pager.slice(&items).is_empty());
        assert_eq!(pager.page_count(0), 1);
    }
}
