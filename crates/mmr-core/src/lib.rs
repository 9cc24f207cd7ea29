//! Core catalog and watch-availability types for MMR.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

pub const CRATE_NAME: &str = "mmr-core";

/// TMDB movie identifier.
pub type MovieId = i64;

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 10.0;

/// A catalog entry as shown in the grid and in the raffle modal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub vote_average: f64,
}

impl Movie {
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            poster_path: None,
            release_date: None,
            vote_average: 0.0,
        }
    }

    pub fn with_poster_path(mut self, poster_path: impl Into<String>) -> Self {
        self.poster_path = Some(poster_path.into());
        self
    }

    pub fn with_release_date(mut self, release_date: NaiveDate) -> Self {
        self.release_date = Some(release_date);
        self
    }

    pub fn with_vote_average(mut self, vote_average: f64) -> Self {
        self.vote_average = clamp_rating(vote_average);
        self
    }

    pub fn release_year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }

    /// Rating with one decimal, e.g. `7.3`.
    pub fn display_rating(&self) -> String {
        format!("{:.1}", self.vote_average)
    }

    /// Title cut to `max_chars` characters with a trailing `...` when longer.
    pub fn truncated_title(&self, max_chars: usize) -> String {
        truncate_chars(&self.title, max_chars)
    }
}

pub fn clamp_rating(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_RATING, MAX_RATING)
    } else {
        MIN_RATING
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head = text.chars().take(max_chars).collect::<String>();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Ordered, id-unique list of movies available for raffling in a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    movies: Vec<Movie>,
}

impl Catalog {
    /// Builds a catalog keeping the first occurrence of each movie id.
    /// Movies with a blank title never enter the catalog.
    pub fn from_movies(movies: impl IntoIterator<Item = Movie>) -> Self {
        let mut seen = HashSet::new();
        let movies = movies
            .into_iter()
            .filter(|m| !m.title.trim().is_empty())
            .filter(|m| seen.insert(m.id))
            .collect::<Vec<_>>();
        Self { movies }
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Movie> {
        self.movies.get(index)
    }

    pub fn find(&self, id: MovieId) -> Option<&Movie> {
        self.movies.iter().find(|m| m.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Movie> {
        self.movies.iter()
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn ids(&self) -> Vec<MovieId> {
        self.movies.iter().map(|m| m.id).collect()
    }
}

impl<'de> Deserialize<'de> for Catalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RawCatalog {
            movies: Vec<Movie>,
        }
        RawCatalog::deserialize(deserializer).map(|raw| Catalog::from_movies(raw.movies))
    }
}

impl FromIterator<Movie> for Catalog {
    fn from_iter<I: IntoIterator<Item = Movie>>(iter: I) -> Self {
        Self::from_movies(iter)
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Movie;
    type IntoIter = std::slice::Iter<'a, Movie>;

    fn into_iter(self) -> Self::IntoIter {
        self.movies.iter()
    }
}

/// A streaming, rental or purchase service for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub provider_id: i64,
    pub provider_name: String,
    pub logo_path: Option<String>,
    pub display_priority: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCategory {
    Streaming,
    Rent,
    Buy,
}

impl ProviderCategory {
    pub const ALL: [ProviderCategory; 3] = [
        ProviderCategory::Streaming,
        ProviderCategory::Rent,
        ProviderCategory::Buy,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProviderCategory::Streaming => "Streaming on:",
            ProviderCategory::Rent => "Available for rent on:",
            ProviderCategory::Buy => "Available to buy on:",
        }
    }
}

/// Where one movie can be watched in the configured region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchAvailability {
    pub link: Option<String>,
    pub streaming: Option<Vec<Provider>>,
    pub rent: Option<Vec<Provider>>,
    pub buy: Option<Vec<Provider>>,
}

impl WatchAvailability {
    pub fn providers(&self, category: ProviderCategory) -> &[Provider] {
        let list = match category {
            ProviderCategory::Streaming => &self.streaming,
            ProviderCategory::Rent => &self.rent,
            ProviderCategory::Buy => &self.buy,
        };
        list.as_deref().unwrap_or_default()
    }

    /// True when no category carries a provider.
    pub fn is_empty(&self) -> bool {
        ProviderCategory::ALL
            .iter()
            .all(|c| self.providers(*c).is_empty())
    }
}

/// Drops repeated provider ids and orders by TMDB display priority.
pub fn normalize_providers(providers: Vec<Provider>) -> Option<Vec<Provider>> {
    let mut seen = HashSet::new();
    let mut out = providers
        .into_iter()
        .filter(|p| seen.insert(p.provider_id))
        .collect::<Vec<_>>();
    if out.is_empty() {
        return None;
    }
    out.sort_by_key(|p| (p.display_priority.unwrap_or(i64::MAX), p.provider_id));
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(id: i64, priority: Option<i64>) -> Provider {
        Provider {
            provider_id: id,
            provider_name: format!("provider-{id}"),
            logo_path: Some(format!("/logo{id}.png")),
            display_priority: priority,
        }
    }

    #[test]
    fn catalog_drops_duplicate_ids_and_keeps_order() {
        let catalog = Catalog::from_movies(vec![
            Movie::new(3, "C"),
            Movie::new(1, "A"),
            Movie::new(3, "C again"),
            Movie::new(2, "B"),
        ]);
        assert_eq!(catalog.ids(), vec![3, 1, 2]);
        assert_eq!(catalog.find(3).unwrap().title, "C");
    }

    #[test]
    fn catalog_drops_blank_titles() {
        let catalog = Catalog::from_movies(vec![
            Movie::new(1, "   "),
            Movie::new(2, ""),
            Movie::new(1, "Alien"),
            Movie::new(3, "Heat"),
        ]);
        assert_eq!(catalog.ids(), vec![1, 3]);
        assert_eq!(catalog.find(1).unwrap().title, "Alien");

        let blank_only = Catalog::from_movies(vec![Movie::new(1, " "), Movie::new(2, "\t")]);
        assert!(blank_only.is_empty());
    }

    #[test]
    fn deserialized_catalog_applies_the_same_rules() {
        let json = serde_json::json!({ "movies": [
            { "id": 1, "title": " ", "poster_path": null, "release_date": null, "vote_average": 0.0 },
            { "id": 2, "title": "Heat", "poster_path": null, "release_date": null, "vote_average": 8.3 },
            { "id": 2, "title": "Heat again", "poster_path": null, "release_date": null, "vote_average": 8.3 }
        ]});
        let catalog: Catalog = serde_json::from_value(json).unwrap();
        assert_eq!(catalog.ids(), vec![2]);
    }

    #[test]
    fn title_truncation_counts_characters() {
        let movie = Movie::new(1, "Interstellar");
        assert_eq!(movie.truncated_title(8), "Interste...");
        assert_eq!(Movie::new(2, "Up").truncated_title(8), "Up");
        assert_eq!(Movie::new(3, "Cidade de Deus").truncated_title(4), "Cida...");
        assert_eq!(Movie::new(4, "Amélie!!").truncated_title(8), "Amélie!!");
    }

    #[test]
    fn rating_is_clamped_and_formatted() {
        assert_eq!(Movie::new(1, "x").with_vote_average(7.34).display_rating(), "7.3");
        assert_eq!(Movie::new(1, "x").with_vote_average(11.0).vote_average, 10.0);
        assert_eq!(Movie::new(1, "x").with_vote_average(f64::NAN).vote_average, 0.0);
    }

    #[test]
    fn release_year_comes_from_date() {
        let movie = Movie::new(1, "x").with_release_date(NaiveDate::from_ymd_opt(1999, 10, 15).unwrap());
        assert_eq!(movie.release_year(), Some(1999));
        assert_eq!(Movie::new(2, "y").release_year(), None);
    }

    #[test]
    fn providers_are_deduplicated_and_sorted_by_priority() {
        let out = normalize_providers(vec![
            provider(8, Some(3)),
            provider(337, Some(1)),
            provider(8, Some(9)),
            provider(99, None),
        ])
        .unwrap();
        let ids = out.iter().map(|p| p.provider_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![337, 8, 99]);
        assert!(normalize_providers(vec![]).is_none());
    }

    #[test]
    fn availability_is_empty_without_providers() {
        let mut availability = WatchAvailability {
            link: Some("https://www.themoviedb.org/movie/1/watch?locale=BR".into()),
            streaming: Some(vec![]),
            rent: None,
            buy: None,
        };
        assert!(availability.is_empty());
        availability.rent = Some(vec![provider(2, None)]);
        assert!(!availability.is_empty());
        assert_eq!(availability.providers(ProviderCategory::Rent).len(), 1);
        assert!(availability.providers(ProviderCategory::Buy).is_empty());
    }

    #[test]
    fn movie_serializes_dates_as_iso_strings() {
        let movie = Movie::new(550, "Fight Club")
            .with_release_date(NaiveDate::from_ymd_opt(1999, 10, 15).unwrap());
        let json = serde_json::to_value(&movie).unwrap();
        assert_eq!(json["release_date"], "1999-10-15");
        assert!(json["poster_path"].is_null());
    }
}
