use std::path::{Path, PathBuf};

use mmr_adapters::{CatalogSource, FixtureCatalogSource, FixtureProviderLookup, ProviderLookup};
use mmr_core::ProviderCategory;

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .expect("workspace root")
}

fn catalog_fixture() -> PathBuf {
    workspace_root().join("fixtures/catalog/sample/pages.json")
}

fn providers_fixture() -> PathBuf {
    workspace_root().join("fixtures/providers/sample/providers.json")
}

#[tokio::test]
async fn sample_catalog_is_normalized_and_deduplicated() {
    let source = FixtureCatalogSource::new(catalog_fixture());
    let catalog = source.fetch_catalog().await.unwrap();
    assert_eq!(catalog.ids(), vec![550, 680, 598, 13, 155, 157336]);
    assert_eq!(catalog.find(155).unwrap().poster_path, None);
    assert_eq!(catalog.find(157336).unwrap().release_date, None);
}

#[tokio::test]
async fn sample_providers_cover_every_lookup_outcome() {
    let lookup = FixtureProviderLookup::new(providers_fixture(), "br");
    assert_eq!(lookup.region(), "BR");

    let fight_club = lookup.fetch_availability(550).await.unwrap().unwrap();
    let streaming = fight_club
        .providers(ProviderCategory::Streaming)
        .iter()
        .map(|p| p.provider_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(streaming, vec!["Max", "Amazon Prime Video"]);
    assert_eq!(fight_club.providers(ProviderCategory::Rent).len(), 1);

    assert!(lookup.fetch_availability(598).await.unwrap().is_none(), "region absent");
    assert!(lookup.fetch_availability(155).await.unwrap().unwrap().is_empty());
    assert!(lookup.fetch_availability(157336).await.unwrap().is_none());
    assert!(lookup.fetch_availability(13).await.is_err());
}

#[tokio::test]
async fn missing_fixture_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = FixtureCatalogSource::new(dir.path().join("nope.json"));
    let err = source.fetch_catalog().await.unwrap_err();
    assert!(err.to_string().contains("nope.json"));
}
