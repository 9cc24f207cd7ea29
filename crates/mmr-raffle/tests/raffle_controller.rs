use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mmr_adapters::{AdapterError, ProviderLookup};
use mmr_core::{Catalog, Movie, MovieId, Provider, WatchAvailability};
use mmr_raffle::{
    AvailabilityStatus, DrawOutcome, LookupApplied, RaffleController, RaffleError, RaffleView,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::oneshot;

type LookupResult = Result<Option<WatchAvailability>, AdapterError>;

/// Lookup whose answers are released by the test, one movie at a time.
#[derive(Default)]
struct GatedLookup {
    gates: Mutex<HashMap<MovieId, oneshot::Receiver<LookupResult>>>,
}

impl GatedLookup {
    fn gate(&self, movie_id: MovieId) -> oneshot::Sender<LookupResult> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(movie_id, rx);
        tx
    }
}

#[async_trait]
impl ProviderLookup for GatedLookup {
    fn region(&self) -> &str {
        "BR"
    }

    async fn fetch_availability(&self, movie_id: MovieId) -> LookupResult {
        let rx = self.gates.lock().unwrap().remove(&movie_id);
        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(AdapterError::Message("gate dropped".into()))),
            None => Ok(None),
        }
    }
}

struct StaticLookup(LookupResult);

#[async_trait]
impl ProviderLookup for StaticLookup {
    fn region(&self) -> &str {
        "BR"
    }

    async fn fetch_availability(&self, _movie_id: MovieId) -> LookupResult {
        match &self.0 {
            Ok(v) => Ok(v.clone()),
            Err(err) => Err(AdapterError::Message(err.to_string())),
        }
    }
}

struct PanickingLookup;

#[async_trait]
impl ProviderLookup for PanickingLookup {
    fn region(&self) -> &str {
        "BR"
    }

    async fn fetch_availability(&self, movie_id: MovieId) -> LookupResult {
        panic!("lookup exploded for {movie_id}");
    }
}

fn abc() -> Catalog {
    Catalog::from_movies(vec![
        Movie::new(1, "Alpha"),
        Movie::new(2, "Bravo"),
        Movie::new(3, "Charlie"),
    ])
}

fn streaming(name: &str) -> WatchAvailability {
    WatchAvailability {
        streaming: Some(vec![Provider {
            provider_id: 8,
            provider_name: name.to_string(),
            logo_path: Some("/logo.png".into()),
            display_priority: Some(1),
        }]),
        ..WatchAvailability::default()
    }
}

fn selected(outcome: DrawOutcome) -> MovieId {
    match outcome {
        DrawOutcome::Selected(ticket) => ticket.movie_id,
        DrawOutcome::PoolExhaustedRestart => panic!("expected a selection"),
    }
}

#[tokio::test]
async fn three_movie_catalog_cycles_then_restarts() {
    let controller = RaffleController::new(Arc::new(StaticLookup(Ok(None))));
    controller
        .initialize_with_rng(abc(), StdRng::seed_from_u64(11))
        .await
        .unwrap();

    let mut seen = HashSet::new();
    for expected_remaining in [2, 1, 0] {
        let ticket = controller.draw().await.unwrap();
        assert!(seen.insert(selected(ticket.outcome)));
        assert_eq!(ticket.settled().await, Some(LookupApplied::Applied));
        assert_eq!(controller.remaining().await, Some(expected_remaining));
    }
    assert_eq!(seen, HashSet::from([1, 2, 3]));

    let restart = controller.draw().await.unwrap();
    assert_eq!(restart.outcome, DrawOutcome::PoolExhaustedRestart);
    assert_eq!(restart.settled().await, None);
    assert_eq!(
        controller.view().await,
        RaffleView::RestartNotice { catalog_size: 3 }
    );
    assert_eq!(controller.remaining().await, Some(3));

    let fifth = controller.draw().await.unwrap();
    assert!([1, 2, 3].contains(&selected(fifth.outcome)));
    assert_eq!(controller.remaining().await, Some(2));
}

#[tokio::test]
async fn draw_before_initialize_and_empty_catalog_fail() {
    let controller = RaffleController::new(Arc::new(StaticLookup(Ok(None))));
    assert!(matches!(
        controller.draw().await,
        Err(RaffleError::InvalidState(_))
    ));
    assert_eq!(
        controller.initialize(Catalog::default()).await,
        Err(RaffleError::EmptyCatalog)
    );
    assert!(!controller.is_initialized().await);
}

#[tokio::test]
async fn stale_lookup_is_discarded_after_a_newer_draw() {
    let lookup = Arc::new(GatedLookup::default());
    let gate_a = lookup.gate(1);
    let gate_b = lookup.gate(2);
    let controller = RaffleController::new(lookup.clone());
    let catalog = Catalog::from_movies(vec![Movie::new(1, "A"), Movie::new(2, "B")]);
    controller
        .initialize_with_rng(catalog, StdRng::seed_from_u64(3))
        .await
        .unwrap();

    let first = controller.draw().await.unwrap();
    let second = controller.draw().await.unwrap();
    let first_id = selected(first.outcome);
    let second_id = selected(second.outcome);
    assert_ne!(first_id, second_id);

    let (first_gate, second_gate) = if first_id == 1 {
        (gate_a, gate_b)
    } else {
        (gate_b, gate_a)
    };

    first_gate.send(Ok(Some(streaming("Late Flix")))).unwrap();
    assert_eq!(first.settled().await, Some(LookupApplied::Discarded));
    let view = controller.view().await;
    let selection = view.selection().unwrap();
    assert_eq!(selection.movie.id, second_id);
    assert_eq!(selection.status, AvailabilityStatus::Pending);

    second_gate.send(Ok(Some(streaming("Max")))).unwrap();
    assert_eq!(second.settled().await, Some(LookupApplied::Applied));
    let view = controller.view().await;
    let selection = view.selection().unwrap();
    assert_eq!(selection.movie.id, second_id);
    assert_eq!(
        selection.status,
        AvailabilityStatus::Ready {
            availability: streaming("Max")
        }
    );
}

#[tokio::test]
async fn dismiss_while_pending_drops_the_late_result() {
    let lookup = Arc::new(GatedLookup::default());
    let gate = lookup.gate(1);
    let controller = RaffleController::new(lookup.clone());
    controller
        .initialize_with_rng(Catalog::from_movies(vec![Movie::new(1, "A")]), StdRng::seed_from_u64(1))
        .await
        .unwrap();

    let ticket = controller.draw().await.unwrap();
    controller.dismiss().await;
    gate.send(Ok(Some(streaming("Max")))).unwrap();
    assert_eq!(ticket.settled().await, Some(LookupApplied::Discarded));
    assert_eq!(controller.view().await, RaffleView::Idle);
}

#[tokio::test]
async fn lookup_error_keeps_movie_selected_with_failed_status() {
    let controller = RaffleController::new(Arc::new(StaticLookup(Err(AdapterError::Message(
        "connection refused".into(),
    )))));
    controller
        .initialize_with_rng(abc(), StdRng::seed_from_u64(5))
        .await
        .unwrap();
    let ticket = controller.draw().await.unwrap();
    let movie_id = selected(ticket.outcome);
    ticket.settled().await;

    let view = controller.view().await;
    let selection = view.selection().unwrap();
    assert_eq!(selection.movie.id, movie_id);
    assert_eq!(
        selection.status,
        AvailabilityStatus::Failed {
            reason: "connection refused".into()
        }
    );
}

#[tokio::test]
async fn absent_availability_resolves_to_empty() {
    let controller = RaffleController::new(Arc::new(StaticLookup(Ok(None))));
    controller
        .initialize_with_rng(abc(), StdRng::seed_from_u64(5))
        .await
        .unwrap();
    controller.draw().await.unwrap().settled().await;
    let view = controller.view().await;
    assert_eq!(view.selection().unwrap().status, AvailabilityStatus::Empty);
}

#[tokio::test]
async fn panicking_lookup_becomes_failed() {
    let controller = RaffleController::new(Arc::new(PanickingLookup));
    controller
        .initialize_with_rng(abc(), StdRng::seed_from_u64(5))
        .await
        .unwrap();
    let ticket = controller.draw().await.unwrap();
    assert_eq!(ticket.settled().await, Some(LookupApplied::Applied));
    let view = controller.view().await;
    assert_eq!(view.selection().unwrap().status.label(), "failed");
}

#[tokio::test]
async fn subscribers_see_pending_then_resolved_view() {
    let lookup = Arc::new(GatedLookup::default());
    let gate = lookup.gate(1);
    let controller = RaffleController::new(lookup.clone());
    let mut updates = controller.subscribe();
    controller
        .initialize_with_rng(Catalog::from_movies(vec![Movie::new(1, "A")]), StdRng::seed_from_u64(1))
        .await
        .unwrap();

    let ticket = controller.draw().await.unwrap();
    let pending = updates.borrow_and_update().clone();
    assert!(pending.selection().unwrap().status.is_pending());

    gate.send(Ok(None)).unwrap();
    ticket.settled().await;
    assert!(updates.has_changed().unwrap());
    let resolved = updates.borrow_and_update().clone();
    assert_eq!(resolved.selection().unwrap().status, AvailabilityStatus::Empty);
}

#[tokio::test]
async fn reset_refills_the_pool_mid_cycle() {
    let controller = RaffleController::new(Arc::new(StaticLookup(Ok(None))));
    controller
        .initialize_with_rng(abc(), StdRng::seed_from_u64(2))
        .await
        .unwrap();
    controller.draw().await.unwrap();
    controller.draw().await.unwrap();
    assert_eq!(controller.remaining().await, Some(1));
    controller.reset().await.unwrap();
    assert_eq!(controller.remaining().await, Some(3));
    assert_eq!(controller.catalog_size().await, Some(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_draws_never_share_a_movie() {
    let n = 50;
    let catalog = Catalog::from_movies((1..=n).map(|id| Movie::new(id, format!("Movie {id}"))));
    let controller = RaffleController::new(Arc::new(StaticLookup(Ok(None))));
    controller
        .initialize_with_rng(catalog, StdRng::seed_from_u64(99))
        .await
        .unwrap();

    let handles = (0..n)
        .map(|_| {
            let controller = controller.clone();
            tokio::spawn(async move {
                let ticket = controller.draw().await.unwrap();
                let id = selected(ticket.outcome);
                ticket.settled().await;
                id
            })
        })
        .collect::<Vec<_>>();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    let unique = ids.iter().copied().collect::<HashSet<_>>();
    assert_eq!(ids.len(), n as usize);
    assert_eq!(unique, (1..=n).collect::<HashSet<_>>());
    assert_eq!(controller.remaining().await, Some(0));
}
