use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use rumo::{
    ApplyOutcome, Coordinates, FixedPosition, MergeMode, NoPosition, PlaceSearchBackend,
    QueryPlanner, ReverseGeocoder, SearchConfig, SearchInput, SmartTravelAgent, TopicId,
    location::ReverseGeocode,
    providers::BackendError,
    search::{PlaceQuery, RawHit},
};

const RECIFE: Coordinates = Coordinates {
    lat: -8.0476,
    lon: -34.877,
};

/// In-process stand-in for Nominatim: answers by query text and records every call.
#[derive(Default)]
struct FakeNominatim {
    bounded: HashMap<String, Vec<RawHit>>,
    unbounded: HashMap<String, Vec<RawHit>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<PlaceQuery>>,
}

impl FakeNominatim {
    fn answer(mut self, query: &str, hits: Vec<RawHit>) -> Self {
        self.bounded.insert(query.to_string(), hits.clone());
        self.unbounded.insert(query.to_string(), hits);
        self
    }

    fn answer_unbounded_only(mut self, query: &str, hits: Vec<RawHit>) -> Self {
        self.unbounded.insert(query.to_string(), hits);
        self
    }

    fn delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    fn calls(&self) -> Vec<PlaceQuery> {
        self.calls.lock().unwrap().clone()
    }
}

impl PlaceSearchBackend for FakeNominatim {
    async fn search(&self, query: &PlaceQuery) -> Result<Vec<RawHit>, BackendError> {
        self.calls.lock().unwrap().push(query.clone());
        if let Some(delay) = self.delays.get(&query.text) {
            tokio::time::sleep(*delay).await;
        }
        let answers = if query.viewbox.is_some() {
            &self.bounded
        } else {
            &self.unbounded
        };
        Ok(answers.get(&query.text).cloned().unwrap_or_default())
    }
}

impl ReverseGeocoder for FakeNominatim {
    async fn reverse(&self, _coordinates: Coordinates) -> Result<ReverseGeocode, BackendError> {
        Ok(ReverseGeocode {
            name: "Recife".to_string(),
            country: "Brasil".to_string(),
            place_types: vec!["city".to_string()],
        })
    }
}

fn hit(name: &str, offset: f64) -> RawHit {
    RawHit {
        name: name.to_string(),
        display_name: format!("{name}, Recife, Pernambuco, Brasil"),
        coordinates: Coordinates::new(RECIFE.lat + offset, RECIFE.lon),
        category: "tourism".to_string(),
        kind: "attraction".to_string(),
        address: [("city".to_string(), "Recife".to_string())].into(),
        image: None,
    }
}

fn agent(
    backend: FakeNominatim,
) -> SmartTravelAgent<Arc<FakeNominatim>, FixedPosition, Arc<FakeNominatim>>
{
    let backend = Arc::new(backend);
    SmartTravelAgent::new(
        Arc::clone(&backend),
        FixedPosition(RECIFE),
        backend,
        SearchConfig::default(),
    )
}

#[tokio::test]
async fn test_nearby_then_load_more() {
    let page_one: Vec<_> = (1..=6_u32)
        .map(|i| hit(&format!("Ponto {i}"), 0.01 * f64::from(i)))
        .collect();
    let page_two = vec![
        hit("Restaurante A", 0.015),
        hit("Restaurante B", 0.025),
        hit("Restaurante C", 0.2),
        hit("Ponto 3", 0.01 * 3.0),
    ];
    let mut agent = agent(
        FakeNominatim::default()
            .answer("Pontos turísticos", page_one)
            .answer("Restaurantes", page_two),
    );

    agent.detect_location().await.unwrap();
    assert_eq!(agent.state().user_location.name, "Recife");

    let report = agent
        .search(SearchInput::Topic(TopicId::Nearby))
        .await
        .unwrap();
    assert_eq!(report.added, 6);
    assert_eq!(agent.state().page, 1);

    let report = agent.load_more().await.unwrap();
    assert_eq!(report.added, 3);
    assert_eq!(report.duplicates, 1);

    let state = agent.state();
    assert_eq!(state.results.len(), 9);
    assert_eq!(state.page, 2);
    assert!(!state.is_loading && !state.is_loading_more);
    assert!(state.has_searched);
    assert!(
        state
            .results
            .windows(2)
            .all(|w| w[0].distance <= w[1].distance),
        "nearby results are sorted by distance"
    );
    assert!(state.results.iter().all(|r| r.tags[1] == "Perto de você"));

    let calls = agent.fetcher().backend().calls();
    let last = calls.last().unwrap();
    assert_eq!(last.text, "Restaurantes");
    assert!(last.viewbox.is_some_and(|b| b.contains(RECIFE)));
}

#[tokio::test]
async fn test_fresh_search_replaces_results() {
    let mut agent = agent(
        FakeNominatim::default()
            .answer("Pontos turísticos", vec![hit("Marco Zero", 0.001)])
            .answer("Atrações em Lisboa", vec![hit("Torre de Belém", 30.0)]),
    );
    agent.detect_location().await.unwrap();

    agent.search(SearchInput::Topic(TopicId::Nearby)).await;
    agent.load_more().await;
    agent.search(SearchInput::FreeText("Lisboa".into())).await;

    let state = agent.state();
    assert_eq!(state.page, 1);
    assert_eq!(state.last_query_term, "Lisboa");
    let names: Vec<_> = state.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Torre de Belém"]);
    assert_eq!(state.results[0].tags[1], "Destino Recomendado");

    let calls = agent.fetcher().backend().calls();
    assert!(
        calls.last().unwrap().viewbox.is_none(),
        "destinations are searched worldwide"
    );
}

#[tokio::test]
async fn test_bounded_miss_falls_back_to_unbounded_primary() {
    let mut agent = agent(
        FakeNominatim::default()
            .answer_unbounded_only("Museus em Recife", vec![hit("Cais do Sertão", 0.002)]),
    );
    agent.detect_location().await.unwrap();

    let report = agent
        .search(SearchInput::Topic(TopicId::Culture))
        .await
        .unwrap();
    assert_eq!(report.added, 1);

    let calls = agent.fetcher().backend().calls();
    let texts: Vec<_> = calls.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["Museus em Recife", "Centro histórico", "Teatro", "Museus em Recife"]
    );
    assert!(calls[..3].iter().all(|c| c.viewbox.is_some()));
    assert!(calls[3].viewbox.is_none());
}

#[tokio::test]
async fn test_exhausted_ladder_leaves_empty_results() {
    let mut agent = agent(FakeNominatim::default());
    agent.detect_location().await.unwrap();

    let report = agent
        .search(SearchInput::Topic(TopicId::Beaches))
        .await
        .unwrap();
    assert_eq!(report.total, 0);
    assert!(agent.state().results.is_empty());
    assert!(agent.state().has_searched);
    assert!(!agent.state().is_loading);
    assert_eq!(agent.fetcher().backend().calls().len(), 1 + 2 + 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_superseded_search_is_discarded() {
    let mut agent = agent(
        FakeNominatim::default()
            .answer("Atrações em Lisboa", vec![hit("Lisboa", 30.0)])
            .answer("Atrações em Porto", vec![hit("Porto", 32.0)])
            .delay("Atrações em Lisboa", Duration::from_secs(5))
            .delay("Atrações em Porto", Duration::from_millis(50)),
    );
    let fetcher = agent.fetcher();

    let slow = agent
        .begin_search(SearchInput::FreeText("Lisboa".into()), MergeMode::Fresh)
        .unwrap();
    let fast = agent
        .begin_search(SearchInput::FreeText("Porto".into()), MergeMode::Fresh)
        .unwrap();
    assert!(agent.state().is_loading);

    let (slow, fast) = tokio::join!(slow.run(&fetcher), fast.run(&fetcher));

    assert!(matches!(agent.apply(fast), ApplyOutcome::Applied(_)));
    assert!(matches!(agent.apply(slow), ApplyOutcome::Stale { .. }));

    let names: Vec<_> = agent.state().results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Porto"]);
    assert!(!agent.state().is_loading);
}

#[tokio::test]
async fn test_superseded_response_is_stale_in_any_order() {
    let mut agent = agent(
        FakeNominatim::default()
            .answer("Atrações em Lisboa", vec![hit("Lisboa", 30.0)])
            .answer("Atrações em Porto", vec![hit("Porto", 32.0)]),
    );
    let fetcher = agent.fetcher();

    let first = agent
        .begin_search(SearchInput::FreeText("Lisboa".into()), MergeMode::Fresh)
        .unwrap();
    let second = agent
        .begin_search(SearchInput::FreeText("Porto".into()), MergeMode::Fresh)
        .unwrap();
    let first = first.run(&fetcher).await;
    let second = second.run(&fetcher).await;

    assert!(matches!(agent.apply(first), ApplyOutcome::Stale { .. }));
    assert!(agent.state().is_loading, "newer search still in flight");
    assert!(agent.state().results.is_empty());
    assert!(matches!(agent.apply(second), ApplyOutcome::Applied(_)));
    assert_eq!(agent.state().results[0].name, "Porto");
}

#[tokio::test]
async fn test_location_failure_still_searches() {
    let backend = Arc::new(
        FakeNominatim::default().answer("Pontos turísticos", vec![hit("Marco Zero", 0.001)]),
    );
    let mut agent = SmartTravelAgent::new(
        Arc::clone(&backend),
        NoPosition,
        backend,
        SearchConfig::default(),
    );

    assert!(agent.detect_location().await.is_err());
    assert_eq!(agent.state().user_location.name, "Localização Atual");

    agent.search(SearchInput::Topic(TopicId::Nearby)).await;
    let state = agent.state();
    assert_eq!(state.results.len(), 1);
    assert_eq!(state.results[0].distance_km, "");

    let calls = agent.fetcher().backend().calls();
    assert!(calls[0].viewbox.is_none(), "no box without coordinates");
}

#[tokio::test]
async fn test_explore_country_pages_walk_the_hubs() {
    let mut agent = agent(
        FakeNominatim::default()
            .answer("Pontos turísticos em Rio de Janeiro", vec![hit("Cristo Redentor", 14.0)])
            .answer("Pontos turísticos em São Paulo", vec![hit("MASP", 15.5)]),
    );
    agent.detect_location().await.unwrap();

    agent.search(SearchInput::Topic(TopicId::ExploreCountry)).await;
    agent.load_more().await;

    let calls = agent.fetcher().backend().calls();
    assert_eq!(calls[0].text, "Pontos turísticos em Rio de Janeiro");
    assert_eq!(calls[1].text, "Pontos turísticos em São Paulo");
    assert!(calls.iter().all(|c| c.viewbox.is_none()));
    assert_eq!(agent.state().results.len(), 2);

    let planner = QueryPlanner::default();
    let hubs = rumo::catalog::reference().national_hubs.len();
    for page in 1..=hubs {
        assert_eq!(planner.hub_for_page(page), planner.hub_for_page(page + hubs));
    }
}

#[tokio::test]
async fn test_load_more_waits_for_search_in_flight() {
    let mut agent = agent(
        FakeNominatim::default()
            .answer("Atrações em Lisboa", vec![hit("Lisboa A", 30.0)])
            .answer("Atrações em Porto", vec![hit("Porto A", 32.0)]),
    );
    let fetcher = agent.fetcher();
    agent.search(SearchInput::FreeText("Lisboa".into())).await;

    let fresh = agent
        .begin_search(SearchInput::FreeText("Porto".into()), MergeMode::Fresh)
        .unwrap();
    assert!(
        agent
            .begin_search(SearchInput::FreeText("ignored".into()), MergeMode::Append)
            .is_none()
    );
    assert!(agent.load_more().await.is_none());

    let response = fresh.run(&fetcher).await;
    assert!(matches!(agent.apply(response), ApplyOutcome::Applied(_)));

    let state = agent.state();
    let names: Vec<_> = state.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Porto A"]);
    assert_eq!(state.page, 1);
    assert_eq!(state.last_query_term, "Porto");
}

#[tokio::test]
async fn test_back_to_back_load_more_requests_each_page_once() {
    let mut agent = agent(
        FakeNominatim::default()
            .answer("Pontos turísticos", vec![hit("Marco Zero", 0.001)])
            .answer("Restaurantes", vec![hit("Restaurante A", 0.002)]),
    );
    agent.detect_location().await.unwrap();
    agent.search(SearchInput::Topic(TopicId::Nearby)).await;

    let next = agent
        .begin_search(SearchInput::Topic(TopicId::Nearby), MergeMode::Append)
        .unwrap();
    assert_eq!(next.page, 2);
    assert!(
        agent
            .begin_search(SearchInput::Topic(TopicId::Nearby), MergeMode::Append)
            .is_none()
    );

    let response = next.run(&agent.fetcher()).await;
    agent.apply(response);
    assert!(!agent.state().is_loading_more);

    let after = agent
        .begin_search(SearchInput::Topic(TopicId::Nearby), MergeMode::Append)
        .unwrap();
    assert_eq!(after.page, 3);
}
