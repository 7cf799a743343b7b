//! Behavioral properties of the ticker engine

use proptest::prelude::*;
use proptest::test_runner::Config;

use trendsite_ticker::repo::sort_by_trending;
use trendsite_ticker::sim::RecordingHost;
use trendsite_ticker::{
    Direction, FetchError, FixtureSource, LoopStrategy, Phase, Ticker, TickerConfig, TickerEvent,
    TickerState, TrendingRepo,
};

fn repo(name: &str, score: f64) -> TrendingRepo {
    TrendingRepo {
        name: name.to_string(),
        url: format!("https://github.com/{}", name),
        stars_today: 1,
        language: "Rust".to_string(),
        trending_score: score,
    }
}

proptest! {
    #![proptest_config(Config::with_cases(256))]

    #[test]
    fn position_stays_within_bounds(
        content in 0.0_f64..5000.0,
        container in 1.0_f64..2000.0,
        steps in prop::collection::vec(0.0_f64..8000.0, 1..200),
        hide_every in 0_usize..20,
        strategy in prop_oneof![Just(LoopStrategy::Bounce), Just(LoopStrategy::Wraparound)],
    ) {
        let mut state = TickerState::new(TickerConfig {
            strategy,
            ..TickerConfig::default()
        });
        state.set_layout(content, container);
        state.set_visible(true);

        let mut now = 0.0;
        for (i, dt) in steps.iter().enumerate() {
            if hide_every > 0 && i % hide_every == 0 {
                state.set_visible(!state.is_visible());
            }
            now += dt;
            state.advance(now);
            prop_assert!(state.position() <= 0.0);
            prop_assert!(state.position() >= state.min_position());
            if strategy == LoopStrategy::Wraparound {
                // never scrolls past one copy of the duplicated strip
                prop_assert!(-state.position() <= content / 2.0);
                prop_assert_eq!(state.direction(), Direction::Reverse);
            }
        }
    }

    #[test]
    fn sort_is_descending_and_stable(scores in prop::collection::vec(0_u8..5, 0..40)) {
        let mut repos: Vec<TrendingRepo> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| repo(&format!("r/{}", i), *s as f64))
            .collect();
        sort_by_trending(&mut repos);

        for pair in repos.windows(2) {
            prop_assert!(pair[0].trending_score >= pair[1].trending_score);
            if pair[0].trending_score == pair[1].trending_score {
                let a: usize = pair[0].name[2..].parse().unwrap();
                let b: usize = pair[1].name[2..].parse().unwrap();
                prop_assert!(a < b);
            }
        }
    }
}

#[test]
fn dwell_holds_position_then_reverses() {
    let mut state = TickerState::new(TickerConfig::default());
    state.set_layout(650.0, 400.0);
    state.set_visible(true);

    // 16ms frames until the first flip
    let mut now = 0.0;
    while state.direction() == Direction::Reverse {
        now += 16.0;
        state.advance(now);
    }
    let flipped_at = now;
    assert_eq!(state.position(), -250.0);

    while now + 16.0 < flipped_at + 2000.0 {
        now += 16.0;
        state.advance(now);
        assert_eq!(state.position(), -250.0);
        assert!(state.is_paused());
    }

    now = flipped_at + 2500.0;
    state.advance(now);
    assert!(state.position() > -250.0);
    assert_eq!(state.direction(), Direction::Forward);
}

#[test]
fn hidden_widget_has_no_pending_frames() {
    let mut ticker = Ticker::new(TickerConfig::default(), RecordingHost::new());
    ticker.dispatch(TickerEvent::DataLoaded(Ok(vec![repo("a/b", 1.0)])));
    ticker.set_layout(2000.0, 500.0);
    ticker.set_visibility(1.0);

    let mut now = 0.0;
    for _ in 0..30 {
        let id = ticker.pending_frame().expect("running ticker has a frame pending");
        ticker.host_mut().fire(id);
        ticker.on_frame(id, now);
        now += 16.0;
        assert!(ticker.host().outstanding() <= 1);
    }

    ticker.set_visibility(0.0);
    let frozen = ticker.machine().state().position();
    assert_eq!(ticker.pending_frame(), None);
    assert_eq!(ticker.host().outstanding(), 0);

    ticker.set_visibility(0.0);
    assert_eq!(ticker.host().outstanding(), 0);
    assert_eq!(ticker.machine().state().position(), frozen);

    ticker.set_visibility(1.0);
    assert_eq!(ticker.host().outstanding(), 1);
    assert_eq!(ticker.host().max_outstanding(), 1);
}

#[test]
fn stale_frame_is_ignored() {
    let mut ticker = Ticker::new(TickerConfig::default(), RecordingHost::new());
    ticker.dispatch(TickerEvent::DataLoaded(Ok(vec![repo("a/b", 1.0)])));
    ticker.set_layout(2000.0, 500.0);
    ticker.set_visibility(1.0);
    let first = ticker.pending_frame().unwrap();

    ticker.set_visibility(0.0);
    ticker.set_visibility(1.0);
    let second = ticker.pending_frame().unwrap();
    assert_ne!(first, second);

    let offsets_before = ticker.host().offsets.len();
    ticker.on_frame(first, 1000.0);
    assert_eq!(ticker.pending_frame(), Some(second));
    assert_eq!(ticker.host().offsets.len(), offsets_before);
}

#[test]
fn teardown_leaves_nothing_scheduled() {
    let mut ticker = Ticker::new(TickerConfig::default(), RecordingHost::new());
    ticker.dispatch(TickerEvent::DataLoaded(Ok(vec![repo("a/b", 1.0)])));
    ticker.set_visibility(1.0);
    assert_eq!(ticker.host().outstanding(), 1);

    ticker.teardown();
    assert_eq!(ticker.host().outstanding(), 0);
    assert_eq!(ticker.machine().phase(), Phase::TornDown);

    ticker.set_visibility(1.0);
    assert_eq!(ticker.host().outstanding(), 0);
}

#[tokio::test]
async fn unreachable_fixture_shows_fallback_and_never_animates() {
    let dir = tempfile::tempdir().unwrap();
    let mut ticker = Ticker::new(TickerConfig::default(), RecordingHost::new());
    ticker.set_visibility(1.0);
    ticker
        .load(&FixtureSource::File(dir.path().join("missing.json")))
        .await;
    ticker.set_visibility(0.5);
    ticker.set_layout(2000.0, 400.0);

    assert_eq!(ticker.machine().phase(), Phase::Unavailable);
    assert_eq!(ticker.host().frames_requested, 0);
    assert_eq!(ticker.host().mounted.len(), 1);
    assert!(ticker.host().mounted[0].contains("temporarily unavailable"));
}

#[tokio::test]
async fn malformed_fixture_shows_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trending.json");
    std::fs::write(&path, "[{\"name\": 3}]").unwrap();

    let mut ticker = Ticker::new(TickerConfig::default(), RecordingHost::new());
    ticker.set_visibility(1.0);
    ticker.load(&FixtureSource::File(path)).await;

    assert_eq!(ticker.machine().phase(), Phase::Unavailable);
    assert_eq!(ticker.host().frames_requested, 0);
}

#[test]
fn fetch_error_kinds_display() {
    let err = FetchError::Status(404);
    assert_eq!(err.to_string(), "Fixture endpoint returned HTTP 404");
}
