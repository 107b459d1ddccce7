use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use futures::executor::block_on;
use gmde_core::{Code, State, StateCatalog, StateDate};
use gmde_recon::chain::MappingChain;
use gmde_recon::model::Hop;
use gmde_recon::{
    compose, identify_state, map_dataset, project_to_newest, ComposeOptions, CorrespondenceEdge,
    CorrespondenceSource, FetchError, MatchMethod, Observation, ReconError, StampedCode,
    TargetSpec,
};

// -------------------------------------------------------------------------
// Fixtures
// -------------------------------------------------------------------------
//
// 2010: 1 A, 2 B, 3 C
// 2012: B renamed to B-neu
// 2014: C splits into C-Nord (4) and C-Süd (5)
// 2016: A and B-neu merge into AB (6)

fn d(s: &str) -> StateDate {
    s.parse().unwrap()
}

const D0: &str = "01-01-2010";
const D1: &str = "01-01-2012";
const D2: &str = "01-01-2014";
const D3: &str = "01-01-2016";

fn state(date: &str, codes: &[(Code, &str)]) -> State {
    State::new(d(date), codes.iter().map(|(c, n)| (*c, n.to_string())).collect())
}

fn catalog() -> StateCatalog {
    StateCatalog::new(vec![
        state(D0, &[(1, "A"), (2, "B"), (3, "C")]),
        state(D1, &[(1, "A"), (2, "B-neu"), (3, "C")]),
        state(D2, &[(1, "A"), (2, "B-neu"), (4, "C-Nord"), (5, "C-Süd")]),
        state(D3, &[(6, "AB"), (4, "C-Nord"), (5, "C-Süd")]),
    ])
    .unwrap()
}

fn edges(rows: &[(Code, &str, Code, &str)]) -> Vec<CorrespondenceEdge> {
    rows.iter()
        .map(|(oc, on, tc, tn)| CorrespondenceEdge::new(*oc, *on, *tc, *tn))
        .collect()
}

fn tables() -> HashMap<(StateDate, StateDate), Vec<CorrespondenceEdge>> {
    let to_newest = edges(&[
        (1, "A", 6, "AB"),
        (2, "B", 6, "AB"),
        (3, "C", 4, "C-Nord"),
        (3, "C", 5, "C-Süd"),
    ]);
    HashMap::from([
        (
            (d(D0), d(D1)),
            edges(&[(1, "A", 1, "A"), (2, "B", 2, "B-neu"), (3, "C", 3, "C")]),
        ),
        (
            (d(D1), d(D2)),
            edges(&[
                (1, "A", 1, "A"),
                (2, "B-neu", 2, "B-neu"),
                (3, "C", 4, "C-Nord"),
                (3, "C", 5, "C-Süd"),
            ]),
        ),
        (
            (d(D2), d(D3)),
            edges(&[
                (1, "A", 6, "AB"),
                (2, "B-neu", 6, "AB"),
                (4, "C-Nord", 4, "C-Nord"),
                (5, "C-Süd", 5, "C-Süd"),
            ]),
        ),
        ((d(D0), d(D3)), to_newest),
        (
            (d(D1), d(D3)),
            edges(&[
                (1, "A", 6, "AB"),
                (2, "B-neu", 6, "AB"),
                (3, "C", 4, "C-Nord"),
                (3, "C", 5, "C-Süd"),
            ]),
        ),
        (
            (d(D0), d(D2)),
            edges(&[
                (1, "A", 1, "A"),
                (2, "B", 2, "B-neu"),
                (3, "C", 4, "C-Nord"),
                (3, "C", 5, "C-Süd"),
            ]),
        ),
    ])
}

/// In-memory correspondence tables that record every lookup.
struct FakeSource {
    tables: HashMap<(StateDate, StateDate), Vec<CorrespondenceEdge>>,
    calls: Mutex<Vec<(StateDate, StateDate)>>,
}

impl FakeSource {
    fn new() -> Self {
        Self::with_tables(tables())
    }

    fn with_tables(tables: HashMap<(StateDate, StateDate), Vec<CorrespondenceEdge>>) -> Self {
        Self {
            tables,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn without(pair: (&str, &str)) -> Self {
        let mut tables = tables();
        tables.remove(&(d(pair.0), d(pair.1)));
        Self::with_tables(tables)
    }

    fn calls(&self) -> BTreeSet<(StateDate, StateDate)> {
        self.calls.lock().unwrap().iter().copied().collect()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CorrespondenceSource for FakeSource {
    fn fetch(
        &self,
        origin: StateDate,
        target: StateDate,
    ) -> impl Future<Output = Result<Vec<CorrespondenceEdge>, FetchError>> + Send {
        self.calls.lock().unwrap().push((origin, target));
        let result = self
            .tables
            .get(&(origin, target))
            .cloned()
            .ok_or_else(|| FetchError::Http {
                status: 500,
                body: format!("no table {origin} -> {target}"),
            });
        std::future::ready(result)
    }
}

/// Ready after being polled `0` more times, waking itself in between.
struct YieldTurns(usize);

impl Future for YieldTurns {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 == 0 {
            return Poll::Ready(());
        }
        self.0 -= 1;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Same tables as [`FakeSource`], but a lookup starting at an older date
/// takes more turns to finish, so earlier hops complete last.
struct LaggingSource {
    inner: FakeSource,
    finished: Mutex<Vec<(StateDate, StateDate)>>,
}

impl LaggingSource {
    fn new() -> Self {
        Self {
            inner: FakeSource::new(),
            finished: Mutex::new(Vec::new()),
        }
    }

    fn turns(origin: StateDate) -> usize {
        match origin.to_string().as_str() {
            D0 => 30,
            D1 => 20,
            D2 => 10,
            _ => 0,
        }
    }

    fn finished(&self) -> Vec<(StateDate, StateDate)> {
        self.finished.lock().unwrap().clone()
    }
}

impl CorrespondenceSource for LaggingSource {
    fn fetch(
        &self,
        origin: StateDate,
        target: StateDate,
    ) -> impl Future<Output = Result<Vec<CorrespondenceEdge>, FetchError>> + Send {
        let lookup = self.inner.fetch(origin, target);
        async move {
            YieldTurns(Self::turns(origin)).await;
            self.finished.lock().unwrap().push((origin, target));
            lookup.await
        }
    }
}

fn hop(origin: &str, target: &str) -> Hop {
    Hop {
        origin: d(origin),
        target: d(target),
        edges: tables()[&(d(origin), d(target))].clone(),
    }
}

// -------------------------------------------------------------------------
// State identification
// -------------------------------------------------------------------------

#[test]
fn exact_state_is_found_by_code_count() {
    let catalog = StateCatalog::new(vec![
        state("01-01-2000", &[(261, "A"), (262, "B"), (263, "C"), (264, "D")]),
        state("01-01-2010", &[(261, "A"), (262, "B"), (263, "C")]),
    ])
    .unwrap();
    let obs = vec![
        Observation::new(261, "A"),
        Observation::new(262, "B"),
        Observation::new(263, "C"),
    ];

    let found = identify_state(&catalog, &obs).unwrap();
    assert_eq!(found.state, d("01-01-2010"));
    assert_eq!(found.method, MatchMethod::CodeCount);
    assert_eq!(found.correction, None);
}

#[test]
fn never_issued_code_is_resolved_through_its_name() {
    let catalog = StateCatalog::new(vec![
        state("01-01-2000", &[(261, "A"), (262, "B"), (263, "C")]),
        state("01-01-2020", &[(261, "A"), (262, "B"), (270, "Alt-Dorf")]),
    ])
    .unwrap();
    let obs = vec![
        Observation::new(261, "A"),
        Observation::new(262, "B"),
        Observation::new(999_999, "Alt-Dorf"),
    ];

    let found = identify_state(&catalog, &obs).unwrap();
    assert_eq!(found.state, d("01-01-2020"));
    assert_eq!(found.method, MatchMethod::BackwardInference);
    let correction = found.correction.unwrap();
    assert_eq!(correction.get(999_999), Some(270));
    assert!(correction.unresolved().is_empty());
}

#[test]
fn codes_from_no_single_state_are_not_found() {
    let obs = vec![Observation::code_only(1), Observation::code_only(6)];
    let err = identify_state(&catalog(), &obs).unwrap_err();
    assert!(matches!(err, ReconError::StateNotFound { codes: 2 }));
}

// -------------------------------------------------------------------------
// Composition
// -------------------------------------------------------------------------

#[test]
fn list_target_is_the_left_fold_of_consecutive_hops() {
    let source = FakeSource::new();
    let result = block_on(compose(
        &catalog(),
        &source,
        d(D0),
        &TargetSpec::List(vec![d(D1), d(D2)]),
        ComposeOptions::default(),
    ))
    .unwrap();

    let expected = MappingChain::fold(d(D0), vec![hop(D0, D1), hop(D1, D2)]);
    assert_eq!(result.chain, expected);
    assert_eq!(source.calls(), BTreeSet::from([(d(D0), d(D1)), (d(D1), d(D2))]));

    let origin_codes: BTreeSet<Code> = result
        .chain
        .rows()
        .iter()
        .filter_map(|r| r.origin().map(|l| l.code))
        .collect();
    assert_eq!(origin_codes, BTreeSet::from([1, 2, 3]));
}

#[test]
fn fold_follows_dates_not_completion_order() {
    let catalog = catalog();
    let lagging = LaggingSource::new();
    let target = TargetSpec::Range(d(D1), d(D3));

    let slow = block_on(compose(&catalog, &lagging, d(D0), &target, ComposeOptions::default()))
        .unwrap();
    let fast = block_on(compose(
        &catalog,
        &FakeSource::new(),
        d(D0),
        &target,
        ComposeOptions::default(),
    ))
    .unwrap();

    assert_eq!(
        lagging.finished(),
        vec![(d(D2), d(D3)), (d(D1), d(D2)), (d(D0), d(D1))]
    );
    assert_eq!(slow.chain, fast.chain);
    assert_eq!(
        slow.chain,
        MappingChain::fold(d(D0), vec![hop(D0, D1), hop(D1, D2), hop(D2, D3)])
    );
}

#[test]
fn range_target_equals_the_listed_states() {
    let catalog = catalog();
    let range_source = FakeSource::new();
    let list_source = FakeSource::new();

    let by_range = block_on(compose(
        &catalog,
        &range_source,
        d(D0),
        &TargetSpec::Range(d(D1), d(D3)),
        ComposeOptions::default(),
    ))
    .unwrap();
    let by_list = block_on(compose(
        &catalog,
        &list_source,
        d(D0),
        &TargetSpec::List(vec![d(D1), d(D2), d(D3)]),
        ComposeOptions::default(),
    ))
    .unwrap();

    assert_eq!(by_range.chain, by_list.chain);
    assert_eq!(range_source.call_count(), 3);
}

#[test]
fn splits_multiply_rows_and_merges_share_a_terminal() {
    let result = block_on(compose(
        &catalog(),
        &FakeSource::new(),
        d(D0),
        &TargetSpec::parse("01-01-2012..01-01-2016").unwrap(),
        ComposeOptions::default(),
    ))
    .unwrap();

    let chain = &result.chain;
    assert_eq!(chain.len(), 4);
    assert_eq!(chain.fanout(), BTreeMap::from([(3, 2)]));

    let terminals: Vec<Code> = chain
        .rows_for_origin(2)
        .filter_map(|r| r.terminal().map(|l| l.code))
        .collect();
    assert_eq!(terminals, vec![6]);
}

#[test]
fn targets_before_the_origin_are_sorted_in() {
    let source = FakeSource::new();
    let result = block_on(compose(
        &catalog(),
        &source,
        d(D1),
        &TargetSpec::List(vec![d(D3), d(D0)]),
        ComposeOptions::default(),
    ))
    .unwrap();

    assert_eq!(result.chain.dates(), &[d(D0), d(D1), d(D3)]);
    assert_eq!(source.calls(), BTreeSet::from([(d(D0), d(D1)), (d(D1), d(D3))]));
}

#[test]
fn off_catalog_dates_are_snapped_and_reported() {
    let result = block_on(compose(
        &catalog(),
        &FakeSource::new(),
        d("15-06-2011"),
        &TargetSpec::Single(d("20-12-2013")),
        ComposeOptions::default(),
    ))
    .unwrap();

    assert_eq!(result.origin.date, d(D0));
    assert!(!result.origin.is_exact());
    assert_eq!(result.targets[0].date, d(D2));
    assert_eq!(result.chain.dates(), &[d(D0), d(D2)]);
}

#[test]
fn same_origin_and_target_is_an_identity_chain() {
    let source = FakeSource::new();
    let result = block_on(compose(
        &catalog(),
        &source,
        d(D3),
        &TargetSpec::Single(d(D3)),
        ComposeOptions::default(),
    ))
    .unwrap();

    assert_eq!(result.chain.len(), 3);
    assert_eq!(result.chain.dates(), &[d(D3)]);
    assert_eq!(source.call_count(), 0);
}

#[test]
fn names_can_be_dropped() {
    let result = block_on(compose(
        &catalog(),
        &FakeSource::new(),
        d(D0),
        &TargetSpec::Single(d(D1)),
        ComposeOptions { with_names: false },
    ))
    .unwrap();

    assert_eq!(
        result.chain.header(),
        vec!["bfs_gmde_code_01-01-2010", "bfs_gmde_code_01-01-2012"]
    );
    assert!(result
        .chain
        .rows()
        .iter()
        .flat_map(|r| r.links.iter().flatten())
        .all(|l| l.name.is_none()));
}

#[test]
fn one_failed_hop_aborts_the_composition() {
    let source = FakeSource::without((D1, D2));
    let err = block_on(compose(
        &catalog(),
        &source,
        d(D0),
        &TargetSpec::List(vec![d(D1), d(D2)]),
        ComposeOptions::default(),
    ))
    .unwrap_err();

    match err {
        ReconError::FetchFailed { origin, target, .. } => {
            assert_eq!((origin, target), (d(D1), d(D2)));
        }
        other => panic!("expected FetchFailed, got {other:?}"),
    }
}

#[test]
fn malformed_ranges_are_rejected() {
    let err = TargetSpec::parse("01-01-2010..01-01-2012..01-01-2014").unwrap_err();
    assert!(matches!(err, ReconError::AmbiguousDateRange(3)));
    let err = TargetSpec::range(vec![d(D0)]).unwrap_err();
    assert!(matches!(err, ReconError::AmbiguousDateRange(1)));
}

// -------------------------------------------------------------------------
// Dataset mapping
// -------------------------------------------------------------------------

#[test]
fn dataset_is_identified_and_mapped_to_the_newest_state() {
    let obs = vec![
        Observation::new(1, "A"),
        Observation::new(2, "B"),
        Observation::new(3, "C"),
        Observation::new(9040, "Zürichsee"),
    ];
    let mapping = block_on(map_dataset(
        &catalog(),
        &FakeSource::new(),
        &obs,
        None,
        None,
        ComposeOptions::default(),
    ))
    .unwrap();

    assert_eq!(mapping.origin, d(D0));
    assert_eq!(mapping.link_dates(), vec![d(D3)]);

    let sources: Vec<usize> = mapping.rows.iter().map(|r| r.source).collect();
    assert_eq!(sources, vec![0, 1, 2, 2, 3]);
    let terminals: Vec<Option<Code>> = mapping
        .rows
        .iter()
        .map(|r| r.links[0].as_ref().map(|l| l.code))
        .collect();
    assert_eq!(terminals, vec![Some(6), Some(6), Some(4), Some(5), None]);
    assert_eq!(mapping.unmatched().count(), 1);
}

#[test]
fn dataset_with_known_origin_gets_corrected() {
    let obs = vec![Observation::new(1, "A"), Observation::new(777_777, "B-neu")];
    let mapping = block_on(map_dataset(
        &catalog(),
        &FakeSource::new(),
        &obs,
        Some(d(D1)),
        Some(&TargetSpec::Single(d(D2))),
        ComposeOptions::default(),
    ))
    .unwrap();

    assert!(mapping.identified.is_none());
    assert_eq!(mapping.correction.as_ref().and_then(|c| c.get(777_777)), Some(2));
    assert_eq!(mapping.rows[1].code, 2);
    assert_eq!(
        mapping.link_header(),
        vec!["bfs_gmde_code_01-01-2014", "bfs_gmde_name_01-01-2014"]
    );
    assert_eq!(mapping.unmatched().count(), 0);
}

#[test]
fn dataset_origin_before_the_catalog_reports_its_fallback() {
    let obs = vec![Observation::new(1, "A"), Observation::new(2, "B")];
    let mapping = block_on(map_dataset(
        &catalog(),
        &FakeSource::new(),
        &obs,
        Some(d("01-01-1990")),
        Some(&TargetSpec::Single(d(D1))),
        ComposeOptions::default(),
    ))
    .unwrap();

    assert_eq!(mapping.origin, d(D0));
    let snap = mapping.origin_snap.expect("caller-given origin is recorded");
    assert_eq!(snap.requested, d("01-01-1990"));
    assert_eq!(snap.date, d(D0));
    assert!(snap.fell_back);
    assert_eq!(mapping.composition.origin, snap);
    assert_eq!(mapping.unmatched().count(), 0);
}

#[test]
fn dataset_origin_between_states_snaps_to_the_earlier_one() {
    let obs = vec![Observation::new(1, "A")];
    let mapping = block_on(map_dataset(
        &catalog(),
        &FakeSource::new(),
        &obs,
        Some(d("01-06-2013")),
        Some(&TargetSpec::Single(d(D2))),
        ComposeOptions::default(),
    ))
    .unwrap();

    let snap = mapping.origin_snap.unwrap();
    assert_eq!(snap.requested, d("01-06-2013"));
    assert_eq!(snap.date, d(D1));
    assert!(!snap.is_exact());
    assert!(!snap.fell_back);
    assert_eq!(mapping.origin, d(D1));
}

#[test]
fn inferred_origin_has_no_snap() {
    let obs = vec![Observation::new(1, "A"), Observation::new(2, "B"), Observation::new(3, "C")];
    let mapping = block_on(map_dataset(
        &catalog(),
        &FakeSource::new(),
        &obs,
        None,
        None,
        ComposeOptions::default(),
    ))
    .unwrap();
    assert!(mapping.origin_snap.is_none());
    assert!(mapping.composition.origin.is_exact());
}

// -------------------------------------------------------------------------
// Projection
// -------------------------------------------------------------------------

fn stamped(code: Option<Code>, as_of: Option<&str>) -> StampedCode {
    StampedCode {
        code,
        as_of: as_of.map(d),
    }
}

fn mixed_rows() -> Vec<StampedCode> {
    vec![
        stamped(Some(1), Some(D0)),
        stamped(Some(3), Some(D1)),
        stamped(Some(4), Some(D2)),
        stamped(Some(6), Some(D3)),
        stamped(None, Some(D1)),
        stamped(Some(99), Some(D0)),
        stamped(Some(5), None),
    ]
}

#[test]
fn mixed_states_are_projected_onto_the_newest() {
    let source = FakeSource::new();
    let projection = block_on(project_to_newest(&source, &mixed_rows())).unwrap();

    assert_eq!(projection.newest, d(D3));
    assert_eq!(
        source.calls(),
        BTreeSet::from([(d(D0), d(D3)), (d(D1), d(D3)), (d(D2), d(D3))])
    );

    let projected: Vec<(usize, Option<Code>)> = projection
        .rows
        .iter()
        .map(|r| (r.source, r.projected))
        .collect();
    assert_eq!(
        projected,
        vec![
            (0, Some(6)),
            (1, Some(4)),
            (1, Some(5)),
            (2, Some(4)),
            (3, Some(6)),
            (4, None),
            (5, None),
            (6, None),
        ]
    );
    assert_eq!(projection.unresolved().count(), 3);
}

#[test]
fn projection_ignores_completion_order() {
    let lagging = LaggingSource::new();
    let slow = block_on(project_to_newest(&lagging, &mixed_rows())).unwrap();
    let fast = block_on(project_to_newest(&FakeSource::new(), &mixed_rows())).unwrap();

    assert_eq!(lagging.finished().first(), Some(&(d(D2), d(D3))));
    assert_eq!(lagging.finished().last(), Some(&(d(D0), d(D3))));
    assert_eq!(slow, fast);
}

#[test]
fn projection_is_idempotent() {
    let first = block_on(project_to_newest(&FakeSource::new(), &mixed_rows())).unwrap();

    let source = FakeSource::new();
    let second = block_on(project_to_newest(&source, &first.restamped())).unwrap();

    assert_eq!(source.call_count(), 0);
    assert_eq!(second.newest, first.newest);
    let codes = |p: &gmde_recon::Projection| p.rows.iter().map(|r| r.projected).collect::<Vec<_>>();
    assert_eq!(codes(&second), codes(&first));
}

#[test]
fn projection_without_dates_fails() {
    let rows = vec![stamped(Some(1), None), stamped(Some(2), None)];
    let err = block_on(project_to_newest(&FakeSource::new(), &rows)).unwrap_err();
    assert!(matches!(err, ReconError::NoStateDates));
}

#[test]
fn projection_aborts_on_failed_lookup() {
    let source = FakeSource::without((D1, D3));
    let err = block_on(project_to_newest(&source, &mixed_rows())).unwrap_err();
    assert!(matches!(err, ReconError::FetchFailed { .. }));
}
