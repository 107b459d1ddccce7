//! Fold stage: turn per-hop correspondence tables into one wide table.

use std::collections::{BTreeMap, HashMap};

use gmde_core::{Code, State, StateDate};
use serde::Serialize;

use crate::model::{ChainRow, CorrespondenceEdge, Hop, Link};

pub const CODE_COLUMN_PREFIX: &str = "bfs_gmde_code";
pub const NAME_COLUMN_PREFIX: &str = "bfs_gmde_name";

/// Municipalities traced across a sequence of states, one row per leaf.
///
/// `dates[0]` is the origin. A row holds one link per date; once a path
/// finds no correspondence it stays `None` for every later date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingChain {
    dates: Vec<StateDate>,
    rows: Vec<ChainRow>,
    with_names: bool,
}

impl MappingChain {
    /// Zero-hop chain: every code of `state` maps onto itself.
    pub fn identity(state: &State) -> Self {
        let rows = state
            .entries()
            .map(|(code, name)| ChainRow {
                links: vec![Some(Link::new(code, name))],
            })
            .collect();
        Self {
            dates: vec![state.date()],
            rows,
            with_names: true,
        }
    }

    /// Left-fold `hops` in order. Hop `i + 1` joins on the (code, name) that
    /// hop `i` produced, so every row of the running table survives.
    ///
    /// `hops` must be chronological and chained: each hop starts where the
    /// previous one ended.
    pub fn fold(origin: StateDate, hops: Vec<Hop>) -> Self {
        let mut dates = vec![origin];
        let mut rows: Vec<ChainRow> = Vec::new();

        for (i, hop) in hops.into_iter().enumerate() {
            debug_assert_eq!(dates.last(), Some(&hop.origin), "hops must be chained");
            if i == 0 {
                rows = hop
                    .edges
                    .iter()
                    .map(|e| ChainRow {
                        links: vec![
                            Some(Link::new(e.origin_code, e.origin_name.as_str())),
                            Some(Link::new(e.terminal_code, e.terminal_name.as_str())),
                        ],
                    })
                    .collect();
            } else {
                rows = join_hop(&rows, &hop.edges);
            }
            dates.push(hop.target);
        }

        Self {
            dates,
            rows,
            with_names: true,
        }
    }

    pub fn origin(&self) -> StateDate {
        self.dates[0]
    }

    pub fn dates(&self) -> &[StateDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[ChainRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn with_names(&self) -> bool {
        self.with_names
    }

    /// Drop every name, keeping codes only.
    pub fn strip_names(&mut self) {
        for link in self.rows.iter_mut().flat_map(|r| r.links.iter_mut()).flatten() {
            link.name = None;
        }
        self.with_names = false;
    }

    /// Rows whose origin is `code`.
    pub fn rows_for_origin(&self, code: Code) -> impl Iterator<Item = &ChainRow> + '_ {
        self.rows
            .iter()
            .filter(move |r| r.origin().map(|l| l.code) == Some(code))
    }

    /// Origin codes that fan out into more than one row, with their row
    /// count. Such codes split at some hop.
    pub fn fanout(&self) -> BTreeMap<Code, usize> {
        let mut counts: BTreeMap<Code, usize> = BTreeMap::new();
        for link in self.rows.iter().filter_map(ChainRow::origin) {
            *counts.entry(link.code).or_insert(0) += 1;
        }
        counts.retain(|_, n| *n > 1);
        counts
    }

    /// `bfs_gmde_code_<date>` (and `bfs_gmde_name_<date>`) for every date.
    pub fn header(&self) -> Vec<String> {
        header_for(&self.dates, self.with_names)
    }

    /// Rows as strings, aligned with [`header`](Self::header). Nulls are
    /// empty strings.
    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| link_cells(&row.links, self.with_names))
            .collect()
    }
}

/// Column names for `dates`, in chain order.
pub fn header_for(dates: &[StateDate], with_names: bool) -> Vec<String> {
    let mut header = Vec::with_capacity(dates.len() * 2);
    for date in dates {
        header.push(format!("{CODE_COLUMN_PREFIX}_{date}"));
        if with_names {
            header.push(format!("{NAME_COLUMN_PREFIX}_{date}"));
        }
    }
    header
}

/// String cells for a slice of links, matching [`header_for`].
pub fn link_cells(links: &[Option<Link>], with_names: bool) -> Vec<String> {
    let mut cells = Vec::with_capacity(links.len() * 2);
    for link in links {
        cells.push(link.as_ref().map(|l| l.code.to_string()).unwrap_or_default());
        if with_names {
            cells.push(
                link.as_ref()
                    .and_then(|l| l.name.clone())
                    .unwrap_or_default(),
            );
        }
    }
    cells
}

fn join_hop(rows: &[ChainRow], edges: &[CorrespondenceEdge]) -> Vec<ChainRow> {
    let mut index: HashMap<(Code, &str), Vec<&CorrespondenceEdge>> = HashMap::new();
    for edge in edges {
        index
            .entry((edge.origin_code, edge.origin_name.as_str()))
            .or_default()
            .push(edge);
    }

    let mut joined = Vec::with_capacity(rows.len());
    for row in rows {
        let key = row
            .terminal()
            .map(|l| (l.code, l.name.as_deref().unwrap_or("")));

        match key.and_then(|k| index.get(&k)) {
            Some(next) => {
                for edge in next {
                    let mut links = row.links.clone();
                    links.push(Some(Link::new(edge.terminal_code, edge.terminal_name.as_str())));
                    joined.push(ChainRow { links });
                }
            }
            None => {
                let mut links = row.links.clone();
                links.push(None);
                joined.push(ChainRow { links });
            }
        }
    }
    joined
}
