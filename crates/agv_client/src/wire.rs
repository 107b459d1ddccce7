//! CSV bodies of the AGVCH endpoints. Extra columns are ignored.

use std::collections::{BTreeMap, BTreeSet};

use gmde_core::{Code, StateDate};
use gmde_recon::{CorrespondenceEdge, FetchError};
use serde::Deserialize;

/// Only level-3 rows of a snapshot are municipalities; 1 and 2 are cantons
/// and districts.
const MUNICIPALITY_LEVEL: u8 = 3;

#[derive(Debug, Deserialize)]
struct CorrespondenceRecord {
    #[serde(rename = "InitialCode")]
    initial_code: Code,
    #[serde(rename = "InitialName")]
    initial_name: String,
    #[serde(rename = "TerminalCode")]
    terminal_code: Code,
    #[serde(rename = "TerminalName")]
    terminal_name: String,
}

#[derive(Debug, Deserialize)]
struct MutationRecord {
    #[serde(rename = "MutationDate")]
    mutation_date: String,
}

#[derive(Debug, Deserialize)]
struct SnapshotRecord {
    #[serde(rename = "Level")]
    level: Option<u8>,
    #[serde(rename = "BfsCode")]
    bfs_code: Option<Code>,
    #[serde(rename = "Name")]
    name: String,
}

fn reader(body: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes())
}

fn parse_error(what: &str, e: impl std::fmt::Display) -> FetchError {
    FetchError::Parse(format!("{what}: {e}"))
}

/// Rows of a `/correspondances` response.
pub fn parse_correspondences(body: &str) -> Result<Vec<CorrespondenceEdge>, FetchError> {
    let mut edges = Vec::new();
    for record in reader(body).deserialize::<CorrespondenceRecord>() {
        let r = record.map_err(|e| parse_error("correspondence table", e))?;
        edges.push(CorrespondenceEdge::new(
            r.initial_code,
            r.initial_name,
            r.terminal_code,
            r.terminal_name,
        ));
    }
    Ok(edges)
}

/// Distinct dates of a `/mutations` response, ascending.
pub fn parse_mutation_dates(body: &str) -> Result<Vec<StateDate>, FetchError> {
    let mut dates = BTreeSet::new();
    for record in reader(body).deserialize::<MutationRecord>() {
        let r = record.map_err(|e| parse_error("mutation feed", e))?;
        let date: StateDate = r
            .mutation_date
            .parse()
            .map_err(|e| parse_error("mutation feed", e))?;
        dates.insert(date);
    }
    Ok(dates.into_iter().collect())
}

/// Municipalities of a `/snapshot` response.
pub fn parse_snapshot(body: &str) -> Result<BTreeMap<Code, String>, FetchError> {
    let mut names = BTreeMap::new();
    for record in reader(body).deserialize::<SnapshotRecord>() {
        let r = record.map_err(|e| parse_error("snapshot", e))?;
        if r.level != Some(MUNICIPALITY_LEVEL) {
            continue;
        }
        if let Some(code) = r.bfs_code {
            names.insert(code, r.name);
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correspondences_ignore_extra_columns() {
        let body = "\
InitialStep,InitialCode,InitialName,TerminalStep,TerminalCode,TerminalName,Mutationnumber
1,261,Zürich,1,261,Zürich,
1,3,Bonstetten,2,3,Bonstetten,1234
";
        let edges = parse_correspondences(body).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0], CorrespondenceEdge::new(261, "Zürich", 261, "Zürich"));
        assert!(edges[0].is_unmodified());
    }

    #[test]
    fn missing_correspondence_column_is_a_parse_error() {
        let body = "InitialCode,InitialName\n261,Zürich\n";
        assert!(matches!(parse_correspondences(body), Err(FetchError::Parse(_))));
    }

    #[test]
    fn mutation_dates_are_distinct_and_sorted() {
        let body = "\
MutationNumber,MutationDate,MutationDescription
2,01.01.2013,Fusion
1,01.01.2012,Fusion
3,01.01.2013,Namensänderung
";
        let dates = parse_mutation_dates(body).unwrap();
        assert_eq!(
            dates,
            vec!["01-01-2012".parse().unwrap(), "01-01-2013".parse().unwrap()]
        );
    }

    #[test]
    fn snapshot_keeps_only_municipalities() {
        let body = "\
Identifier,Level,Parent,Name,BfsCode
1,1,,Zürich,1
101,2,1,Bezirk Affoltern,101
10001,3,101,Aeugst am Albis,1
10002,3,101,Affoltern am Albis,2
";
        let names = parse_snapshot(body).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names[&1], "Aeugst am Albis");
        assert_eq!(names[&2], "Affoltern am Albis");
    }
}
