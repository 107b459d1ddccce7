use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::code::Code;
use crate::date::StateDate;

/// One Gemeindestand: every municipality code valid on `date`, with its name.
#[derive(Debug, Clone)]
pub struct State {
    date: StateDate,
    names: BTreeMap<Code, String>,
    codes_by_name: HashMap<String, Code>,
}

impl State {
    /// When two codes share a name, the lower code keeps it for
    /// [`code_of`](Self::code_of).
    pub fn new(date: StateDate, names: BTreeMap<Code, String>) -> Self {
        let mut codes_by_name: HashMap<String, Code> = HashMap::with_capacity(names.len());
        for (code, name) in &names {
            if let Some(first) = codes_by_name.get(name) {
                log::warn!("Gemeindestand {date}: '{name}' names both {first} and {code}, keeping {first}");
                continue;
            }
            codes_by_name.insert(name.clone(), *code);
        }
        Self {
            date,
            names,
            codes_by_name,
        }
    }

    pub fn date(&self) -> StateDate {
        self.date
    }

    pub fn code_count(&self) -> usize {
        self.names.len()
    }

    pub fn contains(&self, code: Code) -> bool {
        self.names.contains_key(&code)
    }

    /// Superset test: does this state hold every code of `codes`?
    pub fn contains_all(&self, codes: &BTreeSet<Code>) -> bool {
        codes.iter().all(|c| self.names.contains_key(c))
    }

    pub fn name_of(&self, code: Code) -> Option<&str> {
        self.names.get(&code).map(String::as_str)
    }

    pub fn code_of(&self, name: &str) -> Option<Code> {
        self.codes_by_name.get(name).copied()
    }

    pub fn codes(&self) -> impl Iterator<Item = Code> + '_ {
        self.names.keys().copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (Code, &str)> + '_ {
        self.names.iter().map(|(c, n)| (*c, n.as_str()))
    }
}
