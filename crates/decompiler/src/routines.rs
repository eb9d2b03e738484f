//! Engine routine names for ACTION calls.
//!
//! A table maps routine ids to names and records whether a routine leaves
//! a value on the stack. Unknown ids fall back to `Function_<id>` and are
//! assumed to return a value.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::RoutineTableError;

/// One engine routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routine {
    pub name: String,
    /// Whether a call pushes a result.
    pub returns: bool,
}

impl Routine {
    pub fn new(name: impl Into<String>, returns: bool) -> Self {
        Self {
            name: name.into(),
            returns,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Entry {
    Name(String),
    Full {
        name: String,
        #[serde(default = "returns_by_default")]
        returns: bool,
    },
}

fn returns_by_default() -> bool {
    true
}

/// Routine id to [`Routine`] lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutineTable {
    routines: BTreeMap<u16, Routine>,
}

impl RoutineTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u16, routine: Routine) -> Option<Routine> {
        self.routines.insert(id, routine)
    }

    pub fn get(&self, id: u16) -> Option<&Routine> {
        self.routines.get(&id)
    }

    /// Table name for `id`, or `Function_<id>`.
    pub fn name_of(&self, id: u16) -> String {
        match self.routines.get(&id) {
            Some(routine) => routine.name.clone(),
            None => format!("Function_{id}"),
        }
    }

    /// Whether a call to `id` pushes a result. Unknown ids do.
    pub fn returns(&self, id: u16) -> bool {
        self.routines.get(&id).map_or(true, |r| r.returns)
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }

    /// Parse `{"<id>": "Name"}` or `{"<id>": {"name": "Name", "returns": false}}`.
    pub fn from_json(text: &str) -> Result<Self, RoutineTableError> {
        let raw: BTreeMap<String, Entry> = serde_json::from_str(text)?;
        let mut table = Self::new();
        for (key, entry) in raw {
            let id: u16 = key
                .trim()
                .parse()
                .map_err(|_| RoutineTableError::BadId(key.clone()))?;
            let routine = match entry {
                Entry::Name(name) => Routine::new(name, true),
                Entry::Full { name, returns } => Routine::new(name, returns),
            };
            table.insert(id, routine);
        }
        log::debug!("loaded {} routine names", table.len());
        Ok(table)
    }
}

impl FromIterator<(u16, Routine)> for RoutineTable {
    fn from_iter<I: IntoIterator<Item = (u16, Routine)>>(iter: I) -> Self {
        Self {
            routines: iter.into_iter().collect(),
        }
    }
}
