//! Foreign-key dependency ordering
//!
//! Kahn's algorithm over the table-level FK graph, with a lexicographically
//! ordered ready set so the output is deterministic. Self-references do not
//! contribute to in-degree. Cycles are not broken here: the user resolves
//! them with an `ALTER TABLE … ADD CONSTRAINT` follow-up migration.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use model::Table;

use crate::DiffError;

/// Order `tables` so that every referenced table precedes its referents.
///
/// # Errors
///
/// [`DiffError::UnknownReference`] when a foreign key points outside the
/// input set, [`DiffError::CircularDependency`] when the FK graph is cyclic.
pub fn sort_by_dependencies(tables: &[Table]) -> Result<Vec<Table>, DiffError> {
    let by_name: HashMap<&str, &Table> = tables.iter().map(|t| (t.name.as_str(), t)).collect();

    let mut in_degree: BTreeMap<&str, usize> =
        tables.iter().map(|t| (t.name.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for table in tables {
        for dep in table.foreign_key_tables() {
            if !by_name.contains_key(dep) {
                return Err(DiffError::UnknownReference {
                    table: table.name.clone(),
                    references: dep.to_string(),
                });
            }
            *in_degree.get_mut(table.name.as_str()).unwrap() += 1;
            dependents.entry(dep).or_default().push(table.name.as_str());
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();

    let mut sorted = Vec::with_capacity(tables.len());
    while let Some(name) = ready.iter().next().copied() {
        ready.remove(name);
        sorted.push((*by_name[name]).clone());

        for dependent in dependents.get(name).map(Vec::as_slice).unwrap_or_default() {
            let degree = in_degree.get_mut(dependent).unwrap();
            *degree -= 1;
            if *degree == 0 {
                ready.insert(dependent);
            }
        }
    }

    if sorted.len() < tables.len() {
        let remaining: Vec<String> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(name, _)| (*name).to_string())
            .collect();
        return Err(DiffError::CircularDependency { tables: remaining });
    }

    Ok(sorted)
}
