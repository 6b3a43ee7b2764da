use std::collections::BTreeSet;

use looks_core::LookId;

use crate::signals::LOOK_PARAMETER;

/// A link target offered by the look switcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitcherEntry {
    pub id: LookId,
    pub name: String,
    pub query: Vec<(String, String)>,
}

/// `looks` is expected ordered by name.
pub fn switcher_entries(
    looks: Vec<(LookId, String)>,
    exclude: &BTreeSet<LookId>,
    current_query: &[(String, String)],
) -> Vec<SwitcherEntry> {
    looks
        .into_iter()
        .filter(|(id, _)| !exclude.contains(id))
        .map(|(id, name)| SwitcherEntry {
            id,
            query: switch_query(current_query, &name),
            name,
        })
        .collect()
}

/// The current query with any `look` pair replaced by one naming `name`.
pub fn switch_query(current: &[(String, String)], name: &str) -> Vec<(String, String)> {
    let mut query: Vec<(String, String)> = current
        .iter()
        .filter(|(key, _)| key != LOOK_PARAMETER)
        .cloned()
        .collect();
    query.push((LOOK_PARAMETER.to_string(), name.to_string()));
    query
}
