//! Reordering and listing of the look tree.
//!
//! A reorder submission is the whole collection in pre-order, each row
//! naming its new parent. Depth is rebuilt from submission order alone with
//! a stack of the currently open ancestors, and weights become `1..=N`.

use std::collections::{HashMap, HashSet};

use looks_core::{LookId, TreeRow, TreeUpdate};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("look {0} does not exist")]
    UnknownLook(LookId),

    #[error("look {0} is submitted more than once")]
    DuplicateRow(LookId),

    #[error("look {id} names parent {parent}, which is not submitted before it")]
    ParentNotPreceding { id: LookId, parent: LookId },

    #[error("look {id} names parent {parent}, which is not one of its open ancestors")]
    ParentNotInPath { id: LookId, parent: LookId },
}

/// One submitted row: a look and its claimed parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderRow {
    pub id: LookId,
    pub parent: Option<LookId>,
}

impl ReorderRow {
    pub fn root(id: LookId) -> Self {
        Self { id, parent: None }
    }

    pub fn child(id: LookId, parent: LookId) -> Self {
        Self {
            id,
            parent: Some(parent),
        }
    }

    /// From raw client ids, where a parent of `0` means root.
    pub fn from_raw(id: i64, parent: i64) -> Option<Self> {
        Some(Self {
            id: LookId::from_raw(id)?,
            parent: LookId::from_raw(parent),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRow {
    pub id: LookId,
    pub parent: Option<LookId>,
    pub weight: i64,
    pub depth: usize,
    pub changed: bool,
}

/// A validated reorder, not yet applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderPlan {
    pub rows: Vec<PlannedRow>,
}

impl ReorderPlan {
    /// Updates for the rows whose parent or weight differ from storage.
    pub fn updates(&self) -> Vec<TreeUpdate> {
        self.rows
            .iter()
            .filter(|row| row.changed)
            .map(|row| TreeUpdate {
                id: row.id,
                parent: row.parent,
                weight: row.weight,
            })
            .collect()
    }

    pub fn is_noop(&self) -> bool {
        self.rows.iter().all(|row| !row.changed)
    }
}

/// A row of the administrative listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineRow {
    pub id: LookId,
    pub name: String,
    pub parent: Option<LookId>,
    pub weight: i64,
    pub depth: usize,
}

pub struct TreeEditor;

impl TreeEditor {
    /// Validate the whole submission against `current` and compute the
    /// rows to write. Nothing is returned unless every row is valid.
    pub fn plan(current: &[TreeRow], submitted: &[ReorderRow]) -> Result<ReorderPlan, ReorderError> {
        let loaded: HashMap<LookId, &TreeRow> = current.iter().map(|row| (row.id, row)).collect();
        let mut seen = HashSet::with_capacity(submitted.len());
        let mut path: Vec<LookId> = Vec::new();
        let mut rows = Vec::with_capacity(submitted.len());

        for (index, row) in submitted.iter().enumerate() {
            let existing = loaded
                .get(&row.id)
                .ok_or(ReorderError::UnknownLook(row.id))?;
            if seen.contains(&row.id) {
                return Err(ReorderError::DuplicateRow(row.id));
            }

            let depth = match row.parent {
                None => {
                    path.clear();
                    0
                }
                Some(parent) => {
                    if !seen.contains(&parent) {
                        return Err(ReorderError::ParentNotPreceding { id: row.id, parent });
                    }
                    let position = path
                        .iter()
                        .position(|open| *open == parent)
                        .ok_or(ReorderError::ParentNotInPath { id: row.id, parent })?;
                    path.truncate(position + 1);
                    position + 1
                }
            };
            path.push(row.id);
            seen.insert(row.id);

            let weight = index as i64 + 1;
            rows.push(PlannedRow {
                id: row.id,
                parent: row.parent,
                weight,
                depth,
                changed: existing.parent != row.parent || existing.weight != weight,
            });
        }
        Ok(ReorderPlan { rows })
    }

    /// Pre-order listing: parents before children, siblings in the order of
    /// `rows` (expected sorted by weight then name). A row whose parent is
    /// missing is listed as a root.
    pub fn outline(rows: &[TreeRow]) -> Vec<OutlineRow> {
        let known: HashSet<LookId> = rows.iter().map(|row| row.id).collect();
        let mut children: HashMap<Option<LookId>, Vec<&TreeRow>> = HashMap::new();
        for row in rows {
            let parent = row.parent.filter(|p| known.contains(p) && *p != row.id);
            children.entry(parent).or_default().push(row);
        }

        let mut listed = Vec::with_capacity(rows.len());
        let mut visited = HashSet::with_capacity(rows.len());
        for root in children.get(&None).into_iter().flatten() {
            walk_subtree(root, &children, &mut visited, &mut listed);
        }
        // rows caught in a parent cycle never hang off a root
        for row in rows {
            if !visited.contains(&row.id) {
                walk_subtree(row, &children, &mut visited, &mut listed);
            }
        }
        listed
    }
}

fn walk_subtree(
    start: &TreeRow,
    children: &HashMap<Option<LookId>, Vec<&TreeRow>>,
    visited: &mut HashSet<LookId>,
    listed: &mut Vec<OutlineRow>,
) {
    let mut stack = vec![(start, 0usize)];
    while let Some((row, depth)) = stack.pop() {
        if !visited.insert(row.id) {
            continue;
        }
        listed.push(OutlineRow {
            id: row.id,
            name: row.name.clone(),
            parent: row.parent,
            weight: row.weight,
            depth,
        });
        if let Some(kids) = children.get(&Some(row.id)) {
            stack.extend(kids.iter().rev().map(|kid| (*kid, depth + 1)));
        }
    }
}
