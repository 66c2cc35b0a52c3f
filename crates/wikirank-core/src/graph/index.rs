//! Dense id allocation for canonical names.
//!
//! [`NameIndex`] is an arena: a growable list of names plus a lookup table.
//! Ids come from an explicit monotonic counter (the arena length), so the
//! first time a name is interned decides its id for the rest of the run.
//! Ids are never reused or reassigned.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RankError;

/// Node id type. `u32` covers every public encyclopedia dump and halves
/// the column-index footprint of the adjacency matrix.
pub type NodeId = u32;

/// Bidirectional name ↔ id map with first-seen id assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct NameIndex {
    names: Vec<String>,
    ids: HashMap<String, NodeId>,
}

impl NameIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `name`, allocating the next id if it is new.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::IdSpaceExhausted`] once every [`NodeId`] is taken.
    pub fn intern(&mut self, name: &str) -> Result<NodeId, RankError> {
        if let Some(&id) = self.ids.get(name) {
            return Ok(id);
        }
        let id = next_id(self.names.len())?;
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), id);
        Ok(id)
    }

    /// Id of an already-interned name.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<NodeId> {
        self.ids.get(name).copied()
    }

    /// Name for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::UnknownNodeId`] if `id` was never allocated.
    pub fn name(&self, id: usize) -> Result<&str, RankError> {
        self.names
            .get(id)
            .map(String::as_str)
            .ok_or(RankError::UnknownNodeId {
                id,
                len: self.names.len(),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in id order; position `i` holds the name of id `i`.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `(id, name)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(String::as_str).enumerate()
    }
}

fn next_id(len: usize) -> Result<NodeId, RankError> {
    NodeId::try_from(len).map_err(|_| RankError::IdSpaceExhausted { len })
}

impl From<Vec<String>> for NameIndex {
    /// Rebuild an index from names in id order.
    ///
    /// A repeated name keeps its first id; later copies still occupy their
    /// slot so ids stay aligned with positions.
    fn from(names: Vec<String>) -> Self {
        let mut ids = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if let Ok(id) = NodeId::try_from(i) {
                ids.entry(name.clone()).or_insert(id);
            }
        }
        Self { names, ids }
    }
}

impl From<NameIndex> for Vec<String> {
    fn from(index: NameIndex) -> Self {
        index.names
    }
}
