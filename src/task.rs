//! Project task record

use crate::{
    error::Error,
    leaf::{json_canonical_bytes, Canonical},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

/// A task belonging to a project.
///
/// Encoded as compact JSON with fields in declaration order
/// (`{"id":..,"name":..,"status":..}`), so reordering the fields below changes
/// every leaf digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
}

impl Task {
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
        }
    }
}

impl Canonical for Task {
    fn canonical_bytes(&self) -> Result<Vec<u8>, Error> {
        json_canonical_bytes(self)
    }
}
