//! Content-addressed key for execution results.
//!
//! Two tasks with equal keys are expected to produce byte-identical diffs, so
//! the key covers everything that feeds execution: the repository at its
//! revision, the workspace path and fetch mode, and the planned steps
//! (including any deferred conditions they still carry).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{Repository, Step};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionCacheKey {
    pub repository: Repository,
    pub path: String,
    pub only_fetch_workspace: bool,
    pub steps: Vec<Step>,
}

impl ExecutionCacheKey {
    /// Stable SHA-256 hex digest identifying this key.
    ///
    /// Every variable-length field is length-prefixed so that adjacent fields
    /// cannot alias each other.
    pub fn key(&self) -> String {
        let mut h = Sha256::new();
        field(&mut h, self.repository.id.0.as_bytes());
        field(&mut h, self.repository.name.as_bytes());
        field(&mut h, self.repository.rev.as_deref().unwrap_or("").as_bytes());
        field(&mut h, self.path.as_bytes());
        h.update([u8::from(self.only_fetch_workspace)]);

        h.update((self.steps.len() as u64).to_le_bytes());
        for step in &self.steps {
            field(&mut h, step.run.as_bytes());
            field(&mut h, step.container.as_bytes());
            h.update((step.env.len() as u64).to_le_bytes());
            for (k, v) in &step.env {
                field(&mut h, k.as_bytes());
                field(&mut h, v.as_bytes());
            }
            h.update((step.files.len() as u64).to_le_bytes());
            for (k, v) in &step.files {
                field(&mut h, k.as_bytes());
                field(&mut h, v.as_bytes());
            }
            h.update((step.outputs.len() as u64).to_le_bytes());
            for (k, out) in &step.outputs {
                field(&mut h, k.as_bytes());
                field(&mut h, out.value.as_bytes());
                field(&mut h, out.format.as_deref().unwrap_or("").as_bytes());
            }
            field(&mut h, step.if_condition.as_deref().unwrap_or("").as_bytes());
        }
        hex::encode(h.finalize())
    }
}

fn field(h: &mut Sha256, bytes: &[u8]) {
    h.update((bytes.len() as u64).to_le_bytes());
    h.update(bytes);
}
