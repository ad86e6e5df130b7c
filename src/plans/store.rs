//! Plan persistence.
//!
//! The whole plan set is loaded and saved at once. [`JsonPlanStore`] keeps it
//! in a single JSON document on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::fs;

use crate::error::StoreError;
use crate::plans::model::Plan;

/// Load-all / save-all storage for the plan set.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Load every plan, in stored order.
    async fn load_all(&self) -> Result<Vec<Plan>, StoreError>;

    /// Replace the stored set with `plans`. Readers never see a partial write.
    async fn save_all(&self, plans: &[Plan]) -> Result<(), StoreError>;
}

/// Plans stored as a pretty-printed JSON array in one file.
pub struct JsonPlanStore {
    path: PathBuf,
}

impl JsonPlanStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the document is staged in before the rename.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "plans.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl PlanStore for JsonPlanStore {
    async fn load_all(&self) -> Result<Vec<Plan>, StoreError> {
        let bytes = fs::read(&self.path).await.map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;

        let plans: Vec<Plan> =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        for plan in &plans {
            tracing::debug!(
                plan_id = plan.id,
                channel_id = plan.channel_id,
                period = %plan.period,
                "Loaded plan"
            );
        }
        Ok(plans)
    }

    async fn save_all(&self, plans: &[Plan]) -> Result<(), StoreError> {
        let json = to_pretty_json(plans)?;
        let staging = self.staging_path();
        let write_err = |source: std::io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        fs::write(&staging, &json).await.map_err(write_err)?;
        fs::rename(&staging, &self.path).await.map_err(write_err)?;

        tracing::debug!(count = plans.len(), path = %self.path.display(), "Saved plans");
        Ok(())
    }
}

/// Four-space indented JSON, matching how plan files are hand-edited.
fn to_pretty_json(plans: &[Plan]) -> Result<Vec<u8>, StoreError> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    plans.serialize(&mut serializer)?;
    Ok(out)
}
