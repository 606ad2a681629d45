//! Startup flow ingest: reconciles a directory of flow YAML files against
//! the store's flow records.
//!
//! A missing record triggers a create; a mismatched checksum triggers an
//! update; a matching checksum is a no-op. This is the only path by which a
//! flow file on disk reaches the store -- a flow is otherwise only created
//! through direct [`flowforge_store::Store`] calls.

use flowforge_flow::{loader, LoadError};
use flowforge_store::Store;
use std::fmt;
use std::path::Path;

/// What happened to one flow file during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No record existed for this flow's slug; one was created.
    Created,
    /// A record existed with a different checksum; it was replaced.
    Updated,
    /// A record existed with a matching checksum; nothing changed.
    Unchanged,
}

/// An error ingesting one flow file.
#[derive(Debug)]
pub enum IngestError {
    /// The file could not be read or parsed.
    Load(LoadError),
    /// The store rejected the create/update/lookup.
    Store(flowforge_store::StoreError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(e) => write!(f, "failed to load flow file: {e}"),
            Self::Store(e) => write!(f, "failed to reconcile flow record: {e}"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<LoadError> for IngestError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

impl From<flowforge_store::StoreError> for IngestError {
    fn from(e: flowforge_store::StoreError) -> Self {
        Self::Store(e)
    }
}

/// Loads one flow file and reconciles it against `store` by slug and
/// content checksum.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be loaded or the store
/// rejects the lookup/create/update.
pub async fn reconcile_flow_file(
    store: &dyn Store,
    path: impl AsRef<Path>,
) -> Result<ReconcileOutcome, IngestError> {
    let flow = loader::load_from_file(path)?;

    match store.get_flow_by_slug(&flow.slug).await? {
        None => {
            store.create_flow(flow).await?;
            Ok(ReconcileOutcome::Created)
        }
        Some((_, existing)) if existing.checksum == flow.checksum => Ok(ReconcileOutcome::Unchanged),
        Some((flow_id, _)) => {
            store.update_flow(flow_id, flow).await?;
            Ok(ReconcileOutcome::Updated)
        }
    }
}

/// Reconciles every `.yaml`/`.yml` file directly inside `dir` (non-recursive)
/// against `store`. A single file's failure is logged and does not abort
/// the rest of the directory.
///
/// # Errors
///
/// Returns an error if `dir` itself cannot be read.
pub async fn reconcile_flow_dir(store: &dyn Store, dir: impl AsRef<Path>) -> std::io::Result<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        );
        if !is_yaml {
            continue;
        }

        match reconcile_flow_file(store, &path).await {
            Ok(outcome) => {
                tracing::info!(path = %path.display(), outcome = ?outcome, "reconciled flow file");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to reconcile flow file");
            }
        }
    }

    Ok(())
}
