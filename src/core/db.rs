//! Document database backing every repository.
//!
//! All collections live behind one lock. A write runs against a working copy,
//! the copy is flushed as a JSON snapshot through [`Storage`], and only then
//! replaces the live state. Writes touching several collections (draft
//! promotion, KYC submit) therefore land together or not at all, both in
//! memory and on disk. Readers never observe a half-applied write.

use crate::domain::model::{Draft, Kyc, Session, Shipment, User};
use crate::domain::ports::Storage;
use crate::utils::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Collections {
    /// Keyed by tracking number.
    pub shipments: BTreeMap<String, Shipment>,
    /// Keyed by tracking number.
    pub drafts: BTreeMap<String, Draft>,
    /// Keyed by shipment id; at most one verification record per shipment.
    pub kyc: BTreeMap<String, Kyc>,
    /// Keyed by lowercased email.
    pub users: BTreeMap<String, User>,
    /// Keyed by session token.
    pub sessions: BTreeMap<String, Session>,
}

impl Collections {
    pub fn shipment_by_id(&self, id: &str) -> Option<&Shipment> {
        self.shipments.values().find(|s| s.id == id)
    }

    pub fn shipment_by_id_mut(&mut self, id: &str) -> Option<&mut Shipment> {
        self.shipments.values_mut().find(|s| s.id == id)
    }

    pub fn kyc_by_token(&self, token: &str) -> Option<&Kyc> {
        self.kyc.values().find(|k| k.token == token)
    }
}

pub struct Database {
    state: RwLock<Collections>,
    storage: Arc<dyn Storage>,
    snapshot_path: String,
}

impl Database {
    /// Open the database, loading the last snapshot if one exists.
    pub async fn open(storage: Arc<dyn Storage>, snapshot_path: impl Into<String>) -> Result<Self> {
        let snapshot_path = snapshot_path.into();
        let collections = match storage.read_file(&snapshot_path).await {
            Ok(bytes) => {
                let collections: Collections = serde_json::from_slice(&bytes)?;
                tracing::info!(
                    shipments = collections.shipments.len(),
                    drafts = collections.drafts.len(),
                    kyc = collections.kyc.len(),
                    "Loaded snapshot {}",
                    snapshot_path
                );
                collections
            }
            Err(AppError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No snapshot at {}, starting empty", snapshot_path);
                Collections::default()
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            state: RwLock::new(collections),
            storage,
            snapshot_path,
        })
    }

    pub async fn read<R>(&self, f: impl FnOnce(&Collections) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    /// Apply `f` as one transaction. Nothing is kept if `f` or the flush fails.
    pub async fn write<R>(&self, f: impl FnOnce(&mut Collections) -> Result<R>) -> Result<R> {
        let mut state = self.state.write().await;
        let mut working = state.clone();
        let result = f(&mut working)?;

        let bytes = serde_json::to_vec_pretty(&working)?;
        self.storage.write_file(&self.snapshot_path, &bytes).await?;
        tracing::debug!(bytes = bytes.len(), "Snapshot flushed");

        *state = working;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryStorage;
    use crate::domain::model::Role;
    use chrono::Utc;

    fn user(email: &str) -> User {
        User {
            id: "u1".into(),
            name: "Ada".into(),
            email: email.into(),
            password_hash: "h".into(),
            role: Role::User,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_untouched() {
        let db = Database::open(Arc::new(MemoryStorage::new()), "db.json")
            .await
            .unwrap();

        let result: Result<()> = db
            .write(|c| {
                c.users.insert("a@b.co".into(), user("a@b.co"));
                Err(AppError::conflict("boom"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(db.read(|c| c.users.len()).await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_is_reloaded() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let db = Database::open(storage.clone(), "db.json").await.unwrap();
        db.write(|c| {
            c.users.insert("a@b.co".into(), user("a@b.co"));
            Ok(())
        })
        .await
        .unwrap();

        let reopened = Database::open(storage, "db.json").await.unwrap();
        assert!(reopened.read(|c| c.users.contains_key("a@b.co")).await);
    }
}
