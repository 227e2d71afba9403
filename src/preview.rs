//! In-memory store of deployment previews awaiting approval.
//!
//! A preview is created by the `preview_deployment` tool, taken (removed) when
//! the operator deploys it and removed on cancel. Nothing is persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{summarize_changes, FileChange};

/// Previews older than this are dropped on the next insert.
const PREVIEW_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPreview {
    pub id: String,
    pub files: Vec<FileChange>,
    pub message: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct PreviewStore {
    previews: Arc<RwLock<HashMap<String, DeploymentPreview>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, files: Vec<FileChange>, message: String) -> DeploymentPreview {
        let preview = DeploymentPreview {
            id: Uuid::new_v4().to_string(),
            summary: summarize_changes(&files),
            files,
            message,
            created_at: Utc::now(),
        };

        let mut previews = self.previews.write().await;
        let cutoff = Utc::now() - chrono::Duration::hours(PREVIEW_TTL_HOURS);
        previews.retain(|_, p| p.created_at > cutoff);
        previews.insert(preview.id.clone(), preview.clone());
        debug!("Stored preview {} ({})", preview.id, preview.summary);
        preview
    }

    pub async fn get(&self, id: &str) -> Option<DeploymentPreview> {
        self.previews.read().await.get(id).cloned()
    }

    /// Remove and return a preview for deployment.
    pub async fn take(&self, id: &str) -> Option<DeploymentPreview> {
        self.previews.write().await.remove(id)
    }

    /// Put a preview back after a failed deployment.
    pub async fn restore(&self, preview: DeploymentPreview) {
        self.previews
            .write()
            .await
            .insert(preview.id.clone(), preview);
    }

    pub async fn cancel(&self, id: &str) -> bool {
        self.previews.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.previews.read().await.len()
    }
}
