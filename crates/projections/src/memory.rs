use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{ProjectionSnapshot, Result, store::ProjectionStore};

/// In-memory projection store.
#[derive(Clone, Default)]
pub struct InMemoryProjectionStore {
    snapshot: Arc<RwLock<ProjectionSnapshot>>,
}

impl InMemoryProjectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectionStore for InMemoryProjectionStore {
    async fn load(&self) -> Result<ProjectionSnapshot> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save(&self, snapshot: &ProjectionSnapshot) -> Result<()> {
        *self.snapshot.write().await = snapshot.clone();
        Ok(())
    }
}
