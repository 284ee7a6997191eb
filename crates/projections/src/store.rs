use async_trait::async_trait;

use crate::{ProjectionSnapshot, Result};

/// Holds exactly one live projection snapshot, replaced in place.
#[async_trait]
pub trait ProjectionStore: Send + Sync {
    /// Returns the stored snapshot, or [`ProjectionSnapshot::initial`].
    async fn load(&self) -> Result<ProjectionSnapshot>;

    /// Replaces the stored snapshot.
    async fn save(&self, snapshot: &ProjectionSnapshot) -> Result<()>;
}
