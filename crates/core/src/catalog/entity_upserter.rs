use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde_json::Value;

use super::{normalize_record, CatalogRepositoryTrait, EntityType};
use crate::errors::Result;

/// What one page of remote records did to the catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageUpsertOutcome {
    pub upserted: usize,
    /// One message per record that could not be normalized.
    pub skipped: Vec<String>,
    /// Latest `last_updated_time` among the accepted records.
    pub max_last_updated: Option<DateTime<Utc>>,
}

/// Normalizes remote records and upserts them into the catalog.
///
/// Upserts are keyed by `(profile_id, entity_type, entity_id)` and overwrite the
/// stored row, so replaying a page is harmless.
pub struct EntityUpserter {
    repository: Arc<dyn CatalogRepositoryTrait>,
}

impl EntityUpserter {
    pub fn new(repository: Arc<dyn CatalogRepositoryTrait>) -> Self {
        Self { repository }
    }

    pub async fn upsert_page(
        &self,
        profile_id: &str,
        entity_type: EntityType,
        items: Vec<Value>,
    ) -> Result<PageUpsertOutcome> {
        let mut outcome = PageUpsertOutcome::default();
        let mut entities = Vec::with_capacity(items.len());

        for (index, payload) in items.into_iter().enumerate() {
            let record = match normalize_record(entity_type, &payload) {
                Ok(record) => record,
                Err(reason) => {
                    warn!(
                        "Skipping {} record #{} for profile {}: {}",
                        entity_type, index, profile_id, reason
                    );
                    outcome.skipped.push(reason);
                    continue;
                }
            };
            if let Some(updated) = record.last_updated_time() {
                outcome.max_last_updated = Some(match outcome.max_last_updated {
                    Some(current) if current >= updated => current,
                    _ => updated,
                });
            }
            entities.push(record.into_catalog_entity(profile_id, payload));
        }

        if entities.is_empty() {
            return Ok(outcome);
        }

        outcome.upserted = self.repository.upsert_entities(entities).await?;
        debug!(
            "Upserted {} {} for profile {} ({} skipped)",
            outcome.upserted,
            entity_type,
            profile_id,
            outcome.skipped.len()
        );
        Ok(outcome)
    }
}
