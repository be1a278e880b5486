use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Remote collections mirrored into the local catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Campaigns,
    AdGroups,
    Ads,
    Targets,
}

impl EntityType {
    /// Parents first, so an `all` sync never stores children ahead of their campaign.
    pub const ALL: [EntityType; 4] = [
        EntityType::Campaigns,
        EntityType::AdGroups,
        EntityType::Ads,
        EntityType::Targets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Campaigns => "campaigns",
            EntityType::AdGroups => "ad_groups",
            EntityType::Ads => "ads",
            EntityType::Targets => "targets",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "campaigns" => Ok(EntityType::Campaigns),
            "ad_groups" => Ok(EntityType::AdGroups),
            "ads" => Ok(EntityType::Ads),
            "targets" => Ok(EntityType::Targets),
            other => Err(Error::validation(format!("Unknown entity type '{}'", other))),
        }
    }
}

/// Delivery state denormalized from the remote payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Enabled,
    Paused,
    Archived,
    Unknown,
}

impl EntityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityState::Enabled => "enabled",
            EntityState::Paused => "paused",
            EntityState::Archived => "archived",
            EntityState::Unknown => "unknown",
        }
    }

    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "enabled" => EntityState::Enabled,
            "paused" => EntityState::Paused,
            "archived" => EntityState::Archived,
            _ => EntityState::Unknown,
        }
    }
}

/// Flat catalog row, keyed by `(profile_id, entity_type, entity_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntity {
    pub profile_id: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub parent_id: Option<String>,
    pub campaign_id: Option<String>,
    pub name: Option<String>,
    pub state: EntityState,
    pub budget_micros: Option<i64>,
    pub bid_micros: Option<i64>,
    pub last_updated_time: Option<DateTime<Utc>>,
    /// The remote payload as received. The remote system is authoritative.
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_serialization_matches_trigger_contract() {
        let actual = EntityType::ALL
            .iter()
            .map(|t| serde_json::to_string(t).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            actual,
            vec!["\"campaigns\"", "\"ad_groups\"", "\"ads\"", "\"targets\""]
        );
        for t in EntityType::ALL {
            assert_eq!(t.as_str().parse::<EntityType>().unwrap(), t);
        }
    }

    #[test]
    fn state_parsing_is_case_insensitive() {
        assert_eq!(EntityState::parse_lenient("ENABLED"), EntityState::Enabled);
        assert_eq!(EntityState::parse_lenient("paused"), EntityState::Paused);
        assert_eq!(EntityState::parse_lenient("pending"), EntityState::Unknown);
    }
}
