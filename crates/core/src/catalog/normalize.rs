//! Normalization of remote catalog payloads.
//!
//! The remote API names the same field differently across endpoints and
//! versions (`campaignId` vs `id`, `dailyBudget` vs `budget.budget`, epoch
//! millis vs `YYYYMMDD`). All of that fallback resolution lives here; the rest
//! of the crate only sees [`NormalizedRecord`] and [`CatalogEntity`].

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::{CatalogEntity, EntityState, EntityType};
use crate::utils::time_utils::{from_epoch, parse_loose_timestamp};

const MICROS_PER_UNIT: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignRecord {
    pub campaign_id: String,
    pub name: Option<String>,
    pub state: EntityState,
    pub targeting_type: Option<String>,
    pub daily_budget_micros: Option<i64>,
    pub last_updated_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdGroupRecord {
    pub ad_group_id: String,
    pub campaign_id: Option<String>,
    pub name: Option<String>,
    pub state: EntityState,
    pub default_bid_micros: Option<i64>,
    pub last_updated_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdRecord {
    pub ad_id: String,
    pub ad_group_id: Option<String>,
    pub campaign_id: Option<String>,
    pub sku: Option<String>,
    pub asin: Option<String>,
    pub state: EntityState,
    pub last_updated_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetRecord {
    pub target_id: String,
    pub ad_group_id: Option<String>,
    pub campaign_id: Option<String>,
    pub expression: Option<String>,
    pub state: EntityState,
    pub bid_micros: Option<i64>,
    pub last_updated_time: Option<DateTime<Utc>>,
}

/// One internal record type per remote entity kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedRecord {
    Campaign(CampaignRecord),
    AdGroup(AdGroupRecord),
    Ad(AdRecord),
    Target(TargetRecord),
}

impl NormalizedRecord {
    pub fn entity_type(&self) -> EntityType {
        match self {
            NormalizedRecord::Campaign(_) => EntityType::Campaigns,
            NormalizedRecord::AdGroup(_) => EntityType::AdGroups,
            NormalizedRecord::Ad(_) => EntityType::Ads,
            NormalizedRecord::Target(_) => EntityType::Targets,
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            NormalizedRecord::Campaign(r) => &r.campaign_id,
            NormalizedRecord::AdGroup(r) => &r.ad_group_id,
            NormalizedRecord::Ad(r) => &r.ad_id,
            NormalizedRecord::Target(r) => &r.target_id,
        }
    }

    pub fn last_updated_time(&self) -> Option<DateTime<Utc>> {
        match self {
            NormalizedRecord::Campaign(r) => r.last_updated_time,
            NormalizedRecord::AdGroup(r) => r.last_updated_time,
            NormalizedRecord::Ad(r) => r.last_updated_time,
            NormalizedRecord::Target(r) => r.last_updated_time,
        }
    }

    /// Flattens the record into the catalog row stored for `profile_id`.
    pub fn into_catalog_entity(self, profile_id: &str, payload: Value) -> CatalogEntity {
        let entity_type = self.entity_type();
        let mut entity = CatalogEntity {
            profile_id: profile_id.to_string(),
            entity_type,
            entity_id: String::new(),
            parent_id: None,
            campaign_id: None,
            name: None,
            state: EntityState::Unknown,
            budget_micros: None,
            bid_micros: None,
            last_updated_time: None,
            payload,
        };
        match self {
            NormalizedRecord::Campaign(r) => {
                entity.campaign_id = Some(r.campaign_id.clone());
                entity.entity_id = r.campaign_id;
                entity.name = r.name;
                entity.state = r.state;
                entity.budget_micros = r.daily_budget_micros;
                entity.last_updated_time = r.last_updated_time;
            }
            NormalizedRecord::AdGroup(r) => {
                entity.entity_id = r.ad_group_id;
                entity.parent_id = r.campaign_id.clone();
                entity.campaign_id = r.campaign_id;
                entity.name = r.name;
                entity.state = r.state;
                entity.bid_micros = r.default_bid_micros;
                entity.last_updated_time = r.last_updated_time;
            }
            NormalizedRecord::Ad(r) => {
                entity.entity_id = r.ad_id;
                entity.parent_id = r.ad_group_id;
                entity.campaign_id = r.campaign_id;
                entity.name = r.sku.or(r.asin);
                entity.state = r.state;
                entity.last_updated_time = r.last_updated_time;
            }
            NormalizedRecord::Target(r) => {
                entity.entity_id = r.target_id;
                entity.parent_id = r.ad_group_id;
                entity.campaign_id = r.campaign_id;
                entity.name = r.expression;
                entity.state = r.state;
                entity.bid_micros = r.bid_micros;
                entity.last_updated_time = r.last_updated_time;
            }
        }
        entity
    }
}

/// Maps one remote payload to its internal record.
///
/// Returns `Err` with a human-readable reason when the payload is unusable
/// (not an object, or missing the remote identifier). Callers treat that as a
/// skipped record, not a failed batch.
pub fn normalize_record(
    entity_type: EntityType,
    payload: &Value,
) -> std::result::Result<NormalizedRecord, String> {
    let obj = payload
        .as_object()
        .ok_or_else(|| format!("{} payload is not a JSON object", entity_type))?;

    let state = first_string(obj, &["state", "status"])
        .map(|s| EntityState::parse_lenient(&s))
        .unwrap_or(EntityState::Unknown);
    let last_updated_time = first_timestamp(
        obj,
        &[
            "lastUpdatedDateTime",
            "lastUpdatedDate",
            "lastUpdatedTime",
            "last_updated_time",
        ],
    )
    .map_err(|field| format!("{} record has an invalid '{}' value", entity_type, field))?;
    let campaign_id = first_string(obj, &["campaignId", "campaign_id"]);
    let ad_group_id = first_string(obj, &["adGroupId", "ad_group_id"]);

    let missing_id = |field: &str| format!("{} record is missing '{}'", entity_type, field);

    let record = match entity_type {
        EntityType::Campaigns => NormalizedRecord::Campaign(CampaignRecord {
            campaign_id: campaign_id
                .or_else(|| first_string(obj, &["id"]))
                .ok_or_else(|| missing_id("campaignId"))?,
            name: first_string(obj, &["name"]),
            state,
            targeting_type: first_string(obj, &["targetingType", "targeting_type"]),
            daily_budget_micros: budget_micros(obj),
            last_updated_time,
        }),
        EntityType::AdGroups => NormalizedRecord::AdGroup(AdGroupRecord {
            ad_group_id: ad_group_id
                .or_else(|| first_string(obj, &["id"]))
                .ok_or_else(|| missing_id("adGroupId"))?,
            campaign_id,
            name: first_string(obj, &["name"]),
            state,
            default_bid_micros: first_number(obj, &["defaultBid", "default_bid", "bid"])
                .map(to_micros),
            last_updated_time,
        }),
        EntityType::Ads => NormalizedRecord::Ad(AdRecord {
            ad_id: first_string(obj, &["adId", "ad_id", "id"])
                .ok_or_else(|| missing_id("adId"))?,
            ad_group_id,
            campaign_id,
            sku: first_string(obj, &["sku"]),
            asin: first_string(obj, &["asin"]),
            state,
            last_updated_time,
        }),
        EntityType::Targets => NormalizedRecord::Target(TargetRecord {
            target_id: first_string(obj, &["targetId", "target_id", "keywordId", "id"])
                .ok_or_else(|| missing_id("targetId"))?,
            ad_group_id,
            campaign_id,
            expression: first_string(obj, &["keywordText", "resolvedExpression", "expression"])
                .or_else(|| {
                    obj.get("expression")
                        .filter(|v| !v.is_null())
                        .map(|v| v.to_string())
                }),
            state,
            bid_micros: first_number(obj, &["bid"]).map(to_micros),
            last_updated_time,
        }),
    };
    Ok(record)
}

fn to_micros(amount: f64) -> i64 {
    (amount * MICROS_PER_UNIT).round() as i64
}

fn budget_micros(obj: &Map<String, Value>) -> Option<i64> {
    if let Some(amount) = first_number(obj, &["dailyBudget", "daily_budget"]) {
        return Some(to_micros(amount));
    }
    match obj.get("budget") {
        Some(Value::Object(nested)) => first_number(nested, &["budget", "amount"]).map(to_micros),
        Some(value) => value_as_f64(value).map(to_micros),
        None => None,
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(value_as_string))
}

fn first_number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| obj.get(*key).and_then(value_as_f64))
}

/// First present timestamp among `keys`. A present but unparseable value is an
/// error naming the offending field.
fn first_timestamp(
    obj: &Map<String, Value>,
    keys: &[&str],
) -> std::result::Result<Option<DateTime<Utc>>, String> {
    for key in keys {
        let parsed = match obj.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::Number(n)) => n.as_i64().and_then(from_epoch),
            Some(Value::String(s)) if s.trim().is_empty() => continue,
            Some(Value::String(s)) => parse_loose_timestamp(s),
            Some(_) => None,
        };
        return parsed.map(Some).ok_or_else(|| key.to_string());
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn campaign_id_falls_back_to_id() {
        let with_campaign_id = json!({"campaignId": 123, "name": "Brand", "state": "enabled"});
        let with_id = json!({"id": "123", "name": "Brand", "state": "ENABLED"});

        let a = normalize_record(EntityType::Campaigns, &with_campaign_id).unwrap();
        let b = normalize_record(EntityType::Campaigns, &with_id).unwrap();
        assert_eq!(a.entity_id(), "123");
        assert_eq!(a, b);
    }

    #[test]
    fn campaign_budget_accepts_flat_and_nested_shapes() {
        let flat = json!({"campaignId": 1, "dailyBudget": 25.5});
        let nested = json!({"campaignId": 1, "budget": {"budget": 25.5, "budgetType": "DAILY"}});
        for payload in [flat, nested] {
            match normalize_record(EntityType::Campaigns, &payload).unwrap() {
                NormalizedRecord::Campaign(c) => {
                    assert_eq!(c.daily_budget_micros, Some(25_500_000))
                }
                other => panic!("unexpected record {:?}", other),
            }
        }
    }

    #[test]
    fn last_updated_accepts_epoch_millis_and_rfc3339() {
        let expected = Utc.with_ymd_and_hms(2026, 2, 10, 8, 30, 0).unwrap();
        let millis = json!({"adGroupId": 7, "lastUpdatedDate": expected.timestamp_millis()});
        let text = json!({"adGroupId": 7, "lastUpdatedDateTime": "2026-02-10T08:30:00Z"});
        assert_eq!(
            normalize_record(EntityType::AdGroups, &millis)
                .unwrap()
                .last_updated_time(),
            Some(expected)
        );
        assert_eq!(
            normalize_record(EntityType::AdGroups, &text)
                .unwrap()
                .last_updated_time(),
            Some(expected)
        );
    }

    #[test]
    fn out_of_range_epoch_rejects_the_record() {
        for raw in [i64::MIN, i64::MAX] {
            let payload = json!({"campaignId": 1, "lastUpdatedDate": raw});
            let err = normalize_record(EntityType::Campaigns, &payload).unwrap_err();
            assert!(err.contains("lastUpdatedDate"), "{}", err);
        }
        let garbled = json!({"adGroupId": 7, "lastUpdatedDateTime": "yesterday"});
        assert!(normalize_record(EntityType::AdGroups, &garbled).is_err());

        let absent = json!({"adGroupId": 7, "lastUpdatedDate": null});
        assert_eq!(
            normalize_record(EntityType::AdGroups, &absent)
                .unwrap()
                .last_updated_time(),
            None
        );
    }

    #[test]
    fn missing_identifier_is_rejected() {
        let err = normalize_record(EntityType::Ads, &json!({"sku": "SKU-1"})).unwrap_err();
        assert!(err.contains("adId"));
        assert!(normalize_record(EntityType::Targets, &json!("nope")).is_err());
    }

    #[test]
    fn catalog_entity_carries_parent_and_bid() {
        let payload = json!({
            "targetId": "t-1",
            "adGroupId": "ag-1",
            "campaignId": "c-1",
            "bid": 0.75,
            "state": "paused",
            "expression": [{"type": "asinSameAs", "value": "B000"}]
        });
        let entity = normalize_record(EntityType::Targets, &payload)
            .unwrap()
            .into_catalog_entity("p1", payload.clone());
        assert_eq!(entity.entity_id, "t-1");
        assert_eq!(entity.parent_id.as_deref(), Some("ag-1"));
        assert_eq!(entity.campaign_id.as_deref(), Some("c-1"));
        assert_eq!(entity.bid_micros, Some(750_000));
        assert_eq!(entity.state, EntityState::Paused);
        assert!(entity.name.unwrap().contains("asinSameAs"));
    }
}
