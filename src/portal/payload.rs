//! Consumption payload normalization
//!
//! The aggregation endpoint answers in one of two shapes:
//!
//! - **Regular** (credentialed sessions): `{ "dataVolume": {...}, "telephony": {...},
//!   "messages": {...}, "totalCosts": {...} }`
//! - **Guest** (guest links): the data-volume object itself at the top level, without
//!   a `dataVolume` key but with `highSpeedLimit`
//!
//! [`Payload`] tells them apart once, here, and both are turned into the same
//! [`ConsumptionSnapshot`] / [`ConsumptionSummary`]. Nothing downstream branches on
//! the shape.

use crate::error::{PortalError, PortalResult};
use crate::models::{
    ConsumptionSnapshot, ConsumptionSummary, MessageUsage, RefillPackage, TelephonyUsage, TotalCosts,
};
use crate::timestamp_parser::TimestampParser;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Action key advertising that a refill can be booked
pub const REFILL_ACTION: &str = "refill-highspeed-volume";

#[derive(Debug, Clone, Default, Deserialize)]
struct Measure {
    #[serde(default)]
    value: Option<f64>,
}

fn measure(m: &Option<Measure>) -> f64 {
    m.as_ref().and_then(|m| m.value).unwrap_or(0.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RefillAction {
    #[serde(default)]
    href: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookedPackage {
    #[serde(default)]
    total: Option<Measure>,
    #[serde(default)]
    used: Option<Measure>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnlimitedRefill {
    #[serde(default)]
    actions: HashMap<String, RefillAction>,
    #[serde(default)]
    booked_refill_packages: Vec<BookedPackage>,
}

/// The high-speed volume block, shared by both shapes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataVolume {
    #[serde(default)]
    data_updated_at: Option<String>,
    #[serde(default)]
    high_speed_limit: Option<Measure>,
    #[serde(default)]
    total_consumption: Option<Measure>,
    #[serde(default)]
    reset_day: Option<u32>,
    #[serde(default)]
    unlimited_refill: Option<UnlimitedRefill>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountedUsage {
    #[serde(default)]
    is_flat_rate: Option<bool>,
    #[serde(default)]
    total_consumption: Option<Measure>,
    #[serde(default)]
    reset_day: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Costs {
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegularPayload {
    data_volume: DataVolume,
    #[serde(default)]
    telephony: Option<CountedUsage>,
    #[serde(default)]
    messages: Option<CountedUsage>,
    #[serde(default)]
    total_costs: Option<Costs>,
}

#[derive(Debug, Clone)]
pub enum Payload {
    Regular(RegularPayload),
    Guest(DataVolume),
}

impl Payload {
    pub fn parse(body: &str) -> PortalResult<Self> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| PortalError::Parse(format!("invalid json: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> PortalResult<Self> {
        let Some(object) = value.as_object() else {
            return Err(PortalError::Parse("consumption payload is not an object".to_string()));
        };

        let is_guest = !object.contains_key("dataVolume") && object.contains_key("highSpeedLimit");
        let has_regular = object.contains_key("dataVolume");

        if is_guest {
            serde_json::from_value(value)
                .map(Payload::Guest)
                .map_err(|e| PortalError::Parse(format!("guest payload: {e}")))
        } else if has_regular {
            serde_json::from_value(value)
                .map(Payload::Regular)
                .map_err(|e| PortalError::Parse(format!("regular payload: {e}")))
        } else {
            Err(PortalError::Parse("payload carries no data volume".to_string()))
        }
    }

    fn data_volume(&self) -> &DataVolume {
        match self {
            Payload::Regular(regular) => &regular.data_volume,
            Payload::Guest(volume) => volume,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Payload::Guest(_))
    }

    /// Normalize into a snapshot; `fetched_at` stands in for a missing update time
    pub fn snapshot(&self, fetched_at: DateTime<Utc>) -> ConsumptionSnapshot {
        let volume = self.data_volume();
        let updated_at = TimestampParser::parse_or(volume.data_updated_at.as_deref(), fetched_at);

        let snapshot = ConsumptionSnapshot::new(
            round2(measure(&volume.total_consumption)),
            measure(&volume.high_speed_limit),
            updated_at,
        );

        let refill_action = volume
            .unlimited_refill
            .as_ref()
            .and_then(|refill| refill.actions.get(REFILL_ACTION));

        match refill_action {
            Some(action) => snapshot.with_refill(action.href.clone()),
            None => snapshot,
        }
    }

    pub fn summary(&self, contract_id: &str, fetched_at: DateTime<Utc>) -> ConsumptionSummary {
        let volume = self.data_volume();

        let refill_packages = volume
            .unlimited_refill
            .as_ref()
            .map(|refill| {
                refill
                    .booked_refill_packages
                    .iter()
                    .map(|package| RefillPackage {
                        total_gb: round2(measure(&package.total)),
                        used_gb: round2(measure(&package.used)),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let (telephony, messages, total_costs) = match self {
            Payload::Guest(_) => (TelephonyUsage::default(), MessageUsage::default(), None),
            Payload::Regular(regular) => (
                regular.telephony.as_ref().map(telephony_usage).unwrap_or_default(),
                regular.messages.as_ref().map(message_usage).unwrap_or_default(),
                regular.total_costs.as_ref().map(costs_of),
            ),
        };

        ConsumptionSummary {
            contract_id: contract_id.to_string(),
            snapshot: self.snapshot(fetched_at),
            reset_day: volume.reset_day.unwrap_or(1),
            refill_packages,
            telephony,
            messages,
            total_costs,
        }
    }
}

fn telephony_usage(usage: &CountedUsage) -> TelephonyUsage {
    TelephonyUsage {
        is_flat_rate: usage.is_flat_rate.unwrap_or(false),
        consumed_seconds: measure(&usage.total_consumption),
        reset_day: usage.reset_day.unwrap_or(1),
    }
}

fn message_usage(usage: &CountedUsage) -> MessageUsage {
    MessageUsage {
        is_flat_rate: usage.is_flat_rate.unwrap_or(false),
        count: measure(&usage.total_consumption).max(0.0) as u64,
        reset_day: usage.reset_day.unwrap_or(1),
    }
}

fn costs_of(costs: &Costs) -> TotalCosts {
    let amount = match &costs.amount {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "0,00".to_string(),
    };
    TotalCosts {
        amount,
        currency: costs.currency.clone().unwrap_or_else(|| "EUR".to_string()),
    }
}

/// Parse a response body into a snapshot, falling back to a zeroed one when the
/// shape is not understood
pub fn snapshot_or_empty(body: &str, fetched_at: DateTime<Utc>) -> ConsumptionSnapshot {
    match Payload::parse(body) {
        Ok(payload) => payload.snapshot(fetched_at),
        Err(e) => {
            warn!(error = %e, "Could not parse consumption payload, using empty snapshot");
            ConsumptionSnapshot::empty(fetched_at)
        }
    }
}
