//! Core Data Models
//!
//! The types every other module exchanges. Raw portal payloads are normalized into
//! these at the boundary (see [`crate::portal::payload`]) and never branched on
//! afterwards.
//!
//! ## Data Flow
//!
//! 1. **Reading**: [`ConsumptionSnapshot`] - one poll's consumed/limit/update-time values
//! 2. **Full view**: [`ConsumptionSummary`] - the snapshot plus packages, telephony,
//!    messages and costs, used by the `status` command
//! 3. **Action**: [`RefillResult`] - outcome of asking the portal for more volume
//!
//! A snapshot is created per poll, folded into the monitor's history and dropped after
//! the following poll.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One parsed consumption reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionSnapshot {
    #[serde(rename = "consumedGb")]
    pub consumed_gb: f64,
    #[serde(rename = "limitGb")]
    pub limit_gb: f64,
    /// Last update time reported by the upstream data, not the poll time
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "canRefill")]
    pub can_refill: bool,
    #[serde(rename = "refillEndpoint")]
    pub refill_endpoint: Option<String>,
}

impl ConsumptionSnapshot {
    pub fn new(consumed_gb: f64, limit_gb: f64, updated_at: DateTime<Utc>) -> Self {
        Self {
            consumed_gb,
            limit_gb,
            updated_at,
            can_refill: false,
            refill_endpoint: None,
        }
    }

    /// Zeroed reading used when the upstream shape could not be parsed
    pub fn empty(updated_at: DateTime<Utc>) -> Self {
        Self::new(0.0, 0.0, updated_at)
    }

    pub fn with_refill(mut self, endpoint: Option<String>) -> Self {
        self.can_refill = true;
        self.refill_endpoint = endpoint;
        self
    }

    /// Whether the reading carries a usable allowance
    pub fn has_allowance(&self) -> bool {
        self.limit_gb > 0.0
    }

    /// Remaining high-speed volume; zero when no allowance is known.
    /// Not clamped: over-consumption yields a negative value.
    pub fn remaining_gb(&self) -> f64 {
        if self.has_allowance() {
            self.limit_gb - self.consumed_gb
        } else {
            0.0
        }
    }

    pub fn consumed_percent(&self) -> f64 {
        if self.has_allowance() {
            ((self.consumed_gb / self.limit_gb) * 1000.0).round() / 10.0
        } else {
            0.0
        }
    }

    /// Remaining volume clamped for presentation
    pub fn display_remaining_gb(&self) -> f64 {
        self.remaining_gb().max(0.0)
    }

    /// Strictly below the threshold; undefined readings never count as below
    pub fn is_below(&self, threshold_gb: f64) -> bool {
        self.has_allowance() && self.remaining_gb() < threshold_gb
    }
}

/// A refill package booked during the current billing period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefillPackage {
    #[serde(rename = "totalGb")]
    pub total_gb: f64,
    #[serde(rename = "usedGb")]
    pub used_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelephonyUsage {
    #[serde(rename = "isFlatRate")]
    pub is_flat_rate: bool,
    #[serde(rename = "consumedSeconds")]
    pub consumed_seconds: f64,
    #[serde(rename = "resetDay")]
    pub reset_day: u32,
}

impl Default for TelephonyUsage {
    fn default() -> Self {
        Self {
            is_flat_rate: false,
            consumed_seconds: 0.0,
            reset_day: 1,
        }
    }
}

impl TelephonyUsage {
    pub fn consumed_minutes(&self) -> f64 {
        ((self.consumed_seconds / 60.0) * 10.0).round() / 10.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageUsage {
    #[serde(rename = "isFlatRate")]
    pub is_flat_rate: bool,
    pub count: u64,
    #[serde(rename = "resetDay")]
    pub reset_day: u32,
}

impl Default for MessageUsage {
    fn default() -> Self {
        Self {
            is_flat_rate: false,
            count: 0,
            reset_day: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalCosts {
    pub amount: String,
    pub currency: String,
}

/// Everything the consumption endpoint reports for one contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionSummary {
    #[serde(rename = "contractId")]
    pub contract_id: String,
    pub snapshot: ConsumptionSnapshot,
    #[serde(rename = "resetDay")]
    pub reset_day: u32,
    #[serde(rename = "refillPackages")]
    pub refill_packages: Vec<RefillPackage>,
    pub telephony: TelephonyUsage,
    pub messages: MessageUsage,
    #[serde(rename = "totalCosts")]
    pub total_costs: Option<TotalCosts>,
}

/// Outcome of a refill request the portal answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefillResult {
    pub success: bool,
    #[serde(rename = "statusCode")]
    pub status_code: Option<u16>,
    pub message: String,
}

impl RefillResult {
    pub fn booked(status_code: u16) -> Self {
        Self {
            success: true,
            status_code: Some(status_code),
            message: "high-speed volume increased".to_string(),
        }
    }

    pub fn denied(status_code: u16) -> Self {
        Self {
            success: false,
            status_code: Some(status_code),
            message: "refill not yet available for this contract".to_string(),
        }
    }

    pub fn failed(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            message: message.into(),
        }
    }

    /// Explicit rejection by the portal (not yet eligible)
    pub fn is_denied(&self) -> bool {
        !self.success && self.status_code == Some(400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn test_remaining_and_percent() {
        let snap = ConsumptionSnapshot::new(2.5, 10.0, at(0));
        assert!((snap.remaining_gb() - 7.5).abs() < 1e-9);
        assert!((snap.consumed_percent() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_limit_defaults_to_zero() {
        let snap = ConsumptionSnapshot::new(3.0, 0.0, at(0));
        assert_eq!(snap.remaining_gb(), 0.0);
        assert_eq!(snap.consumed_percent(), 0.0);
        assert!(!snap.is_below(1.0));
    }

    #[test]
    fn test_remaining_not_clamped_internally() {
        let snap = ConsumptionSnapshot::new(11.0, 10.0, at(0));
        assert!(snap.remaining_gb() < 0.0);
        assert_eq!(snap.display_remaining_gb(), 0.0);
        assert!(snap.is_below(1.0));
    }

    #[test]
    fn test_refill_result_classification() {
        assert!(RefillResult::denied(400).is_denied());
        assert!(!RefillResult::booked(204).is_denied());
        assert!(!RefillResult::failed(Some(500), "boom").is_denied());
    }
}
