mod common;

use chrono::{TimeZone, Utc};
use common::base_time;
use volume_refill::portal::payload::{snapshot_or_empty, Payload};

const REGULAR: &str = r#"{
  "dataVolume": {
    "dataUpdatedAt": "2024-05-01T11:45:00+02:00",
    "highSpeedLimit": { "value": 25, "unit": "GB" },
    "totalConsumption": { "value": 24.126, "unit": "GB" },
    "resetDay": 17,
    "unlimitedRefill": {
      "actions": {
        "refill-highspeed-volume": { "href": "/service/mssa/contracts/4711/consumption/highspeed-volume" }
      },
      "bookedRefillPackages": [
        { "total": { "value": 1 }, "used": { "value": 0.5 } },
        { "total": { "value": 1 }, "used": { "value": 1 } }
      ]
    }
  },
  "telephony": { "isFlatRate": false, "totalConsumption": { "value": 754 }, "resetDay": 17 },
  "messages": { "isFlatRate": true, "totalConsumption": { "value": 3 }, "resetDay": 17 },
  "totalCosts": { "amount": "19,99", "currency": "EUR" }
}"#;

const GUEST: &str = r#"{
  "dataUpdatedAt": "2024-05-01T09:30:00Z",
  "highSpeedLimit": { "value": 10 },
  "totalConsumption": { "value": 3.333 },
  "resetDay": 3,
  "unlimitedRefill": { "actions": {} }
}"#;

#[test]
fn test_regular_payload_summary() {
    let payload = Payload::parse(REGULAR).unwrap();
    assert!(!payload.is_guest());

    let summary = payload.summary("4711", base_time());
    let snapshot = &summary.snapshot;

    assert_eq!(summary.contract_id, "4711");
    assert_eq!(snapshot.consumed_gb, 24.13);
    assert_eq!(snapshot.limit_gb, 25.0);
    assert_eq!(snapshot.updated_at, Utc.with_ymd_and_hms(2024, 5, 1, 9, 45, 0).unwrap());
    assert!(snapshot.can_refill);
    assert_eq!(
        snapshot.refill_endpoint.as_deref(),
        Some("/service/mssa/contracts/4711/consumption/highspeed-volume")
    );
    assert!(snapshot.is_below(1.0));

    assert_eq!(summary.reset_day, 17);
    assert_eq!(summary.refill_packages.len(), 2);
    assert_eq!(summary.refill_packages[0].used_gb, 0.5);
    assert!(!summary.telephony.is_flat_rate);
    assert_eq!(summary.telephony.consumed_minutes(), 12.6);
    assert!(summary.messages.is_flat_rate);
    assert_eq!(summary.messages.count, 3);
    let costs = summary.total_costs.expect("costs");
    assert_eq!(costs.amount, "19,99");
    assert_eq!(costs.currency, "EUR");
}

#[test]
fn test_guest_payload_summary() {
    let payload = Payload::parse(GUEST).unwrap();
    assert!(payload.is_guest());

    let summary = payload.summary("guest-contract", base_time());

    assert_eq!(summary.snapshot.consumed_gb, 3.33);
    assert_eq!(summary.snapshot.limit_gb, 10.0);
    assert_eq!(summary.snapshot.updated_at, Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap());
    // an empty action map offers nothing
    assert!(!summary.snapshot.can_refill);
    assert_eq!(summary.reset_day, 3);
    assert!(summary.refill_packages.is_empty());
    assert_eq!(summary.total_costs, None);
    assert_eq!(summary.messages.count, 0);
}

#[test]
fn test_unparseable_update_time_falls_back_to_fetch_time() {
    let body = r#"{"dataVolume":{"dataUpdatedAt":"yesterday","highSpeedLimit":{"value":5},"totalConsumption":{"value":1}}}"#;
    let snapshot = snapshot_or_empty(body, base_time());
    assert_eq!(snapshot.updated_at, base_time());
    assert_eq!(snapshot.limit_gb, 5.0);
}

#[test]
fn test_unknown_shape_becomes_empty_snapshot() {
    let snapshot = snapshot_or_empty(r#"{"status":"maintenance"}"#, base_time());
    assert_eq!(snapshot.consumed_gb, 0.0);
    assert_eq!(snapshot.limit_gb, 0.0);
    assert_eq!(snapshot.remaining_gb(), 0.0);
    assert_eq!(snapshot.consumed_percent(), 0.0);
    assert!(!snapshot.is_below(1.0));
}

#[test]
fn test_summary_serializes_camel_case() {
    let summary = Payload::parse(REGULAR).unwrap().summary("4711", base_time());
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["contractId"], "4711");
    assert_eq!(json["snapshot"]["canRefill"], true);
    assert_eq!(json["refillPackages"][1]["totalGb"], 1.0);
    assert_eq!(json["totalCosts"]["amount"], "19,99");
}
