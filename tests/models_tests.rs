// Serialization shape of models and clock helpers

use chaintps::clock::{iso_date, round2};
use chaintps::models::*;

#[test]
fn test_tps_record_serializes_camel_case() {
    let r = TpsRecord {
        chain_id: "43114".into(),
        timestamp: 1000,
        value: 1.5,
        last_updated: 2000,
    };
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["chainId"], "43114");
    assert_eq!(json["lastUpdated"], 2000);
    let back: TpsRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, r);
}

#[test]
fn test_snapshot_serializes_dashboard_fields() {
    let snap = NetworkSnapshot {
        total_tps: 12.5,
        chain_count: 3,
        timestamp: 1000,
        data_age: 4,
        data_age_unit: DATA_AGE_UNIT.into(),
    };
    let json = serde_json::to_value(&snap).unwrap();
    for key in ["totalTps", "chainCount", "timestamp", "dataAge", "dataAgeUnit"] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
}

#[test]
fn test_empty_snapshot_uses_now() {
    let snap = NetworkSnapshot::empty(42);
    assert_eq!(snap.timestamp, 42);
    assert_eq!(snap.total_tps, 0.0);
    assert_eq!(snap.chain_count, 0);
    assert_eq!(snap.data_age, 0);
}

#[test]
fn test_update_outcome_status_tags() {
    let applied = UpdateOutcome::Applied {
        summary: UpsertSummary {
            upserted: 2,
            ..Default::default()
        },
    };
    let json = serde_json::to_value(&applied).unwrap();
    assert_eq!(json["status"], "applied");
    assert_eq!(json["summary"]["upserted"], 2);

    assert_eq!(
        serde_json::to_value(UpdateOutcome::NoData).unwrap()["status"],
        "no-data"
    );
    let failed = UpdateOutcome::Failed {
        attempts: 3,
        reason: "fetch failed: provider returned HTTP 503".into(),
    };
    assert!(failed.is_failed());
    assert_eq!(failed.label(), "failed");
    assert_eq!(serde_json::to_value(&failed).unwrap()["status"], "failed");
}

#[test]
fn test_upsert_summary_applied_counts_matched_and_new() {
    let s = UpsertSummary {
        matched: 2,
        modified: 1,
        upserted: 3,
        failed: 1,
    };
    assert_eq!(s.applied(), 5);
}

#[test]
fn test_record_from_point() {
    let r = TpsRecord::from_point(
        "a",
        MetricPoint {
            timestamp: 10,
            value: 2.0,
        },
        99,
    );
    assert_eq!(r.chain_id, "a");
    assert_eq!(r.timestamp, 10);
    assert_eq!(r.last_updated, 99);
}

#[test]
fn test_round2_and_iso_date() {
    assert_eq!(round2(12.345_678), 12.35);
    assert_eq!(round2(0.004), 0.0);
    assert_eq!(iso_date(0).as_deref(), Some("1970-01-01T00:00:00.000Z"));
    assert_eq!(
        iso_date(1_704_067_200).as_deref(),
        Some("2024-01-01T00:00:00.000Z")
    );
}
