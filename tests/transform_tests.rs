// Raw record -> typed series transformation tests

mod common;

use common::{created, entity_record, host_record, ts};
use fleetcharts::models::RawHostRecord;
use fleetcharts::transform::{transform_entities, transform_host};

#[test]
fn test_transform_host_sorts_by_timestamp() {
    let records = vec![
        host_record("b", 60, 20.0, 41.0),
        host_record("a", 0, 10.0, 40.0),
        host_record("c", 120, 30.0, 42.0),
    ];
    let out = transform_host(&records);
    assert_eq!(out.dropped, 0);
    let stamps: Vec<_> = out.value.iter().map(|p| p.timestamp).collect();
    assert_eq!(stamps, vec![ts(0), ts(60), ts(120)]);
    assert_eq!(out.value[0].memory_percent, 40.0);
    assert_eq!(out.value[0].memory_used, 1.5);
    assert_eq!(out.value[0].network.received, 0.5);
}

#[test]
fn test_transform_host_drops_malformed_records() {
    let records = vec![
        host_record("ok", 0, 10.0, 40.0),
        RawHostRecord {
            id: "bad-time".into(),
            created: "yesterday".into(),
            stats: serde_json::json!({ "cpu": 1.0, "mp": 1.0 }),
        },
        RawHostRecord {
            id: "no-mp".into(),
            created: created(30),
            stats: serde_json::json!({ "cpu": 1.0 }),
        },
    ];
    let out = transform_host(&records);
    assert_eq!(out.value.len(), 1);
    assert_eq!(out.dropped, 2);
}

#[test]
fn test_transform_host_orders_temperatures_by_sensor() {
    let record = RawHostRecord {
        id: "t".into(),
        created: created(0),
        stats: serde_json::json!({ "cpu": 1.0, "mp": 2.0, "t": { "nvme": 41.0, "cpu_pkg": 63.5, "acpi": 30.0 } }),
    };
    let out = transform_host(&[record]);
    let names: Vec<_> = out.value[0].temperatures.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["acpi", "cpu_pkg", "nvme"]);
    assert_eq!(out.value[0].hottest_sensor(), Some(("cpu_pkg", 63.5)));
}

#[test]
fn test_transform_host_accepts_rfc3339() {
    let record = RawHostRecord {
        id: "r".into(),
        created: "2024-05-01T12:00:30Z".into(),
        stats: serde_json::json!({ "cpu": 1.0, "mp": 2.0 }),
    };
    let out = transform_host(&[record]);
    assert_eq!(out.value[0].timestamp, ts(30));
}

#[test]
fn test_transform_entities_groups_in_first_observed_order() {
    // Arrival order is not time order: redis is first seen at t0.
    let records = vec![
        entity_record("2", 60, &[("nginx", 2.0, 20.0), ("redis", 4.0, 40.0)]),
        entity_record("1", 0, &[("redis", 1.0, 10.0)]),
    ];
    let out = transform_entities(&records);
    assert_eq!(out.dropped, 0);
    let names: Vec<_> = out.value.names().collect();
    assert_eq!(names, vec!["redis", "nginx"]);
    let redis = out.value.get("redis").unwrap();
    assert_eq!(redis.points.len(), 2);
    assert_eq!(redis.points[0].timestamp, ts(0));
    assert_eq!(redis.points[1].cpu, 4.0);
}

#[test]
fn test_transform_entities_keeps_duplicate_timestamps() {
    let records = vec![entity_record("1", 0, &[("nginx", 1.0, 1.0), ("nginx", 2.0, 2.0)])];
    let out = transform_entities(&records);
    assert_eq!(out.value.len(), 1);
    assert_eq!(out.value.get("nginx").unwrap().points.len(), 2);
}

#[test]
fn test_transform_entities_drops_bad_payload() {
    let mut bad = entity_record("bad", 30, &[]);
    bad.stats = serde_json::json!({ "not": "a list" });
    let records = vec![entity_record("1", 0, &[("nginx", 1.0, 1.0)]), bad];
    let out = transform_entities(&records);
    assert_eq!(out.dropped, 1);
    assert_eq!(out.value.len(), 1);
}

#[test]
fn test_transform_empty_input() {
    assert!(transform_host(&[]).value.is_empty());
    assert!(transform_entities(&[]).value.is_empty());
}
