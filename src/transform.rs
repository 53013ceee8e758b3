// Raw record -> typed series. Pure: no I/O, no state.
// A record with a bad timestamp or payload is dropped and counted; the batch continues.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::error::RecordDecodeError;
use crate::models::{
    EntitySeriesMap, EntityStatDetail, EntityTimeSeries, HostStatsDetail, NetworkPair,
    RawEntityRecord, RawHostRecord, StatPoint, SystemDataPoint,
};

/// Format the record API uses for `created` (e.g. "2024-05-01 12:00:00.123Z").
const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.fZ";

/// Transformation result plus the number of records dropped as malformed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transformed<T> {
    pub value: T,
    pub dropped: usize,
}

/// Parse a record timestamp (record API format or RFC 3339).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, RECORD_TIME_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn decode_timestamp(id: &str, created: &str) -> Result<DateTime<Utc>, RecordDecodeError> {
    parse_timestamp(created).ok_or_else(|| RecordDecodeError::Timestamp {
        id: id.to_string(),
        value: created.to_string(),
    })
}

fn decode_host(record: &RawHostRecord) -> Result<SystemDataPoint, RecordDecodeError> {
    let timestamp = decode_timestamp(&record.id, &record.created)?;
    let detail: HostStatsDetail =
        serde_json::from_value(record.stats.clone()).map_err(|e| RecordDecodeError::Payload {
            id: record.id.clone(),
            reason: e.to_string(),
        })?;
    let temperatures: Vec<(String, f64)> = detail
        .temperatures
        .unwrap_or_default()
        .into_iter()
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .collect();
    Ok(SystemDataPoint {
        timestamp,
        cpu: detail.cpu,
        memory_percent: detail.memory_percent,
        memory_used: detail.memory_used,
        disk_used: detail.disk_used,
        disk_percent: detail.disk_percent,
        network: NetworkPair {
            sent: detail.net_sent,
            received: detail.net_received,
        },
        temperatures,
    })
}

fn decode_entities(
    record: &RawEntityRecord,
) -> Result<(DateTime<Utc>, Vec<EntityStatDetail>), RecordDecodeError> {
    let timestamp = decode_timestamp(&record.id, &record.created)?;
    let details: Vec<EntityStatDetail> =
        serde_json::from_value(record.stats.clone()).map_err(|e| RecordDecodeError::Payload {
            id: record.id.clone(),
            reason: e.to_string(),
        })?;
    Ok((timestamp, details))
}

/// Host records -> time-ordered host points.
pub fn transform_host(records: &[RawHostRecord]) -> Transformed<Vec<SystemDataPoint>> {
    let mut points = Vec::with_capacity(records.len());
    let mut dropped = 0;
    for record in records {
        match decode_host(record) {
            Ok(p) => points.push(p),
            Err(e) => {
                dropped += 1;
                tracing::debug!(error = %e, operation = "transform_host", "dropping record");
            }
        }
    }
    // Stable: equal timestamps keep source order.
    points.sort_by_key(|p| p.timestamp);
    Transformed {
        value: points,
        dropped,
    }
}

/// Entity records -> one series per entity name, in first-observed order.
pub fn transform_entities(records: &[RawEntityRecord]) -> Transformed<EntitySeriesMap> {
    let mut decoded = Vec::with_capacity(records.len());
    let mut dropped = 0;
    for record in records {
        match decode_entities(record) {
            Ok(d) => decoded.push(d),
            Err(e) => {
                dropped += 1;
                tracing::debug!(error = %e, operation = "transform_entities", "dropping record");
            }
        }
    }
    // Observation order follows time, not arrival order.
    decoded.sort_by_key(|(ts, _)| *ts);

    let mut order: Vec<String> = Vec::new();
    let mut by_name: HashMap<String, Vec<StatPoint>> = HashMap::new();
    for (timestamp, details) in decoded {
        for d in details {
            let point = StatPoint::new(timestamp, d.cpu, d.memory)
                .with_network(d.net_sent, d.net_received);
            match by_name.get_mut(&d.name) {
                Some(points) => points.push(point),
                None => {
                    order.push(d.name.clone());
                    by_name.insert(d.name, vec![point]);
                }
            }
        }
    }

    let value = order
        .into_iter()
        .filter_map(|name| {
            let points = by_name.remove(&name)?;
            Some(EntityTimeSeries {
                entity_name: name,
                points,
            })
        })
        .collect();
    Transformed { value, dropped }
}
