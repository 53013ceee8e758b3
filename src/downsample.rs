// Downsampling: reduce a time-ordered series to one point per bucket.
// Buckets float to the data: each starts at the first point that did not fit the previous one.

use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::models::{NetworkPair, StatPoint, SystemDataPoint};

/// Statistic applied independently to each channel of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    #[default]
    Average,
    Max,
    /// Upper median: element `n / 2` of the sorted bucket, never interpolated.
    Median,
}

impl Reducer {
    pub fn reduce(self, values: &mut [f64]) -> f64 {
        match self {
            Reducer::Average => mean_f64(values),
            Reducer::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Reducer::Median => {
                if values.is_empty() {
                    return 0.0;
                }
                values.sort_by(f64::total_cmp);
                values[values.len() / 2]
            }
        }
    }
}

impl FromStr for Reducer {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "average" | "avg" | "mean" => Ok(Reducer::Average),
            "max" => Ok(Reducer::Max),
            "median" => Ok(Reducer::Median),
            other => Err(AnalyticsError::InvalidParameter {
                name: "reducer",
                reason: format!("unknown reducer {:?}", other),
            }),
        }
    }
}

/// Downsample `series` into greedy buckets of `bucket_width`.
///
/// A point joins the current bucket while `timestamp < bucket_start + bucket_width`, or always
/// when that end is past the representable range;
/// the emitted point carries the bucket's earliest timestamp. Unsorted input is sorted
/// (stable) before bucketing.
pub fn downsample(
    series: &[StatPoint],
    bucket_width: TimeDelta,
    method: Reducer,
) -> Result<Vec<StatPoint>, AnalyticsError> {
    if bucket_width <= TimeDelta::zero() {
        return Err(AnalyticsError::InvalidParameter {
            name: "bucket_width",
            reason: format!("must be positive, got {}", bucket_width),
        });
    }
    if series.is_empty() {
        return Ok(Vec::new());
    }

    let sorted;
    let series = if series.is_sorted_by_key(|p| p.timestamp) {
        series
    } else {
        let mut copy = series.to_vec();
        copy.sort_by_key(|p| p.timestamp);
        sorted = copy;
        &sorted[..]
    };

    let mut out = Vec::new();
    let mut bucket: Vec<&StatPoint> = Vec::new();
    // `None` past the representable range: the bucket never closes.
    let bucket_end = |start: DateTime<Utc>| start.checked_add_signed(bucket_width);
    let mut end = bucket_end(series[0].timestamp);
    for point in series {
        if end.is_none_or(|end| point.timestamp < end) {
            bucket.push(point);
            continue;
        }
        if let Some(p) = reduce_bucket(&bucket, method) {
            out.push(p);
        }
        bucket.clear();
        end = bucket_end(point.timestamp);
        bucket.push(point);
    }
    if let Some(p) = reduce_bucket(&bucket, method) {
        out.push(p);
    }
    Ok(out)
}

/// Downsample the CPU / memory-percent / network channels of a host series.
pub fn downsample_host(
    series: &[SystemDataPoint],
    bucket_width: TimeDelta,
    method: Reducer,
) -> Result<Vec<StatPoint>, AnalyticsError> {
    let points: Vec<StatPoint> = series.iter().map(SystemDataPoint::stat_point).collect();
    downsample(&points, bucket_width, method)
}

/// Smallest whole-second bucket width that keeps a series spanning `span` under `max_points`.
/// Returns `None` when no reduction is needed.
pub fn bucket_width_for(span: TimeDelta, max_points: usize) -> Option<TimeDelta> {
    if max_points == 0 || span <= TimeDelta::zero() {
        return None;
    }
    let span_ms = span.num_milliseconds();
    let width_ms = span_ms / max_points as i64;
    if width_ms < 1000 {
        return None;
    }
    let secs = (width_ms + 999) / 1000;
    Some(TimeDelta::seconds(secs))
}

fn reduce_bucket(bucket: &[&StatPoint], method: Reducer) -> Option<StatPoint> {
    let first = bucket.first()?;
    let timestamp = bucket
        .iter()
        .map(|p| p.timestamp)
        .min()
        .unwrap_or(first.timestamp);

    let mut cpu: Vec<f64> = bucket.iter().map(|p| p.cpu).collect();
    let mut memory: Vec<f64> = bucket.iter().map(|p| p.memory).collect();
    let mut sent: Vec<f64> = bucket.iter().map(|p| p.network.sent).collect();
    let mut received: Vec<f64> = bucket.iter().map(|p| p.network.received).collect();

    Some(StatPoint {
        timestamp,
        cpu: method.reduce(&mut cpu),
        memory: method.reduce(&mut memory),
        network: NetworkPair {
            sent: method.reduce(&mut sent),
            received: method.reduce(&mut received),
        },
    })
}

fn mean_f64(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / (v.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_takes_upper_element() {
        assert_eq!(Reducer::Median.reduce(&mut [20.0, 10.0]), 20.0);
        assert_eq!(Reducer::Median.reduce(&mut [30.0, 10.0, 20.0]), 20.0);
    }

    #[test]
    fn max_and_average() {
        assert_eq!(Reducer::Max.reduce(&mut [1.0, 7.0, 3.0]), 7.0);
        assert_eq!(Reducer::Average.reduce(&mut [0.0, 100.0]), 50.0);
    }

    #[test]
    fn reducer_parses_names() {
        assert_eq!("avg".parse::<Reducer>(), Ok(Reducer::Average));
        assert_eq!("MEDIAN".parse::<Reducer>(), Ok(Reducer::Median));
        assert!("p99".parse::<Reducer>().is_err());
    }

    #[test]
    fn bucket_width_for_budget() {
        assert_eq!(bucket_width_for(TimeDelta::hours(1), 10_000), None);
        assert_eq!(
            bucket_width_for(TimeDelta::hours(1), 60),
            Some(TimeDelta::seconds(60))
        );
        assert_eq!(
            bucket_width_for(TimeDelta::seconds(100), 30),
            Some(TimeDelta::seconds(4))
        );
    }
}
