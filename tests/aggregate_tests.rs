// Stacking, flattening and summary tests over multi-entity series

mod common;

use common::{point, series, ts};
use fleetcharts::aggregate::{BandIndex, DomainOrder, MetricSelector, domain, flatten, stack, summarize};
use fleetcharts::models::{EntitySeriesMap, NetworkPair, StackedBand, StackedChart};

/// nginx at t0 and t1, redis at t0 and t2.
fn nginx_redis() -> EntitySeriesMap {
    [
        series("nginx", vec![point(0, 10.0, 100.0), point(60, 20.0, 110.0)]),
        series("redis", vec![point(0, 5.0, 50.0), point(120, 7.0, 55.0)]),
    ]
    .into_iter()
    .collect()
}

fn bands_at(chart: &StackedChart, secs: i64) -> Vec<&StackedBand> {
    chart.bands.iter().filter(|b| b.timestamp == ts(secs)).collect()
}

#[test]
fn test_stack_running_sum_per_timestamp() {
    let chart = stack(&nginx_redis(), MetricSelector::Cpu, DomainOrder::Observed);
    assert_eq!(chart.domain, vec!["nginx", "redis"]);

    let at = |secs| bands_at(&chart, secs);
    let t0 = at(0);
    assert_eq!(t0.len(), 2);
    assert_eq!((t0[0].entity_name.as_str(), t0[0].y_start, t0[0].y_end), ("nginx", 0.0, 10.0));
    assert_eq!((t0[1].entity_name.as_str(), t0[1].y_start, t0[1].y_end), ("redis", 10.0, 15.0));
    assert_eq!(t0[0].y_end, t0[1].y_start);

    // redis absent at t1: no band, nginx alone from zero.
    let t1 = at(60);
    assert_eq!(t1.len(), 1);
    assert_eq!((t1[0].y_start, t1[0].y_end), (0.0, 20.0));

    // nginx absent at t2: redis starts at zero.
    let t2 = at(120);
    assert_eq!(t2.len(), 1);
    assert_eq!(t2[0].entity_name, "redis");
    assert_eq!((t2[0].y_start, t2[0].y_end), (0.0, 7.0));
}

#[test]
fn test_stack_top_equals_sum_of_present_values() {
    let chart = stack(&nginx_redis(), MetricSelector::Memory, DomainOrder::Observed);
    let top = chart
        .bands
        .iter()
        .filter(|b| b.timestamp == ts(0))
        .map(|b| b.y_end)
        .fold(0.0, f64::max);
    assert_eq!(top, 150.0);
    assert!(chart.bands.iter().all(|b| b.height() >= 0.0));
}

#[test]
fn test_stack_bands_ordered_by_timestamp_then_domain() {
    let chart = stack(&nginx_redis(), MetricSelector::Cpu, DomainOrder::NameSorted);
    let order: Vec<_> = chart
        .bands
        .iter()
        .map(|b| (b.timestamp, b.entity_name.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![(ts(0), "nginx"), (ts(0), "redis"), (ts(60), "nginx"), (ts(120), "redis")]
    );
}

#[test]
fn test_domain_observed_vs_name_sorted() {
    let map: EntitySeriesMap = [
        series("web", vec![point(0, 1.0, 1.0)]),
        series("api", vec![point(10, 1.0, 1.0)]),
        series("db", vec![point(20, 1.0, 1.0)]),
    ]
    .into_iter()
    .collect();
    assert_eq!(domain(&map, DomainOrder::Observed), vec!["web", "api", "db"]);
    assert_eq!(domain(&map, DomainOrder::NameSorted), vec!["api", "db", "web"]);
    // Stable across calls.
    assert_eq!(domain(&map, DomainOrder::Observed), domain(&map, DomainOrder::Observed));
}

#[test]
fn test_stack_order_follows_domain() {
    let map: EntitySeriesMap = [
        series("web", vec![point(0, 4.0, 0.0)]),
        series("api", vec![point(0, 1.0, 0.0)]),
    ]
    .into_iter()
    .collect();
    let chart = stack(&map, MetricSelector::Cpu, DomainOrder::NameSorted);
    assert_eq!(chart.bands[0].entity_name, "api");
    assert_eq!(chart.bands[1].y_start, 1.0);
    assert_eq!(chart.bands[1].y_end, 5.0);
}

#[test]
fn test_stack_network_sums_channels_and_keeps_aux() {
    let map: EntitySeriesMap = [series("nginx", vec![point(0, 0.0, 0.0).with_network(1.5, 2.5)])]
        .into_iter()
        .collect();
    let chart = stack(&map, MetricSelector::Network, DomainOrder::Observed);
    assert_eq!(chart.bands[0].y_end, 4.0);
    assert_eq!(
        chart.bands[0].aux,
        NetworkPair {
            sent: 1.5,
            received: 2.5
        }
    );
}

#[test]
fn test_stack_empty_map() {
    let chart = stack(&EntitySeriesMap::new(), MetricSelector::Cpu, DomainOrder::Observed);
    assert!(chart.domain.is_empty());
    assert!(chart.bands.is_empty());
}

#[test]
fn test_flatten_one_value_per_point() {
    let lines = flatten(&nginx_redis(), MetricSelector::Cpu, DomainOrder::Observed);
    let got: Vec<_> = lines
        .iter()
        .map(|p| (p.timestamp, p.entity_name.as_str(), p.value))
        .collect();
    assert_eq!(
        got,
        vec![
            (ts(0), "nginx", 10.0),
            (ts(0), "redis", 5.0),
            (ts(60), "nginx", 20.0),
            (ts(120), "redis", 7.0),
        ]
    );
}

#[test]
fn test_summarize_latest_average_peak() {
    let summary = summarize(&nginx_redis(), MetricSelector::Cpu);
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].entity_name, "nginx");
    assert_eq!(summary[0].latest, 20.0);
    assert_eq!(summary[0].average, 15.0);
    assert_eq!(summary[0].peak, 20.0);
    assert_eq!(summary[1].entity_name, "redis");
    assert_eq!(summary[1].latest, 7.0);
}

#[test]
fn test_band_index_lookup_and_absence() {
    let chart = stack(&nginx_redis(), MetricSelector::Cpu, DomainOrder::Observed);
    let index = BandIndex::build(&chart.bands);
    assert_eq!(index.len(), chart.bands.len());
    assert_eq!(index.duplicates(), 0);
    assert_eq!(index.value("redis", ts(0)), Some(5.0));
    assert_eq!(index.value("redis", ts(60)), None);
    assert!(index.get("postgres", ts(0)).is_none());
}

#[test]
fn test_band_index_keeps_first_duplicate() {
    // Two points at the same timestamp for one entity yield two bands.
    let map: EntitySeriesMap = [series("nginx", vec![point(0, 3.0, 0.0), point(0, 9.0, 0.0)])]
        .into_iter()
        .collect();
    let chart = stack(&map, MetricSelector::Cpu, DomainOrder::Observed);
    assert_eq!(chart.bands.len(), 2);
    let index = BandIndex::build(&chart.bands);
    assert_eq!(index.len(), 1);
    assert_eq!(index.duplicates(), 1);
    assert_eq!(index.value("nginx", ts(0)), Some(3.0));
}

#[test]
fn test_metric_selector_parse() {
    assert_eq!("mem".parse::<MetricSelector>().unwrap(), MetricSelector::Memory);
    assert_eq!("NET".parse::<MetricSelector>().unwrap(), MetricSelector::Network);
    assert!("disk".parse::<MetricSelector>().is_err());
}
