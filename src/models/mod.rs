// Domain models: raw records, typed series, pins

mod pin;
mod record;
mod series;
mod system;

pub use pin::{PinSnapshot, PinnedItem, ResolvedPinnedItem};
pub use record::{EntityStatDetail, HostStatsDetail, RawEntityRecord, RawHostRecord, RecordPage};
pub use series::{
    EntityScalarPoint, EntitySeriesMap, EntitySummary, EntityTimeSeries, NetworkPair,
    StackedBand, StackedChart, StatPoint, SystemDataPoint,
};
pub use system::{SystemRef, SystemStatus};
