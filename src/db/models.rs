//! Persisted model types.

use chrono::{DateTime, Utc};
use serde::de::{Deserializer, Error as _};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Default number of echo requests per cycle.
pub const DEFAULT_PROBE_COUNT: u32 = 5;

fn default_count() -> u32 {
    DEFAULT_PROBE_COUNT
}

/// A monitored host, keyed by its user-assigned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Hostname or IP handed to the echo utility.
    pub address: String,
    #[serde(default = "default_count")]
    pub count: u32,
    /// Time of the most recent failed cycle.
    #[serde(default = "Utc::now")]
    pub last_failure: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_poll: Option<DateTime<Utc>>,
    /// Keys this program does not interpret, kept for hand-edited files.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Target {
    pub fn new(address: &str, created: DateTime<Utc>) -> Self {
        Self {
            address: address.to_string(),
            count: DEFAULT_PROBE_COUNT,
            last_failure: created,
            last_poll: None,
            extra: Map::new(),
        }
    }
}

/// rrdtool consolidation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Consolidation {
    Last,
    Average,
    Min,
    Max,
}

impl Consolidation {
    /// X-files factor used when creating the archive.
    pub fn xff(self) -> &'static str {
        match self {
            Consolidation::Last => "0",
            _ => "0.5",
        }
    }
}

impl fmt::Display for Consolidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Consolidation::Last => "LAST",
            Consolidation::Average => "AVERAGE",
            Consolidation::Min => "MIN",
            Consolidation::Max => "MAX",
        };
        f.write_str(s)
    }
}

/// A resolution/duration pairing used for both archives and graphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphInterval {
    pub rra: Consolidation,
    /// Sample interval as an rrdtool duration, e.g. `5m`.
    pub interval: String,
    /// Window shown in the graph and kept in the archive, e.g. `24h`.
    pub duration: String,
    /// Step in seconds.
    pub step: u64,
    pub xgrid: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphInterval {
    fn new(rra: Consolidation, interval: &str, duration: &str, step: u64, xgrid: &str) -> Self {
        Self {
            rra,
            interval: interval.to_string(),
            duration: duration.to_string(),
            step,
            xgrid: xgrid.to_string(),
            extra: Map::new(),
        }
    }
}

/// Graph intervals, always held in ascending step order.
///
/// Serialized as a JSON object whose keys follow that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphIntervals(Vec<(String, GraphInterval)>);

impl GraphIntervals {
    pub fn new(items: impl IntoIterator<Item = (String, GraphInterval)>) -> Self {
        let mut items: Vec<_> = items.into_iter().collect();
        items.sort_by(|a, b| a.1.step.cmp(&b.1.step).then_with(|| a.0.cmp(&b.0)));
        Self(items)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GraphInterval)> {
        self.0.iter().map(|(name, g)| (name.as_str(), g))
    }

    /// The finest resolution, listed first on the index page.
    pub fn first(&self) -> Option<(&str, &GraphInterval)> {
        self.iter().next()
    }

    /// Base step of the time-series file.
    pub fn min_step(&self) -> Option<u64> {
        self.0.first().map(|(_, g)| g.step)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for GraphIntervals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for GraphIntervals {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, GraphInterval>::deserialize(deserializer)?;
        if map.values().any(|g| g.step == 0) {
            return Err(D::Error::custom("graph interval step must be positive"));
        }
        Ok(GraphIntervals::new(map))
    }
}

/// On-disk configuration: the target set and the graph intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub targets: BTreeMap<String, Target>,
    #[serde(default)]
    pub graphs: GraphIntervals,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigFile {
    /// Configuration written on first run.
    pub fn with_defaults(now: DateTime<Utc>) -> Self {
        Self {
            targets: default_targets(now),
            graphs: default_graphs(),
            extra: Map::new(),
        }
    }
}

/// Three well-known public resolvers.
pub fn default_targets(now: DateTime<Utc>) -> BTreeMap<String, Target> {
    [
        ("Cloudflare", "one.one.one.one"),
        ("Google", "dns.google"),
        ("OpenDNS", "resolver1.opendns.com"),
    ]
    .into_iter()
    .map(|(id, address)| (id.to_string(), Target::new(address, now)))
    .collect()
}

/// Five intervals from 1 minute over 12 hours up to 1 day over 365 days.
pub fn default_graphs() -> GraphIntervals {
    use Consolidation::*;
    GraphIntervals::new([
        ("1mx12h".to_string(), GraphInterval::new(Last, "1m", "12h", 60, "MINUTE:5:MINUTE:15:HOUR:2")),
        ("5mx24h".to_string(), GraphInterval::new(Average, "5m", "24h", 300, "MINUTE:5:MINUTE:15:HOUR:4")),
        ("30mx7d".to_string(), GraphInterval::new(Average, "30m", "7d", 1800, "MINUTE:30:HOUR:4:HOUR:24")),
        ("2hx28d".to_string(), GraphInterval::new(Average, "2h", "28d", 7200, "HOUR:2:DAY:1:DAY:7")),
        ("1dx365d".to_string(), GraphInterval::new(Average, "1d", "365d", 86400, "HOUR:24:DAY:7:DAY:30")),
    ])
}
