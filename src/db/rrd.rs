//! Round-robin database file management through `rrdtool`.
//!
//! Only command lines are built here; storage and consolidation are
//! rrdtool's business.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::models::{GraphInterval, GraphIntervals, Target};
use crate::command::{ToolCommand, ToolError};
use crate::scheduler::CycleSample;

/// rrdtool caps data-source names at 19 characters.
const DS_NAME_MAX: usize = 19;

/// Latency gauge bounds in milliseconds.
const RTT_MIN: u32 = 0;
const RTT_MAX: u32 = 2000;

/// Extra seconds allowed past a step before a sample counts as missing.
const HEARTBEAT_SLACK: u64 = 5;

/// The two series kept per target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Latency,
    Availability,
}

impl Series {
    fn suffix(self) -> &'static str {
        match self {
            Series::Latency => "_rtt",
            Series::Availability => "_avail",
        }
    }
}

/// Data-source name for one series of a target.
///
/// Characters outside `[A-Za-z0-9_]` become `_` and the id is shortened so
/// the longest suffix still fits.
pub fn ds_name(target_id: &str, series: Series) -> String {
    let keep = DS_NAME_MAX - Series::Availability.suffix().len();
    let mut name: String = target_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .take(keep)
        .collect();
    if name.is_empty() {
        name.push('_');
    }
    name.push_str(series.suffix());
    name
}

/// Time-series file for one configuration.
#[derive(Debug, Clone)]
pub struct RrdFile {
    rrdtool: String,
    path: PathBuf,
}

impl RrdFile {
    pub fn new<P: AsRef<Path>>(rrdtool: &str, path: P) -> Self {
        Self {
            rrdtool: rrdtool.to_string(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_arg(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn info_command(&self) -> ToolCommand {
        ToolCommand::new(&self.rrdtool).arg("info").arg(self.path_arg())
    }

    /// `rrdtool create` with two gauges per target and one archive per
    /// graph interval.
    pub fn create_command(
        &self,
        targets: &BTreeMap<String, Target>,
        graphs: &GraphIntervals,
    ) -> ToolCommand {
        let step = graphs.min_step().unwrap_or(60);
        let heartbeat = step + HEARTBEAT_SLACK;

        let mut cmd = ToolCommand::new(&self.rrdtool)
            .arg("create")
            .arg(self.path_arg())
            .arg("--step")
            .arg(format!("{}s", step));

        for id in targets.keys() {
            cmd = cmd
                .arg(format!(
                    "DS:{}:GAUGE:{}:{}:{}",
                    ds_name(id, Series::Latency),
                    heartbeat,
                    RTT_MIN,
                    RTT_MAX
                ))
                .arg(format!(
                    "DS:{}:GAUGE:{}:0:100",
                    ds_name(id, Series::Availability),
                    heartbeat
                ));
        }

        cmd.args(graphs.iter().map(|(_, g)| rra_spec(g)))
    }

    /// `rrdtool update` carrying one row for every target.
    pub fn update_command(
        &self,
        samples: &BTreeMap<String, CycleSample>,
        at: DateTime<Utc>,
    ) -> ToolCommand {
        let mut template = Vec::with_capacity(samples.len() * 2);
        let mut values = vec![at.timestamp().to_string()];

        for (id, sample) in samples {
            template.push(ds_name(id, Series::Latency));
            template.push(ds_name(id, Series::Availability));
            values.push(sample.avg_rtt_value());
            values.push(sample.availability_value());
        }

        ToolCommand::new(&self.rrdtool)
            .arg("update")
            .arg(self.path_arg())
            .arg("--template")
            .arg(template.join(":"))
            .arg(values.join(":"))
    }

    /// Check the file against the current target set, creating it if it
    /// is missing or laid out for a different set.
    ///
    /// Returns whether a create was issued.
    pub async fn ensure(
        &self,
        targets: &BTreeMap<String, Target>,
        graphs: &GraphIntervals,
    ) -> Result<bool, ToolError> {
        let expected = expected_sources(targets);

        match self.info_command().run().await {
            Ok(info) => {
                let found = parse_sources(&info);
                if found == expected {
                    tracing::debug!("{} matches {} targets", self.path.display(), targets.len());
                    return Ok(false);
                }
                tracing::info!(
                    "{} has data sources for a different target set, recreating",
                    self.path.display()
                );
            }
            Err(e) => {
                tracing::debug!("rrdtool info failed: {}", e);
                tracing::info!("Creating {}", self.path.display());
            }
        }

        let cmd = self.create_command(targets, graphs);
        tracing::debug!("{}", cmd);
        cmd.run().await?;
        Ok(true)
    }

    /// Append this cycle's row.
    pub async fn update(
        &self,
        samples: &BTreeMap<String, CycleSample>,
        at: DateTime<Utc>,
    ) -> Result<(), ToolError> {
        let cmd = self.update_command(samples, at);
        tracing::debug!("{}", cmd);
        cmd.run().await.map(|_| ())
    }
}

fn rra_spec(graph: &GraphInterval) -> String {
    format!(
        "RRA:{}:{}:{}:{}",
        graph.rra,
        graph.rra.xff(),
        graph.interval,
        graph.duration
    )
}

fn expected_sources(targets: &BTreeMap<String, Target>) -> BTreeSet<String> {
    targets
        .keys()
        .flat_map(|id| [ds_name(id, Series::Latency), ds_name(id, Series::Availability)])
        .collect()
}

/// Data-source names listed by `rrdtool info`.
fn parse_sources(info: &str) -> BTreeSet<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^ds\[(?P<name>[A-Za-z0-9_]+)\]\.index\s*=").unwrap());

    re.captures_iter(info)
        .filter_map(|caps| caps.name("name"))
        .map(|m| m.as_str().to_string())
        .collect()
}
