//! Report generation: rrdtool graphs and static HTML pages.

mod html;

use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::command::{run_all, ToolCommand};
use crate::config::RunConfig;
use crate::db::{ds_name, graph_file, GraphInterval, GraphIntervals, Series};
use crate::scheduler::{TargetState, TargetStates};

const GRAPH_WIDTH: u32 = 398;
const GRAPH_HEIGHT: u32 = 246;

/// Availability bands drawn behind the latency line.
///
/// Each band covers `(lower, upper]`; the first starts below zero so that
/// 0% is included.
const AVAILABILITY_BANDS: [(i32, i32, &str, &str); 5] = [
    (-1, 20, "#FF0000", "0-20%"),
    (20, 40, "#FFFF00", "21-40%"),
    (40, 79, "#FF8000", "41-79%"),
    (79, 99, "#00FFFF", "80-99%"),
    (99, 100, "#00FF00", "100%"),
];

/// Report error types.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),
}

/// rrdtool treats `:` as a field separator inside DEF paths.
fn escape_colons(path: &Path) -> String {
    path.to_string_lossy().replace(':', "\\:")
}

/// Renders graphs and pages into the HTML directory.
pub struct Reporter {
    rrdtool: String,
    rrd_path: PathBuf,
    html_dir: PathBuf,
}

impl Reporter {
    pub fn new(cfg: &RunConfig) -> Self {
        Self {
            rrdtool: cfg.rrdtool_bin.clone(),
            rrd_path: cfg.rrd_path.clone(),
            html_dir: cfg.html_dir.clone(),
        }
    }

    pub fn html_dir(&self) -> &Path {
        &self.html_dir
    }

    /// `rrdtool graph` for one target over one interval.
    pub fn graph_command(
        &self,
        id: &str,
        state: &TargetState,
        name: &str,
        graph: &GraphInterval,
        now: DateTime<Utc>,
    ) -> ToolCommand {
        let png = self.html_dir.join(graph_file(id, name));
        let db = escape_colons(&self.rrd_path);
        let stamp = now.with_timezone(&Local).format("%c");
        let ip = state.sample.resolved_ip.as_deref().unwrap_or("unknown");

        let mut cmd = ToolCommand::new(&self.rrdtool)
            .arg("graph")
            .arg(png.to_string_lossy())
            .args(["--width".to_string(), GRAPH_WIDTH.to_string()])
            .args(["--height".to_string(), GRAPH_HEIGHT.to_string()])
            .args(["--imgformat", "PNG"])
            .args(["--start".to_string(), format!("-{}", graph.duration)])
            .args(["--end", "now"])
            .args(["--font", "DEFAULT:7:"])
            .arg("--title")
            .arg(format!("Host Availability - {} ({})", id, name))
            .arg("--watermark")
            .arg(format!("{} - {} [{}]", stamp, state.target.address, ip))
            .args(["--vertical-label", "Round Trip Time latency(ms)"])
            .args(["--right-axis-label", "Availability (%)"])
            .args(["--lower-limit", "0"])
            .args(["--right-axis", "1:0"])
            .arg("--x-grid")
            .arg(format!("{}:0:%R", graph.xgrid))
            .arg("--alt-y-grid")
            .arg("--rigid")
            .arg(format!(
                "DEF:rtt={}:{}:{}:step={}",
                db,
                ds_name(id, Series::Latency),
                graph.rra,
                graph.step
            ))
            .arg(format!(
                "DEF:avail={}:{}:{}:step={}",
                db,
                ds_name(id, Series::Availability),
                graph.rra,
                graph.step
            ));

        for (i, (lower, upper, _, _)) in AVAILABILITY_BANDS.iter().enumerate() {
            cmd = cmd.arg(format!(
                "CDEF:band{}=avail,{},LE,avail,{},GT,OR,UNKN,INF,IF",
                i, lower, upper
            ));
        }

        cmd = cmd.arg("COMMENT:Availability\\:");
        for (i, (_, _, color, label)) in AVAILABILITY_BANDS.iter().enumerate() {
            cmd = cmd.arg(format!("AREA:band{}{}:{}", i, color, label));
        }

        cmd.arg("LINE1:rtt#0000FF:RTT latency ms")
            .arg("GPRINT:rtt:LAST:Current RTT\\: %5.2lf ms")
            .arg("GPRINT:rtt:AVERAGE:Avg RTT\\: %5.2lf ms")
            .arg("GPRINT:rtt:MAX:Max RTT\\: %5.2lf ms")
            .arg("GPRINT:rtt:MIN:Min RTT\\: %5.2lf ms")
    }

    /// Render every target over every interval concurrently.
    ///
    /// Returns how many graphs rendered successfully.
    pub async fn render_graphs(
        &self,
        states: &TargetStates,
        graphs: &GraphIntervals,
        now: DateTime<Utc>,
    ) -> usize {
        let commands: Vec<_> = states
            .iter()
            .flat_map(|(id, state)| {
                graphs.iter().map(move |(name, graph)| {
                    (
                        format!("{} ({})", id, name),
                        self.graph_command(id, state, name, graph, now),
                    )
                })
            })
            .collect();

        tracing::debug!("Spawned {} graph commands", commands.len());

        let mut rendered = 0;
        for (label, result) in run_all(commands).await {
            match result {
                Ok(output) if output.status.success() => {
                    rendered += 1;
                    tracing::debug!(
                        "{} rrdtool graph: {}",
                        label,
                        String::from_utf8_lossy(&output.stdout).trim()
                    );
                }
                Ok(output) => tracing::debug!(
                    "{} rrdtool graph failed: {}",
                    label,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                Err(e) => tracing::debug!("{} rrdtool graph failed: {}", label, e),
            }
        }
        rendered
    }
}
