//! Static HTML pages.
//!
//! Templates live in `templates/` and are compiled in by askama, which
//! escapes every interpolated value.

use askama::Template;
use chrono::{DateTime, Duration, Local, Utc};
use std::fs;
use std::path::Path;

use super::{ReportError, Reporter};
use crate::db::{graph_file, page_file, GraphIntervals, INDEX_PAGE};
use crate::scheduler::{RoundTrip, TargetState, TargetStates};

const TITLE: &str = "Host Availability";

/// Header and footer fields shared by every page.
struct PageMeta {
    expires: String,
    version: &'static str,
    generated: String,
}

impl PageMeta {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            expires: (now + Duration::seconds(60)).to_rfc2822(),
            version: env!("CARGO_PKG_VERSION"),
            generated: display_time(now),
        }
    }
}

struct GraphLink<'a> {
    interval: &'a str,
    png: String,
}

impl<'a> GraphLink<'a> {
    fn new(id: &str, interval: &'a str) -> Self {
        Self {
            interval,
            png: graph_file(id, interval),
        }
    }
}

struct IndexRow<'a> {
    id: &'a str,
    page: String,
    failed: bool,
    availability: f64,
    graph: Option<GraphLink<'a>>,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexPage<'a> {
    title: &'a str,
    meta: PageMeta,
    rows: Vec<IndexRow<'a>>,
}

#[derive(Template)]
#[template(path = "target.html")]
struct TargetPage<'a> {
    title: String,
    meta: PageMeta,
    id: &'a str,
    address: &'a str,
    ip: &'a str,
    failed: bool,
    availability: f64,
    packets: String,
    rtt: Option<RoundTrip>,
    uptime: &'a str,
    last_failure: String,
    last_poll: String,
    graphs: Vec<GraphLink<'a>>,
}

fn display_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// The overview page: every target with its finest-resolution graph.
pub fn index_page(
    states: &TargetStates,
    graphs: &GraphIntervals,
    now: DateTime<Utc>,
) -> Result<String, askama::Error> {
    let rows = states
        .iter()
        .map(|(id, state)| IndexRow {
            id,
            page: page_file(id),
            failed: state.sample.failed,
            availability: state.sample.availability,
            graph: graphs.first().map(|(interval, _)| GraphLink::new(id, interval)),
        })
        .collect();

    IndexPage {
        title: TITLE,
        meta: PageMeta::new(now),
        rows,
    }
    .render()
}

/// One target's page: status table and every graph in step order.
pub fn target_page(
    id: &str,
    state: &TargetState,
    graphs: &GraphIntervals,
    now: DateTime<Utc>,
) -> Result<String, askama::Error> {
    let sample = &state.sample;
    let packets = match (sample.received, sample.transmitted) {
        (Some(rx), Some(tx)) => format!("{} of {} received", rx, tx),
        _ => "unknown".to_string(),
    };

    TargetPage {
        title: format!("{} - {}", TITLE, id),
        meta: PageMeta::new(now),
        id,
        address: &state.target.address,
        ip: sample.resolved_ip.as_deref().unwrap_or("unknown"),
        failed: sample.failed,
        availability: sample.availability,
        packets,
        rtt: sample.rtt,
        uptime: &state.uptime,
        last_failure: display_time(state.target.last_failure),
        last_poll: state
            .target
            .last_poll
            .map(display_time)
            .unwrap_or_else(|| "never".to_string()),
        graphs: graphs
            .iter()
            .map(|(interval, _)| GraphLink::new(id, interval))
            .collect(),
    }
    .render()
}

fn write_file(path: &Path, content: &str) -> Result<(), ReportError> {
    fs::write(path, content).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl Reporter {
    /// Write `index.html` and one page per target.
    pub fn write_pages(
        &self,
        states: &TargetStates,
        graphs: &GraphIntervals,
        now: DateTime<Utc>,
    ) -> Result<(), ReportError> {
        for (id, state) in states.iter() {
            let path = self.html_dir().join(page_file(id));
            write_file(&path, &target_page(id, state, graphs, now)?)?;
        }

        let index = self.html_dir().join(INDEX_PAGE);
        write_file(&index, &index_page(states, graphs, now)?)?;
        tracing::debug!("Wrote {} pages to {}", states.len() + 1, self.html_dir().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::db::{default_graphs, Target};
    use crate::probe::ProbeOutput;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn states() -> TargetStates {
        let mut targets = BTreeMap::new();
        targets.insert("Google".to_string(), Target::new("dns.google", now()));
        targets.insert("<lab>".to_string(), Target::new("192.0.2.1", now()));
        targets.insert("overload".to_string(), Target::new("192.0.2.8", now()));

        let mut outputs = BTreeMap::new();
        outputs.insert(
            "Google".to_string(),
            ProbeOutput::from_text(
                "PING dns.google (8.8.8.8) 56(84) bytes of data.\n\
                 3 packets transmitted, 3 received, 0% packet loss, time 2003ms\n\
                 rtt min/avg/max/mdev = 10.1/12.3/15.0/1.2 ms\n",
            ),
        );
        outputs.insert(
            "overload".to_string(),
            ProbeOutput::from_text(
                "PING 192.0.2.8 (192.0.2.8) 56(84) bytes of data.\n\
                 2 packets transmitted, 1 received, 150% packet loss, time 1001ms\n",
            ),
        );

        let mut states = TargetStates::new(&targets);
        states.apply_probes(outputs, now());
        states.refresh_uptime(now());
        states
    }

    #[test]
    fn test_index_page() {
        let page = index_page(&states(), &default_graphs(), now()).unwrap();
        assert!(page.contains("<meta http-equiv=\"refresh\" content=\"60\">"));
        assert!(page.contains("<meta http-equiv=\"cache-control\" content=\"no-cache\">"));
        assert!(page.contains("href=\"Google.html\""));
        assert!(page.contains("src=\"Google-1mx12h.png\""));
        assert!(page.contains("<b>Google</b> 100%"));
        assert!(page.contains("&lt;lab&gt;"));
        assert!(!page.contains("<lab>"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn test_target_page_lists_graphs_in_step_order() {
        let states = states();
        let state = states.get("Google").unwrap();
        let page = target_page("Google", state, &default_graphs(), now()).unwrap();

        let positions: Vec<_> = ["1mx12h", "5mx24h", "30mx7d", "2hx28d", "1dx365d"]
            .iter()
            .map(|n| page.find(&format!("Google-{}.png", n)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(page.contains("<td>10/12/15/1 ms</td>"));
        assert!(page.contains("8.8.8.8"));
        assert!(page.contains("3 of 3 received"));
    }

    #[test]
    fn test_down_target_page() {
        let states = states();
        let state = states.get("<lab>").unwrap();
        let page = target_page("<lab>", state, &default_graphs(), now()).unwrap();
        assert!(page.contains("<td>DOWN</td>"));
        assert!(page.contains("<td>unknown</td>"));
        assert!(page.contains("<h1>Host Availability - &lt;lab&gt;</h1>"));
        assert!(!page.contains("<lab>"));
    }

    #[test]
    fn test_negative_availability_is_shown_as_is() {
        let states = states();
        let state = states.get("overload").unwrap();
        let page = target_page("overload", state, &default_graphs(), now()).unwrap();
        assert!(page.contains("<td>DOWN</td>"));
        assert!(page.contains("<td>-50%</td>"));
        assert!(page.contains("<td>1 of 2 received</td>"));

        let index = index_page(&states, &default_graphs(), now()).unwrap();
        assert!(index.contains("<b>overload</b> <span class=\"down\">DOWN</span>"));
    }

    #[test]
    fn test_write_pages() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig::new(dir.path(), dir.path(), "hosts", false);
        let reporter = Reporter::new(&cfg);

        reporter.write_pages(&states(), &default_graphs(), now()).unwrap();
        assert!(dir.path().join("index.html").exists());
        assert!(dir.path().join("Google.html").exists());
        assert!(dir.path().join("_lab_.html").exists());
    }
}
