//! Names derived from target ids: rrdtool data sources, pages and graphs.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use super::models::{GraphIntervals, Target};
use super::rrd::{ds_name, Series};

/// The overview page, shared by all targets.
pub const INDEX_PAGE: &str = "index.html";

/// File-name-safe form of a target id.
pub fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// HTML page for one target, relative to the HTML dir.
pub fn page_file(id: &str) -> String {
    format!("{}.html", file_stem(id))
}

/// PNG file name for one target and interval, relative to the HTML dir.
pub fn graph_file(id: &str, interval: &str) -> String {
    format!("{}-{}.png", file_stem(id), file_stem(interval))
}

/// Two configuration entries that would share a derived name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameClash {
    pub name: String,
    pub first: String,
    pub second: String,
}

/// Find the first derived name claimed by two different entries.
///
/// Data-source names, target pages and graph files all live in flat
/// namespaces, so each must map back to exactly one target.
pub fn find_clash(targets: &BTreeMap<String, Target>, graphs: &GraphIntervals) -> Option<NameClash> {
    let mut owners: HashMap<String, String> = HashMap::new();
    owners.insert(INDEX_PAGE.to_string(), "index page".to_string());

    for id in targets.keys() {
        let mut claims = vec![
            (ds_name(id, Series::Latency), id.clone()),
            (ds_name(id, Series::Availability), id.clone()),
            (page_file(id), id.clone()),
        ];
        claims.extend(
            graphs
                .iter()
                .map(|(interval, _)| (graph_file(id, interval), format!("{} ({})", id, interval))),
        );

        for (name, owner) in claims {
            match owners.entry(name) {
                Entry::Vacant(slot) => {
                    slot.insert(owner);
                }
                Entry::Occupied(slot) => {
                    return Some(NameClash {
                        name: slot.key().clone(),
                        first: slot.get().clone(),
                        second: owner,
                    });
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{default_graphs, default_targets, GraphInterval};
    use chrono::{TimeZone, Utc};

    fn targets(ids: &[&str]) -> BTreeMap<String, Target> {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        ids.iter()
            .map(|id| (id.to_string(), Target::new("192.0.2.1", now)))
            .collect()
    }

    #[test]
    fn test_file_names() {
        assert_eq!(page_file("Google"), "Google.html");
        assert_eq!(graph_file("Google", "1mx12h"), "Google-1mx12h.png");
        assert_eq!(graph_file("lab/core router", "1mx12h"), "lab_core_router-1mx12h.png");
    }

    #[test]
    fn test_defaults_have_no_clash() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(find_clash(&default_targets(now), &default_graphs()), None);
    }

    #[test]
    fn test_distinct_ids_with_same_data_source() {
        let clash = find_clash(
            &targets(&["core-router-east", "core-router-west", "web-01", "web.01"]),
            &default_graphs(),
        )
        .unwrap();
        assert_eq!(clash.name, "core_router_e_rtt");
        assert_eq!(clash.first, "core-router-east");
        assert_eq!(clash.second, "core-router-west");

        let clash = find_clash(&targets(&["web-01", "web.01"]), &default_graphs()).unwrap();
        assert_eq!(clash.name, "web_01_rtt");
    }

    #[test]
    fn test_distinct_ids_with_same_graph_file() {
        let mut graphs: BTreeMap<String, GraphInterval> = default_graphs()
            .iter()
            .map(|(name, g)| (name.to_string(), g.clone()))
            .collect();
        let hourly = graphs["1mx12h"].clone();
        graphs.insert("b-c".to_string(), hourly.clone());
        graphs.insert("c".to_string(), hourly);

        let clash = find_clash(&targets(&["a", "a-b"]), &GraphIntervals::new(graphs)).unwrap();
        assert_eq!(clash.name, "a-b-c.png");
        assert_eq!(clash.first, "a (b-c)");
        assert_eq!(clash.second, "a-b (c)");
    }

    #[test]
    fn test_index_is_reserved() {
        let clash = find_clash(&targets(&["index"]), &default_graphs()).unwrap();
        assert_eq!(clash.name, INDEX_PAGE);
        assert_eq!(clash.first, "index page");
        assert_eq!(clash.second, "index");
    }
}
