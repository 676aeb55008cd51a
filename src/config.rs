//! Run configuration for availgraph.
//!
//! Built once at startup from command-line flags and environment
//! variables, then passed by reference to every component.

use std::env;
use std::path::{Path, PathBuf};

/// Default configuration file name, relative to the data directory.
pub const DEFAULT_CONFIG_NAME: &str = "availgraph.json";

/// Everything a cycle needs to know about its surroundings.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// JSON file holding targets and graph intervals.
    pub config_path: PathBuf,
    /// Time-series file, the config path with an `.rrd` extension.
    pub rrd_path: PathBuf,
    /// Where PNG graphs and HTML pages are written.
    pub html_dir: PathBuf,
    /// Echo utility (default: "ping")
    pub ping_bin: String,
    /// Round-robin database tool (default: "rrdtool")
    pub rrdtool_bin: String,
    /// Verbose diagnostics on stderr.
    pub debug: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(Path::new("."), Path::new("."), DEFAULT_CONFIG_NAME, false)
    }
}

impl RunConfig {
    /// Derive file locations from the data directory and config name.
    ///
    /// A name without a `.json` extension gets one appended. A relative
    /// name is placed in `data_dir`.
    pub fn new(data_dir: &Path, html_dir: &Path, config_name: &str, debug: bool) -> Self {
        let name = if Path::new(config_name).extension().is_some_and(|e| e == "json") {
            config_name.to_string()
        } else {
            format!("{}.json", config_name)
        };
        let config_path = data_dir.join(name);
        let rrd_path = config_path.with_extension("rrd");

        Self {
            config_path,
            rrd_path,
            html_dir: html_dir.to_path_buf(),
            ping_bin: "ping".to_string(),
            rrdtool_bin: "rrdtool".to_string(),
            debug,
        }
    }

    /// Apply environment overrides.
    ///
    /// Environment variables:
    /// - `AVAILGRAPH_PING_BIN`: echo utility (default: "ping")
    /// - `AVAILGRAPH_RRDTOOL_BIN`: rrdtool binary (default: "rrdtool")
    pub fn with_env(mut self) -> Self {
        if let Ok(bin) = env::var("AVAILGRAPH_PING_BIN") {
            if !bin.is_empty() {
                self.ping_bin = bin;
            }
        }

        if let Ok(bin) = env::var("AVAILGRAPH_RRDTOOL_BIN") {
            if !bin.is_empty() {
                self.rrdtool_bin = bin;
            }
        }

        self
    }

    /// Default tracing directive for this crate.
    pub fn log_directive(&self) -> &'static str {
        if self.debug {
            "availgraph=debug"
        } else {
            "availgraph=warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.config_path, Path::new("./availgraph.json"));
        assert_eq!(cfg.rrd_path, Path::new("./availgraph.rrd"));
        assert_eq!(cfg.ping_bin, "ping");
        assert_eq!(cfg.rrdtool_bin, "rrdtool");
        assert!(!cfg.debug);
        assert_eq!(cfg.log_directive(), "availgraph=warn");
    }

    #[test]
    fn test_config_name_gets_json_extension() {
        let cfg = RunConfig::new(Path::new("/var/lib/ag"), Path::new("/srv/www"), "lab", true);
        assert_eq!(cfg.config_path, Path::new("/var/lib/ag/lab.json"));
        assert_eq!(cfg.rrd_path, Path::new("/var/lib/ag/lab.rrd"));
        assert_eq!(cfg.html_dir, Path::new("/srv/www"));
        assert_eq!(cfg.log_directive(), "availgraph=debug");
    }

    #[test]
    fn test_trailing_separator_is_irrelevant() {
        let a = RunConfig::new(Path::new("/var/lib/ag/"), Path::new("/srv/www/"), "lab.json", false);
        let b = RunConfig::new(Path::new("/var/lib/ag"), Path::new("/srv/www"), "lab.json", false);
        assert_eq!(a.config_path, b.config_path);
        assert_eq!(a.rrd_path, b.rrd_path);
    }

    #[test]
    fn test_absolute_config_name_wins() {
        let cfg = RunConfig::new(Path::new("/data"), Path::new("/html"), "/etc/ag/hosts.json", false);
        assert_eq!(cfg.config_path, Path::new("/etc/ag/hosts.json"));
        assert_eq!(cfg.rrd_path, Path::new("/etc/ag/hosts.rrd"));
    }
}
