//! Ping probe: command construction and output parsing.
//!
//! Parsing is a pure function over the utility's text so it can be tested
//! without running anything.

use regex::Regex;
use std::sync::OnceLock;

use crate::command::ToolCommand;

/// Build the echo-request command for one target.
///
/// `-q` keeps per-packet lines out of the output; only the header and
/// the statistics summary remain.
pub fn ping_command(ping_bin: &str, address: &str, count: u32) -> ToolCommand {
    ToolCommand::new(ping_bin)
        .arg("-q")
        .arg("-c")
        .arg(count.to_string())
        .arg(address)
}

/// Round-trip statistics in milliseconds, as printed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub mdev: f64,
}

/// Fields extracted from one ping run.
#[derive(Debug, Clone, PartialEq)]
pub struct PingStats {
    pub host: Option<String>,
    pub ip: Option<String>,
    pub transmitted: u32,
    pub received: u32,
    /// Not range-checked.
    pub loss_percent: f64,
    /// Absent when no reply came back.
    pub rtt: Option<RttStats>,
}

/// Result of parsing ping output.
#[derive(Debug, Clone, PartialEq)]
pub enum PingOutcome {
    Stats(PingStats),
    /// The statistics summary was not found.
    Unrecognized,
}

/// Parse ping output into statistics.
///
/// Understands the iputils format (`rtt min/avg/max/mdev`) and the BSD/macOS
/// format (`round-trip min/avg/max/stddev`, `packets received`).
pub fn parse_ping_output(output: &str) -> PingOutcome {
    // Header: "PING host (1.2.3.4) 56(84) bytes of data." / "PING host (1.2.3.4): 56 data bytes"
    static HEADER: OnceLock<Regex> = OnceLock::new();
    let header = HEADER.get_or_init(|| {
        Regex::new(r"(?m)^PING\s+(?P<host>[\w\-.:]+)\s+\((?P<ip>[0-9A-Fa-f.:]+)\)").unwrap()
    });

    // Summary: "3 packets transmitted, 3 received, 0% packet loss, time 2003ms"
    // Errors may sit between received and loss: "+3 errors, 100% packet loss"
    static SUMMARY: OnceLock<Regex> = OnceLock::new();
    let summary = SUMMARY.get_or_init(|| {
        Regex::new(
            r"(?P<tx>\d+)\s+packets\s+transmitted,\s+(?P<rx>\d+)\s+(?:packets\s+)?received,[^\n]*?(?P<loss>\d+(?:\.\d+)?)%\s+packet\s+loss",
        )
        .unwrap()
    });

    // RTT: "rtt min/avg/max/mdev = 10.1/12.3/15.0/1.2 ms"
    static RTT: OnceLock<Regex> = OnceLock::new();
    let rtt = RTT.get_or_init(|| {
        Regex::new(
            r"min/avg/max/(?:mdev|stddev)\s*=\s*(?P<min>\d+(?:\.\d+)?)/(?P<avg>\d+(?:\.\d+)?)/(?P<max>\d+(?:\.\d+)?)/(?P<mdev>\d+(?:\.\d+)?)\s*ms",
        )
        .unwrap()
    });

    let Some(caps) = summary.captures(output) else {
        return PingOutcome::Unrecognized;
    };

    let (Ok(transmitted), Ok(received), Ok(loss_percent)) = (
        caps["tx"].parse::<u32>(),
        caps["rx"].parse::<u32>(),
        caps["loss"].parse::<f64>(),
    ) else {
        return PingOutcome::Unrecognized;
    };

    let (host, ip) = match header.captures(output) {
        Some(h) => (
            h.name("host").map(|m| m.as_str().to_string()),
            h.name("ip").map(|m| m.as_str().to_string()),
        ),
        None => (None, None),
    };

    let rtt = rtt.captures(output).and_then(|r| {
        Some(RttStats {
            min: r["min"].parse().ok()?,
            avg: r["avg"].parse().ok()?,
            max: r["max"].parse().ok()?,
            mdev: r["mdev"].parse().ok()?,
        })
    });

    PingOutcome::Stats(PingStats {
        host,
        ip,
        transmitted,
        received,
        loss_percent,
        rtt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_command() {
        let cmd = ping_command("/bin/ping", "one.one.one.one", 5);
        assert_eq!(cmd.program, "/bin/ping");
        assert_eq!(cmd.args, ["-q", "-c", "5", "one.one.one.one"]);
    }

    #[test]
    fn test_parse_linux_success() {
        let output = r#"PING dns.google (8.8.8.8) 56(84) bytes of data.

--- dns.google ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2003ms
rtt min/avg/max/mdev = 10.1/12.3/15.0/1.2 ms"#;

        let PingOutcome::Stats(stats) = parse_ping_output(output) else {
            panic!("expected stats");
        };
        assert_eq!(stats.host.as_deref(), Some("dns.google"));
        assert_eq!(stats.ip.as_deref(), Some("8.8.8.8"));
        assert_eq!(stats.transmitted, 3);
        assert_eq!(stats.received, 3);
        assert_eq!(stats.loss_percent, 0.0);
        let rtt = stats.rtt.unwrap();
        assert!((rtt.avg - 12.3).abs() < 1e-9);
        assert!((rtt.mdev - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_parse_linux_total_loss() {
        let output = r#"PING 192.0.2.1 (192.0.2.1) 56(84) bytes of data.

--- 192.0.2.1 ping statistics ---
5 packets transmitted, 0 received, 100% packet loss, time 4098ms
"#;
        let PingOutcome::Stats(stats) = parse_ping_output(output) else {
            panic!("expected stats");
        };
        assert_eq!(stats.received, 0);
        assert_eq!(stats.loss_percent, 100.0);
        assert!(stats.rtt.is_none());
    }

    #[test]
    fn test_parse_linux_with_errors() {
        let output = r#"PING 10.9.9.9 (10.9.9.9) 56(84) bytes of data.

--- 10.9.9.9 ping statistics ---
5 packets transmitted, 0 received, +5 errors, 100% packet loss, time 4077ms
"#;
        let PingOutcome::Stats(stats) = parse_ping_output(output) else {
            panic!("expected stats");
        };
        assert_eq!(stats.transmitted, 5);
        assert_eq!(stats.loss_percent, 100.0);
    }

    #[test]
    fn test_parse_fractional_loss() {
        let output = r#"PING 192.0.2.7 (192.0.2.7) 56(84) bytes of data.

--- 192.0.2.7 ping statistics ---
3 packets transmitted, 2 received, 33.3333% packet loss, time 2002ms
rtt min/avg/max/mdev = 1.000/2.000/3.000/0.816 ms
"#;
        let PingOutcome::Stats(stats) = parse_ping_output(output) else {
            panic!("expected stats");
        };
        assert_eq!(stats.received, 2);
        assert_eq!(stats.loss_percent, 33.3333);
    }

    #[test]
    fn test_parse_loss_not_range_checked() {
        let output = "2 packets transmitted, 1 received, 150% packet loss, time 1001ms\n";
        let PingOutcome::Stats(stats) = parse_ping_output(output) else {
            panic!("expected stats");
        };
        assert_eq!(stats.loss_percent, 150.0);
        assert_eq!(stats.host, None);
    }

    #[test]
    fn test_parse_macos_summary() {
        let output = r#"PING google.com (142.250.69.174): 56 data bytes

--- google.com ping statistics ---
5 packets transmitted, 4 packets received, 20.0% packet loss
round-trip min/avg/max/stddev = 17.906/18.512/19.004/0.402 ms"#;

        let PingOutcome::Stats(stats) = parse_ping_output(output) else {
            panic!("expected stats");
        };
        assert_eq!(stats.ip.as_deref(), Some("142.250.69.174"));
        assert_eq!(stats.received, 4);
        assert_eq!(stats.loss_percent, 20.0);
        assert!((stats.rtt.unwrap().avg - 18.512).abs() < 1e-9);
    }

    #[test]
    fn test_parse_unrecognized() {
        assert_eq!(
            parse_ping_output("ping: nowhere.invalid: Name or service not known\n"),
            PingOutcome::Unrecognized
        );
        assert_eq!(parse_ping_output(""), PingOutcome::Unrecognized);
    }
}
