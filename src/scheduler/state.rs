//! Per-target state for one cycle.

use chrono::{DateTime, Local, Utc};
use std::collections::BTreeMap;

use crate::db::Target;
use crate::probe::{parse_ping_output, PingOutcome, ProbeOutput};

/// Round-trip times rounded to whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTrip {
    pub min: u32,
    pub avg: u32,
    pub max: u32,
    pub mdev: u32,
}

/// What one cycle learned about one target.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSample {
    pub transmitted: Option<u32>,
    pub received: Option<u32>,
    /// 100 minus the loss percentage.
    pub availability: f64,
    /// `None` means unknown.
    pub rtt: Option<RoundTrip>,
    pub resolved_ip: Option<String>,
    pub failed: bool,
}

impl CycleSample {
    /// Nothing known, host counted as down.
    pub fn unknown() -> Self {
        Self {
            transmitted: None,
            received: None,
            availability: 0.0,
            rtt: None,
            resolved_ip: None,
            failed: true,
        }
    }

    /// Classify a probe result.
    ///
    /// `last_failure` moves to `now` when the host is judged down and is
    /// otherwise left alone.
    pub fn from_probe(output: &ProbeOutput, now: DateTime<Utc>, last_failure: &mut DateTime<Utc>) -> Self {
        let sample = if output.error.is_some() {
            Self::unknown()
        } else {
            match parse_ping_output(&output.text) {
                PingOutcome::Unrecognized => {
                    tracing::debug!("Unrecognized ping output: {}", output.text.trim());
                    Self::unknown()
                }
                PingOutcome::Stats(stats) => {
                    tracing::debug!(
                        "ping {} [{}]: {}/{} received, {}% loss",
                        stats.host.as_deref().unwrap_or("?"),
                        stats.ip.as_deref().unwrap_or("?"),
                        stats.received,
                        stats.transmitted,
                        stats.loss_percent
                    );
                    let availability = 100.0 - stats.loss_percent;
                    let down = availability <= 0.0;
                    Self {
                        transmitted: Some(stats.transmitted),
                        received: Some(stats.received),
                        availability,
                        rtt: if down {
                            None
                        } else {
                            stats.rtt.map(|r| RoundTrip {
                                min: round_ms(r.min),
                                avg: round_ms(r.avg),
                                max: round_ms(r.max),
                                mdev: round_ms(r.mdev),
                            })
                        },
                        resolved_ip: stats.ip,
                        failed: down,
                    }
                }
            }
        };

        if sample.failed && now > *last_failure {
            *last_failure = now;
        }
        sample
    }

    /// Average RTT as written to the time-series file, `U` when unknown.
    pub fn avg_rtt_value(&self) -> String {
        match self.rtt {
            Some(rtt) => rtt.avg.to_string(),
            None => "U".to_string(),
        }
    }

    pub fn availability_value(&self) -> String {
        format!("{}", self.availability)
    }
}

fn round_ms(ms: f64) -> u32 {
    ms.round().max(0.0) as u32
}

/// Elapsed time as half-days, hours, minutes and seconds.
///
/// Zero units are left out; an elapsed time of zero reads `0 seconds`.
pub fn format_uptime(elapsed: chrono::Duration) -> String {
    let total = elapsed.num_seconds().unsigned_abs();
    let (mins, secs) = (total / 60, total % 60);
    let (hours, mins) = (mins / 60, mins % 60);
    let (half_days, hours) = (hours / 12, hours % 12);

    let parts: Vec<String> = [
        (half_days, "half-days"),
        (hours, "hours"),
        (mins, "minutes"),
        (secs, "seconds"),
    ]
    .into_iter()
    .filter(|(n, _)| *n > 0)
    .map(|(n, unit)| format!("{} {}", n, unit))
    .collect();

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(", ")
    }
}

/// One target with its sample for the current cycle.
#[derive(Debug, Clone)]
pub struct TargetState {
    pub target: Target,
    pub sample: CycleSample,
    /// Display only.
    pub uptime: String,
}

/// All targets, in ascending id order.
#[derive(Debug, Clone, Default)]
pub struct TargetStates {
    states: BTreeMap<String, TargetState>,
}

impl TargetStates {
    pub fn new(targets: &BTreeMap<String, Target>) -> Self {
        let states = targets
            .iter()
            .map(|(id, target)| {
                (
                    id.clone(),
                    TargetState {
                        target: target.clone(),
                        sample: CycleSample::unknown(),
                        uptime: String::new(),
                    },
                )
            })
            .collect();
        Self { states }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TargetState)> {
        self.states.iter().map(|(id, s)| (id.as_str(), s))
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&TargetState> {
        self.states.get(id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Fold probe results in. A target with no result is treated as a
    /// failed launch.
    pub fn apply_probes(&mut self, mut outputs: BTreeMap<String, ProbeOutput>, now: DateTime<Utc>) {
        for (id, state) in self.states.iter_mut() {
            let sample = match outputs.remove(id) {
                Some(output) => CycleSample::from_probe(&output, now, &mut state.target.last_failure),
                None => {
                    tracing::warn!("No probe result for {}", id);
                    CycleSample::from_probe(
                        &ProbeOutput::from_text(""),
                        now,
                        &mut state.target.last_failure,
                    )
                }
            };

            tracing::debug!(
                "{}: availability={} avg_rtt={} last_failure={}",
                id,
                sample.availability,
                sample.avg_rtt_value(),
                state.target.last_failure
            );

            state.sample = sample;
            state.target.last_poll = Some(now);
        }
    }

    /// Recompute every uptime string relative to `now`.
    pub fn refresh_uptime(&mut self, now: DateTime<Utc>) {
        let clock = now.with_timezone(&Local).format("%H:%M:%S");
        for (id, state) in self.states.iter_mut() {
            state.uptime = format!(
                "{} UP (since last ping fail) for {}.",
                clock,
                format_uptime(now - state.target.last_failure)
            );
            tracing::debug!("{}: {}", id, state.uptime);
        }
    }

    /// Persistent fields, for writing back to the configuration.
    pub fn targets(&self) -> BTreeMap<String, Target> {
        self.states
            .iter()
            .map(|(id, s)| (id.clone(), s.target.clone()))
            .collect()
    }

    pub fn samples(&self) -> BTreeMap<String, CycleSample> {
        self.states
            .iter()
            .map(|(id, s)| (id.clone(), s.sample.clone()))
            .collect()
    }
}
