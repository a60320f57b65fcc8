/// Background monitoring loop.
///
/// Reads a fixed set of named addresses at a caller-chosen cadence and
/// ships timestamped snapshots over a channel. Consumers run one loop per
/// cadence (fast for safety-critical data, slow for general status); the
/// loops share the one session, whose lock serializes their device I/O.
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::PlcSession;
use crate::core::Value;

/// One named address polled each cycle.
#[derive(Debug, Clone, Serialize)]
pub struct PollPoint {
    pub name: String,
    pub address: String,
}

impl PollPoint {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// One polling cycle's worth of readings.
#[derive(Debug, Clone, Serialize)]
pub struct PollSnapshot {
    pub timestamp: String,
    pub values: BTreeMap<String, Value>,
    /// Per-point failures for the cycle; a failing point does not abort the
    /// rest of the snapshot.
    pub errors: BTreeMap<String, String>,
}

pub struct PollParams {
    pub session: Arc<PlcSession>,
    pub points: Vec<PollPoint>,
    pub response_tx: flume::Sender<PollSnapshot>,
    /// Control channel; send "stop" to exit the loop gracefully.
    /// None = run until the response channel disconnects.
    pub control_rx: Option<flume::Receiver<String>>,
    pub poll_interval_ms: u64,
}

/// Read every point once and assemble a snapshot.
pub fn poll_once(session: &PlcSession, points: &[PollPoint]) -> PollSnapshot {
    let mut values = BTreeMap::new();
    let mut errors = BTreeMap::new();

    for point in points {
        match session.read(&point.address) {
            Ok(value) => {
                values.insert(point.name.clone(), value);
            }
            Err(err) => {
                errors.insert(point.name.clone(), err.to_string());
            }
        }
    }

    PollSnapshot {
        timestamp: chrono::Utc::now().to_rfc3339(),
        values,
        errors,
    }
}

/// Long-running poll loop. Holds no device state of its own; each cycle is
/// a plain sequence of session reads.
pub fn poll_loop(params: &PollParams) -> Result<()> {
    log::info!(
        "starting poll loop: {} points, interval {}ms",
        params.points.len(),
        params.poll_interval_ms
    );

    let poll_interval = std::time::Duration::from_millis(params.poll_interval_ms);
    let mut consecutive_failures = 0u32;
    const MAX_CONSECUTIVE_FAILURES: u32 = 10;

    loop {
        if let Some(ref control) = params.control_rx {
            if let Ok(cmd) = control.try_recv() {
                match cmd.as_str() {
                    "stop" => {
                        log::info!("poll loop received stop command, exiting gracefully");
                        break;
                    }
                    _ => {
                        log::warn!("unknown control command: {cmd}");
                    }
                }
            }
        }

        let snapshot = poll_once(&params.session, &params.points);

        if snapshot.values.is_empty() && !snapshot.errors.is_empty() {
            consecutive_failures += 1;
            log::warn!(
                "poll cycle failed entirely (#{consecutive_failures}/{MAX_CONSECUTIVE_FAILURES})"
            );
            if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                log::error!(
                    "too many consecutive failed cycles ({consecutive_failures}), pausing before retrying"
                );
                std::thread::sleep(std::time::Duration::from_secs(5));
                consecutive_failures = 0;
            }
        } else {
            consecutive_failures = 0;
        }

        if let Err(err) = params.response_tx.try_send(snapshot) {
            log::warn!("failed to send snapshot to channel: {err}");
            if matches!(err, flume::TrySendError::Disconnected(_)) {
                log::error!("snapshot channel disconnected, stopping poll loop");
                break;
            }
        }

        std::thread::sleep(poll_interval);
    }

    log::info!("poll loop exited cleanly");
    Ok(())
}
