//! PawTrack replay driver.
//!
//! Feeds a JSON-lines stream of tracker inputs (stdin, or a file given
//! as the last argument) through one [`SubjectTracker`], logging every
//! event, then prints the final status and walk log as JSON.
//!
//! ```text
//!  stdin / file (JSON lines)
//!      │
//!      ▼
//!  ReplayLine ──▶ TrackerCommand ──▶ SubjectTracker ──▶ LogEventSink
//!                                         │
//!                                         ▼
//!                            stdout: { status, history }
//! ```
//!
//! Usage: `pawtrack <home_lat> <home_lon> [home_radius_m] [input.jsonl]`
//!
//! ```text
//! {"op":"fix","lat":52.0,"lon":8.0,"accuracy":5,"ts":1700000000000}
//! {"op":"start","ts":1700000060000}
//! {"op":"tick","ts":1700000120000}
//! {"op":"end","ts":1700000900000}
//! {"op":"auto","enabled":true}
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use anyhow::{Context, Result, bail};
use log::{info, warn};
use serde::Deserialize;

use pawtrack::adapters::log_sink::LogEventSink;
use pawtrack::app::commands::TrackerCommand;
use pawtrack::app::service::{SubjectProfile, SubjectTracker};
use pawtrack::config::TrackerConfig;
use pawtrack::fix::{FixSource, GpsFix, Timestamp};
use pawtrack::geo::GeoPoint;
use pawtrack::geofence::GeofenceZone;
use pawtrack::session::{EndTrigger, StartTrigger};

const DEFAULT_HOME_RADIUS_M: f64 = 50.0;

/// One input line.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ReplayLine {
    Fix {
        lat: f64,
        lon: f64,
        #[serde(default)]
        accuracy: f64,
        ts: Timestamp,
    },
    Start {
        ts: Timestamp,
    },
    End {
        ts: Timestamp,
    },
    Tick {
        ts: Timestamp,
    },
    Auto {
        enabled: bool,
    },
    Zone {
        name: String,
        lat: f64,
        lon: f64,
        radius_m: f64,
    },
}

struct Args {
    home: GeoPoint,
    radius_m: f64,
    input: Option<String>,
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        bail!("usage: pawtrack <home_lat> <home_lon> [home_radius_m] [input.jsonl]");
    }
    let lat: f64 = args[0].parse().context("home latitude")?;
    let lon: f64 = args[1].parse().context("home longitude")?;

    let mut radius_m = DEFAULT_HOME_RADIUS_M;
    let mut input = None;
    for extra in &args[2..] {
        match extra.parse::<f64>() {
            Ok(r) => radius_m = r,
            Err(_) => input = Some(extra.clone()),
        }
    }

    Ok(Args {
        home: GeoPoint::new(lat, lon),
        radius_m,
        input,
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let home = GeofenceZone::home(args.home, args.radius_m)
        .map_err(|e| anyhow::anyhow!("home zone: {e}"))?;
    let mut zones = vec![home];

    let profile = SubjectProfile::new("dog", "Dog", 20.0).with_auto_detection(true);
    let mut tracker = SubjectTracker::new(profile, zones.clone(), TrackerConfig::default())
        .context("tracker setup")?;
    let mut sink = LogEventSink::new();

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {path}"))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut applied = 0usize;
    for (n, line) in reader.lines().enumerate() {
        let line = line.context("reading input")?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: ReplayLine = match serde_json::from_str(&line) {
            Ok(p) => p,
            Err(e) => {
                warn!("line {}: skipped ({})", n + 1, e);
                continue;
            }
        };

        let cmd = match parsed {
            ReplayLine::Fix {
                lat,
                lon,
                accuracy,
                ts,
            } => TrackerCommand::SubmitFix(GpsFix::new(lat, lon, accuracy, ts, FixSource::Manual)),
            ReplayLine::Start { ts } => TrackerCommand::StartWalk {
                trigger: StartTrigger::Manual,
                at: ts,
            },
            ReplayLine::End { ts } => TrackerCommand::EndWalk {
                trigger: EndTrigger::Manual,
                at: ts,
            },
            ReplayLine::Tick { ts } => TrackerCommand::Tick { now: ts },
            ReplayLine::Auto { enabled } => TrackerCommand::SetAutoDetection(enabled),
            ReplayLine::Zone {
                name,
                lat,
                lon,
                radius_m,
            } => match GeofenceZone::new(name, GeoPoint::new(lat, lon), radius_m) {
                Ok(zone) => {
                    zones.retain(|z| z.name != zone.name);
                    zones.push(zone);
                    TrackerCommand::SetZones(zones.clone())
                }
                Err(e) => {
                    warn!("line {}: bad zone ({})", n + 1, e);
                    continue;
                }
            },
        };

        match tracker.handle_command(cmd, &mut sink) {
            Ok(()) => applied += 1,
            Err(e) => warn!("line {}: {}", n + 1, e),
        }
    }

    info!("Replay complete: {} inputs applied", applied);

    let report = serde_json::json!({
        "status": tracker.status(),
        "active_session": tracker.active_session(),
        "history": tracker.history().to_vec(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
