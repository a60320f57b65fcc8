/// Command handlers for the chamberlink binary.
///
/// Thin glue over the session API: parse the value for the address's
/// inferred type, run the transaction, print JSON. Connection parameters
/// come from flags when given, otherwise from the environment.
use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use serde_json::json;
use std::sync::Arc;

use crate::api::poll::{poll_loop, PollParams, PollPoint};
use crate::api::PlcSession;
use crate::core::{ConnectOptions, Value};
use crate::protocol::address::{resolve, ValueKind};

pub fn run(matches: &ArgMatches) -> Result<()> {
    let opts = connect_options(matches)?;
    let session = PlcSession::connect(&opts);

    match matches.subcommand() {
        Some(("read", sub)) => handle_read(&session, sub),
        Some(("write", sub)) => handle_write(&session, sub),
        Some(("watch", sub)) => handle_watch(session, sub),
        _ => unreachable!("subcommand is required"),
    }
}

fn connect_options(matches: &ArgMatches) -> Result<ConnectOptions> {
    if let Some(ip) = matches.get_one::<String>("ip") {
        let local = matches
            .get_one::<String>("local-tsap")
            .map(String::as_str)
            .unwrap_or("0100");
        let remote = matches
            .get_one::<String>("remote-tsap")
            .map(String::as_str)
            .unwrap_or("0200");
        let local = u16::from_str_radix(local.trim_start_matches("0x"), 16)
            .map_err(|_| anyhow!("invalid --local-tsap '{local}'"))?;
        let remote = u16::from_str_radix(remote.trim_start_matches("0x"), 16)
            .map_err(|_| anyhow!("invalid --remote-tsap '{remote}'"))?;
        Ok(ConnectOptions::new(ip.clone(), local, remote))
    } else {
        ConnectOptions::from_env()
            .context("no --ip given and connection environment is incomplete")
    }
}

fn handle_read(session: &PlcSession, matches: &ArgMatches) -> Result<()> {
    let address = matches
        .get_one::<String>("address")
        .expect("address is required");

    if matches.get_flag("raw") {
        let bytes = session.read_raw(address)?;
        println!(
            "{}",
            json!({ "address": address, "raw": bytes })
        );
    } else {
        let value = session.read(address)?;
        println!("{}", json!({ "address": address, "value": value }));
    }
    Ok(())
}

fn handle_write(session: &PlcSession, matches: &ArgMatches) -> Result<()> {
    let address = matches
        .get_one::<String>("address")
        .expect("address is required");
    let raw_value = matches
        .get_one::<String>("value")
        .expect("value is required");

    let resolved = resolve(address)?;
    let value = parse_value(resolved.kind, raw_value)?;
    session.write(address, value)?;
    println!("{}", json!({ "address": address, "written": value }));
    Ok(())
}

/// Parse the CLI value string according to the address's inferred type.
fn parse_value(kind: ValueKind, raw: &str) -> Result<Value> {
    match kind {
        ValueKind::Bit => match raw.to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "off" | "0" => Ok(Value::Bool(false)),
            _ => bail!("'{raw}' is not a boolean (use true/false/1/0)"),
        },
        ValueKind::Byte | ValueKind::Word => raw
            .parse::<i16>()
            .map(Value::Int)
            .map_err(|_| anyhow!("'{raw}' is not a 16-bit integer")),
        ValueKind::Real => raw
            .parse::<f32>()
            .map(Value::Real)
            .map_err(|_| anyhow!("'{raw}' is not a float")),
        ValueKind::DWord => raw
            .parse::<u32>()
            .map(Value::DWord)
            .map_err(|_| anyhow!("'{raw}' is not an unsigned 32-bit integer")),
    }
}

fn handle_watch(session: PlcSession, matches: &ArgMatches) -> Result<()> {
    let points: Vec<PollPoint> = matches
        .get_many::<String>("point")
        .ok_or_else(|| anyhow!("at least one --point NAME=ADDRESS is required"))?
        .map(|spec| {
            spec.split_once('=')
                .map(|(name, address)| PollPoint::new(name, address))
                .ok_or_else(|| anyhow!("invalid --point '{spec}', expected NAME=ADDRESS"))
        })
        .collect::<Result<_>>()?;

    let interval_ms: u64 = matches
        .get_one::<String>("interval")
        .expect("interval has a default")
        .parse()
        .context("--interval must be milliseconds")?;

    let count: Option<u64> = matches
        .get_one::<String>("count")
        .map(|raw| raw.parse().context("--count must be a number"))
        .transpose()?;

    let (response_tx, response_rx) = flume::unbounded();
    let (control_tx, control_rx) = flume::unbounded();

    let params = PollParams {
        session: Arc::new(session),
        points,
        response_tx,
        control_rx: Some(control_rx),
        poll_interval_ms: interval_ms,
    };
    let handle = std::thread::spawn(move || poll_loop(&params));

    let mut seen = 0u64;
    while let Ok(snapshot) = response_rx.recv() {
        println!("{}", serde_json::to_string(&snapshot)?);
        seen += 1;
        if let Some(count) = count {
            if seen >= count {
                let _ = control_tx.send("stop".to_string());
                break;
            }
        }
    }

    handle
        .join()
        .map_err(|_| anyhow!("poll loop thread panicked"))??;
    Ok(())
}
