use clap::{Arg, ArgAction, Command};

use chamberlink::cli;

fn main() {
    env_logger::init();

    let matches = Command::new("chamberlink")
        .about("Supervisory access layer for the chamber controller")
        .subcommand_required(true)
        .arg(
            Arg::new("ip")
                .long("ip")
                .global(true)
                .help("Controller IP address (overrides PLC_IP)"),
        )
        .arg(
            Arg::new("local-tsap")
                .long("local-tsap")
                .global(true)
                .help("Local TSAP in hex (default 0100)"),
        )
        .arg(
            Arg::new("remote-tsap")
                .long("remote-tsap")
                .global(true)
                .help("Remote TSAP in hex (default 0200)"),
        )
        .subcommand(
            Command::new("read")
                .about("Read one symbolic address")
                .arg(Arg::new("address").required(true).help("e.g. VD504, M1.4, DB1.DBW50"))
                .arg(
                    Arg::new("raw")
                        .long("raw")
                        .action(ArgAction::SetTrue)
                        .help("Print the raw bytes instead of the decoded value"),
                ),
        )
        .subcommand(
            Command::new("write")
                .about("Write one value to a symbolic address")
                .arg(Arg::new("address").required(true))
                .arg(Arg::new("value").required(true)),
        )
        .subcommand(
            Command::new("watch")
                .about("Poll named addresses and print JSON snapshots")
                .arg(
                    Arg::new("point")
                        .long("point")
                        .action(ArgAction::Append)
                        .help("NAME=ADDRESS, repeatable"),
                )
                .arg(
                    Arg::new("interval")
                        .long("interval")
                        .default_value("1000")
                        .help("Poll interval in milliseconds"),
                )
                .arg(
                    Arg::new("count")
                        .long("count")
                        .help("Stop after this many snapshots"),
                ),
        )
        .get_matches();

    if let Err(err) = cli::run(&matches) {
        log::error!("{err:#}");
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
