use clap::{value_parser, Arg, ArgAction, ArgGroup, Command};
use tracing::error;
use tracing_subscriber::EnvFilter;

use cyclecount::config::{OutputFormat, DEFAULT_DELTA, DEFAULT_SCALE};

mod app_logic;
mod parser;

fn main() {
    let delta_help = format!(
        "Turning-point hysteresis threshold (with --input) [default: {}]",
        DEFAULT_DELTA
    );
    let scale_help = format!(
        "Factor applied to ranges and means, e.g. 0.01 for percent to fraction \
         (with --input) [default: {}]",
        DEFAULT_SCALE
    );
    let matches = Command::new("cyclecount")
        .version("0.1.0")
        .about("Rainflow cycle counting of state-of-charge and load signals")
        .arg(
            Arg::new("run")
                .short('r')
                .long("run")
                .value_name("CONFIG")
                .help("Run the YAML configuration file"),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Count the cycles of a single time,value file"),
        )
        .group(ArgGroup::new("source").args(["run", "input"]).required(true))
        .arg(
            Arg::new("delta")
                .short('d')
                .long("delta")
                .value_parser(value_parser!(f64))
                .help(delta_help),
        )
        .arg(
            Arg::new("scale")
                .short('s')
                .long("scale")
                .value_parser(value_parser!(f64))
                .help(scale_help),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_parser(["json", "csv", "table"])
                .default_value("table")
                .help("Output format (with --input)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log debug information"),
        )
        .after_help("RUST_LOG overrides the log filter, e.g. RUST_LOG=cyclecount=trace")
        .get_matches();

    let level = if matches.get_flag("verbose") { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = if let Some(config_path) = matches.get_one::<String>("run") {
        app_logic::run(config_path)
    } else if let Some(input) = matches.get_one::<String>("input") {
        let delta = matches.get_one::<f64>("delta").copied().unwrap_or(DEFAULT_DELTA);
        let scale = matches.get_one::<f64>("scale").copied().unwrap_or(DEFAULT_SCALE);
        let format = match matches.get_one::<String>("format").map(String::as_str) {
            Some("json") => OutputFormat::Json,
            Some("csv") => OutputFormat::Csv,
            _ => OutputFormat::Table,
        };
        app_logic::run_single(input, delta, scale, format)
    } else {
        Ok(())
    };

    if let Err(err) = result {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
