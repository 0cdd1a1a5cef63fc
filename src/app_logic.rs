//! A module for the main application logic of the cycle counting tool
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::{info, warn};

use cyclecount::config::{load_config, Config, CycleOrder, InputConfig, OutputConfig, OutputFormat};
use cyclecount::{aggregate_batch, CountingConfig, CycleRecord, CycleSummary, Signal};

use crate::parser::read_signal;

/// The cycle table of one input file, as written to the output.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: String,
    pub mean_level: f64,
    pub total_weight: f64,
    pub cycles: Vec<CycleRecord>,
}

impl FileReport {
    fn new(file: &str, summary: &CycleSummary, output: &OutputConfig) -> Result<Self> {
        let summary = match output.sort {
            CycleOrder::Range => summary.sorted_by_range(),
            CycleOrder::Discovery => summary.clone(),
        };
        Ok(FileReport {
            file: file.to_owned(),
            mean_level: summary.scaled_mean_level(output.scale)?,
            total_weight: summary.total_weight(),
            cycles: summary.table(output.scale)?,
        })
    }
}

/// Runs the YAML configuration stored at `config_path`.
pub fn run(config_path: &str) -> Result<()> {
    info!(config = config_path, "running with configuration");
    let conf = load_config(config_path)?;
    conf.validate().context("invalid configuration")?;
    run_config(&conf)
}

/// Runs a single file with default settings for everything not given on the command line.
pub fn run_single(path: &str, delta: f64, scale: f64, format: OutputFormat) -> Result<()> {
    let conf = Config {
        counting: CountingConfig::with_delta(delta),
        input: InputConfig {
            files: vec![path.to_owned()],
            ..Default::default()
        },
        output: OutputConfig {
            format,
            scale,
            ..Default::default()
        },
    };
    conf.validate().context("invalid arguments")?;
    run_config(&conf)
}

/// Processes every input file and writes the reports.
///
/// Files that cannot be read or counted are logged and skipped; the run fails only
/// when none of them produced a report.
pub fn run_config(conf: &Config) -> Result<()> {
    let reports = process(conf)?;
    match &conf.output.path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("failed to create {}", path))?;
            let mut writer = BufWriter::new(file);
            write_reports(&mut writer, &reports, conf.output.format)?;
            writer.flush()?;
            info!(path = path.as_str(), reports = reports.len(), "results written");
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            write_reports(&mut writer, &reports, conf.output.format)?;
        }
    }
    Ok(())
}

pub fn process(conf: &Config) -> Result<Vec<FileReport>> {
    let mut files = Vec::new();
    let mut signals: Vec<Signal> = Vec::new();
    for file in &conf.input.files {
        match read_signal(file, &conf.input) {
            Ok(signal) => {
                if !signal.is_time_ordered() {
                    warn!(file = file.as_str(), "timestamps are not in non-decreasing order");
                }
                files.push(file.as_str());
                signals.push(signal);
            }
            Err(err) => warn!(
                file = file.as_str(),
                error = format!("{:#}", err),
                "skipping unreadable file"
            ),
        }
    }

    let mut reports = Vec::with_capacity(signals.len());
    for (file, result) in files.into_iter().zip(aggregate_batch(&signals, &conf.counting)) {
        match result {
            Ok(summary) => {
                info!(
                    file,
                    cycles = summary.cycles.len(),
                    equivalent_cycles = summary.total_weight(),
                    "counted cycles"
                );
                reports.push(FileReport::new(file, &summary, &conf.output)?);
            }
            Err(err) => warn!(file, error = %err, "skipping file"),
        }
    }

    if reports.is_empty() {
        bail!("none of the {} input files could be processed", conf.input.files.len());
    }
    Ok(reports)
}

/// Writes the reports as JSON, as CSV with one `File,Range,Count,Mean` row per cycle, or
/// as a plain text table per file.
pub fn write_reports<W: Write>(
    writer: &mut W,
    reports: &[FileReport],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, reports)?;
            writeln!(writer)?;
        }
        OutputFormat::Csv => {
            let mut csv_writer = csv::Writer::from_writer(&mut *writer);
            csv_writer.write_record(["File", "Range", "Count", "Mean"])?;
            for report in reports {
                for cycle in &report.cycles {
                    csv_writer.write_record([
                        report.file.clone(),
                        format!("{:.3}", cycle.range),
                        format!("{:.3}", cycle.weight),
                        format!("{:.3}", cycle.mean),
                    ])?;
                }
            }
            csv_writer.flush()?;
        }
        OutputFormat::Table => {
            for report in reports {
                writeln!(writer, "\n{} (mean level {:.3})", report.file, report.mean_level)?;
                writeln!(writer, "{:>7}{:>8}{:>12}", "Range", "Count", "Mean")?;
                writeln!(writer, "{}", "-".repeat(27))?;
                for cycle in &report.cycles {
                    writeln!(writer, "{:7.1}{:8.1}{:12.1}", cycle.range, cycle.weight, cycle.mean)?;
                }
            }
        }
    }
    Ok(())
}
