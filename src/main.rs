use anyhow::{Context, Result};
use clap::Parser;
use snrebin::cli::{Cli, OutputFormat};
use snrebin::config::RebinConfig;
use snrebin::csv_output::{CsvBinOutput, CsvOutput};
use snrebin::handler::{DataHandler, StagedBin};
use snrebin::json_output::JsonOutput;
use snrebin::payload::{PayloadReader, SnPayload};
use snrebin::rebin::{rebin_scalers, Rebinned};
use snrebin::stats::RebinStats;
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<RebinConfig> {
    match path {
        Some(path) => RebinConfig::from_file(path),
        None => Ok(RebinConfig::default()),
    }
}

fn format_events(rebinned: &Rebinned) -> String {
    if rebinned.is_empty() {
        return "-".to_string();
    }
    rebinned
        .iter()
        .map(|e| format!("{}:{}", e.index, e.count))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rebin every payload against one fixed 2 ms grid
fn run_rebin(
    path: &Path,
    raw_start: Option<u64>,
    format: OutputFormat,
    summary: bool,
) -> Result<()> {
    let reader = PayloadReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut stats = RebinStats::new();
    let mut json = JsonOutput::new();
    let mut csv = CsvOutput::new();
    let mut anchor = raw_start;

    for payload in reader {
        let payload = payload.with_context(|| format!("Failed to read {}", path.display()))?;
        if !payload.has_data() {
            continue;
        }
        let raw_utime = *anchor.get_or_insert(payload.utime());
        let rebinned = rebin_scalers(raw_utime, payload.utime(), payload.scalers());
        stats.record(payload.dom_id(), payload.scalers(), &rebinned);

        match format {
            OutputFormat::Text => println!("{} -> {}", payload, format_events(&rebinned)),
            OutputFormat::Json => json.add_payload(&payload, &rebinned),
            OutputFormat::Csv => csv.add_payload(&payload, &rebinned),
        }
    }

    if let Some(utime) = anchor {
        debug!(raw_start = utime, "2 ms grid anchor");
        json.set_raw_start(utime);
    }
    json.set_totals(&stats.calculate_totals());

    match format {
        OutputFormat::Text => {}
        OutputFormat::Json => println!("{}", json.to_json()?),
        OutputFormat::Csv => print!("{}", csv.to_csv()),
    }

    if summary {
        stats.print_summary();
    }
    Ok(())
}

fn print_bins(
    bins: &[StagedBin],
    format: OutputFormat,
    json: &mut JsonOutput,
    csv: &mut CsvBinOutput,
) {
    for bin in bins {
        match format {
            OutputFormat::Text => println!("{} {}", bin.utime, bin.total()),
            OutputFormat::Json => json.add_bin(bin),
            OutputFormat::Csv => csv.add_bin(bin),
        }
    }
}

/// Stage payloads per DOM and emit completed 2 ms bins
fn run_staged(
    path: &Path,
    config: &RebinConfig,
    format: OutputFormat,
    summary: bool,
) -> Result<()> {
    let reader = PayloadReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut handler = DataHandler::new(config.staging.ndom, config.staging.depth);
    let mut json = JsonOutput::new();
    let mut csv = CsvBinOutput::new();

    for payload in reader {
        let payload: SnPayload =
            payload.with_context(|| format!("Failed to read {}", path.display()))?;
        let ready = handler.drain_ready(payload.utime());
        print_bins(&ready, format, &mut json, &mut csv);
        handler.ingest(&payload)?;
    }
    let rest = handler.flush();
    print_bins(&rest, format, &mut json, &mut csv);

    info!(payloads = handler.payloads_read(), "staging complete");

    json.set_totals(&handler.stats().calculate_totals());
    match format {
        OutputFormat::Text => {}
        OutputFormat::Json => println!("{}", json.to_json()?),
        OutputFormat::Csv => print!("{}", csv.to_csv()),
    }

    if summary {
        handler.stats().print_summary();
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = load_config(args.config.as_deref())?;
    let format = args.format.unwrap_or(config.output.format);
    debug!(?format, stage = args.stage, "starting snrebin");

    if args.stage {
        run_staged(&args.file, &config, format, args.statistics)
    } else {
        run_rebin(&args.file, args.raw_start, format, args.statistics)
    }
}
