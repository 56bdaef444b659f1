//! `recur` CLI — expand, describe, and resolve stored recurrence rules.
//!
//! Input is the rule record as the CMS stores it, a flat JSON object such as
//! `{"start_date":"20240131","frequency":"MONTHLY","monthdays":["31"],...}`.
//!
//! ## Usage
//!
//! ```sh
//! # Print occurrences, one ISO-8601 timestamp per line (stdin → stdout)
//! cat rule.json | recur expand
//!
//! # Cap an endless rule and render in a timezone
//! recur expand -i rule.json --max-count 10 --timezone Europe/Amsterdam
//!
//! # JSON array output, stopping at a horizon date
//! recur expand -i rule.json --horizon 2025-12-31 --json
//!
//! # English summary and RRULE text
//! recur describe -i rule.json
//!
//! # Resolve one record or an array of records into field values
//! recur resolve -i records.json -o fields.json
//! ```
//!
//! Logging goes to stderr; set `RUST_LOG` or pass `-v`.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use recurrence_core::{
    expand, parse_timezone, DstPolicy, ExpansionLimit, FieldResolver, RecurrenceError,
    RecurrenceRule, ResolveOptions,
};
use serde_json::Value;
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "recur",
    version,
    about = "Expand, describe and resolve recurrence rules"
)]
struct Cli {
    /// Log expansion progress to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the occurrences of a rule record
    Expand {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        render: RenderArgs,
        /// Print a JSON array instead of one occurrence per line
        #[arg(long)]
        json: bool,
    },
    /// Print an English summary and the RFC 5545 form of a rule record
    Describe {
        #[command(flatten)]
        io: IoArgs,
    },
    /// Resolve a record (or an array of records) into field values
    Resolve {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        render: RenderArgs,
    },
}

#[derive(Args)]
struct IoArgs {
    /// Input file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,
    /// Output file (writes to stdout if omitted)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Args)]
struct RenderArgs {
    /// Maximum number of occurrences
    #[arg(long)]
    max_count: Option<usize>,
    /// Last date (YYYY-MM-DD) an occurrence may fall on
    #[arg(long)]
    horizon: Option<NaiveDate>,
    /// IANA timezone occurrences are rendered in
    #[arg(long, default_value = "UTC")]
    timezone: String,
    /// What to do with local times that fall in a DST gap
    #[arg(long, value_enum, default_value_t = DstArg::ShiftForward)]
    dst: DstArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum DstArg {
    Skip,
    ShiftForward,
}

impl From<DstArg> for DstPolicy {
    fn from(arg: DstArg) -> Self {
        match arg {
            DstArg::Skip => DstPolicy::Skip,
            DstArg::ShiftForward => DstPolicy::ShiftForward,
        }
    }
}

impl RenderArgs {
    fn limit(&self) -> ExpansionLimit {
        ExpansionLimit {
            max_count: self.max_count,
            max_horizon: self.horizon,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Expand { io, render, json } => {
            let text = read_input(io.input.as_deref())?;
            let rule = RecurrenceRule::from_json(&text).context("Invalid recurrence record")?;
            let tz = parse_timezone(&render.timezone)?;
            let policy = DstPolicy::from(render.dst);

            let occurrences = match expand(&rule, render.limit()) {
                Ok(occurrences) => occurrences,
                Err(RecurrenceError::UnboundedExpansion) => anyhow::bail!(
                    "The rule never ends; pass --max-count or --horizon to bound it"
                ),
                Err(e) => return Err(e).context("Failed to expand rule"),
            };
            let stamps: Vec<String> = occurrences
                .filter_map(|o| o.to_iso8601(&tz, policy))
                .collect();
            tracing::debug!(count = stamps.len(), "expanded rule");

            let content = if json {
                let mut out = serde_json::to_string_pretty(&stamps)?;
                out.push('\n');
                out
            } else {
                lines(&stamps)
            };
            write_output(io.output.as_deref(), &content)?;
        }
        Commands::Describe { io } => {
            let text = read_input(io.input.as_deref())?;
            let rule = RecurrenceRule::from_json(&text).context("Invalid recurrence record")?;
            let content = format!("{}\n{}\n", rule.describe(), rule.to_ical());
            write_output(io.output.as_deref(), &content)?;
        }
        Commands::Resolve { io, render } => {
            let text = read_input(io.input.as_deref())?;
            let input: Value = serde_json::from_str(&text).context("Input is not valid JSON")?;

            let mut options = ResolveOptions {
                timezone: render.timezone.clone(),
                dst_policy: render.dst.into(),
                ..ResolveOptions::default()
            };
            if render.max_count.is_some() || render.horizon.is_some() {
                options.limit = render.limit();
            }
            let resolver = FieldResolver::new(&options).context("Invalid resolver options")?;

            let resolved = match &input {
                Value::Array(records) => serde_json::to_value(resolver.resolve_batch(records))?,
                Value::Object(record) => serde_json::to_value(resolver.resolve(record))?,
                _ => anyhow::bail!("Expected a JSON object or an array of objects"),
            };
            let mut content = serde_json::to_string_pretty(&resolved)?;
            content.push('\n');
            write_output(io.output.as_deref(), &content)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn lines(items: &[String]) -> String {
    items.iter().map(|item| format!("{item}\n")).collect()
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
