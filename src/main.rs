use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use retrocast::catalog::{CatalogReader, SqliteCatalog};
use retrocast::config::EngineConfig;
use retrocast::ledger::SqliteLedger;
use retrocast::playlist::write_m3u;
use retrocast::scheduler::{AssemblyRequest, ScheduleEngine, SlotBuilder};

#[derive(Parser)]
#[command(
    name = "retrocast",
    version,
    about = "Historical television network simulator: schedule assembly and playlist generation",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a full day's playlist for one channel
    Assemble {
        /// Channel id to schedule
        #[arg(short, long)]
        channel: i64,

        /// Network the channel replays (e.g. CBS)
        #[arg(short, long)]
        network: String,

        /// Broadcast date YYYY-MM-DD
        #[arg(short, long)]
        date: String,

        /// Window start HH:MM
        #[arg(long, default_value = "18:00")]
        start: String,

        /// Window end HH:MM; at or before start crosses midnight
        #[arg(long, default_value = "23:00")]
        end: String,

        /// Catalog database path
        #[arg(long, default_value = "data/catalog.db")]
        catalog: PathBuf,

        /// Rotation ledger database path
        #[arg(long, default_value = "data/ledger.db")]
        ledger: PathBuf,

        /// Seed for reproducible assembly
        #[arg(long)]
        seed: Option<u64>,

        /// Seasonal lineup instead of the regular schedule
        #[arg(long, value_parser = ["christmas", "thanksgiving"])]
        holiday: Option<String>,

        /// Lineup length in seconds when --holiday is set
        #[arg(long, default_value = "18000")]
        duration_secs: u32,

        /// Engine config TOML
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output playlist path; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (m3u, json)
        #[arg(long, default_value = "m3u")]
        format: String,
    },

    /// Pack commercials for a single break fill
    Pack {
        /// Target fill duration in seconds
        #[arg(short, long)]
        target: u32,

        /// Number of break groups to stripe across
        #[arg(short, long, default_value = "1")]
        breaks: usize,

        /// Broadcast year for the eligibility window
        #[arg(short, long)]
        year: i32,

        /// Catalog database path
        #[arg(long, default_value = "data/catalog.db")]
        catalog: PathBuf,

        /// Seed for a reproducible pack
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Preview the slot plan for a window without filling it
    Slots {
        /// Channel id
        #[arg(short, long, default_value = "1")]
        channel: i64,

        /// Broadcast date YYYY-MM-DD
        #[arg(short, long)]
        date: String,

        /// Window start HH:MM
        #[arg(long, default_value = "18:00")]
        start: String,

        /// Window end HH:MM
        #[arg(long, default_value = "23:00")]
        end: String,

        /// Seed for a reproducible plan
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, &cli.log_format);

    match cli.command {
        Commands::Assemble {
            channel,
            network,
            date,
            start,
            end,
            catalog,
            ledger,
            seed,
            holiday,
            duration_secs,
            config,
            output,
            format,
        } => assemble(AssembleArgs {
            channel,
            network,
            date,
            start,
            end,
            catalog,
            ledger,
            seed,
            holiday,
            duration_secs,
            config,
            output,
            format,
        }),
        Commands::Pack {
            target,
            breaks,
            year,
            catalog,
            seed,
        } => pack(target, breaks, year, &catalog, seed),
        Commands::Slots {
            channel,
            date,
            start,
            end,
            seed,
        } => preview_slots(channel, &date, &start, &end, seed),
    }
}

struct AssembleArgs {
    channel: i64,
    network: String,
    date: String,
    start: String,
    end: String,
    catalog: PathBuf,
    ledger: PathBuf,
    seed: Option<u64>,
    holiday: Option<String>,
    duration_secs: u32,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    format: String,
}

fn assemble(args: AssembleArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let date = parse_date(&args.date)?;
    let start = parse_time(&args.start)?;
    let end = parse_time(&args.end)?;

    let catalog = SqliteCatalog::open(&args.catalog)
        .with_context(|| format!("opening catalog {}", args.catalog.display()))?;
    let mut ledger = SqliteLedger::open(&args.ledger)
        .with_context(|| format!("opening ledger {}", args.ledger.display()))?;
    let mut engine = ScheduleEngine::new(&catalog, &mut ledger, config);

    let segments = match args.holiday {
        Some(season) => engine.assemble_holiday_lineup(
            args.channel,
            date,
            start,
            args.duration_secs,
            &season,
            args.seed,
        )?,
        None => {
            let mut request = AssemblyRequest::new(args.channel, args.network, date)
                .with_window(start, end);
            if let Some(seed) = args.seed {
                request = request.with_seed(seed);
            }
            engine.assemble_schedule(&request)?
        }
    };

    let rendered = match args.format.as_str() {
        "json" => serde_json::to_string_pretty(&segments)? + "\n",
        _ => {
            let mut buf = Vec::new();
            write_m3u(&segments, &mut buf)?;
            String::from_utf8(buf).expect("m3u output is utf-8")
        }
    };

    match args.output {
        Some(path) => std::fs::write(&path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

fn pack(target: u32, breaks: usize, year: i32, catalog: &PathBuf, seed: Option<u64>) -> Result<()> {
    let catalog = SqliteCatalog::open(catalog)
        .with_context(|| format!("opening catalog {}", catalog.display()))?;
    let config = EngineConfig::default();

    let pool = catalog.commercials(target, year - config.commercials.lookback_years, year)?;
    let pairs: Vec<(i64, u32)> = pool.iter().map(|c| (c.id, c.duration())).collect();
    let groups = retrocast::pack_commercials(target, &pairs, breaks, seed);

    println!("{}", serde_json::to_string_pretty(&groups)?);
    Ok(())
}

fn preview_slots(
    channel: i64,
    date: &str,
    start: &str,
    end: &str,
    seed: Option<u64>,
) -> Result<()> {
    use chrono::Datelike;
    use rand::SeedableRng;

    let date = parse_date(date)?;
    let config = EngineConfig::default();
    let builder = SlotBuilder::with_menu(
        config.slots.base_secs,
        config.slots.durations.clone(),
        config.slots.weights.clone(),
    );
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(
        seed.unwrap_or_else(|| date.num_days_from_ce() as u64),
    );

    let slots = builder.build(
        channel,
        date,
        parse_time(start)?,
        parse_time(end)?,
        &[],
        &mut rng,
    )?;

    println!("{:>20} | {:>8} | {}", "Start", "Secs", "End");
    println!("{:-<46}", "");
    for slot in &slots {
        println!(
            "{:>20} | {:>8} | {}",
            slot.start.format("%Y-%m-%d %H:%M"),
            slot.duration_secs,
            slot.end().format("%H:%M")
        );
    }
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(p) => EngineConfig::from_file(p)?,
        None => EngineConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .with_context(|| format!("invalid time '{raw}', expected HH:MM"))
}

fn init_tracing(verbose: bool, format: &str) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
