use anyhow::{Context, Result};
use clap::Parser;
use evolvm_lib::model::config::AppConfig;
use evolvm_lib::model::lineage::{LineageReport, LineageRunner};
use evolvm_lib::model::{ancestor, io, InstSet};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run self-replicating lineages on the evolvm CPU", long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// `.org` listing of the first parent; the built-in ancestor when omitted
    #[arg(short, long)]
    genome: Option<String>,

    #[arg(short = 'n', long, default_value_t = 100)]
    generations: u32,

    /// Independent lineages, run in parallel
    #[arg(short, long, default_value_t = 1)]
    replicates: u32,

    /// Overrides the configured seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Calls a parent gets before it is declared sterile
    #[arg(long, default_value_t = LineageRunner::DEFAULT_MAX_CALLS)]
    max_calls: u32,

    /// Write every lineage report as JSON
    #[arg(long)]
    report: Option<String>,

    /// Write the last genome of the first lineage as an `.org` listing
    #[arg(short, long)]
    output: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn load_config(path: &str) -> Result<AppConfig> {
    if !std::path::Path::new(path).exists() {
        tracing::warn!(path, "Config file not found; using defaults");
        return Ok(AppConfig::default());
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    AppConfig::from_toml(&text).with_context(|| format!("parsing {path}"))
}

fn print_summary(report: &LineageReport) {
    let gestation = report
        .mean_gestation()
        .map_or_else(|| "-".to_string(), |g| format!("{g:.1}"));
    let fate = match report.extinct_at {
        Some(generation) => format!("extinct at generation {generation}"),
        None => "alive".to_string(),
    };
    println!(
        "seed {:>6}: {:>5} generations, {:>4} mutated, mean gestation {:>8} cycles, final length {:>4}, {}",
        report.seed,
        report.generations.len(),
        report.mutated_generations(),
        gestation,
        report.final_genome.len(),
        fate
    );
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = load_config(&args.config)?;
    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let inst_set = if config.instset.is_empty() {
        InstSet::standard()
    } else {
        InstSet::from_config(&config.instset)?
    };
    let inst_set = Arc::new(inst_set);
    let first = match &args.genome {
        Some(path) => io::read_org_file(path, &inst_set)?,
        None => ancestor::ancestor_genome(&inst_set)?,
    };
    let seed = args.seed.or(config.seed).unwrap_or(42);
    let fingerprint = config.fingerprint();

    tracing::info!(
        generations = args.generations,
        replicates = args.replicates,
        seed,
        len = first.len(),
        config = &fingerprint[..16],
        "Starting lineage run"
    );

    let runner = LineageRunner::new(Arc::clone(&inst_set), Arc::new(config))
        .with_max_calls(args.max_calls);
    let reports = runner
        .run_replicates(&first, args.generations, seed, args.replicates)
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    runner.metrics().log_summary();

    for report in &reports {
        print_summary(report);
    }
    if let Some(path) = &args.report {
        io::write_json_file(&reports, path)?;
    }
    if let (Some(path), Some(report)) = (&args.output, reports.first()) {
        let header = format!(
            "lineage seed {}, generation {}",
            report.seed,
            report.generations.len()
        );
        io::write_org_file(&report.final_genome, &inst_set, Some(&header), path)?;
    }
    Ok(())
}
