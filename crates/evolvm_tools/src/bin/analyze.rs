use anyhow::Context;
use clap::{Parser, ValueEnum};
use evolvm_core::{
    ancestor_genome, AppConfig, ExecutionStats, Hardware, InstSet, IsolatedOrganism,
    SchedulingPolicy,
};
use evolvm_data::Genome;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Policy {
    RoundRobin,
    BehaviorClassed,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Gestation, fidelity and composition of a genome", long_about = None)]
struct Args {
    /// `.org` listing; the built-in ancestor when omitted.
    #[arg(short, long)]
    genome: Option<String>,

    /// TOML configuration.
    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Overrides the configured scheduling policy.
    #[arg(short, long, value_enum)]
    policy: Option<Policy>,

    /// Gestations used to measure copy fidelity.
    #[arg(short, long, default_value_t = 20)]
    trials: u32,

    /// Calls before a gestation is declared sterile.
    #[arg(long, default_value_t = 100_000)]
    max_calls: u32,

    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Debug, Serialize)]
struct Gestation {
    calls: u32,
    cycles: u64,
    offspring_len: usize,
}

#[derive(Debug, Serialize)]
struct Report {
    length: usize,
    policy: String,
    config_fingerprint: String,
    gestation: Option<Gestation>,
    /// Offspring identical to the parent over `trials` gestations.
    fidelity: f64,
    sterile_trials: u32,
    composition: BTreeMap<String, usize>,
    stats: ExecutionStats,
}

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading configuration {path}"))?;
            AppConfig::from_toml(&text).with_context(|| format!("parsing configuration {path}"))?
        }
        None => AppConfig::default(),
    };
    if let Some(policy) = args.policy {
        config.scheduler.policy = match policy {
            Policy::RoundRobin => SchedulingPolicy::RoundRobin,
            Policy::BehaviorClassed => SchedulingPolicy::BehaviorClassed,
        };
    }
    Ok(config)
}

fn build_inst_set(config: &AppConfig) -> anyhow::Result<InstSet> {
    if config.instset.is_empty() {
        tracing::warn!("No [[instset]] configured; using the full opcode library");
        return Ok(InstSet::standard());
    }
    Ok(InstSet::from_config(&config.instset)?)
}

/// Runs one gestation. Returns the first offspring, the call count and the
/// hardware statistics.
fn gestate(
    inst_set: &Arc<InstSet>,
    config: &Arc<AppConfig>,
    genome: &Genome,
    seed: u64,
    max_calls: u32,
) -> anyhow::Result<(Option<Genome>, u32, ExecutionStats)> {
    let mut hw = Hardware::new(Arc::clone(inst_set), Arc::clone(config), genome)?;
    let mut org = IsolatedOrganism::from_config(config, seed);
    let mut calls = 0;
    while org.offspring.is_empty() && org.is_alive() && calls < max_calls {
        hw.step(&mut org);
        calls += 1;
    }
    let child = org.take_offspring().into_iter().next();
    Ok((child, calls, hw.stats().clone()))
}

fn composition(genome: &Genome, inst_set: &InstSet) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for inst in genome.iter() {
        *counts.entry(inst_set.name(inst).to_string()).or_insert(0) += 1;
    }
    counts
}

fn analyze(args: &Args) -> anyhow::Result<Report> {
    let config = load_config(args)?;
    let inst_set = Arc::new(build_inst_set(&config)?);
    let genome = match &args.genome {
        Some(path) => evolvm_io::read_org_file(path, &inst_set)?,
        None => ancestor_genome(&inst_set)?,
    };
    let config = Arc::new(config);

    let (child, calls, stats) = gestate(&inst_set, &config, &genome, args.seed, args.max_calls)?;
    let gestation = child.map(|child| Gestation {
        calls,
        cycles: stats.cycles,
        offspring_len: child.len(),
    });

    let mut identical = 0;
    let mut sterile = 0;
    for trial in 0..args.trials {
        let seed = args.seed.wrapping_add(u64::from(trial) + 1);
        match gestate(&inst_set, &config, &genome, seed, args.max_calls)?.0 {
            Some(child) if child == genome => identical += 1,
            Some(_) => {}
            None => sterile += 1,
        }
    }
    let fidelity = if args.trials == 0 {
        0.0
    } else {
        f64::from(identical) / f64::from(args.trials)
    };

    Ok(Report {
        length: genome.len(),
        policy: format!("{:?}", config.scheduler.policy),
        config_fingerprint: config.fingerprint(),
        gestation,
        fidelity,
        sterile_trials: sterile,
        composition: composition(&genome, &inst_set),
        stats,
    })
}

fn print_text(report: &Report) {
    println!("Genome length:   {}", report.length);
    println!("Policy:          {}", report.policy);
    println!("Config:          {}", &report.config_fingerprint[..16]);
    match &report.gestation {
        Some(g) => println!(
            "Gestation:       {} calls, {} cycles, offspring of {}",
            g.calls, g.cycles, g.offspring_len
        ),
        None => println!("Gestation:       sterile"),
    }
    println!(
        "Fidelity:        {:.1}% ({} sterile)",
        report.fidelity * 100.0,
        report.sterile_trials
    );
    println!(
        "Execution:       {} executed, {} stalls, {} faults, {} copies",
        report.stats.executed, report.stats.stalls, report.stats.faults, report.stats.copies
    );
    println!("Composition:");
    for (name, count) in &report.composition {
        println!("  {name:<22} {count}");
    }
}

fn main() -> anyhow::Result<()> {
    evolvm_core::init_logging();
    let args = Args::parse();
    let report = analyze(&args)?;
    match args.format {
        Format::Text => print_text(&report),
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_args_parsing_defaults() {
        let args = Args::parse_from(["analyze"]);
        assert!(args.genome.is_none());
        assert_eq!(args.seed, 42);
        assert_eq!(args.trials, 20);
        assert_eq!(args.format, Format::Text);
    }

    #[test]
    fn test_args_parsing_custom() {
        let args = Args::parse_from([
            "analyze", "-g", "ancestor.org", "-p", "behavior-classed", "-f", "json", "-t", "3",
        ]);
        assert_eq!(args.genome.as_deref(), Some("ancestor.org"));
        assert_eq!(args.policy, Some(Policy::BehaviorClassed));
        assert_eq!(args.format, Format::Json);
        assert_eq!(args.trials, 3);
    }

    #[test]
    fn test_ancestor_report() {
        let args = Args::parse_from(["analyze", "-t", "2"]);
        let report = analyze(&args).expect("report");
        assert_eq!(report.length, 12);
        assert!(report.gestation.is_some());
        assert!((report.fidelity - 1.0).abs() < f64::EPSILON);
        assert_eq!(report.composition.get("nop-A"), Some(&3));
    }

    #[test]
    fn test_missing_genome_file_fails() {
        let args = Args::parse_from(["analyze", "-g", "/nonexistent/genome.org"]);
        assert!(analyze(&args).is_err());
    }
}
