//! Thin CLI over the scanning, finalizing and classification pipeline.
//!
//! This is a demonstration surface, not the crate's contract: the library
//! (`diskscan::{walk, tree, classify, insights}`) is the thing meant to be
//! embedded elsewhere.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use diskscan::{classify, insights, model::ScanNode, tree, walk};
use log::{debug, info};

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
/// Scan a directory tree, aggregate disk usage and report temp/cache/build
/// artifact findings.
struct Args {
    #[arg(value_name = "PATH", help = "Directory to scan", default_value = ".")]
    path: PathBuf,

    #[arg(short = 'j', long = "workers", help = "Worker thread count (defaults to available parallelism)")]
    workers: Option<usize>,

    #[arg(short = 'd', long = "max-depth", help = "Limit traversal to this many levels below the root")]
    max_depth: Option<u32>,

    #[arg(short = 'r', long = "rules", help = "Path to a JSON ruleset; falls back to the built-in rule table")]
    rules: Option<PathBuf>,

    #[arg(short = 'n', long = "top", default_value_t = 10, help = "How many insights to print per category")]
    top: usize,

    #[arg(long = "json", help = "Print the full insight bundle as JSON instead of a human summary")]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("diskstat: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let walk_config = walk::WalkConfig {
        worker_count: args.workers.unwrap_or_else(|| walk::WalkConfig::default().worker_count),
        max_depth: args.max_depth,
        ..walk::WalkConfig::default()
    };

    info!("scanning {}", args.path.display());
    let walk::WalkOutcome::Completed(mut snapshot) = walk::scan(&args.path, &walk_config)? else {
        debug!("scan was cancelled");
        return Ok(());
    };
    tree::finalize(&mut snapshot.root);

    let (rules, additional_paths) = match &args.rules {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            classify::rules::parse_ruleset(&json)?
        }
        None => (classify::rules::default_rules(), std::collections::HashMap::new()),
    };
    let ruleset = classify::compile_ruleset(&rules, &additional_paths)?;
    let bundle = insights::generate(&snapshot.root, &ruleset, &insights::InsightLimits::default());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&bundle)?);
        return Ok(());
    }

    print_summary(&snapshot.root, &snapshot.stats, &bundle, args.top);
    Ok(())
}

fn print_summary(root: &ScanNode, stats: &diskscan::ScanStats, bundle: &diskscan::InsightBundle, top: usize) {
    println!(
        "{} files, {} directories, {} access errors",
        stats.files, stats.directories, stats.access_errors
    );
    println!("total disk usage: {} bytes under {}", root.disk_usage, root.path.display());
    println!();

    for category in diskscan::Category::ALL {
        let Some(cat_stats) = bundle.by_category.get(&category) else {
            continue;
        };
        println!(
            "{category:?}: {} matches, {} bytes on disk",
            cat_stats.count, cat_stats.disk_usage
        );
        for insight in bundle.insights.iter().filter(|i| i.category == category).take(top) {
            println!("  {:>12}  {}", insight.disk_usage, insight.path.display());
        }
        println!();
    }
}
