//! Rastermill CLI - batch image filtering
//!
//! Reads JSON task records from stdin and writes each filtered image to its
//! destination path.

use anyhow::Context;
use rastermill::prelude::*;
use std::io::BufReader;

/// What the command line asked for.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run { threads: usize },
    Usage,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("editor");

    let threads = match parse_args(args.get(1..).unwrap_or(&[])) {
        Command::Run { threads } => threads,
        Command::Usage => {
            print_usage(program);
            return Ok(());
        }
    };

    let config = EditorConfig::new()
        .with_threads(threads)
        .with_env_overrides()
        .context("invalid environment configuration")?;
    let orchestrator = Orchestrator::new(config, FileStore::new())?.with_progress(|update| {
        if let ProgressUpdate::EffectSkipped { source, code } = update {
            log::debug!("{}: skipped effect '{}'", source.display(), code);
        }
    });

    let source = TaskSource::new(BufReader::new(std::io::stdin()));
    let summary = orchestrator.run(&source).context("batch run aborted")?;

    log::info!(
        "{} v{}: {} tasks, {} effects applied, {} skipped in {:.2?}",
        rastermill::NAME,
        rastermill::VERSION,
        summary.tasks_processed,
        summary.effects_applied,
        summary.effects_skipped,
        summary.duration
    );
    if let Some(error) = source.stream_failure() {
        log::warn!("Task stream ended early: {}", error);
    }
    Ok(())
}

fn parse_args(args: &[String]) -> Command {
    match args {
        [] => Command::Run { threads: 0 },
        [flag] => {
            if let Some(value) = flag.strip_prefix("-p=").or_else(|| flag.strip_prefix("--p=")) {
                parse_threads(value)
            } else {
                Command::Usage
            }
        }
        _ => Command::Usage,
    }
}

fn parse_threads(value: &str) -> Command {
    match value.trim().parse() {
        Ok(threads) => Command::Run { threads },
        Err(_) => Command::Usage,
    }
}

fn print_usage(program: &str) {
    println!("Usage: {} [-p=<threads>]", program);
    println!();
    println!("Reads JSON task records from stdin:");
    println!("  {{\"inPath\": \"in.png\", \"outPath\": \"out.png\", \"effects\": [\"G\", \"S\"]}}");
    println!();
    println!("Options:");
    println!("  -p=<threads>  Thread budget; 0 runs sequentially (default: 0)");
    println!("  -h, --help    Show this help message");
    println!();
    println!("Effects:");
    for effect in EffectCode::ALL {
        println!("  {}  {:?}", effect.code(), effect);
    }
    println!();
    println!("Environment:");
    println!("  RASTERMILL_BATCH_SIZE  Tasks per reader batch (default: 2)");
    println!("  RUST_LOG               Log filter (default: info)");
}
