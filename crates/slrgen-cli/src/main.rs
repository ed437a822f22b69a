use anyhow::Context as _;
use clap::Parser;
use slrgen::grammar::Grammar;
use std::{fs, path::PathBuf, time::Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Also dump the LR(0) automaton.
    #[arg(long)]
    automaton: bool,

    /// Also dump the FIRST and FOLLOW sets.
    #[arg(long)]
    sets: bool,

    /// Exit with an error when the grammar is not SLR(1).
    #[arg(long)]
    deny_conflicts: bool,

    /// The path of grammar definition file.
    input: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    process_file(&args)
        .with_context(|| anyhow::anyhow!("errored during processing {}", args.input.display()))?;

    Ok(())
}

fn process_file(args: &Args) -> anyhow::Result<()> {
    let in_file = fs::canonicalize(&args.input) //
        .context("failed to canonicalize the input file name")?;

    let s = Instant::now();
    let grammar = Grammar::from_file(&in_file)?;
    tracing::info!("parse_file: {:?} elapsed", s.elapsed());

    let s = Instant::now();
    let analysis = slrgen::compute(grammar)?;
    tracing::info!("compute_table: {:?} elapsed", s.elapsed());

    let g = &analysis.grammar;
    println!("{}", g);
    if args.sets {
        println!("{}", analysis.first_sets.display(g));
        println!("{}", analysis.follow_sets.display(g));
    }
    if args.automaton {
        println!("{}", analysis.automaton.display(g));
    }
    println!("{}", analysis.table.display(g));

    let conflicts = &analysis.table.conflicts;
    for conflict in conflicts {
        println!("[warning] {}", conflict.display(g));
    }
    if args.deny_conflicts && !conflicts.is_empty() {
        let suffix = if conflicts.len() == 1 { "" } else { "s" };
        anyhow::bail!(
            "the grammar is not SLR(1): {} conflict{} detected",
            conflicts.len(),
            suffix
        );
    }

    Ok(())
}
