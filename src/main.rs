use std::io;

use anyhow::Result;
use clap::Parser;
use monkey::config::{
    Config, DEFAULT_GC_GROWTH, DEFAULT_GC_THRESHOLD, DEFAULT_MAX_CALL_DEPTH,
    DEFAULT_MAX_NESTING_DEPTH,
};
use monkey::repl;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(version, about = "Interactive Monkey interpreter", long_about = None)]
struct Args {
    /// Number of live objects that triggers a garbage collection.
    #[arg(long, default_value_t = DEFAULT_GC_THRESHOLD)]
    gc_threshold: usize,

    /// Factor applied to the surviving object count to get the next threshold.
    #[arg(long, default_value_t = DEFAULT_GC_GROWTH)]
    gc_growth: usize,

    /// Deepest chain of nested function calls before evaluation fails.
    #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,

    /// Deepest expression nesting the parser accepts.
    #[arg(long, default_value_t = DEFAULT_MAX_NESTING_DEPTH)]
    max_nesting_depth: usize,

    /// Skip the greeting.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // MONKEY_LOG takes precedence over RUST_LOG, default to WARN
    let filter = EnvFilter::try_from_env("MONKEY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new("warn"))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let config = Config::default()
        .with_gc_threshold(args.gc_threshold)
        .with_gc_growth(args.gc_growth)
        .with_max_call_depth(args.max_call_depth)
        .with_max_nesting_depth(args.max_nesting_depth);

    repl::start(config, args.quiet, io::stdin().lock(), io::stdout())?;
    Ok(())
}
