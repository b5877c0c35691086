//! Replay a CSV of `key,value` insertions and print them in map order.

use arena_skiplist::record::{batch_records, read_records, replay_into, write_records};
use arena_skiplist::{KeyOrder, SkipListConfig, SortedBatch, NULL_INDEX};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "replay", about = "Sort key/value records through an arena skip list")]
struct Args {
    /// Input CSV with a `key,value` header (stdin if omitted)
    input: Option<PathBuf>,

    /// Sort ascending instead of descending
    #[arg(long)]
    ascending: bool,

    /// Seed for node heights (entropy if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Node records, header included
    #[arg(long, default_value_t = SkipListConfig::DEFAULT_NODE_CAPACITY, value_parser = capacity_parser())]
    node_capacity: u32,

    /// Forward links across all nodes
    #[arg(long, default_value_t = SkipListConfig::DEFAULT_LINK_CAPACITY, value_parser = capacity_parser())]
    link_capacity: u32,
}

/// Arena capacities must stay below `NULL_INDEX`.
fn capacity_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(0..i64::from(NULL_INDEX))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let records = match &args.input {
        Some(path) => read_records(BufReader::new(File::open(path)?))?,
        None => read_records(io::stdin().lock())?,
    };

    let order = if args.ascending { KeyOrder::Ascending } else { KeyOrder::Descending };
    let mut config = SkipListConfig::new(order)
        .with_node_capacity(args.node_capacity)
        .with_link_capacity(args.link_capacity);
    config.seed = args.seed;

    let mut batch = SortedBatch::new(&config)?;
    let inserted = replay_into(&mut batch, &records)?;

    let (used_bytes, capacity_bytes) = batch.node_usage();
    info!(
        records = records.len(),
        inserted,
        replaced = records.len() - inserted,
        level = batch.map().level(),
        used_bytes,
        capacity_bytes,
        "replay complete"
    );

    write_records(BufWriter::new(io::stdout().lock()), batch_records(&batch))?;
    Ok(())
}
