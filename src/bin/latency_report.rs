use arena_skiplist::{KeyOrder, SkipListConfig, SortedBatch};
use clap::Parser;
use hdrhistogram::Histogram;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Largest batch whose worst-case link count still fits a `u32` index.
const MAX_BATCH_SIZE: i64 = 400_000_000;

/// Measure per-insert latency of a sorted batch.
#[derive(Parser, Debug)]
#[command(name = "latency-report")]
struct Args {
    /// Insertions per batch before clearing
    #[arg(long, default_value_t = 10_000, value_parser = clap::value_parser!(u32).range(1..=MAX_BATCH_SIZE))]
    batch_size: u32,

    /// Total insertions to time
    #[arg(long, default_value_t = 1_000_000)]
    iterations: u64,

    /// Seed for keys and node heights
    #[arg(long, default_value_t = 0xDEADBEEF)]
    seed: u64,

    /// Sort ascending instead of descending
    #[arg(long)]
    ascending: bool,

    /// Pin to the last available CPU core
    #[arg(long)]
    pin: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.pin {
        // The last core is typically isolated from OS interrupts
        if let Some(core) = core_affinity::get_core_ids().and_then(|ids| ids.last().copied()) {
            core_affinity::set_for_current(core);
            info!(core = core.id, "pinned to core");
        }
    }

    let order = if args.ascending { KeyOrder::Ascending } else { KeyOrder::Descending };
    // Sized for the tallest possible nodes, so a batch never runs out
    let config = SkipListConfig::new(order)
        .with_seed(args.seed)
        .with_entry_capacity(args.batch_size);

    info!(?config, iterations = args.iterations, "preparing latency benchmark");

    let mut batch: SortedBatch<f32, u32> = SortedBatch::new(&config)?;
    batch.warm_up();

    let mut keys = ChaCha8Rng::seed_from_u64(args.seed ^ 0x5EED);
    let mut histogram = Histogram::<u64>::new_with_bounds(1, 100_000, 3)?;
    let mut total_duration = Duration::ZERO;

    for i in 0..args.iterations {
        if batch.len() as u32 >= args.batch_size {
            batch.clear()?;
        }
        let key: f32 = keys.gen_range(0.0..1000.0);

        // Critical measurement section
        let start = Instant::now();
        std::hint::black_box(batch.submit(key, i as u32)?);
        let elapsed = start.elapsed();

        // Outliers above the histogram bound are dropped
        histogram.record(elapsed.as_nanos() as u64).unwrap_or(());
        total_duration += elapsed;
    }

    println!("\n=== Insert Latency Report (ns) ===");
    println!("Total Ops:  {}", args.iterations);
    println!("Batches:    {}", batch.generation() + 1);
    println!("Throughput: {:.2} ops/sec", args.iterations as f64 / total_duration.as_secs_f64());
    println!("----------------------------------");
    println!("Min:    {:6} ns", histogram.min());
    println!("P50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("P99.99: {:6} ns", histogram.value_at_quantile(0.9999));
    println!("Max:    {:6} ns", histogram.max());
    println!("----------------------------------");

    println!("\nDistribution:");
    for v in histogram.iter_log(100, 2.0) {
        let count = v.count_since_last_iteration();
        if count > 0 {
            println!("<= {:6} ns: {:10} count", v.value_iterated_to(), count);
        }
    }

    Ok(())
}
