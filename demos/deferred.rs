//! Benchmarks an async routine through the deferred-completion protocol.
//!
//! Run with: `cargo run --example deferred`

use std::time::Duration;

use ratebench::benchmark::{Benchmark, BenchmarkOptions, Routine};
use ratebench::suite::Suite;
use ratebench::timer::TimerRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let timer = TimerRegistry::with_defaults().select()?;
    let mut options = BenchmarkOptions::for_timer(&timer);
    options.defer = true;

    let benchmark = Benchmark::new(
        "sleep_1ms",
        Routine::deferred(|handle| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                handle.resolve();
            });
        }),
        options,
        timer,
    );

    let mut suite = Suite::new("async sleep");
    suite.add(benchmark);
    suite.run().await;

    for b in suite.benchmarks() {
        match &b.error {
            Some(err) => println!("{}: failed — {err}", b.name),
            None => println!("{}: {:.1} ops/sec over {} samples", b.name, b.hz, b.stats.len()),
        }
    }

    Ok(())
}
