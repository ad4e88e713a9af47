//! Benchmarks a couple of plain synchronous routines.
//!
//! Run with: `cargo run --example simple`

use ratebench::benchmark::{Benchmark, BenchmarkOptions, Routine};
use ratebench::suite::Suite;
use ratebench::timer::TimerRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let timer = TimerRegistry::with_defaults().select()?;
    let options = BenchmarkOptions::for_timer(&timer);

    let mut suite = Suite::new("string building");

    suite.add(Benchmark::new(
        "push_str",
        Routine::sync(|| {
            let mut s = String::new();
            for _ in 0..32 {
                s.push_str("x");
            }
            std::hint::black_box(s);
        }),
        options,
        timer.clone(),
    ));

    suite.add(Benchmark::new(
        "repeat",
        Routine::sync(|| {
            std::hint::black_box("x".repeat(32));
        }),
        options,
        timer,
    ));

    suite.run().await;

    for b in suite.benchmarks() {
        println!("{}: {:.0} ops/sec (±{:.2}%)", b.name, b.hz, b.stats.rme);
    }

    Ok(())
}
