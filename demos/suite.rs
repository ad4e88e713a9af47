//! A full suite run driven through the shared CLI surface, including
//! baseline save/compare flags.
//!
//! Run with: `cargo run --example suite -- --save-baseline main`

use clap::Parser;

use ratebench::benchmark::{Benchmark, BenchmarkOptions, Routine};
use ratebench::cli::{self, BenchCli};
use ratebench::suite::Suite;
use ratebench::timer::TimerRegistry;

#[derive(Parser)]
struct Opts {
    #[command(flatten)]
    bench: BenchCli,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();

    let timer = TimerRegistry::with_defaults().select()?;
    let options = BenchmarkOptions::for_timer(&timer);

    let mut suite = Suite::new("sort strategies");
    suite.add(Benchmark::new(
        "sort_unstable",
        {
            let mut data: Vec<i32> = (0..256).rev().collect();
            Routine::sync(move || {
                data.sort_unstable();
                std::hint::black_box(&data);
            })
        },
        options,
        timer.clone(),
    ));
    suite.add(Benchmark::new(
        "sort",
        {
            let mut data: Vec<i32> = (0..256).rev().collect();
            Routine::sync(move || {
                data.sort();
                std::hint::black_box(&data);
            })
        },
        options,
        timer,
    ));

    cli::run(&opts.bench, suite).await
}
