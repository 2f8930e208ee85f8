// src/main.rs

use std::time::Duration;

use distwatch::{block_on_bounded, cli, logging, run};

/// How long straggling blocking tasks may delay process exit.
const EXIT_GRACE: Duration = Duration::from_secs(1);

fn main() {
    let result = block_on_bounded(run_main(), EXIT_GRACE).and_then(|r| r);
    if let Err(err) = result {
        eprintln!("distwatch error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
