use std::io::{stderr, stdout};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let code = tq_cli::run(std::env::args(), &mut stdout(), &mut stderr());
    std::process::exit(code);
}
