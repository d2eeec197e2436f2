use clap::Parser;

#[derive(Parser)]
#[command(
    name = "powerwatch",
    about = "Print a timestamped line for every power-state and user-session transition",
    version = env!("GIT_DESCRIBE"),
    after_help = "Press Ctrl+C to stop listening.\n\nDiagnostics go to stderr; set RUST_LOG (e.g. RUST_LOG=debug) for more detail."
)]
pub struct Cli {}
