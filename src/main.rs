use anyhow::Result;
use clap::Parser;
use newton_chat::cli::{self, Cli};
use newton_chat::debug::DebugLevel;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Routes all log::info!() etc. to /tmp/newton_chat_debug.log.
    // --log-level takes precedence over DEBUG_LEVEL.
    newton_chat::debug::init_log_bridge(cli.log_level.map(DebugLevel::from_number));

    log::info!("Starting newton-chat {}", newton_chat::VERSION);

    cli::execute(cli).inspect_err(|e| log::error!("newton-chat failed: {e:#}"))
}
