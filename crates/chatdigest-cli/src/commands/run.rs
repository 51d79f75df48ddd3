use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Settings;
use crate::setup::{build_channel, connect, prepare_core};

/// How long shutdown waits for in-flight summaries
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Run the bot until Ctrl-C
pub async fn run(settings: &Settings) -> Result<()> {
    settings.validate()?;

    let channel = build_channel(settings)?;
    let bot = connect(&channel).await?;
    let core = prepare_core(settings, channel.clone(), &bot)?;

    let handler_task = core.start();
    info!("ChatDigest is running. Press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    channel.stop_polling();
    handler_task.abort();

    let settled = core.handler.wait_for_commands(SHUTDOWN_GRACE).await;
    if !settled {
        warn!(
            "Summaries still running after {:?}, their messages are not counted below",
            SHUTDOWN_GRACE
        );
    }

    let pending = core.buffer.conversation_count();
    if pending > 0 {
        info!(
            "Discarding unsummarized messages from {}{} conversation(s)",
            if settled { "" } else { "at least " },
            pending
        );
    }

    Ok(())
}
