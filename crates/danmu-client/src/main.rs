//! Danmu client entry point
//!
//! Run with:
//! ```bash
//! DANMU_ROOM_ID=21452505 cargo run -p danmu-client
//! ```
//!
//! Configuration is loaded from environment variables.

use danmu_client::Session;
use danmu_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Danmu client failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;

    if let Err(e) = try_init_tracing_with_config(TracingConfig::from(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        room_id = config.room.room_id,
        anonymous = config.room.cookie.is_empty(),
        "Configuration loaded"
    );

    let session = Session::from_config(&config)?;
    register_loggers(&session);

    tokio::select! {
        started = session.start() => {
            if let Err(e) = started {
                error!(error = %e, retryable = e.is_retryable(), "Could not join room");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            session.stop();
            return Ok(());
        }
    }

    info!(room_id = session.room_id(), host = ?session.current_host(), "Listening");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    session.shutdown().await;

    Ok(())
}

fn register_loggers(session: &Session) {
    let handlers = session.handlers();

    handlers.on_danmaku(|danmaku| {
        info!(uid = danmaku.uid, uname = %danmaku.uname, text = %danmaku.text, "Danmaku");
    });
    handlers.on_gift(|gift| {
        info!(
            uname = %gift.uname,
            gift = %gift.gift_name,
            num = gift.num,
            paid = gift.is_paid(),
            "Gift"
        );
    });
    handlers.on_super_chat(|super_chat| {
        info!(
            uname = %super_chat.user_info.uname,
            price = super_chat.price,
            message = %super_chat.message,
            "Super chat"
        );
    });
    handlers.on_guard_buy(|guard| {
        info!(username = %guard.username, level = guard.guard_level, "Guard bought");
    });
    handlers.on_online_count(|count| {
        info!(online = count, "Online count");
    });
}
