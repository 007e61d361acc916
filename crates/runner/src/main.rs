mod bridge;

use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use farmbot_core::world::{Clients, SnapshotWorld};
use farmbot_core::{Bot, BotConfig, RouteStore};

use bridge::{BridgeAlarm, BridgeDisplay, BridgeInput, HostBridge, Outbox};

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let host_addr = env_or("FARMBOT_HOST_ADDR", "127.0.0.1:7979");
    let config_file = env_or("FARMBOT_CONFIG_FILE", "farmbot.toml");
    let tick_ms: u64 = std::env::var("FARMBOT_TICK_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(50);

    let config = BotConfig::load(&config_file)?;
    let routes = RouteStore::new(config.routes_path.clone());
    // Creates the default file on first run.
    let loaded = routes.load();
    info!(
        "runner.routes path={} primary={} secondary={} evacuation={}",
        routes.path().display(),
        loaded.primary.len(),
        loaded.secondary.len(),
        loaded.evacuation.len()
    );

    let bridge = HostBridge::connect(&host_addr).await?;
    info!("runner.connected addr={host_addr} tick_ms={tick_ms}");

    let world = SnapshotWorld::default();
    let outbox = Outbox::default();
    let clients = Clients {
        world: Box::new(world.clone()),
        input: Box::new(BridgeInput(outbox.clone())),
        display: Box::new(BridgeDisplay(outbox.clone())),
        alarm: Box::new(BridgeAlarm(outbox.clone())),
    };
    let mut bot = Bot::new(config, clients, Box::new(routes));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut tick = tokio::time::interval(Duration::from_millis(tick_ms));

    loop {
        tokio::select! {
            _ = tick.tick() => {
                match bridge.snapshot().await {
                    Ok(snapshot) => world.replace(Some(snapshot)),
                    Err(err) => {
                        warn!("runner.snapshot_failed err={err:#}");
                        world.replace(None);
                    }
                }
                bot.tick(Instant::now());
                bridge.flush(&outbox).await;
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) if !line.trim().is_empty() => {
                        bot.execute_line(&line, Instant::now());
                        bridge.flush(&outbox).await;
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        info!("runner.stdin_closed");
                        stdin_open = false;
                    }
                    Err(err) => {
                        warn!("runner.stdin_failed err={err:#}");
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("runner.shutdown");
                bot.stop(Instant::now());
                bridge.flush(&outbox).await;
                break;
            }
        }
    }
    Ok(())
}
