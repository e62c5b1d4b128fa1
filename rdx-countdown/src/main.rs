use anyhow::{bail, Context, Result};
use countdown::prelude::*;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line options: `countdown-dev [--config PATH] TARGET...`
struct Args {
    config_path: Option<PathBuf>,
    targets: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut config_path = None;
    let mut targets = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config expects a path")?;
                config_path = Some(PathBuf::from(path));
            }
            _ => targets.push(arg),
        }
    }
    if targets.is_empty() {
        bail!("usage: countdown-dev [--config PATH] <DATE|+SECONDS>...");
    }
    Ok(Args {
        config_path,
        targets,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // 2. Load the configuration and resolve the targets.
    let args = parse_args()?;
    let config = CountdownConfig::load(args.config_path.as_deref())?;
    let now = SystemClock.now_millis();
    let mut points = args
        .targets
        .iter()
        .map(|arg| TargetPoint::from_arg(arg, now, config.timezone))
        .collect::<Result<Vec<_>>>()?;
    let target = if points.len() == 1 {
        TargetSpec::Single(points.remove(0))
    } else {
        TargetSpec::Multi(points)
    };

    // 3. Create the controller and listen to its event streams.
    let controller = CountdownController::new(target, config);
    spawn_event_listeners(&controller);

    let delta = controller.current().await;
    if delta.completed {
        warn!("Target is already in the past.");
        return Ok(());
    }
    info!("Counting down: {}", controller.formatted().await);

    // 4. Run until completion or Ctrl+C.
    let mut events = controller.subscribe_events();
    controller.activate().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted.");
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(CountdownEvent::Completed(_)) | Err(RecvError::Closed) => break,
                    _ => continue,
                }
            }
        }
    }
    controller.dispose().await;
    Ok(())
}

/// Spawns tasks that log the controller's event streams.
fn spawn_event_listeners(controller: &CountdownController) {
    let mut system_rx = controller.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            info!("[SYSTEM] => {:?}", event);
        }
    });

    let format = controller.clone();
    let mut event_rx = controller.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            match event {
                CountdownEvent::Tick(_) => info!("[TICK] {}", format.formatted().await),
                CountdownEvent::MultiSwitch(delta) => {
                    info!("[SWITCH] Next date in {} s", delta.total / 1000)
                }
                CountdownEvent::Completed(_) => info!("[COMPLETE] Countdown finished."),
            }
        }
    });
}
