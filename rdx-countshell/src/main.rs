use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use countdown::prelude::*;
use countdown::{ENGINE_NAME, VERSION as LIB_VERSION};
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::collections::HashMap;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

const LOGO_TEXT: &str = r"
   ___                  _      _
  / __|___ _  _ _ _  __| |_ __| |_____ __ ___ _
 | (__/ _ \ || | ' \/ _` | '_/ _` / _ \ V  V / ' \
  \___\___/\_,_|_||_\__,_|_| \__,_\___/\_/\_/|_||_|
";

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct CommandHighlighter;

impl Highlighter for CommandHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.yellow().bold(), rest.yellow()))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    println!("{}", LOGO_TEXT.cyan());
    println!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!("{}", "-".repeat(64).dimmed());
}

fn print_help() {
    println!("Available commands:");
    println!("  target <DATE|+S>...   - Counts down to one date, or the first future one of many.");
    println!("  start                 - Starts (or resumes) the countdown.");
    println!("  pause                 - Pauses the countdown; paused time is not counted.");
    println!("  stop                  - Stops the countdown.");
    println!("  show                  - Prints the remaining time.");
    println!("  watch on|off          - Prints every tick.");
    println!("  listen complete       - Adds a completion listener and prints its handle.");
    println!("  unlisten <H>          - Removes a listener by its handle.");
    println!("  exit                  - Quits the shell.");
}

/// Spawns tasks that print the controller's event streams.
fn spawn_event_listeners(controller: &CountdownController, is_watching_ticks: Arc<AtomicBool>) {
    let mut system_rx = controller.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            println!("\n<-- [SYSTEM EVENT] {:?}\n>> ", event);
        }
    });

    let handle = controller.clone();
    let mut event_rx = controller.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            let options = handle.config().await.format_options();
            let formatted = format_delta(event.delta(), &options);
            match event {
                CountdownEvent::Tick(_) => {
                    if is_watching_ticks.load(Ordering::Relaxed) {
                        println!("<-- [TICK] {}", formatted);
                    }
                }
                CountdownEvent::MultiSwitch(_) => {
                    println!("\n<-- [SWITCH] Next date in {}\n>> ", formatted);
                }
                CountdownEvent::Completed(_) => {
                    println!(
                        "\n<-- [COMPLETE] {}\n>> ",
                        "Countdown finished!".green().bold()
                    );
                }
            }
        }
    });
}

/// Prints the remaining time, or a warning for an unusable target.
async fn show(controller: &CountdownController) {
    let delta = controller.current().await;
    let formatted = controller.formatted().await;
    if !delta.valid {
        println!(
            "{} {}",
            formatted.to_string().red(),
            "(target is not a valid date)".dimmed()
        );
        return;
    }
    let ends_at = Utc::now() + chrono::Duration::milliseconds(delta.total);
    println!(
        "{}  {:?}  ends {}",
        formatted.to_string().cyan().bold(),
        controller.status().await,
        ends_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

/// Parses `target` arguments into a target spec.
fn parse_targets(args: &[&str], config: &CountdownConfig) -> Result<TargetSpec> {
    let now = SystemClock.now_millis();
    let mut points = args
        .iter()
        .map(|arg| TargetPoint::from_arg(arg, now, config.timezone))
        .collect::<Result<Vec<_>>>()?;
    Ok(if points.len() == 1 {
        TargetSpec::Single(points.remove(0))
    } else {
        TargetSpec::Multi(points)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let config = CountdownConfig::load(None)?;
    let controller = CountdownController::new(0_i64, config);

    // Create the shared flag for the tick printer.
    let is_watching_ticks = Arc::new(AtomicBool::new(false));
    spawn_event_listeners(&controller, is_watching_ticks.clone());
    info!("{} v{} ready.", ENGINE_NAME, LIB_VERSION);

    // The shell's state management variables.
    let mut active_listeners: HashMap<usize, ListenerId> = HashMap::new();
    let mut next_handle: usize = 0;

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CommandHighlighter));

    println!(
        "{} is ready. Set a target with 'target', or type 'help'.",
        ENGINE_NAME.cyan()
    );

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(_) => {
                println!("Exiting countshell...");
                break;
            }
        };
        rl.add_history_entry(line.as_str())?;
        let args = line.split_whitespace().collect::<Vec<_>>();
        let Some(command) = args.first() else {
            continue;
        };

        match *command {
            "target" => {
                if args.len() < 2 {
                    println!("Usage: target <DATE|+SECONDS>...");
                    continue;
                }
                let config = controller.config().await;
                match parse_targets(&args[1..], &config) {
                    Ok(target) => {
                        controller.update_target(target, config).await;
                        show(&controller).await;
                    }
                    Err(e) => println!("Error: {e:#}"),
                }
            }
            "start" => {
                if controller.activate().await {
                    println!("--> Countdown running.");
                } else {
                    println!("--> Nothing to start ({:?}).", controller.status().await);
                }
            }
            "pause" => {
                if !controller.pause().await {
                    println!("--> The countdown is not running.");
                }
            }
            "stop" => {
                if !controller.deactivate().await {
                    println!("--> The countdown was not running.");
                }
            }
            "show" => show(&controller).await,
            "watch" => match args.get(1) {
                Some(&"on") => {
                    is_watching_ticks.store(true, Ordering::Relaxed);
                    println!("--> Printing every tick.");
                }
                Some(&"off") => {
                    is_watching_ticks.store(false, Ordering::Relaxed);
                    println!("--> Stopped printing ticks.");
                }
                _ => println!("Usage: watch on|off"),
            },
            "listen" => {
                if let Some(&"complete") = args.get(1) {
                    let handle = next_handle;
                    let id = controller
                        .on_complete(move |_| {
                            println!("<-- [LISTENER #{}] Completion received.", handle)
                        })
                        .await;
                    active_listeners.insert(handle, id);
                    next_handle += 1;
                    println!("--> Added completion listener with handle: #{}", handle);
                } else {
                    println!("Usage: listen complete");
                }
            }
            "unlisten" => match args.get(1).map(|h| h.parse::<usize>()) {
                Some(Ok(handle)) => match active_listeners.remove(&handle) {
                    Some(id) => {
                        if controller.remove_listener(id).await {
                            println!("--> Listener successfully removed.");
                        } else {
                            println!("--> Error: Listener not found in controller.");
                        }
                    }
                    None => println!("Error: Invalid handle #{}.", handle),
                },
                Some(Err(_)) => println!("Error: Handle must be a number (e.g., '0', '1')."),
                None => println!("Usage: unlisten <HANDLE>"),
            },
            "help" => print_help(),
            "exit" => break,
            _ => println!("Unknown command: '{}'. Type 'help'.", line.trim()),
        }
    }

    controller.dispose().await;
    Ok(())
}
