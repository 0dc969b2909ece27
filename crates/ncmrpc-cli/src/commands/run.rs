//! Main synchronization mode.

use anyhow::{Result, bail};
use ncmrpc::{Config, SyncEvent, SyncService, Synchronizer, format_position};
use owo_colors::OwoColorize;
use tracing::info;

use crate::input;

pub fn run(config: Config) -> Result<()> {
    info!("ncmrpc {}", env!("CARGO_PKG_VERSION"));

    let interval = config.sync.interval();
    let service = SyncService::spawn(interval, move || Synchronizer::from_config(&config))?;

    let shutdown_ctrlc = service.shutdown_signal();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;
    let _keyboard_handle = input::spawn_keyboard_monitor(service.shutdown_signal());

    println!("Waiting for NetEase Cloud Music... (Press Esc or q to quit)");

    let mut fatal = None;
    while let Ok(event) = service.events().recv() {
        print_event(&event);
        match event {
            SyncEvent::Fatal(message) => fatal = Some(message),
            SyncEvent::Stopped => break,
            _ => {}
        }
    }
    service.join();

    if let Some(message) = fatal {
        bail!(message);
    }
    println!("Stopped.");
    Ok(())
}

fn print_event(event: &SyncEvent) {
    let Some(line) = describe(event) else {
        return;
    };
    match event {
        SyncEvent::Fatal(_) => eprintln!("{} {}", "error:".red().bold(), line),
        SyncEvent::Warning(_) => eprintln!("{} {}", "warning:".yellow().bold(), line),
        SyncEvent::NowPlaying { .. } => println!("{} {}", "▶".green(), line),
        SyncEvent::Paused { .. } => println!("{} {}", "⏸".cyan(), line),
        _ => println!("{} {}", "•".dimmed(), line),
    }
}

/// Plain console line for an event; `None` for events not shown
fn describe(event: &SyncEvent) -> Option<String> {
    let line = match event {
        SyncEvent::Attached {
            pid,
            version,
            layout,
        } => format!("Attached to pid {} (version {}, {})", pid, version, layout),
        SyncEvent::Detached { pid } => format!("Client exited (pid {})", pid),
        SyncEvent::NowPlaying {
            title,
            artist,
            position_seconds,
            ..
        } => format!(
            "{} - {} [{}]",
            title,
            artist,
            format_position(*position_seconds)
        ),
        SyncEvent::Paused { title, .. } => format!("{} (paused)", title),
        SyncEvent::Cleared => "Idle, presence cleared".to_string(),
        SyncEvent::Warning(message) | SyncEvent::Fatal(message) => message.clone(),
        SyncEvent::Stopped => return None,
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_now_playing() {
        let event = SyncEvent::NowPlaying {
            song_id: "1".to_string(),
            title: "Song".to_string(),
            artist: "A / B".to_string(),
            position_seconds: 75.5,
        };
        assert_eq!(describe(&event).unwrap(), "Song - A / B [01:15.50]");
    }

    #[test]
    fn test_describe_attached() {
        let event = SyncEvent::Attached {
            pid: 42,
            version: "2.10.8.4337".to_string(),
            layout: "fixed".to_string(),
        };
        assert_eq!(
            describe(&event).unwrap(),
            "Attached to pid 42 (version 2.10.8.4337, fixed)"
        );
    }

    #[test]
    fn test_stopped_is_silent() {
        assert!(describe(&SyncEvent::Stopped).is_none());
        assert_eq!(
            describe(&SyncEvent::Warning("Discord is not running".to_string())).unwrap(),
            "Discord is not running"
        );
    }
}
