//! TabSnooze RPC Server: newline-delimited JSON over stdin/stdout for the
//! hosting browser shell.
//!
//! Request:  {"id":1, "method":"delayed.schedule", "params":{...}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Message:  {"id":2, "action":"wakeTabsNow", "tabIds":["..."]}
//! Event:    {"event":"open_tab","url":"..."} / {"event":"close_tabs","tabIds":[..]}
//!           / {"event":"notify","title":"...","message":"...","iconUrl":"..."}
//!
//! Logs go to stderr so stdout stays a clean protocol channel.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tabsnooze::app::App;
use tabsnooze::host::bridge::EventTabHost;
use tabsnooze::managers::wake_scheduler::SchedulerConfig;
use tabsnooze::platform;
use tabsnooze::rpc_handler::{handle_message, handle_method};
use tabsnooze::services::recurrence_calculator::WallClock;

fn data_dir() -> PathBuf {
    match std::env::var("TABSNOOZE_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => platform::get_data_dir(),
    }
}

fn scheduler_config() -> SchedulerConfig {
    let Ok(raw) = std::env::var("TABSNOOZE_UTC_OFFSET_MINUTES") else {
        return SchedulerConfig::default();
    };
    match raw.trim().parse::<i32>().ok().and_then(WallClock::fixed_minutes) {
        Some(wall_clock) => SchedulerConfig::with_wall_clock(wall_clock),
        None => {
            warn!(value = %raw, "ignoring invalid TABSNOOZE_UTC_OFFSET_MINUTES");
            SchedulerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;
    let db_path = dir.join("tabsnooze.db");

    let (tabs, mut events) = EventTabHost::new();
    let (app, fired) = App::open(&db_path, Arc::new(tabs), scheduler_config())?;
    info!(db = %db_path.display(), "tabsnooze-rpc starting");

    // Single writer so response and event lines never interleave.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            if stdout.write_all(line.as_bytes()).await.is_err()
                || stdout.write_all(b"\n").await.is_err()
                || stdout.flush().await.is_err()
            {
                break;
            }
        }
    });

    let event_tx = out_tx.clone();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => {
                    if event_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => error!(error = %e, "failed to encode bridge event"),
            }
        }
    });

    let dispatcher = app.startup(fired).await;

    let ready = json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")});
    let _ = out_tx.send(ready.to_string());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let err = json!({"id": null, "error": format!("parse error: {}", e)});
                let _ = out_tx.send(err.to_string());
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        let result = match handle_message(&app, &req).await {
            Some(result) => result,
            None => {
                let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
                let params = req.get("params").cloned().unwrap_or(json!({}));
                handle_method(&app, method, &params).await
            }
        };

        let response = match result {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        let _ = out_tx.send(response.to_string());
    }

    info!("stdin closed; shutting down");
    dispatcher.abort();
    let _ = dispatcher.await;
    drop(app);
    drop(out_tx);
    // The event forwarder may still hold a sender; give queued lines a moment.
    let _ = tokio::time::timeout(Duration::from_secs(1), writer).await;
    Ok(())
}
