//! RPC method handler for the TabSnooze JSON protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! The `handle_method` function dispatches method calls to the wake scheduler
//! and the settings engine via the `App` struct.

use std::collections::HashSet;

use serde_json::{json, Value};

use crate::app::App;
use crate::services::delay_presets::resolve_preset;
use crate::types::delay::{DelayPreset, DelaySpec};
use crate::types::delayed_tab::{format_time_left, TabSnapshot};

/// Dispatch a method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(app: &App, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Delayed tabs ───
        "delayed.list" => {
            let now = app.scheduler.now_millis();
            let tabs = app
                .scheduler
                .store()
                .list_sorted()
                .await
                .map_err(|e| e.to_string())?;
            let mut arr = Vec::with_capacity(tabs.len());
            for tab in &tabs {
                let mut item = serde_json::to_value(tab).map_err(|e| e.to_string())?;
                if let Some(obj) = item.as_object_mut() {
                    obj.insert("timeLeft".to_string(), json!(format_time_left(tab.wake_time, now)));
                }
                arr.push(item);
            }
            Ok(json!(arr))
        }
        "delayed.schedule" => {
            let snapshots = parse_snapshots(params)?;
            let spec = match params.get("preset").and_then(|v| v.as_str()) {
                Some(name) => {
                    let preset: DelayPreset = name.parse()?;
                    DelaySpec::At {
                        wake_time: resolve_wake_time(app, preset).await?,
                    }
                }
                None => {
                    let delay = params.get("delay").cloned().ok_or("missing delay or preset")?;
                    serde_json::from_value(delay).map_err(|e| format!("invalid delay: {}", e))?
                }
            };
            let created = app
                .scheduler
                .schedule_all(snapshots, &spec)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!(created))
        }
        "delayed.remove" => {
            let ids = parse_ids(params.get("ids"))?;
            let removed = app.scheduler.remove(&ids).await.map_err(|e| e.to_string())?;
            Ok(json!({"removed": removed.len()}))
        }
        "delayed.wake_now" => {
            let ids = parse_ids(params.get("ids"))?;
            wake_now(app, &ids).await
        }

        // ─── Settings ───
        "settings.get" => {
            let engine = app.settings_engine.lock().await;
            serde_json::to_value(engine.get_settings()).map_err(|e| e.to_string())
        }
        "settings.set" => {
            let key = params.get("key").and_then(|v| v.as_str()).ok_or("missing key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut engine = app.settings_engine.lock().await;
            engine.set_value(key, value).map_err(|e| e.to_string())?;
            engine.save().await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "settings.reset" => {
            let mut engine = app.settings_engine.lock().await;
            engine.reset().await.map_err(|e| e.to_string())?;
            serde_json::to_value(engine.get_settings()).map_err(|e| e.to_string())
        }

        // ─── Presets ───
        "presets.resolve" => {
            let name = params.get("preset").and_then(|v| v.as_str()).ok_or("missing preset")?;
            let preset: DelayPreset = name.parse()?;
            let wake_time = resolve_wake_time(app, preset).await?;
            Ok(json!({"wakeTime": wake_time}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}

/// Handles an action-style message such as
/// `{"action":"wakeTabsNow","tabIds":[...]}`.
///
/// Returns `None` when `message` carries no `action` field.
pub async fn handle_message(app: &App, message: &Value) -> Option<Result<Value, String>> {
    let action = message.get("action")?.as_str().unwrap_or_default();
    let result = match action {
        "wakeTabsNow" => match parse_ids(message.get("tabIds")) {
            Ok(ids) => wake_now(app, &ids).await,
            Err(e) => Err(e),
        },
        other => Err(format!("unknown action: {}", other)),
    };
    Some(result)
}

async fn wake_now(app: &App, ids: &HashSet<String>) -> Result<Value, String> {
    let woken = app.scheduler.wake_now(ids).await.map_err(|e| e.to_string())?;
    let woken_ids: Vec<&str> = woken.iter().map(|t| t.id.as_str()).collect();
    Ok(json!({"success": true, "woken": woken_ids}))
}

async fn resolve_wake_time(app: &App, preset: DelayPreset) -> Result<i64, String> {
    let settings = app.settings_engine.lock().await.get_settings().clone();
    let now = app.scheduler.now_millis();
    let wall_clock = app.scheduler.config().wall_clock;
    resolve_preset(preset, &settings, now, wall_clock, &mut rand::thread_rng())
        .map_err(|e| e.to_string())
}

/// Accepts `{"tabs":[...]}` or a single `{"tab":{...}}`.
fn parse_snapshots(params: &Value) -> Result<Vec<TabSnapshot>, String> {
    if let Some(tabs) = params.get("tabs") {
        return serde_json::from_value(tabs.clone()).map_err(|e| format!("invalid tabs: {}", e));
    }
    let tab = params.get("tab").cloned().ok_or("missing tabs")?;
    let snapshot: TabSnapshot =
        serde_json::from_value(tab).map_err(|e| format!("invalid tab: {}", e))?;
    Ok(vec![snapshot])
}

/// Record ids may arrive as strings or, from older shells, as numbers.
fn parse_ids(value: Option<&Value>) -> Result<HashSet<String>, String> {
    let arr = value.and_then(|v| v.as_array()).ok_or("missing ids")?;
    arr.iter()
        .map(|id| match id {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(format!("invalid id: {}", other)),
        })
        .collect()
}
