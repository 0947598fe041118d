//! Tab host for the stdin/stdout bridge.
//!
//! Tab requests become event lines the hosting shell acts on:
//! `{"event":"open_tab","url":"..."}`, `{"event":"close_tabs","tabIds":[..]}`
//! and `{"event":"notify","title":"..","message":"..","iconUrl":".."}`.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use super::{TabHandle, TabHost};
use crate::types::delayed_tab::WakeNotification;
use crate::types::errors::HostError;

/// Outbound event for the hosting shell.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    OpenTab {
        url: String,
    },
    CloseTabs {
        #[serde(rename = "tabIds")]
        tab_ids: Vec<TabHandle>,
    },
    Notify {
        title: String,
        message: String,
        #[serde(rename = "iconUrl")]
        icon_url: String,
    },
}

/// Forwards tab requests as [`BridgeEvent`]s on a channel.
///
/// The shell owns the real tabs, so the handles returned by `open_tab` are
/// local sequence numbers only.
pub struct EventTabHost {
    events: mpsc::UnboundedSender<BridgeEvent>,
    next_handle: AtomicI64,
}

impl EventTabHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let host = Self {
            events,
            next_handle: AtomicI64::new(0),
        };
        (host, rx)
    }
}

#[async_trait]
impl TabHost for EventTabHost {
    async fn open_tab(&self, url: &str) -> Result<TabHandle, HostError> {
        self.events
            .send(BridgeEvent::OpenTab {
                url: url.to_string(),
            })
            .map_err(|e| HostError::OpenTab(e.to_string()))?;
        Ok(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn close_tabs(&self, tab_ids: &[TabHandle]) -> Result<(), HostError> {
        self.events
            .send(BridgeEvent::CloseTabs {
                tab_ids: tab_ids.to_vec(),
            })
            .map_err(|e| HostError::CloseTabs(e.to_string()))
    }

    async fn notify(&self, notification: &WakeNotification) -> Result<(), HostError> {
        self.events
            .send(BridgeEvent::Notify {
                title: notification.title.clone(),
                message: notification.message.clone(),
                icon_url: notification.icon_url.clone(),
            })
            .map_err(|e| HostError::Notify(e.to_string()))
    }
}
