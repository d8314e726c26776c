use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::prompt::AttributeSet;
use crate::session::Theme;

/// Everything the engine records in `events.jsonl`. The variant name becomes
/// the `type` field; the fields sit next to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        data_dir: String,
        service: String,
        history_len: usize,
        favorites_len: usize,
        theme: Theme,
    },
    StorageRecovered {
        warning: String,
    },
    PromptBuilt {
        prompt: String,
        attributes: AttributeSet,
    },
    AttributesRandomized {
        attributes: AttributeSet,
    },
    GenerationStarted {
        service: String,
        seed: u32,
        url: String,
        delay_ms: u64,
    },
    GenerationFinished {
        timestamp: i64,
        url: String,
        history_len: usize,
    },
    HistoryLoaded {
        index: usize,
        timestamp: i64,
        url: String,
    },
    HistoryCleared {
        removed: usize,
    },
    FavoriteAdded {
        timestamp: i64,
        url: String,
    },
    FavoriteRemoved {
        timestamp: i64,
        removed: usize,
    },
    ThemeChanged {
        theme: Theme,
    },
    DownloadSaved {
        service: String,
        url: String,
        path: String,
        width: u32,
        height: u32,
    },
    SessionFinished {
        history_len: usize,
        favorites_len: usize,
        theme: Theme,
    },
}

/// Appends one compact JSON line per [`SessionEvent`], stamped with the
/// session id and an RFC 3339 `ts`.
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventLog>,
}

#[derive(Debug)]
struct EventLog {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventLog {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn record(&self, event: &SessionEvent) -> anyhow::Result<Value> {
        let Value::Object(mut row) = serde_json::to_value(event)? else {
            anyhow::bail!("session event did not serialize to an object");
        };
        row.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        row.insert("ts".to_string(), Value::String(now_utc_iso()));
        let row = Value::Object(row);
        let line = serde_json::to_string(&row)?;

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)
            .with_context(|| format!("failed opening {}", self.inner.path.display()))?;
        writeln!(file, "{line}")?;
        Ok(row)
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
