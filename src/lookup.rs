//! DMR ID to callsign lookup.
//!
//! Reads the common `DMRIds.dat` format (one `<id> <callsign> [name...]` per
//! line, `#` comments) and keeps both directions in memory. The table can be
//! reloaded periodically in the background.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::types::DmrId;

/// Resolves DMR IDs and callsigns.
pub trait CallsignLookup: Send + Sync {
    /// Callsign registered for `id`.
    fn find_callsign(&self, id: DmrId) -> Option<String>;

    /// ID registered for `callsign`, matched case-insensitively.
    fn find_id(&self, callsign: &str) -> Option<DmrId>;
}

#[derive(Debug, Default)]
struct Table {
    callsigns: HashMap<DmrId, String>,
    ids: HashMap<String, DmrId>,
}

impl Table {
    fn parse(text: &str) -> Self {
        let mut table = Table::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split(|c: char| c.is_whitespace() || c == ';' || c == ',');
            let (Some(id), Some(callsign)) = (fields.next(), fields.find(|f| !f.is_empty())) else {
                continue;
            };
            let Ok(id) = id.parse::<u32>() else {
                continue;
            };
            let Ok(id) = DmrId::try_from(id) else {
                continue;
            };

            let callsign = callsign.to_ascii_uppercase();
            table.ids.entry(callsign.clone()).or_insert(id);
            table.callsigns.insert(id, callsign);
        }
        table
    }
}

/// Shared, reloadable ID table. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct IdLookup {
    path: Option<PathBuf>,
    table: Arc<RwLock<Table>>,
}

impl IdLookup {
    /// An empty table that never resolves anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the table from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let text = std::fs::read_to_string(&path)?;
        let table = Table::parse(&text);
        info!(
            "Loaded {} DMR IDs from {}",
            table.callsigns.len(),
            path.display()
        );
        Ok(Self {
            path: Some(path),
            table: Arc::new(RwLock::new(table)),
        })
    }

    /// Build a table from text in `DMRIds.dat` format.
    pub fn from_text(text: &str) -> Self {
        Self {
            path: None,
            table: Arc::new(RwLock::new(Table::parse(text))),
        }
    }

    pub fn len(&self) -> usize {
        self.table.read().callsigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-read the backing file, keeping the current table if that fails.
    pub async fn reload(&self) -> Result<usize> {
        let Some(path) = &self.path else {
            return Ok(self.len());
        };

        let text = tokio::fs::read_to_string(path).await?;
        let table = Table::parse(&text);
        let count = table.callsigns.len();
        *self.table.write() = table;
        debug!("Reloaded {} DMR IDs from {}", count, path.display());
        Ok(count)
    }

    /// Start the periodic reload task.
    pub fn start_reload_task(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let lookup = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; the table is already loaded.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = lookup.reload().await {
                    warn!("DMR ID reload failed, keeping previous table: {}", e);
                }
            }
        })
    }
}

impl CallsignLookup for IdLookup {
    fn find_callsign(&self, id: DmrId) -> Option<String> {
        self.table.read().callsigns.get(&id).cloned()
    }

    fn find_id(&self, callsign: &str) -> Option<DmrId> {
        let key = callsign.trim().to_ascii_uppercase();
        self.table.read().ids.get(&key).copied()
    }
}
