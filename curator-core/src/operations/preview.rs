//! Server-side store for preview tokens.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use curator_model::{ItemId, OperationRequest};
use parking_lot::Mutex;
use rand::{TryRngCore, rngs::OsRng};

use crate::clock::Clock;
use crate::error::{CuratorError, Result};

pub const DEFAULT_PREVIEW_TTL_SECS: i64 = 30 * 60;
const TOKEN_BYTES: usize = 32;

/// Everything execute needs to reproduce a reviewed preview.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRecord {
    pub request: OperationRequest,
    pub item_ids: Vec<ItemId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Keyed token store with a fixed TTL. All access goes through one mutex so
/// lookup, consumption and sweeping never interleave.
pub struct PreviewTokenStore {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, PreviewRecord>>,
}

impl fmt::Debug for PreviewTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewTokenStore")
            .field("ttl", &self.ttl)
            .field("clock", &self.clock)
            .field("outstanding", &self.entries.lock().len())
            .finish()
    }
}

impl PreviewTokenStore {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(
        &self,
        request: OperationRequest,
        item_ids: Vec<ItemId>,
    ) -> Result<(String, DateTime<Utc>)> {
        let token = generate_token()?;
        let created_at = self.clock.now();
        let expires_at = created_at + self.ttl;
        self.entries.lock().insert(
            token.clone(),
            PreviewRecord {
                request,
                item_ids,
                created_at,
                expires_at,
            },
        );
        Ok((token, expires_at))
    }

    /// Remove and return the record. The token is gone afterwards whether or
    /// not it had expired.
    pub fn consume(&self, token: &str) -> Result<PreviewRecord> {
        let record = self
            .entries
            .lock()
            .remove(token)
            .ok_or_else(|| CuratorError::not_found("preview token"))?;
        if self.clock.now() >= record.expires_at {
            return Err(CuratorError::TokenExpired);
        }
        Ok(record)
    }

    /// Drop every expired record; returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, record| record.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CuratorError::Internal(format!("secure random unavailable: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
