//! Best-effort replay window for booking commands.
//!
//! A caller that retries a command with the same key inside the window gets
//! the first result back without a second remote call. Keys are scoped to
//! the acting profile, and each entry remembers a fingerprint of the payload
//! it was recorded for: reusing a key for a different payload is a conflict,
//! never a replay. Single-process only; entries do not survive a restart.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use detailr_core::ProfileId;

pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// A caller-supplied deduplication key and the profile that sent it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RequestKey<'a> {
    pub actor: ProfileId,
    pub key: &'a str,
}

impl<'a> RequestKey<'a> {
    pub fn new(actor: ProfileId, key: &'a str) -> Self {
        Self { actor, key }
    }
}

/// Outcome of looking a key up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    Miss,
    Replay(V),
    /// The key was recorded for a different payload.
    Conflict,
}

#[derive(Debug)]
struct Entry<V> {
    at: Instant,
    fingerprint: String,
    value: V,
}

#[derive(Debug)]
pub struct IdempotencyWindow<V> {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V: Clone> IdempotencyWindow<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn key(command: &str, subject: impl Display, request: RequestKey<'_>) -> String {
        format!("{command}:{subject}:{}:{}", request.actor, request.key)
    }

    pub fn lookup(&self, key: &str, fingerprint: &str) -> Lookup<V> {
        let Ok(entries) = self.entries.read() else {
            return Lookup::Miss;
        };
        match entries.get(key) {
            Some(e) if e.at.elapsed() >= self.ttl => Lookup::Miss,
            Some(e) if e.fingerprint == fingerprint => Lookup::Replay(e.value.clone()),
            Some(_) => Lookup::Conflict,
            None => Lookup::Miss,
        }
    }

    pub fn insert(&self, key: String, fingerprint: impl Into<String>, value: V) {
        if let Ok(mut entries) = self.entries.write() {
            let ttl = self.ttl;
            entries.retain(|_, e| e.at.elapsed() < ttl);
            entries.insert(
                key,
                Entry {
                    at: Instant::now(),
                    fingerprint: fingerprint.into(),
                    value,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for IdempotencyWindow<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
