use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The payload held under a key
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Str(Arc<str>),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
}

impl Data {
    /// Name of the kind, as used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Data::Str(_) => "string",
            Data::Hash(_) => "hash",
            Data::Set(_) => "set",
        }
    }
}

/// Remaining lifetime of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The key does not exist
    Missing,
    /// The key exists and never expires
    Persistent,
    /// The key expires after this many whole seconds
    Expires(u64),
}

/// Represents a stored payload with its optional expiration time
#[derive(Debug, Clone)]
pub struct Entry {
    data: Data,
    expires_at: Option<Instant>,
}

impl Entry {
    /// Creates an entry that never expires
    pub fn new(data: Data) -> Self {
        Self {
            data,
            expires_at: None,
        }
    }

    /// Creates an entry that expires at the given instant
    pub fn with_expiry(data: Data, expires_at: Instant) -> Self {
        Self {
            data,
            expires_at: Some(expires_at),
        }
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Data {
        &mut self.data
    }

    /// Returns the expiration time, if any
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn set_expires_at(&mut self, expires_at: Option<Instant>) {
        self.expires_at = expires_at;
    }

    /// Checks if this entry has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }

    /// Remaining lifetime, rounded up to whole seconds
    pub fn ttl(&self) -> Ttl {
        match self.expires_at {
            None => Ttl::Persistent,
            Some(expires_at) => {
                let remaining = expires_at.saturating_duration_since(Instant::now());
                Ttl::Expires(ceil_secs(remaining))
            }
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}
