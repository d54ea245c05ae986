use std::sync::atomic::{AtomicUsize, Ordering};

use snafu::ensure;

use crate::config::{ConfigError, EmptyCredentialsSnafu};

/// An ordered set of API keys with one of them active at a time.
///
/// The active index only moves through [CredentialPool::rotate]. The scheduler never runs two cycles at once,
/// so the atomic is there for `Sync`, not to arbitrate between concurrent rotations.
pub struct CredentialPool {
    keys: Vec<String>,
    index: AtomicUsize,
}

impl CredentialPool {
    pub fn new<I, K>(keys: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        ensure!(!keys.is_empty(), EmptyCredentialsSnafu);

        tracing::info!(count = keys.len(), "initialized credential pool");

        Ok(Self {
            keys,
            index: AtomicUsize::new(0),
        })
    }

    pub fn current(&self) -> &str {
        &self.keys[self.index()]
    }

    pub fn index(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Advance to the next key, wrapping around at the end. Returns the new index.
    pub fn rotate(&self) -> usize {
        let size = self.keys.len();
        let previous = self
            .index
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |x| Some((x + 1) % size))
            .unwrap_or_else(|x| x);
        let index = (previous + 1) % size;

        tracing::info!(index, "rotated to API key");
        index
    }
}

impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("size", &self.keys.len())
            .field("index", &self.index())
            .finish()
    }
}
