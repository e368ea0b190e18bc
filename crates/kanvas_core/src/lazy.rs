use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{info, warn};

use crate::embed::Encoder;
use crate::error::{ChatError, Result};
use crate::model::Embedding;

type Loader<E> = Box<dyn Fn() -> Result<E> + Send + Sync>;

/// Loads the wrapped encoder on first use and shares it afterwards.
///
/// The slot is guarded by a mutex held for the whole load, so concurrent
/// first callers wait for a single load. A failed or panicking load leaves
/// the slot empty and the next call tries again.
pub struct LazyEncoder<E> {
    name: String,
    loader: Loader<E>,
    slot: Mutex<Option<Arc<E>>>,
}

impl<E: Encoder> LazyEncoder<E> {
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<E> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            loader: Box::new(loader),
            slot: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // The slot only ever holds `None` or a finished encoder, so a loader
    // panic leaves nothing half-built behind the poisoned lock.
    fn slot(&self) -> MutexGuard<'_, Option<Arc<E>>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_loaded(&self) -> bool {
        self.slot().is_some()
    }

    pub fn get(&self) -> Result<Arc<E>> {
        let mut slot = self.slot();

        if let Some(encoder) = slot.as_ref() {
            return Ok(Arc::clone(encoder));
        }

        info!(model = %self.name, "loading encoder");
        let started = Instant::now();
        let encoder = match (self.loader)() {
            Ok(encoder) => Arc::new(encoder),
            Err(err) => {
                warn!(model = %self.name, error = %err, "encoder load failed");
                return Err(match err {
                    ChatError::EncoderLoad { .. } => err,
                    other => ChatError::encoder_load(&self.name, other),
                });
            }
        };
        info!(
            model = %self.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "encoder loaded"
        );

        *slot = Some(Arc::clone(&encoder));
        Ok(encoder)
    }
}

impl<E: Encoder> Encoder for LazyEncoder<E> {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.get()?.encode(texts)
    }
}
