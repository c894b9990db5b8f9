//! Idle connection cap
//!
//! sqlx keeps every released connection until its idle timeout. The cap
//! closes a released connection instead when the pool already holds `max`
//! idle ones. The check needs the pool itself, which only exists after the
//! options are built, so the pool is attached once opened.

use std::sync::{Arc, Mutex};

use sqlx::postgres::{PgPool, PgPoolOptions};

#[derive(Debug, Clone)]
pub(crate) struct IdleCap {
    max: usize,
    pool: Arc<Mutex<Option<PgPool>>>,
}

impl IdleCap {
    pub(crate) fn new(max: u32) -> Self {
        Self {
            max: max as usize,
            pool: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether a connection being released goes back to the idle queue.
    /// Connections are kept while no pool is attached.
    pub(crate) fn keep(&self) -> bool {
        let slot = match self.pool.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.as_ref().map_or(true, |pool| pool.num_idle() < self.max)
    }

    pub(crate) fn install(&self, options: PgPoolOptions) -> PgPoolOptions {
        let cap = self.clone();
        options.after_release(move |_conn, _meta| {
            let keep = cap.keep();
            Box::pin(async move { Ok(keep) })
        })
    }

    pub(crate) fn attach(&self, pool: &PgPool) {
        self.set(Some(pool.clone()));
    }

    /// Drop the pool reference held by the release hook, which would
    /// otherwise keep the pool alive.
    pub(crate) fn detach(&self) {
        self.set(None);
    }

    fn set(&self, pool: Option<PgPool>) {
        let mut slot = match self.pool.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = pool;
    }
}
