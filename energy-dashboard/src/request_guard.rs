use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Inner {
    latest: AtomicU64,
    cancel: Mutex<CancellationToken>,
}

/// Hands out tickets for a repeatable fetch; starting a new one supersedes
/// (and cancels) every earlier ticket.
#[derive(Clone, Default)]
pub struct RequestGeneration {
    inner: Arc<Inner>,
}

pub struct RequestTicket {
    generation: u64,
    token: CancellationToken,
    inner: Arc<Inner>,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> RequestTicket {
        let mut slot = self.inner.cancel.lock().unwrap_or_else(|p| p.into_inner());
        slot.cancel();

        let token = CancellationToken::new();
        *slot = token.clone();
        let generation = self.inner.latest.fetch_add(1, Ordering::SeqCst) + 1;

        RequestTicket {
            generation,
            token,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Supersede whatever is in flight without starting anything new.
    pub fn invalidate(&self) {
        let slot = self.inner.cancel.lock().unwrap_or_else(|p| p.into_inner());
        slot.cancel();
        self.inner.latest.fetch_add(1, Ordering::SeqCst);
    }

    pub fn latest(&self) -> u64 {
        self.inner.latest.load(Ordering::SeqCst)
    }
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        !self.token.is_cancelled() && self.inner.latest.load(Ordering::SeqCst) == self.generation
    }

    /// Drive `fut` unless this ticket is superseded first, in which case the
    /// future is dropped and `None` comes back.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }
}
