use std::sync::Arc;

use energy_client::domain::UsageRecord;
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::usage_metrics::{derive, DerivedMetrics, Projection};

/// Records and the metrics derived from exactly those records.
#[derive(Debug, Clone, Default)]
pub struct UsageSnapshot {
    pub records: Arc<Vec<UsageRecord>>,
    pub metrics: DerivedMetrics,
    /// Bumped on every replacement.
    pub revision: u64,
}

/// Shared holder of the latest fetched history.
///
/// Records and metrics are published together in one watch update, so a
/// subscriber can never pair new records with metrics from an older fetch.
pub struct UsageStore {
    projection: Projection,
    tx: watch::Sender<UsageSnapshot>,
}

impl UsageStore {
    pub fn new(projection: Projection) -> Self {
        let (tx, _) = watch::channel(UsageSnapshot::default());
        Self { projection, tx }
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn replace(&self, records: Vec<UsageRecord>) -> UsageSnapshot {
        let metrics = derive(&records, self.projection);
        let records = Arc::new(records);

        self.tx.send_modify(|snap| {
            snap.revision += 1;
            snap.records = records;
            snap.metrics = metrics;
        });

        let snap = self.snapshot();
        tracing::debug!(
            revision = snap.revision,
            records = snap.records.len(),
            predicted_bill = snap.metrics.predicted_bill,
            "usage snapshot replaced"
        );
        snap
    }

    pub fn clear(&self) {
        self.replace(Vec::new());
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UsageSnapshot> {
        self.tx.subscribe()
    }

    /// Current metrics followed by the metrics of every later replacement.
    /// Intermediate values may be skipped if the consumer lags.
    pub fn metrics_stream(&self) -> impl Stream<Item = DerivedMetrics> + Send + 'static {
        WatchStream::new(self.subscribe()).map(|snap| snap.metrics)
    }
}
