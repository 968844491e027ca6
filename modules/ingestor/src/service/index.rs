use std::collections::BTreeSet;
use tokio::{sync::mpsc, task::JoinHandle};

/// Keeps the search index of vulnerabilities in sync.
pub trait VulnerabilityIndex: Send + Sync {
    /// Schedule the vulnerabilities for re-indexing, without waiting for it.
    fn enqueue(&self, vulnerability_ids: Vec<i64>);
}

/// The search engine, indexing vulnerabilities.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    async fn index(&self, vulnerability_ids: &[i64]) -> Result<(), anyhow::Error>;
}

/// Hands vulnerabilities to a [`SearchBackend`] from a background worker.
///
/// Ids enqueued while the backend is busy are merged into a single batch.
#[derive(Clone, Debug)]
pub struct IndexQueue {
    tx: mpsc::UnboundedSender<Vec<i64>>,
}

impl IndexQueue {
    /// Spawn the worker. It ends once all clones of the queue are dropped.
    pub fn spawn<B: SearchBackend>(backend: B) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run(backend, rx));
        (Self { tx }, worker)
    }
}

impl VulnerabilityIndex for IndexQueue {
    fn enqueue(&self, vulnerability_ids: Vec<i64>) {
        if vulnerability_ids.is_empty() {
            return;
        }

        if let Err(err) = self.tx.send(vulnerability_ids) {
            log::warn!(
                "search index worker is gone, dropping {} vulnerability id(s)",
                err.0.len()
            );
        }
    }
}

async fn run<B: SearchBackend>(backend: B, mut rx: mpsc::UnboundedReceiver<Vec<i64>>) {
    while let Some(first) = rx.recv().await {
        let mut batch = first.into_iter().collect::<BTreeSet<_>>();
        while let Ok(more) = rx.try_recv() {
            batch.extend(more);
        }

        let batch = batch.into_iter().collect::<Vec<_>>();
        log::debug!("indexing {} vulnerabilities", batch.len());

        if let Err(err) = backend.index(&batch).await {
            log::warn!("failed to index {} vulnerabilities: {err}", batch.len());
        }
    }

    log::debug!("search index worker finished");
}
