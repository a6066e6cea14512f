//! File-backed transaction ledger.

use alloy::primitives::TxHash;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::ledger::types::{EventStatus, TransactionEvent};
use crate::ledger::{LedgerResult, TransactionLedger};
use crate::observability::metrics;

/// How long an error mark for an unknown hash waits for its record.
const EARLY_ERROR_TTL: Duration = Duration::from_secs(600);
/// Upper bound on held error marks; the oldest is dropped first.
const EARLY_ERROR_CAP: usize = 256;

/// A thread-safe transaction ledger persisted as a JSON array.
///
/// `enqueue` and `mark_with_error_event` for the same hash serialize on the
/// record's map entry, so a mark is never lost between the two.
#[derive(Clone)]
pub struct FileLedger {
    inner: Arc<DashMap<TxHash, TransactionEvent>>,
    /// Hashes marked as errored before their record was enqueued.
    early_errors: Arc<DashMap<TxHash, Instant>>,
    early_error_ttl: Duration,
    early_error_cap: usize,
    persistence_path: Option<PathBuf>,
    /// Serializes file writes so snapshots land in order.
    write_lock: Arc<Mutex<()>>,
}

impl FileLedger {
    /// Create a new empty ledger.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::default(),
            early_errors: Arc::default(),
            early_error_ttl: EARLY_ERROR_TTL,
            early_error_cap: EARLY_ERROR_CAP,
            persistence_path,
            write_lock: Arc::default(),
        }
    }

    /// Create an in-memory ledger with no backing file.
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Load from file if it exists.
    pub fn load_from_file(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let ledger = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let events: Vec<TransactionEvent> = serde_json::from_reader(reader)?;
            for event in events {
                ledger.inner.insert(event.id, event);
            }
            metrics::record_ledger_size(ledger.inner.len());
            tracing::info!(path = %path.display(), events = ledger.inner.len(), "Loaded transaction ledger");
        }
        Ok(ledger)
    }

    /// Write the current contents to the backing file, if any.
    pub async fn persist(&self) -> LedgerResult<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };

        let _guard = self.write_lock.lock().await;
        let bytes = serde_json::to_vec_pretty(&self.list())?;
        tokio::fs::write(path, bytes).await?;
        tracing::debug!(path = %path.display(), "Persisted transaction ledger");
        Ok(())
    }

    /// Get a record by hash.
    pub fn get(&self, tx_hash: &TxHash) -> Option<TransactionEvent> {
        self.inner.get(tx_hash).map(|r| r.value().clone())
    }

    /// All records, newest first.
    pub fn list(&self) -> Vec<TransactionEvent> {
        let mut events: Vec<_> = self.inner.iter().map(|r| r.value().clone()).collect();
        events.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        events
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Override how long and how many early error marks are held.
    pub fn with_early_error_limits(mut self, ttl: Duration, cap: usize) -> Self {
        self.early_error_ttl = ttl;
        self.early_error_cap = cap;
        self
    }

    /// Count of (pending, errored) records.
    pub fn summary(&self) -> (usize, usize) {
        let mut pending = 0;
        let mut errored = 0;
        for r in self.inner.iter() {
            match r.value().status {
                EventStatus::Pending => pending += 1,
                EventStatus::Error => errored += 1,
            }
        }
        (pending, errored)
    }

    /// Remove a held mark for `tx_hash`; true if it was still fresh.
    fn take_early_error(&self, tx_hash: &TxHash) -> bool {
        self.early_errors
            .remove(tx_hash)
            .is_some_and(|(_, marked_at)| marked_at.elapsed() <= self.early_error_ttl)
    }

    fn hold_early_error(&self, tx_hash: TxHash) {
        let ttl = self.early_error_ttl;
        self.early_errors.retain(|_, marked_at| marked_at.elapsed() <= ttl);

        while self.early_errors.len() >= self.early_error_cap {
            let oldest = self
                .early_errors
                .iter()
                .min_by_key(|r| *r.value())
                .map(|r| *r.key());
            match oldest {
                Some(hash) => {
                    self.early_errors.remove(&hash);
                    tracing::debug!(tx_hash = %hash, "Dropped oldest held error mark");
                }
                None => break,
            }
        }

        if self.early_error_cap > 0 {
            self.early_errors.insert(tx_hash, Instant::now());
        }
    }
}

impl TransactionLedger for FileLedger {
    async fn enqueue(&self, mut event: TransactionEvent) -> LedgerResult<()> {
        let tx_hash = event.id;

        {
            let entry = self.inner.entry(tx_hash);
            if self.take_early_error(&tx_hash) {
                tracing::debug!(tx_hash = %tx_hash, "Applying error mark received before enqueue");
                event.status = EventStatus::Error;
            }
            if matches!(entry, Entry::Occupied(_)) {
                tracing::warn!(tx_hash = %tx_hash, "Replaced existing ledger record");
            }
            entry.insert(event);
        }

        metrics::record_ledger_size(self.inner.len());
        tracing::info!(tx_hash = %tx_hash, "Enqueued transaction");

        self.persist().await
    }

    async fn mark_with_error_event(&self, tx_hash: Option<TxHash>) -> LedgerResult<()> {
        let Some(tx_hash) = tx_hash else {
            tracing::warn!("Error mark without transaction hash, nothing to update");
            return Ok(());
        };

        let known = match self.inner.entry(tx_hash) {
            Entry::Occupied(mut record) => {
                record.get_mut().status = EventStatus::Error;
                true
            }
            Entry::Vacant(_) => {
                self.hold_early_error(tx_hash);
                false
            }
        };

        if !known {
            tracing::warn!(tx_hash = %tx_hash, "Error mark for unknown transaction, holding until enqueued");
            return Ok(());
        }

        tracing::info!(tx_hash = %tx_hash, "Marked transaction as errored");
        self.persist().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{OtplStatus, WithdrawEventData};
    use alloy::primitives::{Address, B256, U256};

    fn event(byte: u8, date: u64) -> TransactionEvent {
        let mut event = TransactionEvent::withdraw(
            TxHash::repeat_byte(byte),
            WithdrawEventData {
                from: Address::repeat_byte(0xaa),
                amount: U256::from(100),
                code: format!("code-{}", byte),
                hashed_code: B256::repeat_byte(byte),
                reason: String::new(),
                category: String::new(),
                otpl_status: OtplStatus::Completed,
            },
        );
        event.date = date;
        event
    }

    #[tokio::test]
    async fn test_enqueue_and_mark() {
        let ledger = FileLedger::in_memory();
        let hash = TxHash::repeat_byte(1);

        ledger.enqueue(event(1, 10)).await.unwrap();
        assert_eq!(ledger.get(&hash).unwrap().status, EventStatus::Pending);

        ledger.mark_with_error_event(Some(hash)).await.unwrap();
        assert!(ledger.get(&hash).unwrap().is_errored());
        assert_eq!(ledger.summary(), (0, 1));
    }

    #[tokio::test]
    async fn test_mark_before_enqueue_is_applied() {
        let ledger = FileLedger::in_memory();
        let hash = TxHash::repeat_byte(2);

        ledger.mark_with_error_event(Some(hash)).await.unwrap();
        assert!(ledger.is_empty());

        ledger.enqueue(event(2, 10)).await.unwrap();
        assert!(ledger.get(&hash).unwrap().is_errored());
    }

    #[tokio::test]
    async fn test_mark_without_hash_is_noop() {
        let ledger = FileLedger::in_memory();
        ledger.enqueue(event(3, 10)).await.unwrap();
        ledger.mark_with_error_event(None).await.unwrap();
        assert_eq!(ledger.summary(), (1, 0));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let ledger = FileLedger::in_memory();
        ledger.enqueue(event(1, 10)).await.unwrap();
        ledger.enqueue(event(2, 30)).await.unwrap();
        ledger.enqueue(event(3, 20)).await.unwrap();

        let dates: Vec<_> = ledger.list().iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![30, 20, 10]);
        assert_eq!(ledger.len(), 3);
    }

    #[tokio::test]
    async fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let ledger = FileLedger::load_from_file(&path).unwrap();
        assert!(ledger.is_empty());
        ledger.enqueue(event(4, 10)).await.unwrap();
        ledger
            .mark_with_error_event(Some(TxHash::repeat_byte(4)))
            .await
            .unwrap();

        let loaded = FileLedger::load_from_file(&path).unwrap();
        let record = loaded.get(&TxHash::repeat_byte(4)).unwrap();
        assert!(record.is_errored());
        assert_eq!(record.data.code, "code-4");
    }

    #[tokio::test]
    async fn test_held_marks_are_bounded() {
        let ledger = FileLedger::in_memory().with_early_error_limits(EARLY_ERROR_TTL, 2);

        // Broadcast failures that are never enqueued.
        for byte in 1..=3 {
            ledger.mark_with_error_event(Some(TxHash::repeat_byte(byte))).await.unwrap();
        }
        assert_eq!(ledger.early_errors.len(), 2);

        ledger.enqueue(event(1, 10)).await.unwrap();
        ledger.enqueue(event(3, 10)).await.unwrap();
        assert_eq!(ledger.get(&TxHash::repeat_byte(1)).unwrap().status, EventStatus::Pending);
        assert!(ledger.get(&TxHash::repeat_byte(3)).unwrap().is_errored());
    }

    #[tokio::test]
    async fn test_held_marks_expire() {
        let ledger = FileLedger::in_memory().with_early_error_limits(Duration::from_millis(1), 16);

        ledger.mark_with_error_event(Some(TxHash::repeat_byte(5))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        ledger.mark_with_error_event(Some(TxHash::repeat_byte(6))).await.unwrap();
        assert_eq!(ledger.early_errors.len(), 1);

        ledger.enqueue(event(5, 10)).await.unwrap();
        assert_eq!(ledger.get(&TxHash::repeat_byte(5)).unwrap().status, EventStatus::Pending);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enqueue_and_mark_never_lose_the_mark() {
        let ledger = FileLedger::in_memory();
        let mut tasks = Vec::new();

        for byte in 1..=64u8 {
            let l = ledger.clone();
            tasks.push(tokio::spawn(async move { l.enqueue(event(byte, 10)).await }));
            let l = ledger.clone();
            tasks.push(tokio::spawn(async move {
                l.mark_with_error_event(Some(TxHash::repeat_byte(byte))).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(ledger.summary(), (0, 64));
        assert!(ledger.early_errors.is_empty());
    }

    #[test]
    fn test_load_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, b"{ not json").unwrap();
        assert!(FileLedger::load_from_file(&path).is_err());
    }
}
