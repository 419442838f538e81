use std::collections::VecDeque;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};

use crate::blockchain::AccountId;

use super::models::{NewTransferRecord, StoreEvent, TransferRecord};

const EVENT_BUFFER: usize = 64;

struct Inner {
    records: VecDeque<TransferRecord>,
    next_id: u64,
}

/// Shared in-memory history of submissions.
///
/// Injected by reference into every screen that shows transactions.
/// `record` is the only mutator and is called by the submission service;
/// every other component reads or subscribes.
pub struct TransactionStore {
    inner: RwLock<Inner>,
    capacity: usize,
    events: broadcast::Sender<StoreEvent>,
}

impl TransactionStore {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            inner: RwLock::new(Inner {
                records: VecDeque::new(),
                next_id: 1,
            }),
            capacity: capacity.max(1),
            events,
        }
    }

    pub async fn record(&self, new: NewTransferRecord) -> TransferRecord {
        let mut inner = self.inner.write().await;

        let record = TransferRecord {
            id: inner.next_id,
            account: new.account,
            kind: new.kind,
            status: new.status,
            txids: new.txids,
            statuses: new.statuses,
            fee_zatoshis: new.fee_zatoshis,
            error_code: new.error_code,
            error_message: new.error_message,
            created_at: Utc::now(),
        };
        inner.next_id += 1;
        inner.records.push_back(record.clone());

        let mut evicted = Vec::new();
        while inner.records.len() > self.capacity {
            if let Some(old) = inner.records.pop_front() {
                evicted.push(old.id);
            }
        }
        drop(inner);

        // A send error only means nobody is subscribed
        for id in evicted {
            let _ = self.events.send(StoreEvent::Evicted { id });
        }
        let _ = self.events.send(StoreEvent::Recorded(record.clone()));

        tracing::debug!(
            "Recorded submission {} for account {} ({:?})",
            record.id,
            record.account,
            record.status
        );
        record
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub async fn get(&self, id: u64) -> Option<TransferRecord> {
        self.inner
            .read()
            .await
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub async fn find_by_txid(&self, txid: &str) -> Option<TransferRecord> {
        self.inner
            .read()
            .await
            .records
            .iter()
            .rev()
            .find(|r| r.txids.iter().any(|t| t == txid))
            .cloned()
    }

    /// Newest first
    pub async fn list_by_account(
        &self,
        account: AccountId,
        limit: usize,
        offset: usize,
    ) -> Vec<TransferRecord> {
        self.inner
            .read()
            .await
            .records
            .iter()
            .rev()
            .filter(|r| r.account == account)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn latest(&self, account: AccountId) -> Option<TransferRecord> {
        self.list_by_account(account, 1, 0).await.into_iter().next()
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.records.len()
    }
}
