//! 接続数リミッター
//!
//! 全体の同時接続数と接続先ごとの同時接続数を上限で抑える。
//! HTTPリクエストは送信からボディ読み取りまで両方の許可を保持する。
//! 接続先ごとのセマフォは使われなくなった時点でマップから取り除く。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{CensusError, CensusResult};

/// 接続数リミッター
#[derive(Clone, Debug)]
pub struct ConnectionLimiter {
    /// 全体の上限
    total: Arc<Semaphore>,
    /// 接続先（`address:port`）ごとのセマフォ
    per_host: HostMap,
    /// 接続先ごとの上限
    per_host_limit: usize,
}

type HostMap = Arc<Mutex<HashMap<String, Arc<Semaphore>>>>;

/// 接続許可（ドロップで返却）
#[derive(Debug)]
pub struct ConnectionPermit {
    host: Option<OwnedSemaphorePermit>,
    _total: OwnedSemaphorePermit,
    destination: String,
    per_host: HostMap,
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        drop(self.host.take());
        let mut map = lock_hosts(&self.per_host);
        // マップ以外に参照がなければ待機中の取得もない
        if map
            .get(&self.destination)
            .is_some_and(|sem| Arc::strong_count(sem) == 1)
        {
            map.remove(&self.destination);
        }
    }
}

fn lock_hosts(per_host: &HostMap) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Semaphore>>> {
    per_host
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ConnectionLimiter {
    /// 上限を指定して作成
    pub fn new(max_connections: usize, max_connections_per_host: usize) -> Self {
        Self {
            total: Arc::new(Semaphore::new(max_connections)),
            per_host: Arc::new(Mutex::new(HashMap::new())),
            per_host_limit: max_connections_per_host,
        }
    }

    /// 接続許可を取得する
    ///
    /// 接続先の許可を先に取得し、全体の許可は接続直前まで確保しない。
    pub async fn acquire(&self, destination: &str) -> CensusResult<ConnectionPermit> {
        let host = self.host_semaphore(destination);
        let host_permit = host
            .acquire_owned()
            .await
            .map_err(|_| CensusError::LimiterClosed)?;
        let total_permit = Arc::clone(&self.total)
            .acquire_owned()
            .await
            .map_err(|_| CensusError::LimiterClosed)?;

        Ok(ConnectionPermit {
            host: Some(host_permit),
            _total: total_permit,
            destination: destination.to_string(),
            per_host: Arc::clone(&self.per_host),
        })
    }

    /// 現在空いている全体の許可数
    pub fn available(&self) -> usize {
        self.total.available_permits()
    }

    /// 接続先ごとのセマフォを保持している数
    pub fn tracked_hosts(&self) -> usize {
        lock_hosts(&self.per_host).len()
    }

    fn host_semaphore(&self, destination: &str) -> Arc<Semaphore> {
        let mut map = lock_hosts(&self.per_host);
        // 取得が途中で中断された接続先を掃除する
        map.retain(|_, sem| Arc::strong_count(sem) > 1);
        Arc::clone(
            map.entry(destination.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.per_host_limit))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_permits_are_returned_on_drop() {
        let limiter = ConnectionLimiter::new(2, 2);
        let permit = limiter.acquire("a:1").await.unwrap();
        assert_eq!(limiter.available(), 1);
        drop(permit);
        assert_eq!(limiter.available(), 2);
    }

    #[tokio::test]
    async fn test_idle_hosts_are_pruned() {
        let limiter = ConnectionLimiter::new(10, 2);
        for i in 0..50 {
            let permit = limiter.acquire(&format!("10.0.0.{}:11434", i)).await.unwrap();
            assert_eq!(limiter.tracked_hosts(), 1);
            drop(permit);
        }
        assert_eq!(limiter.tracked_hosts(), 0);
    }

    #[tokio::test]
    async fn test_host_entry_kept_while_in_use() {
        let limiter = ConnectionLimiter::new(10, 2);
        let first = limiter.acquire("10.0.0.1:11434").await.unwrap();
        let second = limiter.acquire("10.0.0.1:11434").await.unwrap();
        assert_eq!(limiter.tracked_hosts(), 1);

        drop(first);
        assert_eq!(limiter.tracked_hosts(), 1);
        drop(second);
        assert_eq!(limiter.tracked_hosts(), 0);
        assert_eq!(limiter.available(), 10);
    }

    #[tokio::test]
    async fn test_per_host_limit_is_enforced() {
        let limiter = ConnectionLimiter::new(100, 2);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _permit = limiter.acquire("10.0.0.1:11434").await.unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_total_limit_spans_hosts() {
        let limiter = ConnectionLimiter::new(3, 10);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..12 {
            let limiter = limiter.clone();
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _permit = limiter.acquire(&format!("10.0.0.{}:80", i)).await.unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(limiter.available(), 3);
        assert_eq!(limiter.tracked_hosts(), 0);
    }
}
