//! AdmissionThrottle - 同時に走るエンコードタスク数の上限
//!
//! # 実装詳細
//! - `watch` チャネルに in_use カウンタを持たせる
//! - 判定と加算は `send_if_modified` の中で行うので競合しない
//! - 待機側は `wait_for` で「空きがありそう」になるまで眠り、起きたら再判定する
//!
//! 1 つの acquire に対して release はちょうど 1 回。`AdmissionPermit` は
//! move-only で、`release()` でも drop でも解放される。

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug)]
pub struct AdmissionThrottle {
    capacity: usize,
    in_use: watch::Sender<usize>,
}

impl AdmissionThrottle {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Arc<Self> {
        let (in_use, _) = watch::channel(0);
        Arc::new(Self {
            capacity: capacity.max(1),
            in_use,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        *self.in_use.borrow()
    }

    /// Suspend until a slot is free, then take it.
    pub async fn acquire(self: &Arc<Self>) -> AdmissionPermit {
        let mut rx = self.in_use.subscribe();
        loop {
            if let Some(permit) = self.try_acquire() {
                return permit;
            }
            // sender は self が持っているので閉じることはない
            let _ = rx.wait_for(|n| *n < self.capacity).await;
        }
    }

    pub fn try_acquire(self: &Arc<Self>) -> Option<AdmissionPermit> {
        let capacity = self.capacity;
        let granted = self.in_use.send_if_modified(|n| {
            if *n < capacity {
                *n += 1;
                true
            } else {
                false
            }
        });
        granted.then(|| AdmissionPermit {
            throttle: Arc::clone(self),
        })
    }

    /// Suspend until nothing is in flight.
    pub async fn drain(&self) {
        let mut rx = self.in_use.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    fn release(&self) {
        self.in_use.send_if_modified(|n| {
            debug_assert!(*n > 0, "release without a grant");
            if *n > 0 {
                *n -= 1;
                true
            } else {
                false
            }
        });
    }
}

/// One granted admission slot.
#[must_use = "dropping a permit releases its slot immediately"]
#[derive(Debug)]
pub struct AdmissionPermit {
    throttle: Arc<AdmissionThrottle>,
}

impl AdmissionPermit {
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.throttle.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn acquire_up_to_capacity_without_waiting() {
        let throttle = AdmissionThrottle::new(2);
        let a = throttle.acquire().await;
        let b = throttle.acquire().await;
        assert_eq!(throttle.in_use(), 2);
        assert!(throttle.try_acquire().is_none());
        a.release();
        b.release();
        assert_eq!(throttle.in_use(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn one_extra_acquire_stays_suspended_until_release() {
        let capacity = 3;
        let throttle = AdmissionThrottle::new(capacity);

        let mut handles = Vec::new();
        for _ in 0..=capacity {
            let t = Arc::clone(&throttle);
            handles.push(tokio::spawn(async move { t.acquire().await }));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut granted = Vec::new();
        let mut waiting = Vec::new();
        for h in handles {
            if h.is_finished() {
                granted.push(h.await.unwrap());
            } else {
                waiting.push(h);
            }
        }
        assert_eq!(granted.len(), capacity);
        assert_eq!(waiting.len(), 1);
        assert_eq!(throttle.in_use(), capacity);

        granted.pop().unwrap().release();
        let last = timeout(Duration::from_secs(1), waiting.pop().unwrap())
            .await
            .expect("waiter should be woken")
            .unwrap();
        assert_eq!(throttle.in_use(), capacity);
        drop(last);
        drop(granted);
        assert_eq!(throttle.in_use(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_returns_only_when_idle() {
        let throttle = AdmissionThrottle::new(2);
        let a = throttle.acquire().await;
        let b = throttle.acquire().await;

        let t = Arc::clone(&throttle);
        let drain = tokio::spawn(async move { t.drain().await });

        a.release();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!drain.is_finished());

        b.release();
        timeout(Duration::from_secs(1), drain)
            .await
            .expect("drain should finish")
            .unwrap();
        assert_eq!(throttle.in_use(), 0);
    }

    #[tokio::test]
    async fn drain_on_idle_throttle_is_immediate() {
        let throttle = AdmissionThrottle::new(1);
        timeout(Duration::from_millis(100), throttle.drain())
            .await
            .unwrap();
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(AdmissionThrottle::new(0).capacity(), 1);
    }
}
