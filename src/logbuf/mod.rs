use serde::Serialize;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::Mutex;

/// Append-only observation of a completed request. Produced exactly once per
/// request at pipeline completion.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp_ms: u64,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub api_key: String,
    pub target_url: String,
    pub ip: IpAddr,
    pub message: String,
}

/// Bounded ring of `LogRecord`, holding at most `capacity` of the most recent
/// entries. A single `std::sync::Mutex` guards the whole ring — appends and
/// snapshots are short, non-suspending operations so there is no benefit to
/// finer-grained locking here, unlike the per-key rate limiter.
pub struct LogBuffer {
    capacity: usize,
    records: Mutex<VecDeque<LogRecord>>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Insert at the head, evicting the oldest entry once `capacity` is exceeded.
    pub fn append(&self, record: LogRecord) {
        let mut records = self.records.lock().expect("log buffer mutex poisoned");
        records.push_front(record);
        while records.len() > self.capacity {
            records.pop_back();
        }
    }

    /// Snapshot in newest-first order, matching append order.
    pub fn snapshot(&self) -> Vec<LogRecord> {
        let records = self.records.lock().expect("log buffer mutex poisoned");
        records.iter().cloned().collect()
    }

    pub fn clear(&self) {
        let mut records = self.records.lock().expect("log buffer mutex poisoned");
        records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp_ms: u64) -> LogRecord {
        LogRecord {
            timestamp_ms,
            method: "GET".to_string(),
            path: "/x".to_string(),
            status_code: 200,
            api_key: "k1".to_string(),
            target_url: "https://u.example".to_string(),
            ip: "127.0.0.1".parse().unwrap(),
            message: "ok".to_string(),
        }
    }

    #[test]
    fn snapshot_is_newest_first() {
        let buf = LogBuffer::new(10);
        buf.append(record(1));
        buf.append(record(2));
        buf.append(record(3));

        let snap = buf.snapshot();
        let timestamps: Vec<u64> = snap.iter().map(|r| r.timestamp_ms).collect();
        assert_eq!(timestamps, vec![3, 2, 1]);
    }

    #[test]
    fn ring_evicts_oldest_beyond_capacity() {
        let buf = LogBuffer::new(3);
        for t in 1..=5 {
            buf.append(record(t));
        }
        let snap = buf.snapshot();
        assert_eq!(snap.len(), 3);
        let timestamps: Vec<u64> = snap.iter().map(|r| r.timestamp_ms).collect();
        assert_eq!(timestamps, vec![5, 4, 3]);
    }

    #[test]
    fn clear_empties_buffer() {
        let buf = LogBuffer::new(10);
        buf.append(record(1));
        buf.clear();
        assert!(buf.snapshot().is_empty());
    }
}
