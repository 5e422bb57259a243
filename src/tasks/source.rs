//! Serialized access to a shared stream of task records.
//!
//! Any number of readers may call [`TaskSource::next_batch`] concurrently.
//! The read-and-decode step runs under a mutex, so each record is handed to
//! exactly one caller and records inside a batch keep stream order.
//!
//! Decode policy:
//! - A JSON value that is not a valid task record is logged and skipped
//! - A syntax error leaves the stream unrecoverable; it is logged and the
//!   source reports end-of-stream from then on

use crate::core::error::TaskError;
use crate::tasks::record::TaskRecord;
use parking_lot::Mutex;
use serde_json::de::IoRead;
use serde_json::{Deserializer, StreamDeserializer, Value};
use std::io::Read;

/// Batches never reserve more slots up front than this.
const BATCH_PREALLOC_LIMIT: usize = 64;

/// Decoder state guarded by the source's mutex.
struct SourceState<R: Read> {
    stream: StreamDeserializer<'static, IoRead<R>, Value>,
    exhausted: bool,
    values_read: usize,
    delivered: usize,
    skipped: usize,
    failure: Option<TaskError>,
}

impl<R: Read> SourceState<R> {
    fn next_record(&mut self) -> Option<TaskRecord> {
        while !self.exhausted {
            match self.stream.next() {
                None => {
                    self.exhausted = true;
                }
                Some(Err(error)) => {
                    let error = TaskError::Stream(error.to_string());
                    log::error!("{}; no further tasks will be read", error);
                    self.failure = Some(error);
                    self.exhausted = true;
                }
                Some(Ok(value)) => {
                    let index = self.values_read;
                    self.values_read += 1;
                    match TaskRecord::from_value(value) {
                        Ok(record) => {
                            self.delivered += 1;
                            return Some(record);
                        }
                        Err(error) => {
                            let error = TaskError::Malformed {
                                index,
                                reason: error.to_string(),
                            };
                            log::warn!("{}; skipping", error);
                            self.skipped += 1;
                        }
                    }
                }
            }
        }
        None
    }
}

/// A task stream shared by every reader agent.
pub struct TaskSource<R: Read> {
    state: Mutex<SourceState<R>>,
}

impl<R: Read> TaskSource<R> {
    /// Wrap a reader producing concatenated JSON task records.
    pub fn new(reader: R) -> Self {
        Self {
            state: Mutex::new(SourceState {
                stream: Deserializer::from_reader(reader).into_iter::<Value>(),
                exhausted: false,
                values_read: 0,
                delivered: 0,
                skipped: 0,
                failure: None,
            }),
        }
    }

    /// Take up to `max_count` records.
    ///
    /// The batch is shorter than `max_count` only when the stream ends while
    /// filling it; an empty batch means the stream is exhausted.
    pub fn next_batch(&self, max_count: usize) -> Vec<TaskRecord> {
        let mut state = self.state.lock();
        let mut batch = Vec::with_capacity(max_count.min(BATCH_PREALLOC_LIMIT));
        while batch.len() < max_count {
            match state.next_record() {
                Some(record) => batch.push(record),
                None => break,
            }
        }
        batch
    }

    /// Take the next record, if any.
    pub fn next_task(&self) -> Option<TaskRecord> {
        self.state.lock().next_record()
    }

    /// Drain every remaining record.
    pub fn read_all(&self) -> Vec<TaskRecord> {
        let mut state = self.state.lock();
        std::iter::from_fn(|| state.next_record()).collect()
    }

    /// Whether the stream has ended.
    pub fn is_exhausted(&self) -> bool {
        self.state.lock().exhausted
    }

    /// Records handed out so far.
    pub fn records_read(&self) -> usize {
        self.state.lock().delivered
    }

    /// Malformed records skipped so far.
    pub fn records_skipped(&self) -> usize {
        self.state.lock().skipped
    }

    /// The syntax error that ended the stream early, if one did.
    pub fn stream_failure(&self) -> Option<TaskError> {
        self.state.lock().failure.clone()
    }
}

impl<'a> TaskSource<&'a [u8]> {
    /// Read records from an in-memory buffer.
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn stream(count: usize) -> String {
        (0..count)
            .map(|i| format!(r#"{{"inPath":"in/{i}.png","outPath":"out/{i}.png","effects":["G"]}}"#))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_batches_preserve_order() {
        let text = stream(5);
        let source = TaskSource::from_slice(text.as_bytes());

        let first = source.next_batch(2);
        let second = source.next_batch(2);
        let third = source.next_batch(2);
        let fourth = source.next_batch(2);

        assert_eq!(first.len(), 2);
        assert_eq!(first[0].source_path.to_str(), Some("in/0.png"));
        assert_eq!(first[1].source_path.to_str(), Some("in/1.png"));
        assert_eq!(second[0].source_path.to_str(), Some("in/2.png"));
        assert_eq!(third.len(), 1);
        assert!(fourth.is_empty());
        assert!(source.is_exhausted());
        assert_eq!(source.records_read(), 5);
    }

    #[test]
    fn test_oversized_batch_request() {
        let text = stream(1);
        let source = TaskSource::from_slice(text.as_bytes());
        let batch = source.next_batch(usize::MAX);
        assert_eq!(batch.len(), 1);
        assert!(source.next_batch(usize::MAX).is_empty());
    }

    #[test]
    fn test_empty_stream() {
        let source = TaskSource::from_slice(b"   \n");
        assert!(source.next_batch(3).is_empty());
        assert!(source.stream_failure().is_none());
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let text = r#"
            {"inPath":"a.png","outPath":"a-out.png","effects":["S"]}
            {"outPath":"nowhere.png"}
            [1, 2, 3]
            {"inPath":"b.png","outPath":"b-out.png","effects":["B"]}
        "#;
        let source = TaskSource::from_slice(text.as_bytes());
        let batch = source.next_batch(2);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].source_path.to_str(), Some("b.png"));
        assert_eq!(source.records_skipped(), 2);
        assert!(source.next_batch(2).is_empty());
    }

    #[test]
    fn test_syntax_error_ends_stream() {
        let text = r#"{"inPath":"a.png","outPath":"b.png"} {"inPath": oops} {"inPath":"c.png","outPath":"d.png"}"#;
        let source = TaskSource::from_slice(text.as_bytes());

        assert_eq!(source.next_batch(5).len(), 1);
        assert!(matches!(source.stream_failure(), Some(TaskError::Stream(_))));
        assert!(source.next_batch(5).is_empty());
    }

    #[test]
    fn test_read_all_and_next_task() {
        let text = stream(3);
        let source = TaskSource::from_slice(text.as_bytes());
        assert_eq!(source.next_task().unwrap().source_path.to_str(), Some("in/0.png"));
        assert_eq!(source.read_all().len(), 2);
        assert!(source.next_task().is_none());
    }

    #[test]
    fn test_concurrent_readers_never_duplicate() {
        let text = stream(200);
        let source = Arc::new(TaskSource::new(std::io::Cursor::new(text.into_bytes())));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let source = Arc::clone(&source);
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    loop {
                        let batch = source.next_batch(3);
                        if batch.is_empty() {
                            break;
                        }
                        seen.extend(batch.into_iter().map(|t| t.source_path));
                    }
                    seen
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), 200);
        assert_eq!(unique.len(), 200);
    }
}
