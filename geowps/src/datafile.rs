//! Bounded in-memory store of generated result files.
//!
//! Processes that produce file outputs put the payload here and hand the
//! client a URL containing the file's id. The store keeps only the most
//! recent entries: once [`DataFileCache::capacity`] is exceeded the oldest
//! file is dropped, regardless of how often it was read.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

/// Number of result files kept by default.
pub const DEFAULT_CAPACITY: usize = 20;

/// A generated result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    /// Unique identifier used in the retrieval URL.
    pub id: Uuid,
    /// File contents.
    pub payload: Vec<u8>,
    /// Media type served with the payload.
    pub media_type: String,
}

impl DataFile {
    /// Create a data file with a freshly generated id.
    pub fn new(payload: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: payload.into(),
            media_type: media_type.into(),
        }
    }
}

/// FIFO ring of recent [`DataFile`]s.
///
/// All access goes through a mutex, so concurrent requests cannot interleave
/// an insertion with an eviction and iteration always follows insertion order.
#[derive(Debug)]
pub struct DataFileCache {
    files: Mutex<VecDeque<Arc<DataFile>>>,
    capacity: usize,
}

impl DataFileCache {
    /// Create a cache holding at most `capacity` files.
    ///
    /// A capacity of zero is bumped to one so a freshly stored file can
    /// always be fetched at least once.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            files: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a file, evicting the oldest one if the cache is full.
    ///
    /// Returns the stored entry.
    pub fn put(&self, file: DataFile) -> Arc<DataFile> {
        let file = Arc::new(file);
        let mut files = self.lock();
        files.push_back(Arc::clone(&file));
        while files.len() > self.capacity {
            if let Some(evicted) = files.pop_front() {
                tracing::debug!(id = %evicted.id, "Evicted data file");
            }
        }
        file
    }

    /// Find a file by id.
    pub fn find(&self, id: &Uuid) -> Option<Arc<DataFile>> {
        self.lock().iter().find(|file| file.id == *id).cloned()
    }

    /// Ids of the stored files, oldest first.
    pub fn ids(&self) -> Vec<Uuid> {
        self.lock().iter().map(|file| file.id).collect()
    }

    /// Number of files currently stored.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no files.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of files kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Arc<DataFile>>> {
        // The deque is never left half-updated, so a poisoned lock is still usable.
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for DataFileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
