//! Durable key-value store module
//!
//! Trackers never talk to a concrete storage backend. They receive a
//! `DurableStore` handle, which is synchronous and string-valued, and which
//! outlives any single tracker instance.

pub mod error;
pub mod file;
pub mod memory;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Synchronous string key-value store that survives tracker teardown
pub trait DurableStore: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove `key` from the store. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// List every key currently held by the store
    fn keys(&self) -> StoreResult<Vec<String>>;

    /// Human readable description used in status output
    fn describe(&self) -> String;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Store doubles shared by the tracker, task and state tests

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::{DurableStore, MemoryStore, StoreError, StoreResult};

    /// Memory store that counts writes and can be told to fail
    #[derive(Default)]
    pub struct RecordingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
        failing: AtomicBool,
    }

    impl RecordingStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> StoreResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "quota exceeded",
                )))
            } else {
                Ok(())
            }
        }
    }

    impl DurableStore for RecordingStore {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.check()?;
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StoreResult<()> {
            self.check()?;
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> StoreResult<()> {
            self.check()?;
            self.inner.remove(key)
        }

        fn keys(&self) -> StoreResult<Vec<String>> {
            self.check()?;
            self.inner.keys()
        }

        fn describe(&self) -> String {
            "recording".to_string()
        }
    }
}
