//! Mock object store
//!
//! Fails a fixed number of times before succeeding, and remembers every
//! request it saw.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use contracts::{ObjectMetadata, ObjectStore, UploadError};

#[derive(Debug, Default)]
pub struct FlakyStore {
    failures_left: AtomicU32,
    attempts: AtomicU32,
    stored: Mutex<Vec<ObjectMetadata>>,
}

impl FlakyStore {
    /// Store failing the first `failures` requests
    pub fn new(failures: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(failures),
            ..Self::default()
        }
    }

    /// Store that never accepts anything
    pub fn always_failing() -> Self {
        Self::new(u32::MAX)
    }

    /// Requests seen so far, failed or not
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Metadata of the accepted objects
    pub fn stored(&self) -> Vec<ObjectMetadata> {
        self.stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ObjectStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn create_object(
        &self,
        metadata: &ObjectMetadata,
        path: &Path,
    ) -> Result<String, UploadError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(UploadError::request(&metadata.name, "simulated outage"));
        }

        if !tokio::fs::try_exists(path).await? {
            return Err(UploadError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )));
        }

        let mut stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
        stored.push(metadata.clone());
        Ok(format!("mock-{attempt}"))
    }
}
