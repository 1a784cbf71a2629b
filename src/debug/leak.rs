//! Deliberate memory retention for operational testing.

use std::collections::TryReserveError;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::http::response::ApiError;

pub const BYTES_PER_MB: usize = 1024 * 1024;

/// Non-zero so the allocator cannot hand back lazily-mapped zero pages.
const FILL_BYTE: u8 = 0xA5;

/// Snapshot of what the bucket currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeakStats {
    pub chunks: usize,
    pub total_bytes: usize,
}

/// Validated `mb` / `count` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakRequest {
    pub mb: usize,
    pub count: usize,
}

impl LeakRequest {
    /// Parse raw parameter values. Missing or empty values default to 1.
    pub fn parse(mb: Option<&str>, count: Option<&str>) -> Result<Self, ApiError> {
        let mb = parse_int("mb", mb)?;
        let count = parse_int("count", count)?;
        if mb <= 0 || count <= 0 {
            return Err(ApiError::InvalidParameters(
                "mb and count must be positive integers".into(),
            ));
        }

        let request = Self {
            mb: usize::try_from(mb).map_err(|_| too_large())?,
            count: usize::try_from(count).map_err(|_| too_large())?,
        };
        request
            .bytes_per_chunk()
            .and_then(|per| per.checked_mul(request.count))
            .ok_or_else(too_large)?;
        Ok(request)
    }

    pub fn bytes_per_chunk(&self) -> Option<usize> {
        self.mb.checked_mul(BYTES_PER_MB)
    }
}

fn parse_int(name: &str, raw: Option<&str>) -> Result<i64, ApiError> {
    let raw = raw.filter(|s| !s.is_empty()).unwrap_or("1");
    raw.trim().parse::<i64>().map_err(|_| {
        ApiError::InvalidParameters(format!("invalid integer for {name}: '{raw}'"))
    })
}

fn too_large() -> ApiError {
    ApiError::InvalidParameters("requested allocation is too large".into())
}

/// Buffers retained until [`LeakBucket::clear`].
#[derive(Default)]
pub struct LeakBucket {
    chunks: Mutex<Vec<Box<[u8]>>>,
}

impl fmt::Debug for LeakBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeakBucket").field("stats", &self.stats()).finish()
    }
}

impl LeakBucket {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Box<[u8]>>> {
        // A panic mid-push cannot leave the Vec inconsistent.
        self.chunks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stats_of(chunks: &[Box<[u8]>]) -> LeakStats {
        LeakStats {
            chunks: chunks.len(),
            total_bytes: chunks.iter().map(|c| c.len()).sum(),
        }
    }

    /// Allocate `count` buffers of `mb` MiB each and keep them.
    ///
    /// Allocation failure leaves the bucket untouched.
    pub fn leak(&self, request: LeakRequest) -> Result<LeakStats, TryReserveError> {
        let bytes = request.bytes_per_chunk().unwrap_or(usize::MAX);
        let mut fresh: Vec<Box<[u8]>> = Vec::new();
        fresh.try_reserve_exact(request.count)?;
        for _ in 0..request.count {
            let mut chunk = Vec::new();
            chunk.try_reserve_exact(bytes)?;
            chunk.resize(bytes, FILL_BYTE);
            fresh.push(chunk.into_boxed_slice());
        }

        let mut chunks = self.lock();
        chunks.extend(fresh);
        Ok(Self::stats_of(&chunks))
    }

    pub fn stats(&self) -> LeakStats {
        Self::stats_of(&self.lock())
    }

    /// Drop every retained buffer and return the backing storage.
    pub fn clear(&self) -> LeakStats {
        let released = std::mem::take(&mut *self.lock());
        drop(released);
        self.stats()
    }
}
