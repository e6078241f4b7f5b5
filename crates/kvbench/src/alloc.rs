//! Allocation counting.
//!
//! Install [`CountingAllocator`] as the global allocator in a binary to get
//! allocation figures in run results:
//!
//! ```ignore
//! #[global_allocator]
//! static GLOBAL: kvbench::alloc::CountingAllocator<mimalloc::MiMalloc> =
//!     kvbench::alloc::CountingAllocator::new(mimalloc::MiMalloc);
//! ```

use std::alloc::{GlobalAlloc, Layout};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters read by [`snapshot`].
static GLOBAL_COUNTERS: Counters = Counters::new();

/// A pair of allocation counters.
pub struct Counters {
    allocations: AtomicU64,
    bytes: AtomicU64,
}

impl Counters {
    pub const fn new() -> Self {
        Self {
            allocations: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    fn record(&self, size: usize) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size as u64, Ordering::Relaxed);
    }

    /// Current values, or `None` when nothing has been counted.
    pub fn snapshot(&self) -> Option<AllocStats> {
        let allocations = self.allocations.load(Ordering::Relaxed);
        if allocations == 0 {
            return None;
        }
        Some(AllocStats {
            allocations,
            bytes: self.bytes.load(Ordering::Relaxed),
        })
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}

/// Global allocator wrapper that counts allocations and bytes.
pub struct CountingAllocator<A> {
    inner: A,
    /// `None` counts into the process-wide counters.
    counters: Option<&'static Counters>,
}

impl<A> CountingAllocator<A> {
    /// Wrap `inner`, counting into the process-wide counters.
    pub const fn new(inner: A) -> Self {
        Self {
            inner,
            counters: None,
        }
    }

    /// Wrap `inner`, counting into `counters`.
    pub const fn with_counters(inner: A, counters: &'static Counters) -> Self {
        Self {
            inner,
            counters: Some(counters),
        }
    }

    fn counters(&self) -> &'static Counters {
        self.counters.unwrap_or(&GLOBAL_COUNTERS)
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for CountingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.counters().record(layout.size());
        self.inner.alloc(layout)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.counters().record(layout.size());
        self.inner.alloc_zeroed(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.counters().record(new_size);
        self.inner.realloc(ptr, layout, new_size)
    }
}

/// Allocation counters at a point in time, or a difference of two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    pub allocations: u64,
    pub bytes: u64,
}

impl AllocStats {
    /// Counters accumulated since `earlier`.
    pub fn since(&self, earlier: &AllocStats) -> AllocStats {
        AllocStats {
            allocations: self.allocations.saturating_sub(earlier.allocations),
            bytes: self.bytes.saturating_sub(earlier.bytes),
        }
    }

    /// Average allocations per operation, 0 when `ops` is 0.
    pub fn per_op(&self, ops: u64) -> f64 {
        if ops == 0 {
            return 0.0;
        }
        self.allocations as f64 / ops as f64
    }
}

/// Current process-wide counters, or `None` when no counting allocator is
/// installed.
///
/// Any running process has allocated by the time this is called, so zero
/// recorded allocations means nothing is counting.
pub fn snapshot() -> Option<AllocStats> {
    GLOBAL_COUNTERS.snapshot()
}
