//! Engine-agnostic metrics collection for the streaming octree.
//!
//! Feature-gated and runtime-toggled to ensure zero overhead when disabled.
//!
//! # Usage
//!
//! ```ignore
//! use octree_stream::metrics::{StreamMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! // OctreeIndex records loads and node counts each frame:
//! let metrics = index.metrics();
//! println!("avg decode {:.1}us", metrics.avg_decode_us());
//! ```

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;

use crate::pipeline::LoadStats;

/// Runtime toggle for metrics collection.
/// Set to false to disable metrics gathering at runtime.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Last `capacity` samples with a running total, so averages are O(1).
///
/// Samples are per load, not per frame: a burst of loads pushes many at once.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<u64>,
    capacity: usize,
    total: u64,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            total: 0,
        }
    }

    pub fn push(&mut self, sample: u64) {
        if self.samples.len() == self.capacity {
            if let Some(evicted) = self.samples.pop_front() {
                self.total -= evicted;
            }
        }
        self.samples.push_back(sample);
        self.total += sample;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.total = 0;
    }

    /// Sum of the samples currently in the window.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn average(&self) -> f64 {
        match self.samples.len() {
            0 => 0.0,
            n => self.total as f64 / n as f64,
        }
    }

    pub fn latest(&self) -> Option<u64> {
        self.samples.back().copied()
    }

    pub fn peak(&self) -> Option<u64> {
        self.samples.iter().copied().max()
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Node counts per lifecycle state, taken during one traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeCounts {
    pub collapsed: u32,
    pub requested: u32,
    pub downloading: u32,
    pub ready: u32,
}

impl NodeCounts {
    pub fn total(&self) -> u32 {
        self.collapsed + self.requested + self.downloading + self.ready
    }
}

/// Streaming statistics updated by the octree index.
#[derive(Debug, Clone, Default)]
pub struct StreamMetrics {
    /// Rolling window of decode + build times in microseconds.
    pub decode_timings: SampleWindow,
    /// Rolling window of node file sizes in bytes.
    pub download_bytes: SampleWindow,
    /// Node counts from the last frame.
    pub nodes: NodeCounts,
    /// Predicted GPU bytes of every ready node.
    pub resident_gpu_bytes: u64,
    /// Nodes loaded this session.
    pub total_loaded: u64,
    /// Failed requests this session.
    pub total_failed: u64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset everything except the session totals.
    pub fn reset(&mut self) {
        self.decode_timings.clear();
        self.download_bytes.clear();
        self.nodes = NodeCounts::default();
        self.resident_gpu_bytes = 0;
    }

    pub fn record_load(&mut self, stats: &LoadStats, gpu_bytes: u64) {
        if !is_enabled() {
            return;
        }
        self.decode_timings.push(stats.decode_time.as_micros() as u64);
        self.download_bytes.push(stats.bytes as u64);
        self.resident_gpu_bytes += gpu_bytes;
        self.total_loaded += 1;
    }

    pub fn record_release(&mut self, gpu_bytes: u64) {
        if is_enabled() {
            self.resident_gpu_bytes = self.resident_gpu_bytes.saturating_sub(gpu_bytes);
        }
    }

    pub fn record_failure(&mut self) {
        if is_enabled() {
            self.total_failed += 1;
        }
    }

    pub fn record_nodes(&mut self, nodes: NodeCounts) {
        if is_enabled() {
            self.nodes = nodes;
        }
    }

    pub fn avg_decode_us(&self) -> f64 {
        self.decode_timings.average()
    }

    pub fn resident_gpu_mb(&self) -> f64 {
        self.resident_gpu_bytes as f64 / 1_048_576.0
    }
}
