//! Recognized configuration options. All optional, all with sensible
//! defaults.

use crate::schema::Projection;

#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Size of the I/O/decode pool. Defaults to hardware concurrency.
    pub thread_count: usize,
    /// Enables the vectorized (chunked-popcount) level-counting path over
    /// the portable byte-at-a-time one. Both are exact; this just picks
    /// which is run, since no intrinsics-level SIMD decoder lives in this
    /// crate.
    pub enable_simd: bool,
    /// This implementation always uses `flate2`'s portable inflate, so this
    /// is a no-op knob kept for interface compatibility with other readers.
    pub use_libdeflate: bool,
    /// Target bytes per decoded batch, used by the batch-size formula in
    /// `column::batch_size_for_row_width`.
    pub batch_memory_target: usize,
    /// Which leaf columns to read. Defaults to everything.
    pub projection: Projection,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            thread_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            enable_simd: true,
            use_libdeflate: true,
            batch_memory_target: 6 * 1024 * 1024,
            projection: Projection::All,
        }
    }
}
