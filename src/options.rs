//! Configuration surface for [`crate::load`], mirroring the original
//! `load_xdf` keyword arguments (see `original_source/Python/xdf.py`).

use crate::model::StreamInfo;

/// Decoded row values for a `Samples` chunk, mirroring the crate's internal
/// sample representation so an [`XdfOptions::on_chunk`] hook can rewrite
/// sample data before it is buffered (§4.1).
#[derive(Debug, Clone)]
pub enum ChunkValues {
    Numeric(Vec<f64>, usize),
    String(Vec<Vec<String>>),
}

/// Per-chunk context passed to an [`XdfOptions::on_chunk`] hook after a
/// `Samples` chunk has been decoded.
pub struct ChunkContext {
    pub stream_id: u32,
    pub info: StreamInfo,
    pub stamps: Vec<f64>,
    pub values: ChunkValues,
}

/// Tunables for [`crate::load`]. Defaults match §6 exactly.
pub struct XdfOptions {
    /// Invoked after each Samples chunk is decoded; may rewrite the
    /// values/stamps/info that get buffered. `None` by default.
    pub on_chunk: Option<Box<dyn FnMut(ChunkContext) -> ChunkContext>>,
    /// Run the Clock Synchronizer.
    pub synchronize_clocks: bool,
    /// Within clock synchronization, split on detected resets.
    pub handle_clock_resets: bool,
    /// Run the Jitter Remover on regular streams.
    pub dejitter_timestamps: bool,
    pub jitter_break_threshold_seconds: f64,
    pub jitter_break_threshold_samples: i64,
    pub clock_reset_threshold_seconds: f64,
    pub clock_reset_threshold_stds: f64,
    pub clock_reset_threshold_offset_seconds: f64,
    pub clock_reset_threshold_offset_stds: f64,
    pub winsor_threshold: f64,
}

impl Default for XdfOptions {
    fn default() -> Self {
        XdfOptions {
            on_chunk: None,
            synchronize_clocks: true,
            handle_clock_resets: true,
            dejitter_timestamps: true,
            jitter_break_threshold_seconds: 1.0,
            jitter_break_threshold_samples: 500,
            clock_reset_threshold_seconds: 5.0,
            clock_reset_threshold_stds: 5.0,
            clock_reset_threshold_offset_seconds: 1.0,
            clock_reset_threshold_offset_stds: 10.0,
            winsor_threshold: 1e-4,
        }
    }
}

impl std::fmt::Debug for XdfOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XdfOptions")
            .field("on_chunk", &self.on_chunk.as_ref().map(|_| "<fn>"))
            .field("synchronize_clocks", &self.synchronize_clocks)
            .field("handle_clock_resets", &self.handle_clock_resets)
            .field("dejitter_timestamps", &self.dejitter_timestamps)
            .field(
                "jitter_break_threshold_seconds",
                &self.jitter_break_threshold_seconds,
            )
            .field(
                "jitter_break_threshold_samples",
                &self.jitter_break_threshold_samples,
            )
            .field(
                "clock_reset_threshold_seconds",
                &self.clock_reset_threshold_seconds,
            )
            .field(
                "clock_reset_threshold_stds",
                &self.clock_reset_threshold_stds,
            )
            .field(
                "clock_reset_threshold_offset_seconds",
                &self.clock_reset_threshold_offset_seconds,
            )
            .field(
                "clock_reset_threshold_offset_stds",
                &self.clock_reset_threshold_offset_stds,
            )
            .field("winsor_threshold", &self.winsor_threshold)
            .finish()
    }
}
