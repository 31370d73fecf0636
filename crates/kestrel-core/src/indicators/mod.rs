//! Batch indicator kernels over contiguous `f32` arrays.
//!
//! All kernels are out-of-place and deterministic. Invalid parameters
//! are signalled by writing NaN across the output; empty inputs write
//! nothing. Each kernel returns the number of elements (or records)
//! written, which is bounded by both input and output lengths.

pub mod ema;
pub mod rsi;
pub mod ohlc;

pub use ema::{ema, ema_last, ema_multi, ema_step, alpha_is_valid};
pub use rsi::rsi;
pub use ohlc::{ohlc, ohlc_flat, window_count, Ohlc};

/// Lane width of the blocked kernels.
pub const LANES: usize = 8;
