//! Tumbling-window OHLC bars.
//!
//! Window `k` covers ticks `[k*W, (k+1)*W)`. Trailing ticks that do not
//! fill a whole window are ignored.

use bytemuck::{Pod, Zeroable};

/// One bar. Laid out as four contiguous `f32` so a bar slice can be
/// viewed as `[f32]` at the ABI.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Ohlc {
    pub open: f32,  // 4 bytes
    pub high: f32,  // 4 bytes
    pub low: f32,   // 4 bytes
    pub close: f32, // 4 bytes
}

const _: () = assert!(core::mem::size_of::<Ohlc>() == 16);

impl Ohlc {
    pub const NAN: Self = Self {
        open: f32::NAN,
        high: f32::NAN,
        low: f32::NAN,
        close: f32::NAN,
    };

    /// Bar over a non-empty window.
    #[inline]
    fn from_window(window: &[f32]) -> Self {
        let first = window[0];
        let (high, low) = window[1..]
            .iter()
            .fold((first, first), |(h, l), &p| (h.max(p), l.min(p)));
        Self {
            open: first,
            high,
            low,
            close: window[window.len() - 1],
        }
    }
}

/// Number of whole windows in `ticks`.
#[inline(always)]
pub fn window_count(ticks: usize, window: usize) -> usize {
    if window == 0 {
        0
    } else {
        ticks / window
    }
}

/// OHLC bars into `out`. Returns bars written.
///
/// `window == 0` is invalid: every bar in `out` is set to NaN and the
/// return is `out.len()`.
pub fn ohlc(ticks: &[f32], out: &mut [Ohlc], window: usize) -> usize {
    if window == 0 {
        out.fill(Ohlc::NAN);
        return out.len();
    }
    let bars = window_count(ticks.len(), window).min(out.len());
    for (bar, chunk) in out[..bars].iter_mut().zip(ticks.chunks_exact(window)) {
        *bar = Ohlc::from_window(chunk);
    }
    bars
}

/// OHLC bars into a flat `[o, h, l, c, o, h, l, c, ..]` buffer.
///
/// Returns bars written. Any trailing `out` elements short of a full bar
/// are untouched.
pub fn ohlc_flat(ticks: &[f32], out: &mut [f32], window: usize) -> usize {
    let whole = out.len() / 4 * 4;
    let bars: &mut [Ohlc] = bytemuck::cast_slice_mut(&mut out[..whole]);
    ohlc(ticks, bars, window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ohlc_reference_values() {
        let ticks = [1.0f32, 3.0, 2.0, 4.0, 2.0, 5.0, 1.0, 3.0];
        let mut out = [Ohlc::default(); 2];
        assert_eq!(ohlc(&ticks, &mut out, 4), 2);
        assert_eq!(
            out[0],
            Ohlc { open: 1.0, high: 4.0, low: 1.0, close: 4.0 }
        );
        assert_eq!(
            out[1],
            Ohlc { open: 2.0, high: 5.0, low: 1.0, close: 3.0 }
        );
    }

    #[test]
    fn test_ohlc_partial_window_ignored() {
        let ticks = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        let mut out = [Ohlc::default(); 4];
        assert_eq!(ohlc(&ticks, &mut out, 2), 2);
        assert_eq!(out[2], Ohlc::default());
    }

    #[test]
    fn test_ohlc_zero_window() {
        let mut out = [Ohlc::default(); 3];
        assert_eq!(ohlc(&[1.0, 2.0], &mut out, 0), 3);
        assert!(out.iter().all(|b| b.open.is_nan() && b.close.is_nan()));
    }

    #[test]
    fn test_ohlc_window_of_one() {
        let ticks = [7.0f32, 8.0];
        let mut out = [Ohlc::default(); 2];
        ohlc(&ticks, &mut out, 1);
        assert_eq!(out[1], Ohlc { open: 8.0, high: 8.0, low: 8.0, close: 8.0 });
    }

    #[test]
    fn test_ohlc_flat_layout() {
        let ticks = [1.0f32, 3.0, 2.0, 4.0, 2.0, 5.0, 1.0, 3.0];
        let mut out = [0.0f32; 9];
        assert_eq!(ohlc_flat(&ticks, &mut out, 4), 2);
        assert_eq!(out, [1.0, 4.0, 1.0, 4.0, 2.0, 5.0, 1.0, 3.0, 0.0]);
    }
}
