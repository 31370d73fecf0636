//! Exponential moving average.
//!
//! `ema[0] = price[0]`, `ema[i] = alpha * price[i] + (1 - alpha) * ema[i-1]`.
//!
//! The recurrence is serial within a series, so the vector form runs
//! many independent series side by side. Every lane evaluates exactly
//! the scalar expression, which keeps the two paths bitwise identical.

use super::LANES;

/// Check `0 < alpha <= 1` (false for NaN).
#[inline(always)]
pub fn alpha_is_valid(alpha: f32) -> bool {
    alpha > 0.0 && alpha <= 1.0
}

/// One EMA step.
#[inline(always)]
pub fn ema_step(price: f32, prev: f32, alpha: f32) -> f32 {
    alpha * price + (1.0 - alpha) * prev
}

/// EMA of a single series.
///
/// Writes `min(prices.len(), out.len())` values. An invalid alpha fills
/// that prefix with NaN.
pub fn ema(prices: &[f32], out: &mut [f32], alpha: f32) -> usize {
    let n = prices.len().min(out.len());
    if n == 0 {
        return 0;
    }
    let out = &mut out[..n];
    if !alpha_is_valid(alpha) {
        out.fill(f32::NAN);
        return n;
    }

    let mut acc = prices[0];
    out[0] = acc;
    for (o, &p) in out[1..].iter_mut().zip(&prices[1..n]) {
        acc = ema_step(p, acc, alpha);
        *o = acc;
    }
    n
}

/// Final EMA value of a series, NaN if empty or alpha is invalid.
pub fn ema_last(prices: &[f32], alpha: f32) -> f32 {
    if prices.is_empty() || !alpha_is_valid(alpha) {
        return f32::NAN;
    }
    prices[1..]
        .iter()
        .fold(prices[0], |acc, &p| ema_step(p, acc, alpha))
}

/// EMA of `series` interleaved series.
///
/// `prices[t * series + s]` is sample `t` of series `s`; the output uses
/// the same layout. Only whole rows are processed. The previous output
/// row is the recurrence state, so no scratch is needed. Returns the
/// number of values written.
pub fn ema_multi(prices: &[f32], out: &mut [f32], series: usize, alpha: f32) -> usize {
    if series == 0 {
        return 0;
    }
    let rows = prices.len().min(out.len()) / series;
    let n = rows * series;
    if n == 0 {
        return 0;
    }
    let out = &mut out[..n];
    if !alpha_is_valid(alpha) {
        out.fill(f32::NAN);
        return n;
    }

    out[..series].copy_from_slice(&prices[..series]);
    for t in 1..rows {
        let (done, rest) = out.split_at_mut(t * series);
        let prev = &done[(t - 1) * series..];
        let cur = &mut rest[..series];
        let input = &prices[t * series..(t + 1) * series];
        step_row(input, prev, cur, alpha);
    }
    n
}

/// Advance one row of interleaved series in fixed-width blocks.
#[inline(always)]
fn step_row(input: &[f32], prev: &[f32], cur: &mut [f32], alpha: f32) {
    let mut cur_blocks = cur.chunks_exact_mut(LANES);
    let mut in_blocks = input.chunks_exact(LANES);
    let mut prev_blocks = prev.chunks_exact(LANES);

    for ((c, i), p) in (&mut cur_blocks).zip(&mut in_blocks).zip(&mut prev_blocks) {
        for lane in 0..LANES {
            c[lane] = ema_step(i[lane], p[lane], alpha);
        }
    }

    let tail = cur_blocks.into_remainder();
    for ((c, &i), &p) in tail
        .iter_mut()
        .zip(in_blocks.remainder())
        .zip(prev_blocks.remainder())
    {
        *c = ema_step(i, p, alpha);
    }
}
