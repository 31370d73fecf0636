//! Wilder relative strength index.
//!
//! Differences are `diff[0] = 0`, `diff[i] = price[i] - price[i-1]`, so the
//! first `period` differences are available at index `period - 1`, where
//! the averages are seeded with their simple mean. After that Wilder
//! smoothing applies: `avg = (avg * (P - 1) + x) / P`.
//!
//! Averages accumulate in `f64`; outputs are narrowed to `f32`.

/// RSI from smoothed averages. Zero average loss reads as 100.
#[inline(always)]
fn rsi_value(avg_gain: f64, avg_loss: f64) -> f32 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)) as f32
}

#[inline(always)]
fn split_diff(prev: f32, cur: f32) -> (f64, f64) {
    let d = cur as f64 - prev as f64;
    if d > 0.0 {
        (d, 0.0)
    } else {
        // NaN lands here and poisons the loss average.
        (0.0, -d)
    }
}

/// RSI over `period`.
///
/// Indices below `period - 1` are NaN. `period == 0` fills the output
/// with NaN. Returns the number of values written.
pub fn rsi(prices: &[f32], out: &mut [f32], period: usize) -> usize {
    let n = prices.len().min(out.len());
    if n == 0 {
        return 0;
    }
    let out = &mut out[..n];
    if period == 0 {
        out.fill(f32::NAN);
        return n;
    }

    let warmup = (period - 1).min(n);
    out[..warmup].fill(f32::NAN);
    if n < period {
        return n;
    }

    let p = period as f64;
    let (mut gain_sum, mut loss_sum) = (0.0f64, 0.0f64);
    for i in 1..period {
        let (g, l) = split_diff(prices[i - 1], prices[i]);
        gain_sum += g;
        loss_sum += l;
    }
    let mut avg_gain = gain_sum / p;
    let mut avg_loss = loss_sum / p;
    out[period - 1] = rsi_value(avg_gain, avg_loss);

    for i in period..n {
        let (g, l) = split_diff(prices[i - 1], prices[i]);
        avg_gain = (avg_gain * (p - 1.0) + g) / p;
        avg_loss = (avg_loss * (p - 1.0) + l) / p;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_all_gains() {
        let prices: Vec<f32> = (1..=15).map(|v| v as f32).collect();
        let mut out = vec![0.0f32; 15];
        assert_eq!(rsi(&prices, &mut out, 14), 15);
        assert!(out[..13].iter().all(|v| v.is_nan()));
        assert_eq!(out[13], 100.0);
        assert_eq!(out[14], 100.0);
    }

    #[test]
    fn test_rsi_all_losses() {
        let prices: Vec<f32> = (1..=10).rev().map(|v| v as f32).collect();
        let mut out = vec![0.0f32; 10];
        rsi(&prices, &mut out, 3);
        assert!(out[2..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rsi_seed_and_smoothing() {
        // period 3: diffs at 0..=2 are [0, +2, -1]
        let prices = [10.0f32, 12.0, 11.0, 13.0];
        let mut out = [0.0f32; 4];
        rsi(&prices, &mut out, 3);

        // seed: gain 2/3, loss 1/3 -> RS 2 -> 66.666..
        assert!((out[2] - 66.666_67).abs() < 1e-3);

        // i=3: diff +2 -> gain (2/3*2 + 2)/3 = 10/9, loss (1/3*2)/3 = 2/9 -> RS 5
        assert!((out[3] - 83.333_33).abs() < 1e-3);
    }

    #[test]
    fn test_rsi_invalid_period() {
        let prices = [1.0f32, 2.0];
        let mut out = [0.0f32; 2];
        assert_eq!(rsi(&prices, &mut out, 0), 2);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_rsi_period_longer_than_input() {
        let prices = [1.0f32, 2.0, 3.0];
        let mut out = [0.0f32; 3];
        assert_eq!(rsi(&prices, &mut out, 10), 3);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_rsi_nan_propagates() {
        let prices = [1.0f32, f32::NAN, 3.0, 4.0];
        let mut out = [0.0f32; 4];
        rsi(&prices, &mut out, 2);
        assert!(out[1].is_nan());
        assert!(out[3].is_nan());
    }
}
