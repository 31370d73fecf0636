//! # Kestrel C ABI
//!
//! Flat `extern "C"` surface over `kestrel-core`. Every entry point runs
//! to completion on the caller's thread and never allocates, except the
//! book lifecycle calls.
//!
//! Pointers are checked for null; lengths, alignment and record sizes
//! are the caller's contract (see `include/kestrel.h`).

use core::{ptr, slice};

use kestrel_core::indicators::{self, ohlc::window_count};
use kestrel_core::{
    process_tick_batch as translate_ticks, status_of, DenseLadder, EngineError, OrderBook,
    Price, PriceBand, RiskEngine, Scale, SortedLadder, TopOfBook, VarModel,
};
use kestrel_proto::{Event, LimitRecord, OrderRecord, PositionRecord, Tick};

/// Returned by `calculate_portfolio_var` when VaR is NaN or out of range.
pub const VAR_SENTINEL: u64 = u64::MAX;

/// Opaque book handle.
pub enum KestrelBook {
    Dense(OrderBook<DenseLadder>),
    Sorted(OrderBook<SortedLadder>),
}

impl KestrelBook {
    #[inline(always)]
    pub fn update_level(
        &mut self,
        side: i32,
        price_raw: u64,
        quantity_raw: u64,
        action: i32,
    ) -> Result<(), EngineError> {
        match self {
            KestrelBook::Dense(book) => book.update_level(side, price_raw, quantity_raw, action),
            KestrelBook::Sorted(book) => book.update_level(side, price_raw, quantity_raw, action),
        }
    }

    #[inline(always)]
    pub fn top(&self) -> TopOfBook {
        match self {
            KestrelBook::Dense(book) => book.top(),
            KestrelBook::Sorted(book) => book.top(),
        }
    }
}

#[inline(always)]
fn len(count: u64) -> Option<usize> {
    usize::try_from(count).ok()
}

/// View `count` records at `ptr`. Null is only accepted for an empty view.
#[inline(always)]
unsafe fn view<'a, T>(ptr: *const T, count: usize) -> Option<&'a [T]> {
    if count == 0 {
        return Some(&[]);
    }
    if ptr.is_null() {
        return None;
    }
    Some(slice::from_raw_parts(ptr, count))
}

#[inline(always)]
unsafe fn view_mut<'a, T>(ptr: *mut T, count: usize) -> Option<&'a mut [T]> {
    if count == 0 {
        return Some(&mut []);
    }
    if ptr.is_null() {
        return None;
    }
    Some(slice::from_raw_parts_mut(ptr, count))
}

// ============================================================================
// Book lifecycle
// ============================================================================

/// Create a dense book over `slots` prices starting at `base_price`,
/// `tick_size` apart. Returns null on invalid parameters.
#[no_mangle]
pub extern "C" fn book_create_dense(
    scale: u8,
    base_price: u64,
    tick_size: u64,
    slots: u32,
) -> *mut KestrelBook {
    let build = || -> Result<KestrelBook, EngineError> {
        let scale = Scale::new(scale)?;
        if base_price == 0 {
            return Err(EngineError::InvalidParameter);
        }
        let band = PriceBand::new(Price(base_price), tick_size, slots)?;
        Ok(KestrelBook::Dense(OrderBook::dense(scale, band)))
    };
    match build() {
        Ok(book) => Box::into_raw(Box::new(book)),
        Err(_) => ptr::null_mut(),
    }
}

/// Create a tree-backed book with no price bounds. Returns null on an
/// invalid scale.
#[no_mangle]
pub extern "C" fn book_create_sorted(scale: u8) -> *mut KestrelBook {
    match Scale::new(scale) {
        Ok(scale) => Box::into_raw(Box::new(KestrelBook::Sorted(OrderBook::sorted(scale)))),
        Err(_) => ptr::null_mut(),
    }
}

/// Destroy a book. Null is ignored.
///
/// # Safety
/// `book` must come from a `book_create_*` call and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn book_destroy(book: *mut KestrelBook) {
    if !book.is_null() {
        drop(Box::from_raw(book));
    }
}

// ============================================================================
// Order book
// ============================================================================

/// Apply one level update. Returns 0 or a negative status code.
///
/// # Safety
/// `book` must be null or a live handle not accessed concurrently.
#[no_mangle]
pub unsafe extern "C" fn update_l2_level(
    book: *mut KestrelBook,
    side: i32,
    price_raw: u64,
    quantity_raw: u64,
    action: i32,
) -> i32 {
    let Some(book) = book.as_mut() else {
        return EngineError::InvalidParameter.status();
    };
    status_of(book.update_level(side, price_raw, quantity_raw, action))
}

/// Write the cached best bid and ask (0 for an empty side). Null
/// pointers are skipped.
///
/// # Safety
/// `book` must be null or a live handle; `best_bid` and `best_ask` must
/// be null or writable.
#[no_mangle]
pub unsafe extern "C" fn get_best_bid_ask(
    book: *const KestrelBook,
    best_bid: *mut u64,
    best_ask: *mut u64,
) {
    let Some(book) = book.as_ref() else {
        return;
    };
    let (bid, ask) = book.top().raw_prices();
    if let Some(out) = best_bid.as_mut() {
        *out = bid;
    }
    if let Some(out) = best_ask.as_mut() {
        *out = ask;
    }
}

// ============================================================================
// Market data
// ============================================================================

/// Translate `count` ticks into `count` events.
///
/// # Safety
/// `input` must point to `count` readable `Tick`s and `output` to `count`
/// writable `Event`s; the buffers must not overlap.
#[no_mangle]
pub unsafe extern "C" fn process_tick_batch(
    input: *const Tick,
    output: *mut Event,
    count: u64,
    instrument_id: u64,
) {
    let Some(n) = len(count) else { return };
    let (Some(ticks), Some(events)) = (view(input, n), view_mut(output, n)) else {
        return;
    };
    translate_ticks(ticks, events, instrument_id);
}

/// OHLC bars over tumbling windows; writes `4 * floor(count / window)`
/// floats. `window == 0` has no output length, so unlike the other
/// invalid parameters it writes nothing instead of NaN.
///
/// # Safety
/// `ticks` must point to `count` floats and `output` to room for the bars.
#[no_mangle]
pub unsafe extern "C" fn calculate_ohlc_vectorized(
    ticks: *const f32,
    output: *mut f32,
    count: u64,
    window_size: u64,
) {
    let (Some(n), Some(w)) = (len(count), len(window_size)) else {
        return;
    };
    if w == 0 {
        return;
    }
    let bars = window_count(n, w);
    let (Some(ticks), Some(out)) = (view(ticks, n), view_mut(output, bars * 4)) else {
        return;
    };
    indicators::ohlc_flat(ticks, out, w);
}

/// EMA over one series. Invalid alpha writes NaN.
///
/// # Safety
/// `prices` and `output` must each cover `count` floats.
#[no_mangle]
pub unsafe extern "C" fn calculate_ema_vectorized(
    prices: *const f32,
    output: *mut f32,
    count: u64,
    alpha: f32,
) {
    let Some(n) = len(count) else { return };
    let (Some(prices), Some(out)) = (view(prices, n), view_mut(output, n)) else {
        return;
    };
    indicators::ema(prices, out, alpha);
}

/// EMA over `series` interleaved series of `count` samples in total.
///
/// # Safety
/// `prices` and `output` must each cover `count` floats.
#[no_mangle]
pub unsafe extern "C" fn calculate_ema_multi(
    prices: *const f32,
    output: *mut f32,
    count: u64,
    series: u64,
    alpha: f32,
) {
    let (Some(n), Some(s)) = (len(count), len(series)) else {
        return;
    };
    let (Some(prices), Some(out)) = (view(prices, n), view_mut(output, n)) else {
        return;
    };
    indicators::ema_multi(prices, out, s, alpha);
}

/// One EMA step.
#[no_mangle]
pub extern "C" fn calculate_ema_step(price: f32, prev_ema: f32, alpha: f32) -> f32 {
    indicators::ema_step(price, prev_ema, alpha)
}

/// Final EMA value of a series; NaN when empty or alpha is invalid.
///
/// # Safety
/// `prices` must cover `count` floats.
#[no_mangle]
pub unsafe extern "C" fn calculate_ema_last(prices: *const f32, count: u64, alpha: f32) -> f32 {
    match len(count).and_then(|n| view(prices, n)) {
        Some(prices) => indicators::ema_last(prices, alpha),
        None => f32::NAN,
    }
}

/// Wilder RSI. `period == 0` writes NaN.
///
/// # Safety
/// `prices` and `output` must each cover `count` floats.
#[no_mangle]
pub unsafe extern "C" fn calculate_rsi_vectorized(
    prices: *const f32,
    output: *mut f32,
    count: u64,
    period: u64,
) {
    let Some(n) = len(count) else { return };
    let (Some(prices), Some(out)) = (view(prices, n), view_mut(output, n)) else {
        return;
    };
    // Periods beyond usize cannot warm up; treat them as the longest one.
    let period = len(period).unwrap_or(usize::MAX);
    indicators::rsi(prices, out, period);
}

// ============================================================================
// Risk
// ============================================================================

unsafe fn risk_inputs<'a>(
    orders: *const OrderRecord,
    positions: *const PositionRecord,
    limits: *const LimitRecord,
    count: u64,
) -> Option<(&'a [OrderRecord], &'a [PositionRecord], &'a [LimitRecord])> {
    let n = len(count)?;
    Some((view(orders, n)?, view(positions, n)?, view(limits, n)?))
}

/// Validate a batch of orders against parallel positions and limits.
///
/// Returns the acceptance bitmask for `count <= 64`, otherwise the number
/// of accepted orders. Null inputs return 0.
///
/// # Safety
/// Each pointer must cover `count` records.
#[no_mangle]
pub unsafe extern "C" fn validate_order_batch(
    orders: *const OrderRecord,
    positions: *const PositionRecord,
    limits: *const LimitRecord,
    count: u64,
) -> u64 {
    let Some((orders, positions, limits)) = risk_inputs(orders, positions, limits, count) else {
        return 0;
    };
    RiskEngine::new(Scale::CANONICAL)
        .validate(orders, positions, limits, None)
        .map_or(0, |verdict| verdict.to_word())
}

/// As `validate_order_batch`, also writing 1/0 per order into `accepted`.
///
/// # Safety
/// Each input pointer must cover `count` records and `accepted` must
/// cover `count` bytes.
#[no_mangle]
pub unsafe extern "C" fn validate_order_batch_ext(
    orders: *const OrderRecord,
    positions: *const PositionRecord,
    limits: *const LimitRecord,
    count: u64,
    accepted: *mut u8,
) -> u64 {
    let Some((orders, positions, limits)) = risk_inputs(orders, positions, limits, count) else {
        return 0;
    };
    let Some(accepted) = view_mut(accepted, orders.len()) else {
        return 0;
    };
    RiskEngine::new(Scale::CANONICAL)
        .validate(orders, positions, limits, Some(accepted))
        .map_or(0, |verdict| verdict.to_word())
}

/// One-day 99% parametric VaR at the canonical scale.
///
/// Returns `VAR_SENTINEL` when the result is NaN or does not fit.
///
/// # Safety
/// `positions` and `volatilities` must cover `count` floats and
/// `correlations` must cover `count * count` floats.
#[no_mangle]
pub unsafe extern "C" fn calculate_portfolio_var(
    positions: *const f32,
    correlations: *const f32,
    volatilities: *const f32,
    count: u64,
) -> u64 {
    let Some(n) = len(count) else {
        return VAR_SENTINEL;
    };
    let Some(cells) = n.checked_mul(n) else {
        return VAR_SENTINEL;
    };
    let (Some(w), Some(corr), Some(vol)) = (
        view(positions, n),
        view(correlations, cells),
        view(volatilities, n),
    ) else {
        return VAR_SENTINEL;
    };
    VarModel::default()
        .var_fixed(w, corr, vol, Scale::CANONICAL)
        .unwrap_or(VAR_SENTINEL)
}
