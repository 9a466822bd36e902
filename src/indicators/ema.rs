// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
//   multiplier = 2 / (period + 1)
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//              = EMA_{t-1} + (close_t - EMA_{t-1}) * multiplier
//
// The second form is evaluated so a constant series stays exactly constant.
//
// The recurrence is seeded with the SMA of the first `period` closes. Seeding
// with the first raw close converges differently and is not supported.
// =============================================================================

/// Most recent EMA of `closes` (oldest first) for look-back `period`.
///
/// Returns `None` when `period == 0`, when `closes.len() < period`, or when a
/// non-finite value appears anywhere in the recurrence.
pub fn current_ema(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let multiplier = 2.0 / (period + 1) as f64;

    let sma = closes[..period].iter().sum::<f64>() / period as f64;
    if !sma.is_finite() {
        return None;
    }

    let mut ema = sma;
    for &close in &closes[period..] {
        ema += (close - ema) * multiplier;
        if !ema.is_finite() {
            return None;
        }
    }

    Some(ema)
}

/// Signed percentage distance of `price` from `ema`.
///
/// `None` unless `ema` is a positive finite number and `price` is finite.
pub fn ema_distance(price: f64, ema: f64) -> Option<f64> {
    if !price.is_finite() || !ema.is_finite() || ema <= 0.0 {
        return None;
    }
    Some((price - ema) / ema * 100.0)
}
