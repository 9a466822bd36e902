// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// Step 1 — Successive differences of ascending closes.
// Step 2 — Seed average gain / average loss with the simple mean of the first
//          `period` gains / losses.
// Step 3 — Wilder smoothing for every later difference:
//            avg = (prev_avg * (period - 1) + current) / period
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Degenerate averages:
//   avg_loss == 0 && avg_gain == 0  =>  50   (flat series)
//   avg_loss == 0                   =>  100  (only gains)
// =============================================================================

/// Most recent RSI value of `closes` (oldest first).
///
/// Returns `None` when `period == 0`, when `closes.len() < period + 1`, or
/// when the computation is non-finite. Insufficient history is an expected
/// case, not an error.
pub fn current_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let period_f = period as f64;
    let mut deltas = closes.windows(2).map(|w| w[1] - w[0]);

    // --- Seed with the simple mean of the first `period` deltas --------------
    let (mut sum_gain, mut sum_loss) = (0.0_f64, 0.0_f64);
    for delta in deltas.by_ref().take(period) {
        if delta > 0.0 {
            sum_gain += delta;
        } else {
            sum_loss -= delta;
        }
    }
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    // --- Wilder smoothing over the remaining deltas --------------------------
    for delta in deltas {
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { -delta } else { 0.0 };
        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;
    }

    rsi_from_averages(avg_gain, avg_loss)
}

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    if rsi.is_finite() {
        Some(rsi.clamp(0.0, 100.0))
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rsi_empty_input() {
        assert!(current_rsi(&[], 14).is_none());
    }

    #[test]
    fn rsi_period_zero() {
        assert!(current_rsi(&[1.0, 2.0, 3.0], 0).is_none());
    }

    #[test]
    fn rsi_insufficient_data() {
        // 14 closes => 13 deltas < 14.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!(current_rsi(&closes, 14).is_none());
    }

    #[test]
    fn rsi_exactly_period_plus_one_is_defined() {
        let closes = [
            10.0, 12.0, 11.0, 13.0, 15.0, 14.0, 16.0, 18.0, 17.0, 19.0, 21.0, 20.0, 22.0, 24.0,
            23.0,
        ];
        let rsi = current_rsi(&closes, 14).expect("15 points, period 14");
        // 9 up-moves of 2 (18), 5 down-moves of 1 (5): RS = 18/5.
        let expected = 100.0 - 100.0 / (1.0 + 18.0 / 5.0);
        assert!((rsi - expected).abs() < 1e-10, "got {rsi}, expected {expected}");
    }

    #[test]
    fn rsi_all_gains() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let rsi = current_rsi(&closes, 14).unwrap();
        assert!((rsi - 100.0).abs() < 1e-10, "expected 100.0, got {rsi}");
    }

    #[test]
    fn rsi_all_losses() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let rsi = current_rsi(&closes, 14).unwrap();
        assert!(rsi.abs() < 1e-10, "expected 0.0, got {rsi}");
    }

    #[test]
    fn rsi_flat_market_is_neutral() {
        let closes = vec![100.0; 30];
        assert_eq!(current_rsi(&closes, 14), Some(50.0));
    }

    #[test]
    fn rsi_uses_wilder_smoothing_not_window_average() {
        // Seed on [+1, -1], then one extra +1 delta.
        // Wilder: gain = (0.5*1 + 1)/2 = 0.75, loss = (0.5*1 + 0)/2 = 0.25 => RS 3 => 75.
        // A plain re-average of the last two deltas would give 50.
        let rsi = current_rsi(&[1.0, 2.0, 1.0, 2.0], 2).unwrap();
        assert!((rsi - 75.0).abs() < 1e-10, "got {rsi}");
    }

    #[test]
    fn rsi_known_reference_series() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        // Seeded on the first 14 deltas, then three Wilder steps.
        let rsi = current_rsi(&closes, 14).unwrap();
        assert!((rsi - 42.422484).abs() < 1e-5, "got {rsi}");
    }

    proptest! {
        #[test]
        fn rsi_none_below_minimum_length(len in 0usize..20, period in 1usize..20) {
            prop_assume!(len < period + 1);
            let closes: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
            prop_assert!(current_rsi(&closes, period).is_none());
        }

        #[test]
        fn rsi_bounded_for_random_series(
            closes in prop::collection::vec(1.0f64..100_000.0, 2..300),
            period in 1usize..30,
        ) {
            if let Some(v) = current_rsi(&closes, period) {
                prop_assert!((0.0..=100.0).contains(&v), "RSI {} out of range", v);
            } else {
                prop_assert!(closes.len() < period + 1);
            }
        }

        #[test]
        fn rsi_strictly_increasing_is_100(
            start in 1.0f64..1000.0,
            step in 0.01f64..50.0,
            extra in 0usize..50,
            period in 1usize..30,
        ) {
            let len = period + 1 + extra;
            let closes: Vec<f64> = (0..len).map(|i| start + step * i as f64).collect();
            prop_assert_eq!(current_rsi(&closes, period), Some(100.0));
        }
    }
}
