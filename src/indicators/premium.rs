// =============================================================================
// Spot / Contract Premium
// =============================================================================
//
//   premium = (contract - spot) / spot * 100
//
// Positive means the perpetual contract trades above spot.
// =============================================================================

/// Percentage premium of `contract_price` over `spot_price`.
///
/// `None` unless both prices are positive finite numbers.
pub fn spot_premium(spot_price: f64, contract_price: f64) -> Option<f64> {
    let valid = |p: f64| p.is_finite() && p > 0.0;
    if !valid(spot_price) || !valid(contract_price) {
        return None;
    }
    Some((contract_price - spot_price) / spot_price * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_above_spot_is_positive() {
        let p = spot_premium(100.0, 105.0).unwrap();
        assert!((p - 5.0).abs() < 1e-12, "got {p}");
    }

    #[test]
    fn contract_below_spot_is_negative() {
        let p = spot_premium(100.0, 99.5).unwrap();
        assert!((p + 0.5).abs() < 1e-12, "got {p}");
    }

    #[test]
    fn non_positive_prices_yield_none() {
        assert!(spot_premium(100.0, 0.0).is_none());
        assert!(spot_premium(0.0, 100.0).is_none());
        assert!(spot_premium(-1.0, 100.0).is_none());
        assert!(spot_premium(100.0, f64::INFINITY).is_none());
    }
}
