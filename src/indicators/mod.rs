// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator math over ascending close prices. Every
// public function returns `Option<f64>`; `None` means insufficient data or a
// degenerate input and is rendered as "N/A" downstream.

pub mod ema;
pub mod premium;
pub mod rsi;

pub use ema::{current_ema, ema_distance};
pub use premium::spot_premium;
pub use rsi::current_rsi;
