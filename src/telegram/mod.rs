// =============================================================================
// Telegram — delivery sink and chat commands
// =============================================================================

pub mod commands;
pub mod sink;

pub use sink::{MessageSink, TelegramSink};
