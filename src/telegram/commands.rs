// =============================================================================
// Chat commands
// =============================================================================
//
//   /start            activate scheduled pushes
//   /stop             deactivate scheduled pushes
//   /rsi [timeframe]  RSI report, optionally for one timeframe
//   /ema              EMA report
//   /fng              fear & greed report
//   /premium          spot premium report
//   /indicator        comprehensive report
//   /status           activation state and schedule
//   /help             command list
//
// Anything else, including plain text, answers with the command list.
// =============================================================================

use crate::types::ReportKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    /// Raw timeframe argument; parsed by the caller so a bad value can be
    /// reported back to the chat.
    Rsi(Option<String>),
    Report(ReportKind),
    Status,
    Help,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let mut parts = text.split_whitespace();
        let Some(head) = parts.next() else {
            return Self::Help;
        };
        // Group chats address commands as `/rsi@my_bot`.
        let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();

        match name.as_str() {
            "/start" => Self::Start,
            "/stop" => Self::Stop,
            "/rsi" => Self::Rsi(parts.next().map(str::to_string)),
            "/ema" => Self::Report(ReportKind::Ema),
            "/fng" => Self::Report(ReportKind::Sentiment),
            "/premium" => Self::Report(ReportKind::Premium),
            "/indicator" => Self::Report(ReportKind::Comprehensive),
            "/status" => Self::Status,
            _ => Self::Help,
        }
    }
}

pub fn help_text() -> &'static str {
    "🤖 *Crypto Indicator Bot*\n\
     /start - enable scheduled reports\n\
     /stop - disable scheduled reports\n\
     /rsi - RSI report (optional timeframe, e.g. /rsi 4h)\n\
     /ema - EMA distance report\n\
     /fng - fear & greed index\n\
     /premium - spot premium report\n\
     /indicator - comprehensive analysis\n\
     /status - current status\n\
     /help - this message"
}
