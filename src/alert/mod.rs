pub mod rules;
pub mod sink;

pub use rules::{failure_message, FailureAlertPolicy};
pub use sink::{AlertSink, StdoutSink, TelegramSink};
