//! Threshold alerting
//!
//! - `threshold`: turns a sample into zero or more alert events
//! - `dispatcher`: renders and delivers each event

mod dispatcher;
mod threshold;

pub use dispatcher::{AlertDispatcher, AlertMessage, AlertTransport, SmtpTransport};
pub use threshold::ThresholdEvaluator;
