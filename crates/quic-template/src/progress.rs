//! The streaming consumer contract for `TemplateSetup` (spec §4.C, §6).

use crate::model::{LogLevel, TemplateSetupResult};
use async_trait::async_trait;

/// Receives the interleaved `Log | Error | Result` sequence a
/// `TemplateSetup` call emits. Cancelling the stream on the caller's side
/// does not interrupt work already committed to disk; it just stops
/// delivery.
#[async_trait]
pub trait ProgressSink: Send {
    async fn log(&mut self, line: &str, level: LogLevel);
    async fn error(&mut self, step: &str, message: &str);
    async fn result(&mut self, result: TemplateSetupResult);
}
