//! Template initializer (spec §4.C): restore a physical backup into a new
//! ZFS dataset, reconfigure it as a standby template, bring it up under
//! systemd, and stream progress to the caller.

mod conf;
mod config;
mod engine;
mod error;
mod model;
mod port;
mod progress;

pub use config::TemplateEngineConfig;
pub use engine::{read_template_metadata, TemplateEngine};
pub use error::{Error, ErrorKind, Result};
pub use model::{LogLevel, LogLine, TemplateMetadata, TemplateSetupRequest, TemplateSetupResult};
pub use progress::ProgressSink;
