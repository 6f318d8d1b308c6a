pub mod diagnostics;
pub mod errors;
pub mod id;

pub use diagnostics::{Diagnostic, DiagnosticLevel, DiagnosticSink, MemorySink, TracingSink};
pub use errors::{ConfigError, DevServerError, IpcError, PositronError, WindowError};
pub use id::WindowId;

pub type Result<T> = std::result::Result<T, PositronError>;
