//! C++ backend for compiled blueprint classes
//!
//! Terms become expressions, statements become lines, function graphs become either straight-line
//! code or a state dispatch loop, and the assembler stitches the results into a header and a body.

pub mod assembler;
pub mod context;
pub mod control_flow;
pub mod error;
pub mod logger;
pub mod names;
pub mod native_types;
pub mod options;
pub mod statement;
pub mod term;

pub use assembler::{FunctionReport, GeneratedClass, generate_class, generate_functions};
pub use control_flow::FlowStrategy;
pub use error::{EmitError, Result};
pub use logger::{BufferedLogger, LogLevel, Logger, LoggerRef, NullLogger, StderrLogger};
pub use options::BackendOptions;
