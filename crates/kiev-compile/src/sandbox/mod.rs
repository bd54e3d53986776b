//! Sandbox: running the Kiev compiler in an isolated execution context.
//!
//! # Modules
//!
//! - [`context`]: `IsolatedContext`, single-use and scoped to the tool classpath
//! - [`entry_point`]: `CompilerEntryPoint` / `EntryPointLoader` capability traits
//! - [`jvm`]: `JvmToolLoader`, the child-JVM implementation

pub mod context;
pub mod entry_point;
pub mod jvm;

pub use context::IsolatedContext;
pub use entry_point::{
    CompilerEntryPoint, EntryPointLoader, RunStatus, SourceMapping, ToolFault, ABORT_SIGNAL,
    ENTRY_POINT,
};
pub use jvm::JvmToolLoader;
