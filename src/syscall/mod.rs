//! System call entry points.

pub mod clone;

// Re-exports
pub use clone::{sys_clone, sys_fork, sys_vfork, CloneArgs, CloneFlags, SIGCHLD};
