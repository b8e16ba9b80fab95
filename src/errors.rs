//! Kernel error taxonomy and errno mapping.
//!
//! Every failure in this crate is one of four cases, detected synchronously
//! and handed back across the syscall boundary as a negative errno. None is
//! retried internally and none is fatal to the emulator process.

/// Error type for task-creation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A flag or address combination this core does not emulate.
    /// Rejected outright rather than half-emulated.
    UnsupportedOperand,
    /// Task, memory or file-table allocation failed.
    ResourceExhausted,
    /// A guest address is not mapped/writable.
    InvalidAddress,
    /// A collaborator-specific duplication failure.
    ResourceUnavailable,
}

impl KernelError {
    /// The Linux errno value this error reports to the guest.
    pub const fn errno(self) -> i32 {
        match self {
            KernelError::UnsupportedOperand => EINVAL,
            KernelError::ResourceExhausted => ENOMEM,
            KernelError::InvalidAddress => EFAULT,
            KernelError::ResourceUnavailable => EAGAIN,
        }
    }

    /// Syscall return convention: negative errno.
    pub const fn to_syscall_ret(self) -> i32 {
        -self.errno()
    }
}

impl core::fmt::Display for KernelError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            KernelError::UnsupportedOperand => write!(f, "Unsupported operand"),
            KernelError::ResourceExhausted => write!(f, "Resource exhausted"),
            KernelError::InvalidAddress => write!(f, "Invalid address"),
            KernelError::ResourceUnavailable => write!(f, "Resource unavailable"),
        }
    }
}

pub type KernelResult<T> = Result<T, KernelError>;

pub const EAGAIN: i32 = 11;
pub const ENOMEM: i32 = 12;
pub const EFAULT: i32 = 14;
pub const EINVAL: i32 = 22;
