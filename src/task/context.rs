//! Guest CPU register snapshot
//!
//! The register file of the emulated 32-bit x86 guest. `eax` carries a
//! syscall's return value: after `clone`/`fork` the child resumes with
//! `eax == 0` while the parent's call returns the child pid.

/// Saved guest CPU state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuState {
    /// Return value register (EAX)
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
    pub esi: u32,
    pub edi: u32,
    /// Base pointer (EBP)
    pub ebp: u32,
    /// Stack pointer (ESP)
    pub esp: u32,
    /// Instruction pointer (EIP)
    pub eip: u32,
    /// Flags register (EFLAGS)
    pub eflags: u32,
}

impl CpuState {
    pub const fn empty() -> Self {
        Self {
            eax: 0,
            ebx: 0,
            ecx: 0,
            edx: 0,
            esi: 0,
            edi: 0,
            ebp: 0,
            esp: 0,
            eip: 0,
            eflags: 0,
        }
    }

    /// Set the value the guest observes as the syscall's return.
    pub fn set_syscall_result(&mut self, value: u32) {
        self.eax = value;
    }
}
