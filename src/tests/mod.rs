//! Task-creation tests — clone/fork/vfork.

mod clone_tests;

use crate::fs::OpenFile;
use crate::kernel::Kernel;
use crate::task::Task;
use alloc::sync::Arc;

/// A kernel with one initial task that has a few mapped pages, some page
/// content, one open file and a recognizable CPU snapshot.
pub fn test_kernel() -> (Kernel, Arc<Task>) {
    let kernel = Kernel::new();
    let init = kernel.tasks.spawn_init();

    {
        let mem = init.mem();
        let mut image = mem.lock();
        image.map_zeroed(0, 16).unwrap();
        image.write_bytes(0x100, b"guest data").unwrap();
    }
    {
        let files = init.files();
        files.lock().install(OpenFile::new("/dev/tty")).unwrap();
    }
    init.with_cpu(|cpu| {
        cpu.eip = 0x0804_8000;
        cpu.esp = 0xbfff_f000;
        cpu.eax = 120; // clone syscall number still in eax
    });

    (kernel, init)
}
