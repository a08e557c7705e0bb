//! Host CPU helpers
//!
//! The measurement protocol assumes a single logical processor. Pinning the
//! benchmark thread before building the kernel keeps every kernel thread on
//! one host CPU, since spawned threads inherit the creator's affinity.

use crate::error::{Error, Result};
use tracing::debug;

/// Pin the calling OS thread to host CPU `cpu`
#[cfg(target_os = "linux")]
pub fn pin_current_thread(cpu: usize) -> Result<()> {
    if cpu >= libc::CPU_SETSIZE as usize {
        return Err(Error::InvalidConfig(format!("CPU {} out of range", cpu)));
    }

    // SAFETY: cpu_set_t is plain data and `cpu` is below CPU_SETSIZE
    let ret = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(cpu, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };
    if ret != 0 {
        return Err(Error::Affinity {
            cpu,
            source: std::io::Error::last_os_error(),
        });
    }

    debug!(cpu, tid = get_tid(), "pinned thread");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(cpu: usize) -> Result<()> {
    // Affinity is only supported on Linux; run unpinned elsewhere
    debug!(cpu, "CPU pinning not supported on this platform");
    Ok(())
}

/// Get the current OS thread ID (TID)
#[cfg(target_os = "linux")]
pub fn get_tid() -> u32 {
    unsafe { libc::syscall(libc::SYS_gettid) as u32 }
}

#[cfg(not(target_os = "linux"))]
pub fn get_tid() -> u32 {
    std::process::id()
}
