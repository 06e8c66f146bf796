//! Real-time scheduling for the control loop (Linux SCHED_FIFO / affinity / mlockall).
//!
//! Every step is best effort: failures are logged and the run continues with
//! normal scheduling.

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
/// Capacity of cpu_set_t in CPU indices (bits).
const MAX_CPUSET_BITS: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

#[cfg(target_os = "linux")]
fn last_os_error<T>(rc: libc::c_int, ok: T) -> std::io::Result<T> {
    if rc == 0 {
        Ok(ok)
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(target_os = "linux")]
fn apply_mem_lock(lock: RtLock) -> std::io::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};
    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => MCL_CURRENT,
        RtLock::All => MCL_CURRENT | MCL_FUTURE,
    };
    let rc = unsafe { mlockall(flags) };
    match last_os_error(rc, ()) {
        // locking future pages can exceed RLIMIT_MEMLOCK; settle for current
        Err(e) if lock == RtLock::All && matches!(e.raw_os_error(), Some(libc::EPERM | libc::ENOMEM)) => {
            tracing::warn!(error = %e, "mlockall(current|future) failed; retrying current only");
            last_os_error(unsafe { mlockall(MCL_CURRENT) }, ())
        }
        other => other,
    }
}

#[cfg(target_os = "linux")]
fn apply_fifo_priority(prio: Option<i32>) -> std::io::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param, sched_setscheduler};
    let (min, max) = unsafe { (sched_get_priority_min(SCHED_FIFO), sched_get_priority_max(SCHED_FIFO)) };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    let wanted = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param {
        sched_priority: wanted,
    };
    last_os_error(unsafe { sched_setscheduler(0, SCHED_FIFO, &param) }, wanted)
}

#[cfg(target_os = "linux")]
fn apply_affinity(cpu: usize) -> eyre::Result<()> {
    use libc::{CPU_ISSET, CPU_SET, CPU_ZERO, cpu_set_t, sched_getaffinity, sched_setaffinity};
    if cpu >= MAX_CPUSET_BITS {
        eyre::bail!("requested CPU {cpu} exceeds cpu_set_t capacity {MAX_CPUSET_BITS}");
    }
    let size = std::mem::size_of::<cpu_set_t>();
    let mut allowed: cpu_set_t = unsafe { std::mem::zeroed() };
    unsafe { CPU_ZERO(&mut allowed) };
    last_os_error(unsafe { sched_getaffinity(0, size, &mut allowed) }, ())?;
    if !unsafe { CPU_ISSET(cpu, &allowed) } {
        eyre::bail!("CPU {cpu} not permitted by current affinity mask");
    }
    let mut desired: cpu_set_t = unsafe { std::mem::zeroed() };
    unsafe {
        CPU_ZERO(&mut desired);
        CPU_SET(cpu, &mut desired);
    }
    last_os_error(unsafe { sched_setaffinity(0, size, &desired) }, ())?;
    Ok(())
}

#[cfg(target_os = "linux")]
pub fn setup_rt_once(rt: bool, prio: Option<i32>, lock: RtLock, cpu: Option<usize>) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();
    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        match apply_mem_lock(lock) {
            Ok(()) => tracing::info!(?lock, "rt: memory lock"),
            Err(e) => tracing::warn!(error = %e, ?lock, "rt: mlockall failed (needs CAP_IPC_LOCK and 'ulimit -l')"),
        }
        match apply_fifo_priority(prio) {
            Ok(p) => tracing::info!(priority = p, "rt: SCHED_FIFO"),
            Err(e) => tracing::warn!(error = %e, "rt: SCHED_FIFO failed (needs CAP_SYS_NICE or root)"),
        }
        let cpu = cpu.unwrap_or(0);
        match apply_affinity(cpu) {
            Ok(()) => tracing::info!(cpu, "rt: pinned"),
            Err(e) => tracing::warn!(error = %e, "rt: affinity not applied"),
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(rt: bool, _prio: Option<i32>, _lock: RtLock, _cpu: Option<usize>) {
    if rt {
        tracing::warn!("rt: real-time mode is only supported on Linux; ignoring --rt");
    }
}
