//! Real-time scheduling helpers (Linux SCHED_FIFO + mlockall; macOS mlockall).

use crate::cli::RtLock;
use std::sync::OnceLock;
use tracing::{info, warn};

static RT_ONCE: OnceLock<()> = OnceLock::new();

#[cfg(unix)]
fn is_retryable_memlock_error(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
}

#[cfg(unix)]
fn mlockall(flags: libc::c_int) -> std::io::Result<()> {
    let rc = unsafe { libc::mlockall(flags) };
    if rc != 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(unix)]
fn try_apply_mem_lock(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE};

    let err = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => match mlockall(MCL_CURRENT) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        },
        RtLock::All => match mlockall(MCL_CURRENT | MCL_FUTURE) {
            Ok(()) => return Ok(()),
            // Fall back to resident pages only
            Err(e) if is_retryable_memlock_error(&e) => match mlockall(MCL_CURRENT) {
                Ok(()) => {
                    warn!(error = %e, "mlockall(current|future) failed; locked current pages only");
                    return Ok(());
                }
                Err(e2) => e2,
            },
            Err(e) => e,
        },
    };
    let mut msg = format!("mlockall failed: {err}");
    if is_retryable_memlock_error(&err) {
        msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

#[cfg(target_os = "linux")]
fn try_apply_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    let (min, max) = unsafe {
        let min = sched_get_priority_min(SCHED_FIFO);
        let max = sched_get_priority_max(SCHED_FIFO);
        if min < 0 || max < 0 { (1, 99) } else { (min, max) }
    };
    let prio_val = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param {
        sched_priority: prio_val,
    };
    let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        eyre::bail!(
            "sched_setscheduler(SCHED_FIFO, {prio_val}) failed: {err}; hint: needs CAP_SYS_NICE or root"
        );
    }
    Ok(prio_val)
}

/// Apply real-time settings once per process. Failures are logged, never fatal.
pub fn setup_rt_once(rt: bool, prio: Option<i32>, lock: RtLock) {
    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        #[cfg(unix)]
        {
            match try_apply_mem_lock(lock) {
                Ok(()) => info!(?lock, "RT: memory lock applied"),
                Err(err) => warn!(error = %err, "RT: memory lock not applied"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = lock;
        }
        #[cfg(target_os = "linux")]
        {
            match try_apply_fifo_priority(prio) {
                Ok(p) => info!(priority = p, "RT: SCHED_FIFO enabled"),
                Err(err) => warn!(error = %err, "RT: SCHED_FIFO not applied"),
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = prio;
            warn!("RT: SCHED_FIFO is only supported on Linux");
        }
    });
}
