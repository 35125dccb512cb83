//! Applies priority classes to live processes

use crate::policy::Priority;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriorityError {
    #[error("process {0} no longer exists")]
    NotFound(u32),
    #[error("permission denied changing priority of process {0}")]
    PermissionDenied(u32),
    #[error("changing process priority is not supported on this platform")]
    Unsupported,
    #[error("failed to change priority of process {pid}: {source}")]
    Os {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

pub trait PriorityControl: Send + Sync {
    fn set_priority(&self, pid: u32, priority: Priority) -> Result<(), PriorityError>;
}

/// Nice value used for each priority class.
pub fn nice_value(priority: Priority) -> i32 {
    match priority {
        Priority::Normal => 0,
        Priority::Idle => 19,
    }
}

/// `setpriority(2)`-backed control for the host OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsPriorityControl;

impl OsPriorityControl {
    pub fn new() -> Self {
        Self
    }

    #[cfg(unix)]
    fn os_error(pid: u32, err: std::io::Error) -> PriorityError {
        match err.raw_os_error() {
            Some(libc::ESRCH) => PriorityError::NotFound(pid),
            Some(libc::EPERM) | Some(libc::EACCES) => PriorityError::PermissionDenied(pid),
            _ => PriorityError::Os { pid, source: err },
        }
    }
}

impl PriorityControl for OsPriorityControl {
    #[cfg(unix)]
    fn set_priority(&self, pid: u32, priority: Priority) -> Result<(), PriorityError> {
        let res = unsafe {
            libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, nice_value(priority))
        };
        if res == 0 {
            Ok(())
        } else {
            Err(Self::os_error(pid, std::io::Error::last_os_error()))
        }
    }

    #[cfg(not(unix))]
    fn set_priority(&self, _pid: u32, _priority: Priority) -> Result<(), PriorityError> {
        Err(PriorityError::Unsupported)
    }
}
