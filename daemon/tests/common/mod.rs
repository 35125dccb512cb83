#![allow(dead_code)]

use allocator_daemon::collector::{HostSample, ProcessSample, SampleError, Sampler};
use allocator_daemon::executor::{PriorityControl, PriorityError};
use allocator_daemon::policy::Priority;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

pub fn sample(pid: u32, name: &str, cpu_percent: f64, memory_percent: f64) -> ProcessSample {
    ProcessSample {
        pid,
        name: name.to_string(),
        cpu_percent,
        memory_percent,
    }
}

/// Sampler returning whatever processes the test last set.
pub struct FakeSampler {
    pub host: HostSample,
    pub boot_time: u64,
    processes: Mutex<Vec<ProcessSample>>,
    fail: Mutex<bool>,
}

impl FakeSampler {
    pub fn new(processes: Vec<ProcessSample>) -> Self {
        Self {
            host: HostSample {
                cpu_percent: 12.5,
                memory_percent: 40.0,
            },
            boot_time: 0,
            processes: Mutex::new(processes),
            fail: Mutex::new(false),
        }
    }

    pub fn with_boot_time(mut self, boot_time: u64) -> Self {
        self.boot_time = boot_time;
        self
    }

    pub fn set_processes(&self, processes: Vec<ProcessSample>) {
        *self.processes.lock() = processes;
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    fn check(&self) -> Result<(), SampleError> {
        if *self.fail.lock() {
            return Err(SampleError::Parse {
                path: "/proc/stat",
                detail: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

impl Sampler for FakeSampler {
    fn sample_host(&self) -> Result<HostSample, SampleError> {
        self.check()?;
        Ok(self.host)
    }

    fn sample_processes(&self) -> Result<Vec<ProcessSample>, SampleError> {
        self.check()?;
        Ok(self.processes.lock().clone())
    }

    fn boot_time(&self) -> Result<u64, SampleError> {
        self.check()?;
        Ok(self.boot_time)
    }
}

/// Priority control that records every write instead of touching the OS.
#[derive(Default)]
pub struct RecordingControl {
    writes: Mutex<Vec<(u32, Priority)>>,
    current: Mutex<HashMap<u32, Priority>>,
    failing: Mutex<HashSet<u32>>,
}

impl RecordingControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, pid: u32) {
        self.failing.lock().insert(pid);
    }

    pub fn writes(&self) -> Vec<(u32, Priority)> {
        self.writes.lock().clone()
    }

    pub fn priority_of(&self, pid: u32) -> Priority {
        self.current
            .lock()
            .get(&pid)
            .copied()
            .unwrap_or(Priority::Normal)
    }

    pub fn set_initial(&self, pid: u32, priority: Priority) {
        self.current.lock().insert(pid, priority);
    }
}

impl PriorityControl for RecordingControl {
    fn set_priority(&self, pid: u32, priority: Priority) -> Result<(), PriorityError> {
        if self.failing.lock().contains(&pid) {
            return Err(PriorityError::NotFound(pid));
        }
        self.writes.lock().push((pid, priority));
        self.current.lock().insert(pid, priority);
        Ok(())
    }
}
