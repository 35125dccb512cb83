use super::{HostSample, ProcessSample, SampleError, Sampler};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

const PROC_STAT: &str = "/proc/stat";
const PROC_MEMINFO: &str = "/proc/meminfo";
/// Longest name the kernel keeps in `comm` (TASK_COMM_LEN - 1).
const COMM_LEN: usize = 15;

#[derive(Clone, Copy)]
struct CpuTimes {
    busy: u64,
    total: u64,
}

struct MemInfo {
    total_kb: u64,
    available_kb: u64,
}

struct RawProcess {
    name: String,
    total_ticks: u64, // utime + stime
    rss_pages: u64,
}

/// Stateless `/proc` sampler. Every call measures its own window, so
/// concurrent callers never disturb each other's readings.
pub struct LinuxSampler {
    page_size: u64,
    clock_ticks: u64,
    window: Duration,
}

impl LinuxSampler {
    pub fn new(window: Duration) -> Self {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) }.max(1) as u64;
        let clock_ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) }.max(1) as u64;
        Self {
            page_size,
            clock_ticks,
            window,
        }
    }

    fn read(path: &'static str) -> Result<String, SampleError> {
        fs::read_to_string(path).map_err(|source| SampleError::Read { path, source })
    }

    fn cpu_times() -> Result<CpuTimes, SampleError> {
        let stat = Self::read(PROC_STAT)?;
        let line = stat
            .lines()
            .find(|l| l.starts_with("cpu "))
            .ok_or_else(|| SampleError::Parse {
                path: PROC_STAT,
                detail: "missing aggregate cpu line".to_string(),
            })?;
        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .map(|f| f.parse().unwrap_or(0))
            .collect();
        if fields.len() < 4 {
            return Err(SampleError::Parse {
                path: PROC_STAT,
                detail: format!("expected at least 4 cpu fields, got {}", fields.len()),
            });
        }
        // guest and guest_nice are already folded into user and nice
        let total: u64 = fields.iter().take(8).sum();
        let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
        Ok(CpuTimes {
            busy: total.saturating_sub(idle),
            total,
        })
    }

    fn mem_info() -> Result<MemInfo, SampleError> {
        let content = Self::read(PROC_MEMINFO)?;
        let field = |key: &str| {
            content
                .lines()
                .find_map(|l| l.strip_prefix(key))
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|v| v.parse::<u64>().ok())
        };
        let total_kb = field("MemTotal:").ok_or_else(|| SampleError::Parse {
            path: PROC_MEMINFO,
            detail: "missing MemTotal".to_string(),
        })?;
        let available_kb = match field("MemAvailable:") {
            Some(v) => v,
            // kernels before 3.14
            None => field("MemFree:").unwrap_or(0)
                + field("Buffers:").unwrap_or(0)
                + field("Cached:").unwrap_or(0),
        };
        Ok(MemInfo {
            total_kb,
            available_kb,
        })
    }

    fn parse_process(pid: u32) -> Option<RawProcess> {
        let stat = fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
        // comm may contain spaces and parentheses
        let open = stat.find('(')?;
        let close = stat.rfind(')')?;
        let comm = stat.get(open + 1..close)?;
        let rest: Vec<&str> = stat.get(close + 1..)?.split_whitespace().collect();
        if rest.len() < 22 {
            return None;
        }
        let utime: u64 = rest[11].parse().unwrap_or(0);
        let stime: u64 = rest[12].parse().unwrap_or(0);
        let rss_pages: u64 = rest[21].parse().unwrap_or(0);
        Some(RawProcess {
            name: Self::full_name(pid, comm),
            total_ticks: utime + stime,
            rss_pages,
        })
    }

    /// `comm` is cut at 15 bytes; recover the full name from argv[0] when it
    /// extends the truncated one.
    fn full_name(pid: u32, comm: &str) -> String {
        if comm.len() < COMM_LEN {
            return comm.to_string();
        }
        fs::read(format!("/proc/{}/cmdline", pid))
            .ok()
            .and_then(|cmdline| {
                let argv0 = cmdline.split(|b| *b == 0).next()?;
                let argv0 = String::from_utf8_lossy(argv0);
                let base = Path::new(argv0.as_ref()).file_name()?.to_str()?.to_string();
                base.starts_with(comm).then_some(base)
            })
            .unwrap_or_else(|| comm.to_string())
    }

    /// One pass over `/proc`. Processes that exit mid-scan are skipped.
    fn scan() -> Result<HashMap<u32, RawProcess>, SampleError> {
        let entries = fs::read_dir("/proc").map_err(|source| SampleError::Read {
            path: "/proc",
            source,
        })?;
        Ok(entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
            .filter_map(|pid| Some((pid, Self::parse_process(pid)?)))
            .collect())
    }

    fn cpu_percent(&self, tick_delta: u64, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            let cpu_seconds = tick_delta as f64 / self.clock_ticks as f64;
            (cpu_seconds / secs) * 100.0
        } else {
            0.0
        }
    }
}

impl Sampler for LinuxSampler {
    fn sample_host(&self) -> Result<HostSample, SampleError> {
        let before = Self::cpu_times()?;
        std::thread::sleep(self.window);
        let after = Self::cpu_times()?;

        let total_delta = after.total.saturating_sub(before.total);
        let busy_delta = after.busy.saturating_sub(before.busy);
        let cpu_percent = if total_delta == 0 {
            0.0
        } else {
            busy_delta as f64 / total_delta as f64 * 100.0
        };

        let mem = Self::mem_info()?;
        let memory_percent = if mem.total_kb == 0 {
            0.0
        } else {
            mem.total_kb.saturating_sub(mem.available_kb) as f64 / mem.total_kb as f64 * 100.0
        };

        Ok(HostSample {
            cpu_percent,
            memory_percent,
        })
    }

    fn sample_processes(&self) -> Result<Vec<ProcessSample>, SampleError> {
        let before = Self::scan()?;
        let started = Instant::now();
        std::thread::sleep(self.window);
        let after = Self::scan()?;
        let elapsed = started.elapsed();

        let mem_total_bytes = Self::mem_info()?.total_kb * 1024;
        let mut processes: Vec<ProcessSample> = after
            .into_iter()
            .map(|(pid, raw)| {
                // started inside the window: no baseline to compare against
                let cpu_percent = before
                    .get(&pid)
                    .map(|prev| {
                        self.cpu_percent(raw.total_ticks.saturating_sub(prev.total_ticks), elapsed)
                    })
                    .unwrap_or(0.0);
                let memory_percent = if mem_total_bytes == 0 {
                    0.0
                } else {
                    (raw.rss_pages * self.page_size) as f64 / mem_total_bytes as f64 * 100.0
                };
                ProcessSample {
                    pid,
                    name: raw.name,
                    cpu_percent,
                    memory_percent,
                }
            })
            .collect();
        processes.sort_by_key(|p| p.pid);
        Ok(processes)
    }

    fn boot_time(&self) -> Result<u64, SampleError> {
        let stat = Self::read(PROC_STAT)?;
        stat.lines()
            .find_map(|l| l.strip_prefix("btime "))
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| SampleError::Parse {
                path: PROC_STAT,
                detail: "missing btime".to_string(),
            })
    }
}
