use std::collections::HashMap;

use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

/// Ticks per second of the counters in `/proc/stat`.
///
/// The kernel exposes these in `USER_HZ`, which is 100 on all mainstream architectures regardless
/// of the internal timer frequency. A few legacy ones (e.g. alpha) differ and will be misreported.
const USER_HZ: u64 = 100;
const MS_PER_TICK: u64 = 1000 / USER_HZ;

/// Information for a single logical processor.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Cpu {
    /// Brand string of the processor.
    pub model: String,
    /// Current clock speed in MHz.
    pub speed: u64,
    pub times: CpuTimes,
}

/// Cumulative time in milliseconds that a processor has spent in each state since boot.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub sys: u64,
    pub idle: u64,
    pub irq: u64,
}

/// The facts about a machine that can be asked for.
pub trait Facts {
    /// Returns one record per logical processor, in the order the OS lists them.
    fn cpus(&self) -> Vec<Cpu>;
    /// Total physical memory in bytes.
    fn total_memory(&self) -> u64;
    /// Memory in bytes that is available for new allocations without swapping.
    fn free_memory(&self) -> u64;
}

/// The machine this program is running on.
#[derive(Debug, Default, Clone, Copy)]
pub struct Host;

impl Facts for Host {
    fn cpus(&self) -> Vec<Cpu> {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::everything()),
        );

        let times = proc_stat().map(|s| parse_stat(&s)).unwrap_or_default();
        let speeds = proc_cpuinfo().map(|s| parse_cpuinfo_mhz(&s)).unwrap_or_default();

        system
            .cpus()
            .iter()
            .enumerate()
            .map(|(i, cpu)| {
                let model = match cpu.brand().trim() {
                    "" => "unknown".to_string(),
                    brand => brand.to_string(),
                };
                // Some virtualized hosts do not expose a scaling frequency.
                let speed = match cpu.frequency() {
                    0 => speeds.get(i).copied().unwrap_or(0),
                    mhz => mhz,
                };
                // Offline processors are absent from `/proc/stat`, so match on the label.
                let times = times.get(cpu.name()).copied().unwrap_or_default();
                Cpu { model, speed, times }
            })
            .collect()
    }

    fn total_memory(&self) -> u64 {
        memory().total_memory()
    }

    fn free_memory(&self) -> u64 {
        memory().available_memory()
    }
}

fn memory() -> System {
    System::new_with_specifics(
        RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
    )
}

#[cfg(target_os = "linux")]
fn proc_stat() -> Option<String> {
    read_procfs("/proc/stat", "reporting zero cpu times")
}

#[cfg(not(target_os = "linux"))]
fn proc_stat() -> Option<String> {
    None
}

#[cfg(target_os = "linux")]
fn proc_cpuinfo() -> Option<String> {
    read_procfs("/proc/cpuinfo", "no fallback cpu speed")
}

#[cfg(not(target_os = "linux"))]
fn proc_cpuinfo() -> Option<String> {
    None
}

/// Reads a procfs file, warning with the `consequence` of its absence if that fails.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn read_procfs(path: &str, consequence: &str) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            eprintln!("WARNING: could not read {path}, {consequence} ({e})");
            None
        }
    }
}

/// Parses the per-processor lines of `/proc/stat` into times keyed by their label (`cpu0`, ...).
///
/// The aggregate `cpu` line and all non-cpu lines are skipped.
fn parse_stat(s: &str) -> HashMap<String, CpuTimes> {
    let mut times = HashMap::new();
    for line in s.lines() {
        let mut fields = line.split_whitespace();
        let Some(label) = fields.next() else {
            continue;
        };
        let Some(Ok(_)) = label.strip_prefix("cpu").map(str::parse::<usize>) else {
            continue;
        };

        // Columns: user nice system idle iowait irq softirq steal guest guest_nice
        let ticks: Vec<u64> = fields.map(|v| v.parse().unwrap_or(0)).collect();
        let ms = |column: usize| ticks.get(column).copied().unwrap_or(0) * MS_PER_TICK;

        let cpu = CpuTimes { user: ms(0), nice: ms(1), sys: ms(2), idle: ms(3), irq: ms(5) };
        times.insert(label.to_string(), cpu);
    }
    times
}

/// Collects the `cpu MHz` entries of `/proc/cpuinfo` in processor order.
fn parse_cpuinfo_mhz(s: &str) -> Vec<u64> {
    s.lines()
        .filter_map(|line| line.split_once(':'))
        .filter(|(key, _)| key.trim() == "cpu MHz")
        .map(|(_, value)| value.trim().parse::<f64>().map(|mhz| mhz as u64).unwrap_or(0))
        .collect()
}
