// System information collection

use crate::service::types::{MemoryInfo, SystemInfo};
use std::time::Instant;

fn hostname() -> Option<String> {
    ["/proc/sys/kernel/hostname", "/etc/hostname"]
        .iter()
        .find_map(|path| std::fs::read_to_string(path).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a `/proc/meminfo` style line value in kB into bytes
fn meminfo_bytes(content: &str, key: &str) -> Option<u64> {
    content
        .lines()
        .find(|line| line.starts_with(key) && line[key.len()..].starts_with(':'))
        .and_then(|line| line[key.len() + 1..].split_whitespace().next())
        .and_then(|v| v.parse::<u64>().ok())
        .map(|kb| kb * 1024)
}

fn memory_from(content: &str) -> MemoryInfo {
    let total = meminfo_bytes(content, "MemTotal");
    let available = meminfo_bytes(content, "MemAvailable");
    MemoryInfo {
        total,
        available,
        free: meminfo_bytes(content, "MemFree"),
        used: total.zip(available).map(|(t, a)| t.saturating_sub(a)),
    }
}

fn memory() -> MemoryInfo {
    memory_from(&std::fs::read_to_string("/proc/meminfo").unwrap_or_default())
}

/// First `model name` in `/proc/cpuinfo`
fn cpu_model_from(content: &str) -> Option<String> {
    content
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "model name")
        .map(|(_, value)| value.trim().to_string())
        .filter(|model| !model.is_empty())
}

fn cpu_model() -> Option<String> {
    std::fs::read_to_string("/proc/cpuinfo")
        .ok()
        .and_then(|content| cpu_model_from(&content))
}

/// Interface names from `/sys/class/net`, sorted
fn network_interfaces() -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir("/sys/class/net")
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Snapshot of host and process facts
pub fn collect(started: Instant, spawn_mode: &str) -> SystemInfo {
    SystemInfo {
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        family: std::env::consts::FAMILY.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        hostname: hostname(),
        pid: std::process::id(),
        cwd: std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        uptime_secs: started.elapsed().as_secs(),
        cpu_cores: std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        cpu_model: cpu_model(),
        memory: memory(),
        network_interfaces: network_interfaces(),
        spawn_mode: spawn_mode.to_string(),
        timestamp: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meminfo_parse() {
        let content = "MemTotal:       16303884 kB\nMemFree:         1234 kB\nMemAvailable:    8000000 kB\n";
        assert_eq!(meminfo_bytes(content, "MemTotal"), Some(16303884 * 1024));
        assert_eq!(meminfo_bytes(content, "MemAvailable"), Some(8000000 * 1024));
        assert_eq!(meminfo_bytes(content, "Mem"), None);
        assert_eq!(meminfo_bytes(content, "SwapTotal"), None);
    }

    #[test]
    fn test_memory_from_meminfo() {
        let content = "MemTotal:       1000 kB\nMemFree:         100 kB\nMemAvailable:    400 kB\n";
        let memory = memory_from(content);
        assert_eq!(memory.total, Some(1000 * 1024));
        assert_eq!(memory.free, Some(100 * 1024));
        assert_eq!(memory.available, Some(400 * 1024));
        assert_eq!(memory.used, Some(600 * 1024));

        let memory = memory_from("");
        assert_eq!(memory.total, None);
        assert_eq!(memory.used, None);
    }

    #[test]
    fn test_cpu_model() {
        let content = "processor\t: 0\nvendor_id\t: GenuineIntel\nmodel\t\t: 85\nmodel name\t: Intel(R) Xeon(R) CPU @ 2.00GHz\n\nprocessor\t: 1\nmodel name\t: other\n";
        assert_eq!(
            cpu_model_from(content).as_deref(),
            Some("Intel(R) Xeon(R) CPU @ 2.00GHz")
        );
        assert_eq!(cpu_model_from("processor\t: 0\nmodel\t: 85\n"), None);
    }

    #[test]
    fn test_collect() {
        let info = collect(Instant::now(), "direct");
        assert_eq!(info.pid, std::process::id());
        assert!(info.cpu_cores >= 1);
        assert_eq!(info.spawn_mode, "direct");
        assert!(!info.platform.is_empty());
    }
}
