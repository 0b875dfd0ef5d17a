//! System Metadata Collection
//!
//! Collects the host description stored in report metadata.
//!
//! Linux-specific data (CPU model, memory) gracefully degrades on other
//! platforms, returning "Unknown" or 0 values.

use crate::config::DiffBenchConfig;
use chrono::Utc;
use diffbench_report::{REPORT_SCHEMA_VERSION, ReportConfig, ReportMeta, SystemInfo};
use diffbench_runner::DiffProgram;

/// Build report metadata for a run of `programs` under `config`
pub fn build_report_meta(
    config: &DiffBenchConfig,
    programs: &[DiffProgram],
    base_seed: u64,
) -> anyhow::Result<ReportMeta> {
    let runner = &config.runner;
    Ok(ReportMeta {
        schema_version: REPORT_SCHEMA_VERSION,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        git_commit: git_commit(),
        base_seed,
        system: system_info(),
        config: ReportConfig {
            timeout_ms: config.timeout()?.as_millis() as u64,
            min_repetitions: runner.min_repetitions,
            max_repetitions: runner.max_repetitions,
            confidence_level: runner.confidence_level,
            max_median_error: runner.max_median_error,
            sample_field: runner.sample_field.clone(),
            num_regens: config.generation.num_regens,
            programs: programs.iter().map(|p| p.name.clone()).collect(),
        },
        cancelled: false,
    })
}

/// Current git commit of the working directory, if any
pub fn git_commit() -> Option<String> {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Describe the host running the benchmarks
pub fn system_info() -> SystemInfo {
    SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu: get_cpu_model().unwrap_or_else(|| "Unknown".to_string()),
        cpu_cores: num_cpus(),
        memory_gb: get_memory_gb().unwrap_or(0.0),
    }
}

/// Get CPU model name from /proc/cpuinfo (Linux only)
fn get_cpu_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("model name"))
                    .and_then(|l| l.split(':').nth(1))
                    .map(|s| s.trim().to_string())
            })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

fn num_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}

/// Get total system memory in GB (Linux only)
fn get_memory_gb() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("MemTotal"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(|kb| kb as f64 / 1024.0 / 1024.0)
            })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_info_is_populated() {
        let info = system_info();
        assert_eq!(info.os, std::env::consts::OS);
        assert!(info.cpu_cores >= 1);
        assert!(info.memory_gb >= 0.0);
    }

    #[test]
    fn test_meta_captures_runner_settings() {
        let config = DiffBenchConfig::default();
        let meta = build_report_meta(&config, &[DiffProgram::golden()], 17).unwrap();
        assert_eq!(meta.schema_version, REPORT_SCHEMA_VERSION);
        assert_eq!(meta.base_seed, 17);
        assert_eq!(meta.config.timeout_ms, 60_000);
        assert_eq!(meta.config.programs, vec!["diffutils".to_string()]);
        assert!(!meta.cancelled);
    }
}
