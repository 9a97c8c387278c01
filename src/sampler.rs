use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use crate::error::{FarmError, Result};

/// Obtains a current load figure for a host. May block on network I/O for
/// remote hosts. Loads are volatile: callers must resample every pass and
/// never cache a result.
#[async_trait]
pub trait LoadSampler {
    async fn sample(&self, host: &str) -> Result<f64>;
}

/// A pool entry refers to this machine if it matches the local hostname,
/// its first label, or the usual loopback name.
pub fn is_local_host(local_host: &str, host: &str) -> bool {
    host == "localhost" || host == local_host || Some(host) == local_host.split('.').next()
}

/// Samples the short-term load average, locally from the OS and remotely by
/// running `uptime` over a remote shell.
#[derive(Debug, Clone)]
pub struct OsLoadSampler {
    local_host: String,
    remote_shell: String,
}

impl OsLoadSampler {
    pub fn new(local_host: String, remote_shell: String) -> Self {
        Self {
            local_host,
            remote_shell,
        }
    }

    pub fn is_local(&self, host: &str) -> bool {
        is_local_host(&self.local_host, host)
    }

    async fn sample_local(&self) -> Result<f64> {
        // First field of /proc/loadavg is the one-minute average.
        if let Ok(text) = tokio::fs::read_to_string("/proc/loadavg").await {
            if let Some(first) = text.split_whitespace().next() {
                if let Ok(load) = first.parse::<f64>() {
                    return Ok(load);
                }
            }
        }
        // No procfs (or unreadable): fall back to parsing local uptime.
        let output = Command::new("uptime").output().await.map_err(|e| {
            FarmError::Sample {
                host: self.local_host.clone(),
                reason: format!("uptime failed: {e}"),
            }
        })?;
        parse_load_average(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            FarmError::Sample {
                host: self.local_host.clone(),
                reason: "no load average in uptime output".to_string(),
            }
        })
    }

    async fn sample_remote(&self, host: &str) -> Result<f64> {
        let output = Command::new(&self.remote_shell)
            .arg(host)
            .arg("uptime")
            .output()
            .await
            .map_err(|e| FarmError::Sample {
                host: host.to_string(),
                reason: format!("{} failed: {e}", self.remote_shell),
            })?;
        if !output.status.success() {
            return Err(FarmError::Sample {
                host: host.to_string(),
                reason: format!("{} exited with {}", self.remote_shell, output.status),
            });
        }
        parse_load_average(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            FarmError::Sample {
                host: host.to_string(),
                reason: "no load average in uptime output".to_string(),
            }
        })
    }
}

#[async_trait]
impl LoadSampler for OsLoadSampler {
    async fn sample(&self, host: &str) -> Result<f64> {
        if self.is_local(host) {
            self.sample_local().await
        } else {
            self.sample_remote(host).await
        }
    }
}

static LOAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    // First run of digits/decimal point following an "average" marker.
    Regex::new(r"(?i)average[^0-9]*([0-9][0-9.]*)").expect("load average pattern is valid")
});

/// Extract a load figure from free-form `uptime`-style status text.
pub fn parse_load_average(text: &str) -> Option<f64> {
    let captures = LOAD_RE.captures(text)?;
    captures[1].trim_end_matches('.').parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_linux_uptime() {
        let text = " 17:21:05 up 42 days,  3:14,  5 users,  load average: 0.52, 0.58, 0.59";
        assert_eq!(parse_load_average(text), Some(0.52));
    }

    #[test]
    fn parses_bsd_uptime() {
        let text = "17:21  up 3 days, 5 users, load averages: 1.32 1.40 1.41";
        assert_eq!(parse_load_average(text), Some(1.32));
    }

    #[test]
    fn parses_integer_load() {
        assert_eq!(parse_load_average("load average: 3, 2, 1"), Some(3.0));
    }

    #[test]
    fn marker_is_case_insensitive() {
        assert_eq!(parse_load_average("Load Average: 0.07"), Some(0.07));
    }

    #[test]
    fn no_marker_is_no_match() {
        assert_eq!(parse_load_average("17:21:05 up 42 days, 5 users"), None);
        assert_eq!(parse_load_average(""), None);
    }

    #[test]
    fn digits_before_marker_ignored() {
        let text = "3 users, load average: 0.10, 0.20, 0.30";
        assert_eq!(parse_load_average(text), Some(0.10));
    }

    #[test]
    fn local_host_detection() {
        let sampler = OsLoadSampler::new("build7.farm.example.com".to_string(), "ssh".to_string());
        assert!(sampler.is_local("localhost"));
        assert!(sampler.is_local("build7"));
        assert!(sampler.is_local("build7.farm.example.com"));
        assert!(!sampler.is_local("build8"));
    }
}
