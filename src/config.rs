use crate::error::{FarmError, Result};

/// Environment variable naming the host pool (`host[:count]` tokens).
pub const ENV_HOSTS: &str = "FARMRUN_HOSTS";
/// Environment variable naming the color palette (color names).
pub const ENV_COLORS: &str = "FARMRUN_COLORS";
/// Environment variable carrying the global load ceiling.
pub const ENV_MAXLOAD: &str = "FARMRUN_MAXLOAD";
/// Environment variable pointing at the environment-initialization file
/// sourced on remote hosts before running the command.
pub const ENV_SETUP: &str = "FARMRUN_SETUP";
/// Environment variable naming the marker variable whose presence on the
/// remote side means the environment is already bootstrapped.
pub const ENV_SETUP_MARKER: &str = "FARMRUN_SETUP_MARKER";
/// Environment variable selecting the remote-shell program.
pub const ENV_RSH: &str = "FARMRUN_RSH";

const DEFAULT_SETUP_MARKER: &str = "FARMRUN_ENV";
const DEFAULT_REMOTE_SHELL: &str = "ssh";

/// Site configuration read from the environment.
///
/// The host pool and palette stay as raw strings here; parsing them is the
/// pool and palette modules' job. The load ceiling is validated eagerly
/// because a malformed value must fail before the dispatch loop starts.
#[derive(Debug, Clone)]
pub struct Config {
    pub hosts: Option<String>,
    pub colors: String,
    pub max_load: Option<u32>,
    pub setup_file: Option<String>,
    pub setup_marker: String,
    pub remote_shell: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup, so tests do not
    /// have to mutate the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let max_load = match lookup(ENV_MAXLOAD) {
            None => None,
            Some(raw) => {
                let n: u32 = raw.trim().parse().map_err(|_| {
                    FarmError::Config(format!("{ENV_MAXLOAD} must be a positive integer, got {raw:?}"))
                })?;
                if n == 0 {
                    return Err(FarmError::Config(format!(
                        "{ENV_MAXLOAD} must be at least 1"
                    )));
                }
                Some(n)
            }
        };

        Ok(Self {
            hosts: lookup(ENV_HOSTS).filter(|s| !s.trim().is_empty()),
            colors: lookup(ENV_COLORS).unwrap_or_default(),
            max_load,
            setup_file: lookup(ENV_SETUP).filter(|s| !s.trim().is_empty()),
            setup_marker: lookup(ENV_SETUP_MARKER)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SETUP_MARKER.to_string()),
            remote_shell: lookup(ENV_RSH)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REMOTE_SHELL.to_string()),
        })
    }

    /// The load ceiling is mandatory for dispatch but not for `--count`.
    pub fn require_max_load(&self) -> Result<u32> {
        self.max_load.ok_or_else(|| {
            FarmError::Config(format!("{ENV_MAXLOAD} is not set; cannot dispatch"))
        })
    }
}
