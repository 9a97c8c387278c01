use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::admission::accepts;
use crate::error::{FarmError, Result};
use crate::executor::CommandRunner;
use crate::palette::Palette;
use crate::pool::HostPool;
use crate::sampler::{is_local_host, LoadSampler};

/// One task's placement request, immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Opaque shell-level command string.
    pub command: String,
    /// Slot weight this task counts for, at least 1.
    pub weight: u32,
    /// Global load ceiling hosts are admitted against.
    pub limit: u32,
}

/// Terminal result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub host: String,
    pub exit_status: i32,
}

/// Drives the pool scan: sample, admit, execute on first acceptance.
///
/// Holds the loop's mutable state explicitly. The color index in particular
/// persists across passes, so color assignment keeps rotating instead of
/// restarting each time the pool is exhausted.
pub struct DispatchLoop<S, R> {
    pool: HostPool,
    palette: Palette,
    request: DispatchRequest,
    local_host: String,
    sampler: S,
    runner: R,
    backoff: Duration,
    color_index: usize,
}

impl<S: LoadSampler, R: CommandRunner> DispatchLoop<S, R> {
    pub fn new(
        pool: HostPool,
        palette: Palette,
        request: DispatchRequest,
        local_host: String,
        sampler: S,
        runner: R,
    ) -> Self {
        Self {
            pool,
            palette,
            request,
            local_host,
            sampler,
            runner,
            backoff: Duration::from_secs(1),
            color_index: 0,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Scan the pool until a slot is claimed or the token is cancelled.
    ///
    /// Returns `Ok(None)` only on cancellation; there is no "pool exhausted"
    /// outcome. A host whose load cannot be sampled counts as rejected for
    /// the current pass and never aborts the loop.
    pub async fn run(&mut self, token: CancellationToken) -> Result<Option<DispatchOutcome>> {
        loop {
            for group in self.pool.groups().to_vec() {
                if token.is_cancelled() {
                    return Ok(None);
                }

                let color = self.palette.color_at(self.color_index);
                self.color_index += 1;

                // Loads are volatile: sampled fresh on every visit.
                let load = match self.sampler.sample(&group.host).await {
                    Ok(load) => load,
                    Err(e) => {
                        tracing::debug!(host = %group.host, error = %e, "Load sample failed, skipping host");
                        continue;
                    }
                };

                if !accepts(load, self.request.weight, self.request.limit) {
                    tracing::debug!(
                        host = %group.host,
                        load,
                        weight = self.request.weight,
                        limit = self.request.limit,
                        "Host over load ceiling"
                    );
                    continue;
                }

                tracing::info!(host = %group.host, load, "Slot accepted");
                let local = is_local_host(&self.local_host, &group.host);
                let exit_status = self
                    .runner
                    .run(&group.host, local, &self.request.command, color)
                    .await?;
                return Ok(Some(DispatchOutcome {
                    host: group.host,
                    exit_status,
                }));
            }

            tracing::debug!(backoff = ?self.backoff, "Pass found no free slot, backing off");
            tokio::select! {
                _ = token.cancelled() => return Ok(None),
                _ = tokio::time::sleep(self.backoff) => {}
            }
        }
    }

    /// Number of pool entries visited so far; exposed for tests.
    pub fn visits(&self) -> usize {
        self.color_index
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }
}

impl DispatchRequest {
    pub fn new(command: String, weight: u32, limit: u32) -> Result<Self> {
        if weight == 0 {
            return Err(FarmError::Config(
                "requested weight must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            command,
            weight,
            limit,
        })
    }
}
