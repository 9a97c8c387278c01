use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::colorize::LineColorizer;
use crate::error::{FarmError, Result};
use crate::palette::Color;

/// Runs the caller's command on a chosen host and reports its exit status.
#[async_trait]
pub trait CommandRunner {
    async fn run(&self, host: &str, local: bool, command: &str, color: Option<Color>)
        -> Result<i32>;
}

/// Executes commands through a shell: `sh -c` on the local host, a single
/// remote-shell invocation otherwise. stdout and stderr are merged line by
/// line through the colorizer as they arrive.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    remote_shell: String,
    cwd: PathBuf,
    setup_file: Option<String>,
    setup_marker: String,
}

impl ShellRunner {
    pub fn new(
        remote_shell: String,
        cwd: PathBuf,
        setup_file: Option<String>,
        setup_marker: String,
    ) -> Self {
        Self {
            remote_shell,
            cwd,
            setup_file,
            setup_marker,
        }
    }

    /// Command string shipped to the remote shell as one argument.
    ///
    /// Bootstraps the environment only if the marker variable is not already
    /// set on the remote side, with errors discarded, then changes to the
    /// local working directory verbatim (a shared filesystem layout is
    /// assumed) before running the command. The stages compose into one
    /// shell exit code; a non-zero result does not say which stage failed.
    fn remote_script(&self, command: &str) -> String {
        let mut script = String::new();
        if let Some(setup) = &self.setup_file {
            script.push_str(&format!(
                "test -n \"${{{marker}}}\" || . {setup} >/dev/null 2>&1; ",
                marker = self.setup_marker,
            ));
        }
        script.push_str(&format!(
            "cd {cwd} && {command}",
            cwd = self.cwd.display(),
        ));
        script
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        host: &str,
        local: bool,
        command: &str,
        color: Option<Color>,
    ) -> Result<i32> {
        // Announcement precedes execution and is never colorized.
        println!("Machine:{host} Starting:{command}");

        let mut builder = if local {
            let mut b = Command::new("sh");
            b.arg("-c").arg(command).current_dir(&self.cwd);
            b
        } else {
            let mut b = Command::new(&self.remote_shell);
            b.arg(host).arg(self.remote_script(command));
            b
        };

        builder
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = builder.spawn().map_err(|e| {
            if local {
                FarmError::Io(e)
            } else {
                FarmError::Transport {
                    host: host.to_string(),
                    source: e,
                }
            }
        })?;

        stream_and_wait(child, color, tokio::io::stdout()).await
    }
}

/// Pump the child's merged output through the colorizer, then reap it.
///
/// If forwarding fails the child is killed (and thereby reaped) before the
/// error is returned, so a broken output pipe never leaks a running child.
async fn stream_and_wait<W: AsyncWrite + Unpin>(
    mut child: tokio::process::Child,
    color: Option<Color>,
    writer: W,
) -> Result<i32> {
    let stdout = child.stdout.take().expect("stdout is piped");
    let stderr = child.stderr.take().expect("stderr is piped");

    let (tx, rx) = mpsc::channel::<String>(64);
    let out_task = tokio::spawn(forward_lines(stdout, tx.clone()));
    let err_task = tokio::spawn(forward_lines(stderr, tx));

    if let Err(e) = drain_lines(rx, color, writer).await {
        out_task.abort();
        err_task.abort();
        let _ = child.kill().await;
        return Err(e);
    }
    let _ = out_task.await;
    let _ = err_task.await;

    let status = child.wait().await?;
    Ok(exit_code(status))
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
            break;
        }
    }
}

async fn drain_lines<W: AsyncWrite + Unpin>(
    mut rx: mpsc::Receiver<String>,
    color: Option<Color>,
    writer: W,
) -> Result<()> {
    let mut colorizer = LineColorizer::new(writer, color);
    while let Some(line) = rx.recv().await {
        colorizer.write_line(&line).await?;
    }
    colorizer.finish().await?;
    Ok(())
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
