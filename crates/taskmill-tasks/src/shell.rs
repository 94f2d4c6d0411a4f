//! Shell-command actions

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Build an action closure running `command` through `sh -c` in `cwd`
pub fn command_action(
    command: impl Into<String>,
    cwd: impl Into<PathBuf>,
    env: HashMap<String, String>,
) -> impl Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static {
    let command = command.into();
    let cwd = cwd.into();
    move || {
        let (command, cwd, env) = (command.clone(), cwd.clone(), env.clone());
        async move { run_shell_command(&command, &cwd, &env).await.map(|_| ()) }.boxed()
    }
}

/// Run a shell command, logging its output, and return captured stdout
pub async fn run_shell_command(
    cmd: &str,
    cwd: &Path,
    env: &HashMap<String, String>,
) -> anyhow::Result<String> {
    debug!(command = cmd, cwd = %cwd.display(), "spawning");
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .current_dir(cwd)
        .envs(env)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn `{}`", cmd))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let read_stdout = async move {
        let mut lines_out = Vec::new();
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("{}", line);
                lines_out.push(line);
            }
        }
        lines_out
    };

    let read_stderr = async move {
        let mut lines_out = Vec::new();
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!("{}", line);
                lines_out.push(line);
            }
        }
        lines_out
    };

    let (stdout_lines, stderr_lines) = tokio::join!(read_stdout, read_stderr);

    let status = child
        .wait()
        .await
        .with_context(|| format!("Failed to wait for `{}`", cmd))?;

    if !status.success() {
        let code = status.code().unwrap_or(-1);
        bail!(
            "Command exited with code {}: {}",
            code,
            stderr_lines.join("\n")
        );
    }

    Ok(stdout_lines.join("\n"))
}
