use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

/// Default timeout for captured commands. WP-CLI bootstraps a full WordPress
/// install on every invocation, so this is deliberately generous.
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(120);

/// Generic command execution with timeout and guaranteed process kill.
///
/// This trait is NOT tied to any one binary — it runs git, composer, npm,
/// wp, ssh, and rsync alike. The production implementation uses tokio; test
/// doubles can return canned results without spawning processes.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a command with the default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;

    /// Run a command with a custom timeout (overrides default).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;

    /// Run a command with stdin piped from `input`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output>;

    /// Spawn a command with piped stdout and the given stdin handle, for
    /// pipeline construction. No timeout — caller manages the child lifetime.
    /// `kill_on_drop(true)` is set as a safety net.
    ///
    /// # Errors
    ///
    /// Returns an error if the process fails to spawn.
    fn spawn(&self, program: &str, args: &[&str], stdin: Stdio) -> Result<tokio::process::Child>;

    /// Run a command with inherited stdio (interactive pass-through).
    /// No timeout — used for long tools like composer, npm, and rsync that
    /// render their own progress.
    async fn run_status(&self, program: &str, args: &[&str]) -> Result<std::process::ExitStatus>;
}

/// Production `CommandRunner` — uses tokio for async process execution
/// with guaranteed timeout and kill on all platforms.
///
/// `tokio::time::timeout` around `.output().await` does NOT kill the child
/// process when the timeout fires — the future is dropped but the OS process
/// keeps running. This implementation uses `tokio::select!` with explicit
/// `child.kill()` to guarantee the process is terminated.
#[derive(Clone, Copy)]
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CMD_TIMEOUT)
    }
}

/// Wait for a spawned child, reading stdout/stderr CONCURRENTLY with wait()
/// to avoid pipe deadlock. If the child writes more than the OS pipe buffer
/// (64KB Linux, 4KB some Windows configs), it blocks on write. If we only
/// called child.wait() first, wait() would never resolve.
async fn collect_output(
    mut child: tokio::process::Child,
    program: &str,
    timeout: Duration,
) -> Result<Output> {
    let mut stdout_handle = child.stdout.take();
    let mut stderr_handle = child.stderr.take();

    tokio::select! {
        result = async {
            let (status, stdout, stderr) = tokio::join!(
                child.wait(),
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stdout_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stderr_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
            );
            Ok(Output {
                status: status.with_context(|| format!("waiting for {program}"))?,
                stdout,
                stderr,
            })
        } => result,
        () = tokio::time::sleep(timeout) => {
            let _ = child.kill().await;
            anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
        }
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        collect_output(child, program, timeout).await
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        // Write stdin in a spawned task to avoid deadlock with stdout/stderr reads.
        let stdin_handle = child.stdin.take();
        let input_owned = input.to_vec();
        tokio::spawn(async move {
            if let Some(mut stdin) = stdin_handle {
                use tokio::io::AsyncWriteExt;
                let _ = stdin.write_all(&input_owned).await;
            }
        });

        collect_output(child, program, self.timeout).await
    }

    fn spawn(&self, program: &str, args: &[&str], stdin: Stdio) -> Result<tokio::process::Child> {
        tokio::process::Command::new(program)
            .args(args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))
    }

    async fn run_status(&self, program: &str, args: &[&str]) -> Result<std::process::ExitStatus> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        child
            .wait()
            .await
            .with_context(|| format!("waiting for {program}"))
    }
}
