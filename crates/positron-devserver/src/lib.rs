//! External bundler / dev-server collaborator.
//!
//! Spawns the configured command through the platform shell, streams its
//! output into `tracing`, and decides when the server is usable: either a
//! readiness marker shows up in the output or the port accepts a TCP
//! connection. Servers that pick a different port (because the configured
//! one is taken) announce it on their `Local:` line; the URL follows it.

pub mod output;

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use positron_common::DevServerError;
use positron_config::DevServerConfig;

pub use output::{scan_line, LineSignal};

const PROBE_INTERVAL: Duration = Duration::from_millis(500);
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);
const STOP_GRACE: Duration = Duration::from_secs(5);

/// State the output readers share with the server handle.
#[derive(Debug)]
struct Shared {
    ready: AtomicBool,
    port: AtomicU16,
}

#[derive(Debug)]
pub struct DevServer {
    config: DevServerConfig,
    shared: Arc<Shared>,
    child: Option<Child>,
    readers: Vec<JoinHandle<()>>,
    settle_delay: Duration,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        let shared = Arc::new(Shared {
            ready: AtomicBool::new(false),
            port: AtomicU16::new(config.port),
        });
        Self {
            config,
            shared,
            child: None,
            readers: Vec::new(),
            settle_delay: Duration::from_secs(1),
        }
    }

    /// Pause between detecting readiness and reporting it, giving the
    /// server a moment to finish binding.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Spawn the server and wait until it is ready. On failure the process
    /// is stopped before the error is returned. Calling this while the
    /// server is already running does nothing.
    pub async fn start(&mut self) -> Result<(), DevServerError> {
        if self.child.is_some() {
            info!("dev server is already running");
            return Ok(());
        }

        let cwd = self.working_dir()?;
        info!(command = %self.config.command, cwd = %cwd.display(), "starting dev server");

        self.shared.ready.store(false, Ordering::SeqCst);
        self.shared.port.store(self.config.port, Ordering::SeqCst);

        let mut child = shell_command(&self.config.command)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DevServerError::Spawn(format!("{}: {e}", self.config.command)))?;

        if let Some(stdout) = child.stdout.take() {
            let reader = self.spawn_reader(stdout, "stdout");
            self.readers.push(reader);
        }
        if let Some(stderr) = child.stderr.take() {
            let reader = self.spawn_reader(stderr, "stderr");
            self.readers.push(reader);
        }
        self.child = Some(child);

        if !self.wait_for_ready().await {
            let secs = self.config.wait_timeout_secs;
            warn!(secs, "dev server did not become ready");
            self.stop().await;
            return Err(DevServerError::ReadyTimeout { secs });
        }

        info!(url = %self.url(), "dev server is ready");
        Ok(())
    }

    /// Poll until the output reported readiness or the port accepts
    /// connections. Returns `false` once `wait_timeout_secs` has elapsed.
    pub async fn wait_for_ready(&self) -> bool {
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.config.wait_timeout_secs);

        while tokio::time::Instant::now() < deadline {
            if self.shared.ready.load(Ordering::SeqCst) || self.port_open().await {
                tokio::time::sleep(self.settle_delay).await;
                return true;
            }
            tokio::time::sleep(PROBE_INTERVAL).await;
        }
        false
    }

    /// Ask the process to exit, wait up to five seconds, then kill it.
    pub async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        info!("stopping dev server");

        terminate(&mut child).await;
        match tokio::time::timeout(STOP_GRACE, child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "dev server exited"),
            Ok(Err(e)) => warn!(error = %e, "failed to wait for dev server"),
            Err(_) => {
                warn!("dev server ignored terminate; killing");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill dev server");
                }
            }
        }

        for reader in self.readers.drain(..) {
            reader.abort();
        }
        self.shared.ready.store(false, Ordering::SeqCst);
        info!("dev server stopped");
    }

    /// Base URL of the server, following any port change it announced.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.config.host, self.port())
    }

    pub fn port(&self) -> u16 {
        self.shared.port.load(Ordering::SeqCst)
    }

    /// Started and the process has not exited.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn working_dir(&self) -> Result<PathBuf, DevServerError> {
        let cwd = &self.config.cwd;
        if !cwd.is_dir() {
            return Err(DevServerError::Spawn(format!(
                "working directory {} does not exist",
                cwd.display()
            )));
        }
        Ok(cwd.canonicalize()?)
    }

    async fn port_open(&self) -> bool {
        let addr = (self.config.host.as_str(), self.port());
        matches!(
            tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(addr)).await,
            Ok(Ok(_))
        )
    }

    fn spawn_reader<R>(&self, pipe: R, stream: &'static str) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let patterns = self.config.ready_patterns.clone();
        let configured_port = self.config.port;

        tokio::spawn(async move {
            let mut lines = BufReader::new(pipe).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        info!(stream, "[dev server] {}", line.trim_end());
                        let signal = scan_line(&line, &patterns);
                        if let Some(port) = signal.port {
                            if port != configured_port {
                                info!(from = configured_port, to = port, "dev server port changed");
                            }
                            shared.port.store(port, Ordering::SeqCst);
                        }
                        if signal.ready {
                            shared.ready.store(true, Ordering::SeqCst);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!(stream, error = %e, "dev server output closed");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// SIGTERM on unix (via `kill`), hard kill elsewhere.
async fn terminate(child: &mut Child) {
    if send_sigterm(child).await {
        return;
    }
    if let Err(e) = child.start_kill() {
        warn!(error = %e, "failed to signal dev server");
    }
}

#[cfg(unix)]
async fn send_sigterm(child: &Child) -> bool {
    let Some(pid) = child.id() else {
        return false;
    };
    Command::new("kill")
        .arg("-TERM")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(not(unix))]
async fn send_sigterm(_child: &Child) -> bool {
    false
}

impl Drop for DevServer {
    fn drop(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}
