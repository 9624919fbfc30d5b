//! Browser manager for coordinating headless capture sessions.

use crate::extract::ELEMENT_KINDS;
use crate::progress::{log_progress, ProgressCallback};
use crate::{H2dError, Result, Viewport};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info};

use super::dom::{RawPageSnapshot, ScriptResultWithSnapshot};
use super::playwright::{
    ensure_node_available, ensure_playwright_available, map_playwright_error,
    map_playwright_status_error, map_spawn_error, ScriptError, CAPTURE_SCRIPT,
};

pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for the entire Playwright process.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(45);

/// When set, names a snapshot JSON file returned instead of launching a browser.
pub const MOCK_SNAPSHOT_ENV: &str = "H2D_MOCK_SNAPSHOT";

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub node_command: String,
    pub viewport: Viewport,
    pub headless: bool,
    pub navigation_timeout: Duration,
    pub network_idle_timeout: Duration,
    pub process_timeout: Duration,
    pub max_concurrent_sessions: usize,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            viewport: Viewport::default(),
            headless: true,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            network_idle_timeout: DEFAULT_NETWORK_IDLE_TIMEOUT,
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
            max_concurrent_sessions: 1,
        }
    }
}

/// Limits how many Playwright processes run at once.
#[derive(Debug, Clone)]
pub struct BrowserManager {
    options: BrowserOptions,
    semaphore: Arc<Semaphore>,
}

impl BrowserManager {
    pub fn new(options: BrowserOptions) -> Self {
        let permits = options.max_concurrent_sessions.max(1);
        Self {
            options,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub async fn capture(
        &self,
        url: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<RawPageSnapshot> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| H2dError::Config("Browser manager unavailable".to_string()))?;
        capture_page_snapshot(url, &self.options, progress).await
    }
}

/// Render `url` in headless Chromium and serialize its allow-listed elements.
pub async fn capture_page_snapshot(
    url: &str,
    options: &BrowserOptions,
    progress: Option<ProgressCallback>,
) -> Result<RawPageSnapshot> {
    if let Some(path) = std::env::var_os(MOCK_SNAPSHOT_ENV) {
        let path = PathBuf::from(path);
        log_progress(
            &progress,
            &format!("Using mock snapshot {}", path.display()),
        );
        return RawPageSnapshot::from_file(&path);
    }

    log_progress(
        &progress,
        &format!(
            "Launching headless browser for {} ({}, nav {}s, idle {}s)…",
            url,
            options.viewport,
            options.navigation_timeout.as_secs(),
            options.network_idle_timeout.as_secs()
        ),
    );
    ensure_node_available(&options.node_command).await?;
    ensure_playwright_available(&options.node_command).await?;

    let tags = serde_json::to_string(ELEMENT_KINDS)?;
    let mut cmd = Command::new(&options.node_command);
    cmd.arg("-e")
        .arg(CAPTURE_SCRIPT)
        .arg(url)
        .arg(options.viewport.width.to_string())
        .arg(options.viewport.height.to_string())
        .arg(options.navigation_timeout.as_millis().to_string())
        .arg(options.network_idle_timeout.as_millis().to_string())
        .arg(if options.headless { "1" } else { "0" })
        .arg(tags)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    log_progress(&progress, "Navigating and waiting for network idle (Playwright)…");
    let start = Instant::now();
    let mut child = cmd
        .spawn()
        .map_err(|err| map_spawn_error(err, &options.node_command))?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_pipe {
            let _ = out.read_to_end(&mut buf).await;
        }
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_pipe {
            let _ = err.read_to_end(&mut buf).await;
        }
        buf
    });

    let status = match timeout(options.process_timeout, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(err)) => return Err(H2dError::Io(err)),
        Err(_) => {
            let _ = child.kill().await;
            let _ = child.wait().await;
            log_progress(
                &progress,
                "Playwright timed out; process killed after exceeding timeout.",
            );
            return Err(H2dError::Config(format!(
                "Playwright timed out after {:?}",
                options.process_timeout
            )));
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr);
        return Err(map_playwright_error(status.to_string(), &stderr));
    }

    let stdout = String::from_utf8_lossy(&stdout);
    let result: ScriptResultWithSnapshot = serde_json::from_str(stdout.trim()).map_err(|e| {
        H2dError::Config(format!(
            "Failed to parse Playwright output: {} - raw: {}",
            e,
            stdout.trim()
        ))
    })?;

    if result.status != "ok" {
        if let Ok(err) = serde_json::from_str::<ScriptError>(stdout.trim()) {
            return Err(map_playwright_status_error(&err.status, err.message));
        }
        return Err(H2dError::Config(format!(
            "Playwright returned non-ok status: {}",
            result.status
        )));
    }

    let snapshot = result.snapshot.ok_or_else(|| {
        H2dError::Config("Playwright returned ok status but no snapshot".to_string())
    })?;

    debug!(nodes = snapshot.nodes.len(), "snapshot received");
    info!(
        url,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "page rendered"
    );
    log_progress(
        &progress,
        &format!("Capture finished in {:.1}s", start.elapsed().as_secs_f32()),
    );
    Ok(snapshot)
}
