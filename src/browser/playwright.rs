//! Playwright integration for headless page capture.
//!
//! This module contains the inline capture script, error mapping,
//! and availability checks for Node.js and Playwright.

use crate::{H2dError, Result};
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Renders a page and serializes every allow-listed element with its computed style.
///
/// The tag allow-list arrives as a JSON array argument.
pub(crate) const CAPTURE_SCRIPT: &str = r#"
const [, url, width, height, navTimeout, idleTimeout, headlessFlag, tagsJson] = process.argv;

async function run() {
  let browser;
  try {
    const { chromium } = require('playwright');
    browser = await chromium.launch({ headless: headlessFlag !== '0' });
    const context = await browser.newContext({
      viewport: {
        width: parseInt(width, 10),
        height: parseInt(height, 10)
      }
    });
    const page = await context.newPage();
    const navMs = parseInt(navTimeout, 10);
    const idleMs = parseInt(idleTimeout, 10);

    await page.goto(url, { waitUntil: 'networkidle', timeout: navMs });
    await page.waitForLoadState('networkidle', { timeout: idleMs });

    const snapshot = await page.evaluate((tags) => {
      const nodes = [];
      for (const el of document.querySelectorAll(tags.join(','))) {
        try {
          const rect = el.getBoundingClientRect();
          const s = window.getComputedStyle(el);
          const isImg = el.tagName.toLowerCase() === 'img';
          nodes.push({
            tag: el.tagName.toLowerCase(),
            text: el.innerText || '',
            rect: { x: rect.x, y: rect.y, width: rect.width, height: rect.height },
            style: {
              display: s.display,
              visibility: s.visibility,
              opacity: s.opacity,
              color: s.color,
              fontSize: s.fontSize,
              fontFamily: s.fontFamily,
              fontWeight: s.fontWeight,
              textAlign: s.textAlign,
              paddingTop: s.paddingTop,
              paddingRight: s.paddingRight,
              paddingBottom: s.paddingBottom,
              paddingLeft: s.paddingLeft,
              borderRadius: s.borderRadius,
              boxShadow: s.boxShadow,
              zIndex: s.zIndex,
              backgroundColor: s.backgroundColor
            },
            src: isImg ? (el.currentSrc || el.src || null) : null,
            complete: isImg ? (el.complete && el.naturalWidth > 0) : true
          });
        } catch (err) {
          nodes.push({ tag: el.tagName.toLowerCase(), text: '', complete: false });
        }
      }
      return {
        url: window.location.href,
        title: document.title,
        viewport: { width: window.innerWidth, height: window.innerHeight },
        nodes
      };
    }, JSON.parse(tagsJson));

    console.log(JSON.stringify({ status: 'ok', snapshot }));
  } catch (err) {
    const message = err && err.message ? err.message : String(err);
    console.error(JSON.stringify({ status: 'error', message }));
    process.exitCode = 1;
  } finally {
    if (browser) {
      await browser.close();
    }
  }
}

run();
"#;

/// Timeout for checking node/playwright availability.
pub(crate) const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

/// Error result from the capture script.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ScriptError {
    pub status: String,
    pub message: String,
}

pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> H2dError {
    if err.kind() == io::ErrorKind::NotFound {
        H2dError::Config(format!(
            "Unable to spawn Playwright helper; '{}' was not found on PATH",
            command
        ))
    } else {
        H2dError::Io(err)
    }
}

/// Maps Playwright stderr output to a config error with a remediation hint.
pub(crate) fn map_playwright_error(status_text: impl Into<String>, stderr: &str) -> H2dError {
    if let Ok(error) = serde_json::from_str::<ScriptError>(stderr.trim()) {
        return map_playwright_status_error(&error.status, error.message);
    }

    let lower = stderr.to_ascii_lowercase();
    if lower.contains("cannot find module 'playwright'") {
        return missing_playwright();
    }
    if lower.contains("executable doesn't exist") {
        return H2dError::Config(
            "Playwright's chromium executable is missing; run `npx playwright install chromium`."
                .to_string(),
        );
    }
    if lower.contains("timeout") {
        return H2dError::Config(
            "Playwright timed out; try increasing --nav-timeout/--network-idle-timeout or --process-timeout, and ensure the page finishes loading."
                .to_string(),
        );
    }

    H2dError::Config(format!(
        "Playwright exited with status {}: {}",
        status_text.into(),
        stderr.trim()
    ))
}

pub(crate) fn map_playwright_status_error(status: &str, message: String) -> H2dError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("cannot find module 'playwright'") {
        missing_playwright()
    } else if lower.contains("timeout") {
        H2dError::Config(format!(
            "Playwright error (status {}): {}. Hint: increase --nav-timeout/--network-idle-timeout or --process-timeout, and ensure the page finishes loading.",
            status, message
        ))
    } else {
        H2dError::Config(format!("Playwright error (status {}): {}", status, message))
    }
}

fn missing_playwright() -> H2dError {
    H2dError::Config(
        "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
    )
}

pub(crate) async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            H2dError::Config(format!(
                "Timed out checking node availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(H2dError::Config(format!(
            "Node command {:?} is not available (exit {})",
            node_command, status
        )));
    }
    Ok(())
}

pub(crate) async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            H2dError::Config(format!(
                "Timed out checking Playwright availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_playwright_error(
            format!("{:?}", output.status),
            &stderr,
        ));
    }
    Ok(())
}
