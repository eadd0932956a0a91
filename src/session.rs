use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{ClientBuilder, Locator};
use std::fs;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{SeleniumConfig, WebdriverConfig};
use crate::driver::{DriverError, PageDriver};
use crate::utils::error::AppError;

const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
const STARTUP_POLL: Duration = Duration::from_millis(200);
const DISPLAY_TIMEOUT: Duration = Duration::from_secs(5);
const SCRIPT_TIMEOUT: Duration = Duration::from_secs(5);
const IMPLICIT_WAIT: Duration = Duration::from_secs(1);

/// The Selenium server child process, plus the Xvfb frame buffer backing it
/// on platforms that need one.
pub struct SeleniumServer {
    server: Child,
    xvfb: Option<Child>,
    base_url: String,
}

impl SeleniumServer {
    /// Spawn the server and wait until it answers on its status endpoint.
    ///
    /// Both binaries must already exist on disk.
    pub async fn launch(
        selenium: &SeleniumConfig,
        webdriver: &WebdriverConfig,
        debug_output: bool,
    ) -> Result<Self, AppError> {
        let webdriver_path = resolve_binary(&webdriver.path, "webdriver binary")?;
        let server_path = resolve_binary(&selenium.path, "selenium server")?;
        let base_url = selenium.base_url();

        // Firefox needs a display; macOS renders headless without one.
        let xvfb = if cfg!(target_os = "macos") {
            None
        } else {
            Some(start_frame_buffer(selenium.port).await?)
        };

        info!("Starting the selenium server on port {}", selenium.port);
        let mut cmd = Command::new("java");
        cmd.arg(format!(
            "-Dwebdriver.gecko.driver={}",
            webdriver_path.display()
        ))
        .arg("-jar")
        .arg(&server_path)
        .arg("-port")
        .arg(selenium.port.to_string())
        .stdin(Stdio::null())
        .kill_on_drop(true);

        if xvfb.is_some() {
            cmd.env("DISPLAY", format!(":{}", selenium.port));
        }
        if debug_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let mut server = cmd.spawn().map_err(|e| {
            AppError::Session(format!("failed to start the selenium server: {}", e))
        })?;

        if let Err(e) = wait_until_ready(&base_url, &mut server).await {
            let mut failed = SeleniumServer {
                server,
                xvfb,
                base_url,
            };
            failed.shutdown().await;
            return Err(e);
        }

        Ok(SeleniumServer {
            server,
            xvfb,
            base_url,
        })
    }

    /// Resolved remote endpoint, for opening sessions against this server.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn stop(mut self) {
        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        debug!("Stopping the selenium server");
        if let Err(e) = self.server.kill().await {
            warn!("Failed to stop the selenium server: {}", e);
        }
        if let Some(xvfb) = self.xvfb.as_mut() {
            if let Err(e) = xvfb.kill().await {
                warn!("Failed to stop Xvfb: {}", e);
            }
        }
    }
}

fn resolve_binary(path: &str, what: &str) -> Result<PathBuf, AppError> {
    if path.is_empty() {
        return Err(AppError::Config(format!("{} path is not set", what)));
    }
    fs::canonicalize(path)
        .map_err(|e| AppError::Session(format!("{} not found at {}: {}", what, path, e)))
}

async fn start_frame_buffer(display_num: u16) -> Result<Child, AppError> {
    debug!("Starting Xvfb on display :{}", display_num);
    let child = Command::new("Xvfb")
        .arg(format!(":{}", display_num))
        .args(["-screen", "0", "1280x1024x24"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AppError::Session(format!("failed to start Xvfb: {}", e)))?;

    // The X socket appears once the display is usable.
    let socket = PathBuf::from(format!("/tmp/.X11-unix/X{}", display_num));
    let deadline = Instant::now() + DISPLAY_TIMEOUT;
    while !socket.exists() {
        if Instant::now() >= deadline {
            return Err(AppError::Session(format!(
                "Xvfb display :{} did not come up within {:?}",
                display_num, DISPLAY_TIMEOUT
            )));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    Ok(child)
}

async fn wait_until_ready(base_url: &str, server: &mut Child) -> Result<(), AppError> {
    let status_url = format!("{}/status", base_url.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let deadline = Instant::now() + STARTUP_TIMEOUT;

    loop {
        if let Some(status) = server
            .try_wait()
            .map_err(|e| AppError::Session(format!("selenium server wait failed: {}", e)))?
        {
            return Err(AppError::Session(format!(
                "selenium server exited during startup ({})",
                status
            )));
        }

        match client.get(&status_url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Selenium server is ready at {}", base_url);
                return Ok(());
            }
            _ => {}
        }

        if Instant::now() >= deadline {
            return Err(AppError::Session(format!(
                "selenium server not ready at {} after {:?}",
                status_url, STARTUP_TIMEOUT
            )));
        }
        tokio::time::sleep(STARTUP_POLL).await;
    }
}

/// One remote Firefox session on a running Selenium server.
pub struct WebDriverSession {
    client: fantoccini::Client,
}

impl WebDriverSession {
    pub async fn connect(remote_url: &str) -> Result<Self, AppError> {
        let mut caps = serde_json::map::Map::new();
        caps.insert(
            "browserName".to_string(),
            serde_json::Value::from("firefox"),
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(remote_url)
            .await
            .map_err(|e| {
                AppError::Session(format!("failed to open a browser session: {}", e))
            })?;

        client
            .update_timeouts(TimeoutConfiguration::new(
                Some(SCRIPT_TIMEOUT),
                None,
                Some(IMPLICIT_WAIT),
            ))
            .await
            .map_err(|e| AppError::Session(format!("failed to apply session timeouts: {}", e)))?;

        Ok(WebDriverSession { client })
    }

    /// Close the browser session. Failures are logged, not propagated.
    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            warn!("Failed to close the browser session: {}", e);
        }
    }
}

#[async_trait]
impl PageDriver for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))
    }

    async fn find_text(&self, selector: &str) -> Result<String, DriverError> {
        let element = self
            .client
            .find(Locator::Css(selector))
            .await
            .map_err(|e| element_error(selector, e))?;
        element
            .text()
            .await
            .map_err(|e| DriverError::Command(e.to_string()))
    }

    async fn find_all_text(&self, selector: &str) -> Result<String, DriverError> {
        let elements = self
            .client
            .find_all(Locator::Css(selector))
            .await
            .map_err(|e| element_error(selector, e))?;
        if elements.is_empty() {
            return Err(DriverError::ElementNotFound {
                selector: selector.to_string(),
            });
        }

        let mut parts = Vec::with_capacity(elements.len());
        for element in elements {
            parts.push(
                element
                    .text()
                    .await
                    .map_err(|e| DriverError::Command(e.to_string()))?,
            );
        }
        Ok(parts.join("\n"))
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        self.client
            .source()
            .await
            .map_err(|e| DriverError::Command(e.to_string()))
    }
}

fn element_error(selector: &str, err: CmdError) -> DriverError {
    if err.is_no_such_element() {
        DriverError::ElementNotFound {
            selector: selector.to_string(),
        }
    } else {
        DriverError::Command(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_binary_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("geckodriver");
        fs::write(&bin, b"").unwrap();

        let resolved = resolve_binary(bin.to_str().unwrap(), "webdriver binary").unwrap();
        assert!(resolved.is_absolute());

        let missing = dir.path().join("nope");
        let err = resolve_binary(missing.to_str().unwrap(), "webdriver binary").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_resolve_binary_rejects_empty_path() {
        let err = resolve_binary("", "selenium server").unwrap_err();
        assert!(err.to_string().contains("path is not set"));
    }
}
