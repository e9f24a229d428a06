//! Browser driver boundary
//!
//! The runner needs only four things from the browser: navigate, wait for
//! the document, best-effort click, and identify itself. [`Browser`] is
//! that seam. The bundled implementation speaks W3C WebDriver REST against
//! a session someone else created; session bootstrapping is not this
//! crate's job.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::common::{Error, Result};

/// Identifying metadata for the browser half of a test run.
#[derive(Debug, Clone, Default)]
pub struct BrowserCapabilities {
    pub browser_name: String,
    pub browser_version: String,
    pub platform_name: String,
}

/// Operations the test runner requires from a browser session.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigate to a URL.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait until the current document has finished loading.
    async fn document_ready(&self) -> Result<()>;

    /// Click the first element matching a CSS selector, polling until the
    /// timeout. `Ok(false)` means it never showed up.
    async fn click_when_present(&self, css: &str, timeout: Duration) -> Result<bool>;

    /// Browser capabilities for the active session.
    async fn capabilities(&self) -> Result<BrowserCapabilities>;
}

const DOCUMENT_READY_POLL: Duration = Duration::from_millis(100);
const DOCUMENT_READY_ATTEMPTS: u32 = 100;
const ELEMENT_POLL: Duration = Duration::from_millis(100);

/// W3C WebDriver REST client bound to an existing session.
pub struct WebDriverBrowser {
    http: reqwest::Client,
    base: String,
    session_id: String,
}

impl WebDriverBrowser {
    pub fn new(server_url: &str, session_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: server_url.trim_end_matches('/').to_string(),
            session_id: session_id.to_string(),
        }
    }

    fn session_url(&self, suffix: &str) -> String {
        format!("{}/session/{}{}", self.base, self.session_id, suffix)
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        let body = json!({ "script": script, "args": [] });
        let response: Value = self
            .http
            .post(self.session_url("/execute/sync"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.get("value").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.http
            .post(self.session_url("/url"))
            .json(&json!({ "url": url }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn document_ready(&self) -> Result<()> {
        for _ in 0..DOCUMENT_READY_ATTEMPTS {
            let state = self.execute_script("return document.readyState").await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            tokio::time::sleep(DOCUMENT_READY_POLL).await;
        }
        Err(Error::Browser(
            "document never reached readyState 'complete'".to_string(),
        ))
    }

    async fn click_when_present(&self, css: &str, timeout: Duration) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let body = json!({ "using": "css selector", "value": css });
            let response = self
                .http
                .post(self.session_url("/element"))
                .json(&body)
                .send()
                .await?;
            // "no such element" comes back as a client error; keep polling.
            if response.status().is_success() {
                let payload: Value = response.json().await?;
                if let Some(element_id) = first_element_id(&payload) {
                    self.http
                        .post(self.session_url(&format!("/element/{element_id}/click")))
                        .json(&json!({}))
                        .send()
                        .await?
                        .error_for_status()?;
                    return Ok(true);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(ELEMENT_POLL).await;
        }
    }

    async fn capabilities(&self) -> Result<BrowserCapabilities> {
        let response = self.http.get(self.session_url("")).send().await?;
        if !response.status().is_success() {
            // Not every driver serves session metadata; identify as unknown.
            return Ok(BrowserCapabilities::default());
        }
        let payload: Value = response.json().await?;
        let value = payload.get("value").cloned().unwrap_or(Value::Null);
        let capabilities = value.get("capabilities").cloned().unwrap_or(value);
        let field = |name: &str| {
            capabilities
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Ok(BrowserCapabilities {
            browser_name: field("browserName"),
            browser_version: field("browserVersion"),
            platform_name: field("platformName"),
        })
    }
}

/// Element ids come back keyed by the W3C element-identifier constant;
/// taking the first object value tolerates legacy drivers too.
fn first_element_id(payload: &Value) -> Option<String> {
    payload
        .get("value")?
        .as_object()?
        .values()
        .next()?
        .as_str()
        .map(str::to_string)
}
