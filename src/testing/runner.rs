//! Test runner
//!
//! Executes one test's commands against a live AT + browser pair and
//! assembles the structured result. Validation failures fail individual
//! commands; protocol and configuration failures abort the rest of the
//! test.

use serde::Serialize;

use crate::atdriver::{AtDriverClient, Capabilities};
use crate::browser::Browser;
use crate::common::config::Timings;
use crate::common::{Error, Result};
use crate::keys::{map_keys, validate_command, KeySequence};

use super::collector::collect_speech;
use super::plan::TestFile;
use super::settings::{AtVendor, SettingsDriver};

/// CSS class of the control that arms a reference page's setup script
const SETUP_BUTTON_SELECTOR: &str = ".button-run-test-setup";

/// Parking page between commands, isolating each command's captured output
const BLANK_PAGE: &str = "about:blank";

/// Spoken output or validation errors for one command
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutput {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Pass/fail for one assertion of one command
#[derive(Debug, Clone, Serialize)]
pub struct AssertionResult {
    pub command: String,
    pub expectation: String,
    pub pass: bool,
}

/// Result of one executed test
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_number: Option<f64>,
    pub capabilities: Capabilities,
    pub commands: Vec<CommandOutput>,
    pub results: Vec<AssertionResult>,
}

/// Runs tests against one AT driver connection and one browser session.
pub struct TestRunner {
    client: AtDriverClient,
    browser: Box<dyn Browser>,
    base_url: String,
    timings: Timings,
    capabilities: Option<Capabilities>,
}

impl TestRunner {
    pub fn new(
        client: AtDriverClient,
        browser: Box<dyn Browser>,
        base_url: &str,
        timings: Timings,
    ) -> Self {
        Self {
            client,
            browser,
            base_url: base_url.trim_end_matches('/').to_string(),
            timings,
            capabilities: None,
        }
    }

    /// AT and browser identification, fetched on first use and reused for
    /// every test this runner executes.
    pub async fn capabilities(&mut self) -> Result<Capabilities> {
        if let Some(capabilities) = &self.capabilities {
            return Ok(capabilities.clone());
        }

        let at = self
            .client
            .at_capabilities()
            .ok_or(Error::SessionNotReady)?
            .clone();
        let browser = self.browser.capabilities().await?;
        let capabilities = Capabilities {
            at_name: at.at_name,
            at_version: at.at_version,
            browser_name: browser.browser_name,
            browser_version: browser.browser_version,
            platform_name: if at.platform_name.is_empty() {
                browser.platform_name
            } else {
                at.platform_name
            },
        };
        tracing::info!(?capabilities, "collected capabilities");
        self.capabilities = Some(capabilities.clone());
        Ok(capabilities)
    }

    /// Run one test to completion.
    pub async fn run(&mut self, test: &TestFile) -> Result<TestResult> {
        let capabilities = self.capabilities().await?;
        let vendor = AtVendor::from_name(&capabilities.at_name);
        tracing::info!(
            test = %test.info.test_id,
            title = test.info.title.as_deref().unwrap_or(""),
            "starting test"
        );

        let mut commands = Vec::new();
        let mut results = Vec::new();

        for command in &test.commands {
            match validate_command(command) {
                Err(errors) => {
                    tracing::warn!(command = %command.id, ?errors, "invalid keys; skipping command");
                    commands.push(CommandOutput {
                        command: command.id.clone(),
                        response: None,
                        errors,
                    });
                    for assertion in &test.assertions {
                        results.push(AssertionResult {
                            command: command.id.clone(),
                            expectation: assertion.expectation.clone(),
                            pass: false,
                        });
                    }
                }
                Ok(valid) => {
                    let sequence = map_keys(&valid);
                    let spoken = self
                        .execute_command(test, &vendor, valid.command().settings.as_deref(), &sequence)
                        .await?;
                    commands.push(CommandOutput {
                        command: command.id.clone(),
                        response: Some(spoken.join("\n")),
                        errors: Vec::new(),
                    });
                    for assertion in &test.assertions {
                        results.push(AssertionResult {
                            command: command.id.clone(),
                            expectation: assertion.expectation.clone(),
                            pass: true,
                        });
                    }
                }
            }
        }

        Ok(TestResult {
            test_id: test.info.test_id.clone(),
            presentation_number: test.info.presentation_number,
            capabilities,
            commands,
            results,
        })
    }

    /// Close the underlying AT driver connection.
    pub async fn quit(self) -> Result<()> {
        self.client.quit().await
    }

    async fn execute_command(
        &self,
        test: &TestFile,
        vendor: &AtVendor,
        settings: Option<&str>,
        sequence: &KeySequence,
    ) -> Result<Vec<String>> {
        // Opening the page makes the AT speak; let that settle before keys.
        let ((), _navigation_speech) = collect_speech(
            self.client.speeches(),
            self.timings.navigation_debounce(),
            self.open_page(&test.target.reference_page),
        )
        .await?;

        let settings_driver = SettingsDriver::new(&self.client, self.timings.mode_switch_debounce());
        if let Some(settings) = settings {
            settings_driver.ensure_settings(vendor, settings).await?;
        } else if let Some(mode) = test.target.mode.as_deref() {
            settings_driver.ensure_mode(vendor, mode).await?;
        }

        tracing::debug!(keys = %sequence, "sending keys");
        let ((), spoken) = collect_speech(
            self.client.speeches(),
            self.timings.keys_debounce(),
            self.client.send_keys(sequence),
        )
        .await?;

        // Parking on a blank page isolates this command's captured output
        // from the next command's navigation speech.
        let ((), _blank_speech) = collect_speech(
            self.client.speeches(),
            self.timings.navigation_debounce(),
            self.browser.navigate(BLANK_PAGE),
        )
        .await?;

        Ok(spoken)
    }

    async fn open_page(&self, reference_page: &str) -> Result<()> {
        let url = format!(
            "{}/{}",
            self.base_url,
            reference_page.trim_start_matches('/')
        );
        tracing::info!(%url, "opening reference page");
        self.browser.navigate(&url).await?;
        self.browser.document_ready().await?;

        let clicked = self
            .browser
            .click_when_present(SETUP_BUTTON_SELECTOR, self.timings.setup_button_timeout())
            .await?;
        if !clicked {
            tracing::info!(reference_page, "no run-test-setup control on page");
        }
        Ok(())
    }
}
