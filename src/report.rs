//! Result callback reporting
//!
//! Optionally POSTs each finished test's result to a caller-supplied HTTP
//! endpoint. Delivery problems are logged, never fatal: the run's source of
//! truth is the returned [`TestResult`].

use serde_json::{json, Map, Value};

use crate::testing::plan::TestFile;
use crate::testing::runner::TestResult;

/// Terminal status reported for a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Completed,
    Error,
}

impl TestStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        }
    }
}

/// POSTs test outcomes to a callback URL.
pub struct CallbackReporter {
    http: reqwest::Client,
    url: String,
}

impl CallbackReporter {
    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
        }
    }

    /// Report one finished test.
    pub async fn post_result(&self, result: &TestResult, status: TestStatus) {
        let responses: Map<String, Value> = result
            .commands
            .iter()
            .map(|output| {
                let response = match &output.response {
                    Some(response) => json!(response),
                    None => Value::Null,
                };
                (output.command.clone(), response)
            })
            .collect();

        let body = json!({
            "testId": result.test_id,
            "presentationNumber": result.presentation_number,
            "capabilities": result.capabilities,
            "status": status.as_str(),
            "responses": responses,
        });
        self.deliver(&result.test_id, &body).await;
    }

    /// Report a test that aborted before producing a result.
    pub async fn post_error(&self, test: &TestFile) {
        let body = json!({
            "testId": test.info.test_id,
            "presentationNumber": test.info.presentation_number,
            "status": TestStatus::Error.as_str(),
        });
        self.deliver(&test.info.test_id, &body).await;
    }

    async fn deliver(&self, test_id: &str, body: &Value) {
        match self.http.post(&self.url).json(body).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(test = %test_id, "result callback delivered");
            }
            Ok(response) => {
                tracing::warn!(test = %test_id, status = %response.status(), "result callback rejected");
            }
            Err(e) => {
                tracing::warn!(test = %test_id, error = %e, "result callback failed");
            }
        }
    }
}
