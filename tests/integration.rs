//! End-to-end integration tests for the AT harness
//!
//! These tests run the complete engine against an in-process mock AT
//! Driver WebSocket server and a mock browser: session creation, key-press
//! round trips, interleaved speech capture, settings toggling, and result
//! assembly.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use at_harness::browser::{Browser, BrowserCapabilities};
use at_harness::common::config::Timings;
use at_harness::testing::plan::{self, TestFile};
use at_harness::testing::runner::TestRunner;
use at_harness::{AtDriverClient, Chord, Key, KeySequence};

/// A scripted AT driver: answers `session.new` with the configured AT name
/// and, for each `interaction.pressKeys`, emits the next scripted batch of
/// capturedOutput notifications BEFORE the response — exercising the
/// client's interleaved-message filtering.
struct MockAtDriver {
    url: String,
    received: Arc<Mutex<Vec<Value>>>,
}

impl MockAtDriver {
    async fn spawn(at_name: &str, press_speech: Vec<Vec<&str>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let script: VecDeque<Vec<String>> = press_speech
            .into_iter()
            .map(|batch| batch.into_iter().map(str::to_string).collect())
            .collect();

        let at_name = at_name.to_string();
        let task_received = Arc::clone(&received);
        tokio::spawn(async move {
            let mut script = script;
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let (mut sink, mut source) = ws.split();

            while let Some(Ok(message)) = source.next().await {
                let raw = match message {
                    Message::Text(raw) => raw,
                    Message::Close(_) => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                    _ => continue,
                };
                let frame: Value = serde_json::from_str(&raw).unwrap();
                task_received.lock().unwrap().push(frame.clone());

                let id = frame["id"].as_str().unwrap().to_string();
                let method = frame["method"].as_str().unwrap();
                match method {
                    "session.new" => {
                        let response = json!({
                            "id": id,
                            "result": {
                                "sessionId": "mock-session",
                                "capabilities": {
                                    "atName": at_name,
                                    "atVersion": "2099.1",
                                    "platformName": "test-os"
                                }
                            }
                        });
                        sink.send(Message::Text(response.to_string())).await.unwrap();
                    }
                    "interaction.pressKeys" => {
                        let speech = script.pop_front().unwrap_or_default();
                        for line in &speech {
                            let notification = json!({
                                "method": "interaction.capturedOutput",
                                "params": { "data": line }
                            });
                            sink.send(Message::Text(notification.to_string()))
                                .await
                                .unwrap();
                        }
                        sink.send(Message::Text(json!({ "id": id, "result": {} }).to_string()))
                            .await
                            .unwrap();
                    }
                    _ => {
                        sink.send(Message::Text(json!({ "id": id, "result": {} }).to_string()))
                            .await
                            .unwrap();
                    }
                }
            }
        });

        Self {
            url: format!("ws://{addr}"),
            received,
        }
    }

    fn requests(&self, method: &str) -> Vec<Value> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .filter(|frame| frame["method"] == method)
            .cloned()
            .collect()
    }
}

/// Browser that records navigations and always finds the setup control.
#[derive(Default)]
struct MockBrowser {
    navigations: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Browser for MockBrowser {
    async fn navigate(&self, url: &str) -> at_harness::Result<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn document_ready(&self) -> at_harness::Result<()> {
        Ok(())
    }

    async fn click_when_present(
        &self,
        _css: &str,
        _timeout: Duration,
    ) -> at_harness::Result<bool> {
        Ok(true)
    }

    async fn capabilities(&self) -> at_harness::Result<BrowserCapabilities> {
        Ok(BrowserCapabilities {
            browser_name: "Firefox".to_string(),
            browser_version: "133.0".to_string(),
            platform_name: "linux".to_string(),
        })
    }
}

fn fast_timings() -> Timings {
    Timings {
        navigation_debounce_ms: 40,
        keys_debounce_ms: 80,
        mode_switch_debounce_ms: 40,
        setup_button_timeout_ms: 5,
    }
}

fn test_file(commands: Value, mode: Option<&str>) -> TestFile {
    serde_json::from_value(json!({
        "info": { "testId": "t1", "presentationNumber": 1.0, "title": "Mock test" },
        "target": { "referencePage": "reference/index.html", "mode": mode },
        "commands": commands,
        "assertions": [
            { "priority": 1, "expectation": "Role 'alert' is conveyed" }
        ]
    }))
    .unwrap()
}

async fn connect_and_start(mock: &MockAtDriver) -> AtDriverClient {
    let mut client = AtDriverClient::connect(&mock.url).await.unwrap();
    client.new_session().await.unwrap();
    client
}

#[tokio::test]
async fn test_enter_command_maps_and_collects_speech() {
    let mock = MockAtDriver::spawn(
        "NVDA",
        vec![
            vec!["You pressed enter"],
            vec!["heading", "level 2"],
        ],
    )
    .await;
    let client = connect_and_start(&mock).await;

    let browser = MockBrowser::default();
    let navigations = Arc::clone(&browser.navigations);
    let mut runner = TestRunner::new(
        client,
        Box::new(browser),
        "http://files.test",
        fast_timings(),
    );

    let test = test_file(
        json!([
            { "id": "c1", "keystroke": "Enter", "keypresses": [{ "id": "ENTER" }] },
            { "id": "c2", "keystroke": "h", "keypresses": [{ "id": "h" }] }
        ]),
        None,
    );
    let result = runner.run(&test).await.unwrap();

    // Scenario A: exactly one pressKeys per chord, ENTER mapped to U+E007.
    let presses = mock.requests("interaction.pressKeys");
    assert_eq!(presses.len(), 2);
    assert_eq!(presses[0]["params"]["keys"], json!(["\u{e007}"]));
    assert_eq!(presses[1]["params"]["keys"], json!(["h"]));

    // Request ids are strictly increasing from 0 (session.new took 0).
    let ids: Vec<u64> = mock
        .received
        .lock()
        .unwrap()
        .iter()
        .map(|frame| frame["id"].as_str().unwrap().parse().unwrap())
        .collect();
    assert_eq!(ids[0], 0);
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

    // Each command's window captured only its own speech.
    assert_eq!(result.commands.len(), 2);
    assert_eq!(result.commands[0].response.as_deref(), Some("You pressed enter"));
    assert_eq!(result.commands[1].response.as_deref(), Some("heading\nlevel 2"));
    assert!(result.results.iter().all(|assertion| assertion.pass));

    // Capabilities were composed from both halves of the pair.
    assert_eq!(result.capabilities.at_name, "NVDA");
    assert_eq!(result.capabilities.at_version, "2099.1");
    assert_eq!(result.capabilities.browser_name, "Firefox");
    assert_eq!(result.capabilities.platform_name, "test-os");

    // Reference page, blank page, reference page, blank page.
    let visited = navigations.lock().unwrap().clone();
    assert_eq!(
        visited,
        vec![
            "http://files.test/reference/index.html",
            "about:blank",
            "http://files.test/reference/index.html",
            "about:blank",
        ]
    );

    runner.quit().await.unwrap();
}

#[tokio::test]
async fn test_invalid_keys_fail_assertions_without_side_effects() {
    let mock = MockAtDriver::spawn("NVDA", vec![]).await;
    let client = connect_and_start(&mock).await;

    let browser = MockBrowser::default();
    let navigations = Arc::clone(&browser.navigations);
    let mut runner = TestRunner::new(
        client,
        Box::new(browser),
        "http://files.test",
        fast_timings(),
    );

    let test = test_file(
        json!([
            { "id": "c2", "keystroke": "A or B", "keypresses": [{ "id": "A/B" }] }
        ]),
        None,
    );
    let result = runner.run(&test).await.unwrap();

    // Scenario B: validation errors, no output, every assertion fails.
    assert_eq!(result.commands.len(), 1);
    assert!(result.commands[0].response.is_none());
    assert!(result.commands[0]
        .errors
        .iter()
        .any(|error| error.contains("'/'")));
    assert!(!result.results.is_empty());
    assert!(result.results.iter().all(|assertion| !assertion.pass));

    // The command was skipped entirely: no key presses, no navigation.
    assert!(mock.requests("interaction.pressKeys").is_empty());
    assert!(navigations.lock().unwrap().is_empty());

    runner.quit().await.unwrap();
}

#[tokio::test]
async fn test_nvda_mode_switch_succeeds_on_second_attempt() {
    // Scenario C: first toggle lands in the wrong mode, second confirms.
    let mock = MockAtDriver::spawn(
        "NVDA",
        vec![
            vec!["Focus mode"],
            vec!["Browse mode"],
            vec!["Alert dialog"],
        ],
    )
    .await;
    let client = connect_and_start(&mock).await;

    let mut runner = TestRunner::new(
        client,
        Box::new(MockBrowser::default()),
        "http://files.test",
        fast_timings(),
    );

    let test = test_file(
        json!([
            {
                "id": "c1",
                "keystroke": "b",
                "keypresses": [{ "id": "b" }],
                "settings": "browseMode"
            }
        ]),
        None,
    );
    let result = runner.run(&test).await.unwrap();

    // Audio indication disabled before the toggles, restored afterwards.
    let settings = mock.requests("nvda:settings.setSettings");
    assert_eq!(settings.len(), 2);
    assert_eq!(
        settings[0]["params"]["settings"][0]["name"],
        "virtualBuffers.passThroughAudioIndication"
    );
    assert_eq!(settings[0]["params"]["settings"][0]["value"], json!(false));
    assert_eq!(settings[1]["params"]["settings"][0]["value"], json!(true));

    // Two toggle attempts (insert+space) then the command's own key.
    let presses = mock.requests("interaction.pressKeys");
    assert_eq!(presses.len(), 3);
    assert_eq!(
        presses[0]["params"]["keys"],
        json!(["\u{e016}", "\u{e00d}"])
    );
    assert_eq!(presses[1]["params"]["keys"], presses[0]["params"]["keys"]);
    assert_eq!(presses[2]["params"]["keys"], json!(["b"]));

    assert_eq!(result.commands[0].response.as_deref(), Some("Alert dialog"));
    assert!(result.results.iter().all(|assertion| assertion.pass));

    runner.quit().await.unwrap();
}

#[tokio::test]
async fn test_mode_switch_failure_reports_unmatched_speech() {
    // Both attempts land in the wrong mode; the error lists what was heard
    // and the audio indication is still restored.
    let mock = MockAtDriver::spawn(
        "NVDA",
        vec![vec!["Focus mode"], vec!["Focus mode"]],
    )
    .await;
    let client = connect_and_start(&mock).await;

    let mut runner = TestRunner::new(
        client,
        Box::new(MockBrowser::default()),
        "http://files.test",
        fast_timings(),
    );

    let test = test_file(
        json!([
            {
                "id": "c1",
                "keystroke": "b",
                "keypresses": [{ "id": "b" }],
                "settings": "browseMode"
            }
        ]),
        None,
    );
    let error = runner.run(&test).await.unwrap_err();
    let message = error.to_string();
    assert!(message.contains("Browse mode"), "{message}");
    assert!(message.contains("Focus mode"), "{message}");

    let settings = mock.requests("nvda:settings.setSettings");
    assert_eq!(settings.len(), 2);
    assert_eq!(settings[1]["params"]["settings"][0]["value"], json!(true));

    runner.quit().await.unwrap();
}

#[tokio::test]
async fn test_legacy_reading_mode_translates_for_nvda() {
    let mock = MockAtDriver::spawn(
        "NVDA",
        vec![vec!["Browse mode"], vec!["banner landmark"]],
    )
    .await;
    let client = connect_and_start(&mock).await;

    let mut runner = TestRunner::new(
        client,
        Box::new(MockBrowser::default()),
        "http://files.test",
        fast_timings(),
    );

    let test = test_file(
        json!([
            { "id": "c1", "keystroke": "d", "keypresses": [{ "id": "d" }] }
        ]),
        Some("reading"),
    );
    let result = runner.run(&test).await.unwrap();

    // The legacy mode triggered the browse-mode toggle machinery, and the
    // first attempt's confirmation made a second attempt unnecessary:
    // one toggle chord plus the command's own key.
    assert_eq!(mock.requests("nvda:settings.setSettings").len(), 2);
    assert_eq!(mock.requests("interaction.pressKeys").len(), 2);
    assert_eq!(result.commands[0].response.as_deref(), Some("banner landmark"));

    runner.quit().await.unwrap();
}

#[tokio::test]
async fn test_calls_require_session() {
    let mock = MockAtDriver::spawn("NVDA", vec![]).await;
    let client = AtDriverClient::connect(&mock.url).await.unwrap();

    let sequence = KeySequence::from(Chord::new(vec![Key::new("enter")]));
    let error = client.send_keys(&sequence).await.unwrap_err();
    assert!(matches!(error, at_harness::Error::SessionNotReady));

    client.quit().await.unwrap();
}

#[tokio::test]
async fn test_plan_fixture_loads_from_directory() {
    let fixtures = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures");
    let tests = plan::load_plan(&fixtures).unwrap();

    assert_eq!(tests.len(), 1);
    assert_eq!(tests[0].info.test_id, "alert-trigger");
    assert_eq!(tests[0].commands.len(), 2);
    assert_eq!(tests[0].commands[0].keypresses[0].id, "ENTER");
}
