//! Debounce-based speech collection
//!
//! An AT never says "done speaking"; silence is the only completion signal.
//! The collector runs an operation while a background job drains the speech
//! stream, then waits for one full idle window before declaring the output
//! settled.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::atdriver::Speeches;
use crate::common::Result;
use crate::job::CancelableJob;

/// Run `op` while draining `speeches` into a buffer, then keep waiting
/// until one full `debounce` window passes with no new utterances.
///
/// Returns the operation's value and everything captured, in arrival order
/// and without deduplication. Total collection time is op-time plus at
/// least one idle window — and has no upper bound while speech keeps
/// arriving.
pub async fn collect_speech<T, Fut>(
    mut speeches: Speeches,
    debounce: Duration,
    op: Fut,
) -> Result<(T, Vec<String>)>
where
    Fut: Future<Output = Result<T>>,
{
    let observed = Arc::new(AtomicUsize::new(0));

    let job = CancelableJob::start({
        let observed = Arc::clone(&observed);
        move |token| async move {
            let mut spoken = Vec::new();
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    utterance = speeches.next() => match utterance {
                        Some(text) => {
                            tracing::debug!(spoken = %text, "speech event");
                            spoken.push(text);
                            observed.fetch_add(1, Ordering::SeqCst);
                        }
                        None => break,
                    },
                }
            }
            spoken
        }
    });

    let value = match op.await {
        Ok(value) => value,
        Err(e) => {
            let _ = job.cancel().await;
            return Err(e);
        }
    };

    loop {
        let before = observed.load(Ordering::SeqCst);
        tokio::time::sleep(debounce).await;
        if observed.load(Ordering::SeqCst) == before {
            break;
        }
    }

    let spoken = job.cancel().await?;
    Ok((value, spoken))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atdriver::types::{Inbound, Notification};
    use crate::common::Error;
    use tokio::sync::broadcast;

    fn utterance(text: &str) -> Arc<Inbound> {
        Arc::new(Inbound::Notification(Notification {
            method: "interaction.capturedOutput".to_string(),
            params: serde_json::json!({ "data": text }),
        }))
    }

    #[tokio::test]
    async fn test_collects_until_idle_window() {
        let (tx, rx) = broadcast::channel(16);
        let speeches = Speeches::from_receiver(rx);

        let feeder = tokio::spawn({
            let tx = tx.clone();
            async move {
                for i in 0..3 {
                    tx.send(utterance(&format!("line {i}"))).unwrap();
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            }
        });

        let ((), spoken) = collect_speech(speeches, Duration::from_millis(80), async {
            Ok::<(), Error>(())
        })
        .await
        .unwrap();

        assert_eq!(spoken, vec!["line 0", "line 1", "line 2"]);
        feeder.await.unwrap();
    }

    #[tokio::test]
    async fn test_windows_do_not_duplicate_events() {
        let (tx, keepalive) = broadcast::channel(16);

        let first_window = Speeches::from_receiver(tx.subscribe());
        tx.send(utterance("first")).unwrap();
        let ((), first) = collect_speech(first_window, Duration::from_millis(30), async {
            Ok::<(), Error>(())
        })
        .await
        .unwrap();

        let second_window = Speeches::from_receiver(tx.subscribe());
        tx.send(utterance("second")).unwrap();
        let ((), second) = collect_speech(second_window, Duration::from_millis(30), async {
            Ok::<(), Error>(())
        })
        .await
        .unwrap();

        assert_eq!(first, vec!["first"]);
        assert_eq!(second, vec!["second"]);
        drop(keepalive);
    }

    #[tokio::test]
    async fn test_operation_error_still_stops_listener() {
        let (tx, rx) = broadcast::channel(16);
        let speeches = Speeches::from_receiver(rx);

        let result: Result<((), Vec<String>)> =
            collect_speech(speeches, Duration::from_millis(20), async {
                Err(Error::Internal("operation failed".to_string()))
            })
            .await;

        assert!(result.is_err());
        drop(tx);
    }

    #[tokio::test]
    async fn test_collection_extends_while_speech_arrives() {
        let (tx, rx) = broadcast::channel(16);
        let speeches = Speeches::from_receiver(rx);

        // Keep speaking at intervals shorter than the debounce; everything
        // must land in one window.
        let feeder = tokio::spawn({
            let tx = tx.clone();
            async move {
                for i in 0..5 {
                    tokio::time::sleep(Duration::from_millis(15)).await;
                    tx.send(utterance(&format!("more {i}"))).unwrap();
                }
            }
        });

        let ((), spoken) = collect_speech(speeches, Duration::from_millis(60), async {
            Ok::<(), Error>(())
        })
        .await
        .unwrap();

        assert_eq!(spoken.len(), 5);
        feeder.await.unwrap();
    }
}
