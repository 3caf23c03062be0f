//! Timeout combinators.
//!
//! Every wait in the crate (browser launch, selector polling, network interception,
//! external processes) goes through these helpers so a timer win always surfaces as
//! [`AppError::Timeout`] with a label naming the step.

use std::future::Future;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::core::error::AppError;

/// Races `future` against a timer of `duration`.
///
/// Exactly one side wins. If the timer fires first the future is dropped and
/// `AppError::Timeout("<label> timed out after Ns")` is returned.
pub async fn race<T, E, Fut>(duration: Duration, label: &str, future: Fut) -> Result<T, AppError>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<AppError>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(timed_out(label, duration)),
    }
}

/// Builds the error returned when `label` loses its race.
pub fn timed_out(label: &str, duration: Duration) -> AppError {
    AppError::Timeout(format!("{} timed out after {}", label, format_duration(duration)))
}

fn format_duration(duration: Duration) -> String {
    if duration.as_millis() < 1000 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{}s", duration.as_secs())
    }
}

/// Run an async Command with a timeout.
///
/// The child is killed when the timer wins.
pub async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, AppError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(AppError::Io(e)),
        Err(_) => Err(timed_out("process", timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_race_returns_value_when_future_wins() {
        let result = race(Duration::from_secs(1), "quick", async { Ok::<_, AppError>(7) }).await;
        assert_eq!(result.ok(), Some(7));
    }

    #[tokio::test]
    async fn test_race_times_out_with_label() {
        let result = race(Duration::from_millis(20), "page creation", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, AppError>(())
        })
        .await;

        match result {
            Err(AppError::Timeout(msg)) => assert_eq!(msg, "page creation timed out after 20ms"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_race_passes_inner_error_through() {
        let result = race(Duration::from_secs(1), "op", async {
            Err::<(), _>(AppError::Browser("boom".into()))
        })
        .await;
        assert!(matches!(result, Err(AppError::Browser(msg)) if msg == "boom"));
    }

    #[tokio::test]
    async fn test_run_with_timeout_kills_slow_process() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let result = run_with_timeout(&mut cmd, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(AppError::Timeout(_))));
    }
}
