//! End-to-end tests of the log backend through its processing loop

use std::time::Duration;

use pretty_assertions::assert_eq;
use pulse::{
    config::read_config_file,
    storage::{StorageEngine, StorageError, log::LogStorage},
    supervisor::EngineSupervisor,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::helpers::*;

#[tokio::test]
async fn test_records_written_in_arrival_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ordered.log");

    let token = CancellationToken::new();
    let tracker = TaskTracker::new();
    let storage = LogStorage::new(&create_log_config(path.to_str().unwrap())).unwrap();
    let (metrics, _events) = storage.start_storage_engine(token.clone(), &tracker);

    for i in 0..50 {
        metrics
            .send(create_metric(&format!("job{i}"), i as f64))
            .await
            .unwrap();
    }

    token.cancel();
    tracker.close();
    tokio::time::timeout(Duration::from_secs(5), tracker.wait())
        .await
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let expected: Vec<String> = (0..50).map(|i| format!("metric job{i} {i}")).collect();
    assert_eq!(content.lines().collect::<Vec<_>>(), expected);
}

#[tokio::test]
async fn test_events_written_in_arrival_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events-ordered.log");

    let supervisor = EngineSupervisor::new();
    let handles =
        supervisor.start(LogStorage::new(&create_log_config(path.to_str().unwrap())).unwrap());

    for status in 0..30 {
        handles
            .events
            .send(create_event(&format!("event{status}"), status))
            .await
            .unwrap();
    }
    supervisor.shutdown(Duration::from_secs(5)).await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let expected: Vec<String> = (0..30)
        .map(|i| format!("event event{i} {i} source=test"))
        .collect();
    assert_eq!(content.lines().collect::<Vec<_>>(), expected);
}

#[tokio::test]
async fn test_stderr_flushed_but_left_open_on_close() {
    use std::io::Write;

    let mut storage = LogStorage::new(&create_log_config("stderr")).unwrap();
    storage
        .send_metric(&create_metric("to-stderr", 1.0))
        .await
        .unwrap();
    storage.close().await.unwrap();

    // the backend released its handle, the process stream is still usable
    assert!(matches!(
        storage.send_metric(&create_metric("late", 1.0)).await,
        Err(StorageError::Closed)
    ));
    let mut stderr = std::io::stderr();
    assert!(writeln!(stderr, "stderr still open").is_ok());
    assert!(stderr.flush().is_ok());
}

#[tokio::test]
async fn test_events_rendered_with_tags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.log");

    let supervisor = EngineSupervisor::new();
    let handles =
        supervisor.start(LogStorage::new(&create_log_config(path.to_str().unwrap())).unwrap());

    handles
        .events
        .send(create_event("rollback", 503))
        .await
        .unwrap();
    supervisor.shutdown(Duration::from_secs(5)).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "event rollback 503 source=test\n"
    );
}

#[tokio::test]
async fn test_config_file_to_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.log");
    let config_path = dir.path().join("config.json");

    let config = serde_json::json!({
        "storage": {
            "log": {
                "stream": output,
                "format": {
                    "metric": "%time %job/%timing=%value [%tags]",
                    "event": "%time %name",
                    "tag": "%name:%value",
                    "tag-seperator": " "
                },
                "time": { "location": "America/New_York", "format": "%Y-%m-%d %H:%M" }
            }
        }
    });
    std::fs::write(&config_path, config.to_string()).unwrap();

    let config = read_config_file(&config_path).unwrap();
    let supervisor = EngineSupervisor::new();
    let handles = supervisor.start_configured(&config).unwrap();

    let mut metric = create_metric("checkout", 0.333333333);
    metric.timing = "render".to_string();
    metric.tags.insert("region".to_string(), "us".to_string());
    metric.tags.insert("browser".to_string(), "firefox".to_string());
    handles[0].metrics.send(metric).await.unwrap();

    supervisor.shutdown(Duration::from_secs(5)).await.unwrap();

    // 10:00 UTC is 06:00 in New York during daylight saving time
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "2024-06-01 06:00 checkout/render=0.333333 [browser:firefox region:us]\n"
    );
}
