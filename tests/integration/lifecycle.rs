//! Lifecycle tests: startup from config, shutdown, contract violations

use std::time::Duration;

use assert_matches::assert_matches;
use pulse::{
    config::{Config, ConsoleConfig, StorageConfig},
    storage::{IngressError, log::LogStorage},
    supervisor::EngineSupervisor,
};

use super::helpers::*;

#[tokio::test]
async fn test_shutdown_closes_file_and_rejects_late_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.log");

    let supervisor = EngineSupervisor::new();
    let storage = LogStorage::new(&create_log_config(path.to_str().unwrap())).unwrap();
    let handles = supervisor.start(storage);

    handles.metrics.send(create_metric("a", 1.0)).await.unwrap();
    handles.metrics.send(create_metric("b", 2.0)).await.unwrap();
    handles.events.send(create_event("deploy", 200)).await.unwrap();

    supervisor.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(supervisor.running(), 0);

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 3);

    // the loop is gone and the file handle with it
    assert!(handles.metrics.is_closed());
    assert_eq!(
        handles.metrics.send(create_metric("late", 3.0)).await,
        Err(IngressError::Closed)
    );
    assert_eq!(
        handles.events.send(create_event("late", 500)).await,
        Err(IngressError::Closed)
    );
}

#[tokio::test]
async fn test_start_configured_starts_every_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("both.log");

    let config = Config {
        storage: StorageConfig {
            console: Some(ConsoleConfig::default()),
            log: Some(create_log_config(path.to_str().unwrap())),
        },
    };

    let supervisor = EngineSupervisor::new();
    let handles = supervisor.start_configured(&config).unwrap();
    assert_eq!(handles.len(), 2);
    assert_eq!(supervisor.running(), 2);

    let names: Vec<_> = handles.iter().map(|h| h.name).collect();
    assert_eq!(names, vec!["console", "log"]);

    for handle in &handles {
        handle.metrics.send(create_metric("both", 1.5)).await.unwrap();
    }

    supervisor.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "metric both 1.5\n");
}

#[tokio::test]
async fn test_console_event_is_contract_violation() {
    let config = Config {
        storage: StorageConfig {
            console: Some(ConsoleConfig::default()),
            log: None,
        },
    };

    let supervisor = EngineSupervisor::new();
    let handles = supervisor.start_configured(&config).unwrap();
    let console = &handles[0];

    assert!(!console.events.is_supported());
    let err = console.events.send(create_event("deploy", 200)).await.unwrap_err();
    assert_matches!(err, IngressError::Unsupported { backend: "console" });
    assert_ne!(err, IngressError::Closed);

    // still a contract violation once the backend is gone
    supervisor.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_matches!(
        console.events.send(create_event("deploy", 200)).await,
        Err(IngressError::Unsupported { .. })
    );
}

#[tokio::test]
async fn test_shutdown_is_bounded_for_many_backends() {
    let dir = tempfile::tempdir().unwrap();
    let supervisor = EngineSupervisor::new();

    let mut handles = Vec::new();
    for i in 0..8 {
        let path = dir.path().join(format!("engine-{i}.log"));
        let storage = LogStorage::new(&create_log_config(path.to_str().unwrap())).unwrap();
        handles.push(supervisor.start(storage));
    }
    assert_eq!(supervisor.running(), 8);

    let started = std::time::Instant::now();
    supervisor.shutdown(Duration::from_secs(5)).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    for handle in handles {
        assert!(handle.metrics.is_closed());
    }
}
