//! End-to-end config reload: file change to restart request.

use std::time::Duration;

use mdqconfig::{ConfigDocument, PartitionConfig};
use mdqdaemon::classify::RestartSignal;
use mdqdaemon::orchestrator::TaskOutcome;
use mdqdaemon::watch::watch_config;
use tokio::time::{sleep, timeout};

const SETTLE: Duration = Duration::from_millis(300);
const DEADLINE: Duration = Duration::from_secs(10);

async fn watch_for(
    edit: impl FnOnce(&mut ConfigDocument),
) -> (RestartSignal, ConfigDocument) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mdqueue.yaml");

    let snapshot = ConfigDocument::default();
    snapshot.store(&path).unwrap();

    let watcher = tokio::spawn(watch_config(path.clone(), snapshot.clone()));
    // Give the backend time to install its watch before we edit the file.
    sleep(SETTLE).await;

    let mut next = snapshot;
    edit(&mut next);
    next.store(&path).unwrap();

    let outcome = timeout(DEADLINE, watcher).await.unwrap().unwrap().unwrap();
    let TaskOutcome::Restart { signal, config } = outcome else {
        panic!("watcher completed without a restart request");
    };
    (signal, config)
}

#[tokio::test]
async fn port_change_requests_a_global_restart() {
    let (signal, config) = watch_for(|config| config.port = 6601).await;
    assert_eq!(signal, RestartSignal::Global);
    assert_eq!(config.port, 6601);
}

#[tokio::test]
async fn partition_change_requests_a_partition_restart() {
    let (signal, config) = watch_for(|config| {
        config
            .partitions
            .insert("kitchen".to_string(), PartitionConfig::default());
    })
    .await;
    assert_eq!(signal, RestartSignal::PartitionsOnly);
    assert!(config.partitions.contains_key("kitchen"));
}
