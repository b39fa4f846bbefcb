use super::*;
use sg_core::config::WatcherConfig;
use std::time::Duration;
use tempfile::tempdir;
use tokio::time::timeout;

fn fast_config() -> WatcherConfig {
    WatcherConfig {
        idle_timeout: Duration::from_millis(150),
        stability_threshold_local: Duration::from_millis(40),
        stability_threshold_spoke: Duration::from_millis(250),
        poll_interval: Duration::from_millis(10),
        max_depth: 2,
    }
}

async fn recv_until(
    rx: &mut mpsc::Receiver<WatcherEvent>,
    pred: impl Fn(&WatcherEvent) -> bool,
) -> WatcherEvent {
    timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("channel open");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event within timeout")
}

#[tokio::test]
async fn idle_fires_exactly_once_after_quiescence() {
    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("session.jsonl");
    std::fs::write(&file, "{\"id\":\"h\"}\n").expect("write header");

    let (watcher, mut rx) = Watcher::start(
        vec![WatchRoot::local(dir.path())],
        fast_config(),
        Topology::default(),
    )
    .expect("start");

    recv_until(&mut rx, |e| matches!(e, WatcherEvent::Ready)).await;
    let idle = recv_until(&mut rx, |e| matches!(e, WatcherEvent::Idle(_))).await;
    match idle {
        WatcherEvent::Idle(path) => assert_eq!(path, file),
        _ => unreachable!(),
    }

    // No second idle event should follow without an intervening write.
    let second = timeout(Duration::from_millis(300), async {
        loop {
            if let Some(WatcherEvent::Idle(_)) = rx.recv().await {
                return true;
            }
        }
    })
    .await;
    assert!(second.is_err(), "idle fired more than once for one quiescent period");

    watcher.stop();
}

#[tokio::test]
async fn spoke_path_tolerates_writes_within_threshold_without_change_event() {
    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("session.jsonl");
    std::fs::write(&file, "{\"id\":\"h\"}\n").expect("write header");

    let mut topology = Topology::default();
    topology.register(dir.path(), "spoke-1");

    let mut config = fast_config();
    config.stability_threshold_spoke = Duration::from_millis(500);

    let (watcher, mut rx) =
        Watcher::start(vec![WatchRoot::spoke(dir.path())], config, topology).expect("start");

    recv_until(&mut rx, |e| matches!(e, WatcherEvent::Ready)).await;

    // Keep writing faster than the spoke threshold; Change must not fire.
    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(80)).await;
        std::fs::write(&file, "{\"id\":\"h\"}\nmore\n").expect("append");
    }

    let premature = timeout(Duration::from_millis(200), async {
        loop {
            if let Some(WatcherEvent::Change(_)) = rx.recv().await {
                return true;
            }
        }
    })
    .await;
    assert!(premature.is_err(), "Change fired before spoke stability threshold elapsed");

    watcher.stop();
}
