use super::*;

#[tokio::test]
async fn test_status_of_unknown_job_is_not_found() {
    let (coordinator, _engine, _temp_dir) = create_test_coordinator().await;

    let id = crate::types::JobId::new();
    assert!(matches!(coordinator.status(id).await, Err(Error::NotFound(got)) if got == id));
    assert!(matches!(coordinator.watch(id).await, Err(Error::NotFound(_))));
    assert!(matches!(coordinator.wait(id).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_list_is_in_creation_order() {
    let (coordinator, _engine, _temp_dir) = create_test_coordinator().await;

    let a = coordinator.start(MAGNET).await.unwrap();
    let b = coordinator.start(OTHER_MAGNET).await.unwrap();
    let c = coordinator.start(MAGNET).await.unwrap();

    let listed: Vec<_> = coordinator.list().await.into_iter().map(|s| s.job_id).collect();
    assert_eq!(listed, vec![a, b, c]);

    for id in [a, b, c] {
        coordinator.stop(id).await.unwrap();
    }
}

#[tokio::test]
async fn test_watch_sees_every_state() {
    let (coordinator, engine, _temp_dir) = create_test_coordinator().await;

    let id = coordinator.start(MAGNET).await.unwrap();
    let mut rx = coordinator.watch(id).await.unwrap();
    let transfer = wait_for_transfer(&engine, MAGNET).await;

    let collector = tokio::spawn(async move {
        let mut states = vec![rx.borrow_and_update().state];
        while rx.changed().await.is_ok() {
            let snapshot: JobSnapshot = rx.borrow_and_update().clone();
            if states.last() != Some(&snapshot.state) {
                states.push(snapshot.state);
            }
            if snapshot.state.is_terminal() {
                break;
            }
        }
        states
    });

    transfer.set_metadata(true);
    wait_until(&coordinator, id, |s| s.state == JobState::Downloading).await;
    transfer.complete();

    let states = tokio::time::timeout(WAIT_LIMIT, collector)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(states.first(), Some(&JobState::Pending));
    assert!(states.contains(&JobState::Downloading));
    assert_eq!(states.last(), Some(&JobState::Completed));
}

#[tokio::test]
async fn test_snapshot_carries_rate_and_peers() {
    let (coordinator, engine, _temp_dir) = create_test_coordinator().await;
    let (id, transfer) = start_downloading(&coordinator, &engine, MAGNET).await;

    transfer.set_rate(4096, 7);
    let snapshot = wait_until(&coordinator, id, |s| s.peers == 7).await;
    assert_eq!(snapshot.download_rate, 4096);

    coordinator.stop(id).await.unwrap();
    let snapshot = coordinator.wait(id).await.unwrap();
    assert_eq!(snapshot.download_rate, 0);
    assert_eq!(snapshot.peers, 0);
}
