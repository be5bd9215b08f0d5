use rtms_scribe::rtms::{ChannelCommand, ChannelHandle, ChannelRole, ConnectionRegistry};
use tokio::sync::mpsc;

fn test_handle(role: ChannelRole) -> (ChannelHandle, mpsc::Receiver<ChannelCommand>) {
    let (tx, rx) = mpsc::channel(8);
    (ChannelHandle::new(role, tx), rx)
}

#[tokio::test]
async fn register_then_lookup_returns_both_roles() {
    let registry = ConnectionRegistry::new();
    let (control, _control_rx) = test_handle(ChannelRole::Control);
    let (data, _data_rx) = test_handle(ChannelRole::Data);

    registry.register("sess-1", control).await;
    registry.register("sess-1", data).await;

    let (control, data) = registry.lookup("sess-1").await;
    assert!(control.is_some());
    assert!(data.is_some());
    assert_eq!(control.unwrap().role(), ChannelRole::Control);
    assert_eq!(data.unwrap().role(), ChannelRole::Data);
}

#[tokio::test]
async fn lookup_of_unknown_session_is_empty() {
    let registry = ConnectionRegistry::new();
    let (control, data) = registry.lookup("nope").await;
    assert!(control.is_none());
    assert!(data.is_none());
}

#[tokio::test]
async fn register_overwrites_per_role() {
    let registry = ConnectionRegistry::new();
    let (first, mut first_rx) = test_handle(ChannelRole::Control);
    let (second, _second_rx) = test_handle(ChannelRole::Control);

    registry.register("sess-1", first).await;
    registry.register("sess-1", second).await;

    // Tearing down must close the surviving (second) registration only
    registry.teardown_all("sess-1").await;
    assert!(first_rx.try_recv().is_err());
}

#[tokio::test]
async fn teardown_closes_both_channels_and_empties_lookup() {
    let registry = ConnectionRegistry::new();
    let (control, mut control_rx) = test_handle(ChannelRole::Control);
    let (data, mut data_rx) = test_handle(ChannelRole::Data);

    registry.register("sess-1", control).await;
    registry.register("sess-1", data).await;

    registry.teardown_all("sess-1").await;

    assert!(matches!(control_rx.recv().await, Some(ChannelCommand::Close)));
    assert!(matches!(data_rx.recv().await, Some(ChannelCommand::Close)));

    let (control, data) = registry.lookup("sess-1").await;
    assert!(control.is_none());
    assert!(data.is_none());
}

#[tokio::test]
async fn teardown_is_idempotent() {
    let registry = ConnectionRegistry::new();
    let (control, mut control_rx) = test_handle(ChannelRole::Control);

    registry.register("sess-1", control).await;

    registry.teardown_all("sess-1").await;
    registry.teardown_all("sess-1").await;

    // Exactly one close command reaches the writer
    assert!(matches!(control_rx.recv().await, Some(ChannelCommand::Close)));
    assert!(control_rx.try_recv().is_err());
}

#[tokio::test]
async fn teardown_survives_an_already_stopped_writer() {
    let registry = ConnectionRegistry::new();

    let (control, control_rx) = test_handle(ChannelRole::Control);
    let (data, mut data_rx) = test_handle(ChannelRole::Data);

    registry.register("sess-1", control).await;
    registry.register("sess-1", data).await;

    // The control writer is gone; its close must not prevent the data close
    drop(control_rx);
    registry.teardown_all("sess-1").await;

    assert!(matches!(data_rx.recv().await, Some(ChannelCommand::Close)));
}

#[tokio::test]
async fn removing_one_channel_keeps_the_other() {
    let registry = ConnectionRegistry::new();
    let (control, _control_rx) = test_handle(ChannelRole::Control);
    let (data, _data_rx) = test_handle(ChannelRole::Data);

    registry.register("sess-1", control).await;
    registry.register("sess-1", data).await;

    registry.remove_channel("sess-1", ChannelRole::Data).await;

    let (control, data) = registry.lookup("sess-1").await;
    assert!(control.is_some());
    assert!(data.is_none());

    // Removing the last channel drops the session entry entirely
    registry.remove_channel("sess-1", ChannelRole::Control).await;
    let (control, _) = registry.lookup("sess-1").await;
    assert!(control.is_none());
}
