use sgrid_domain::node::{NodeId, NodeInfo, Topology};
use sgrid_events::{
    ClusterEvents, EventHubError, SessionEvent, SessionEventKind, SsoEvent, SsoEventKind,
};

fn seed_topology() -> Topology {
    Topology::new(NodeId::from("n1"), vec![NodeInfo::new("n1", Some("r1"))])
}

#[tokio::test]
async fn topology_watch_sees_latest_snapshot() {
    let hub = ClusterEvents::new(seed_topology());
    let mut rx = hub.watch_topology();

    assert_eq!(rx.borrow().len(), 1);

    let grown = hub.current_topology().with_member(NodeInfo::new("n2", Some("r2")));
    hub.publish_topology(grown);

    rx.changed().await.expect("sender is alive");
    assert_eq!(rx.borrow().len(), 2);
    assert_eq!(hub.current_topology().len(), 2);
}

#[tokio::test]
async fn session_events_fan_out_to_all_subscribers() {
    let hub = ClusterEvents::new(seed_topology());
    let mut rx_a = hub.subscribe_sessions();
    let mut rx_b = hub.subscribe_sessions();

    let delivered =
        hub.publish_session(SessionEvent::new("web", "s-1", SessionEventKind::Created));
    assert_eq!(delivered, 2);

    let got_a = rx_a.recv().await.expect("event for a");
    let got_b = rx_b.recv().await.expect("event for b");
    assert_eq!(got_a, got_b);
    assert_eq!(got_a.kind, SessionEventKind::Created);
}

#[tokio::test]
async fn publishing_without_subscribers_delivers_to_nobody() {
    let hub = ClusterEvents::new(seed_topology());
    let delivered = hub.publish_sso(SsoEvent::new("sso-1", SsoEventKind::Registered));
    assert_eq!(delivered, 0);
}

#[test]
fn zero_capacity_is_rejected() {
    let err = ClusterEvents::with_capacity(seed_topology(), 0)
        .expect_err("zero capacity must be rejected");
    assert!(matches!(err, EventHubError::InvalidCapacity { .. }));
}

#[tokio::test]
async fn cascading_logout_carries_session_ids() {
    let hub = ClusterEvents::new(seed_topology());
    let mut rx = hub.subscribe_sso();

    hub.publish_sso(SsoEvent::new(
        "sso-1",
        SsoEventKind::SessionsInvalidated { sessions: vec!["s-1".to_owned(), "s-2".to_owned()] },
    ));

    let event = rx.recv().await.expect("sso event");
    match event.kind {
        SsoEventKind::SessionsInvalidated { sessions } => assert_eq!(sessions.len(), 2),
        other => panic!("unexpected event kind: {other:?}"),
    }
}
