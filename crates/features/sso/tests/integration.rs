use sgrid_domain::config::SsoConfig;
use sgrid_domain::node::{NodeId, Topology};
use sgrid_events::{ClusterEvents, SsoEventKind};
use sgrid_sso::{Credentials, SsoError, SsoManager};
use std::time::Duration;

fn hub() -> ClusterEvents {
    ClusterEvents::new(Topology::new(NodeId::from("n1"), Vec::new()))
}

fn manager(max_empty_life_secs: u64) -> SsoManager {
    SsoManager::new(
        SsoConfig { enabled: true, max_empty_life_secs, process_expires_interval_secs: 60 },
        hub(),
    )
}

#[test]
fn register_associate_deregister_roundtrip() {
    let sso = manager(1800);

    let id = sso.register(Some(Credentials::new("alice", "secret")));
    sso.associate(&id, "web", "s-1").unwrap();
    sso.associate(&id, "api", "s-2").unwrap();

    let mut sessions = sso.sessions_of(&id).unwrap();
    sessions.sort();
    assert_eq!(
        sessions,
        vec![("api".to_owned(), "s-2".to_owned()), ("web".to_owned(), "s-1".to_owned())]
    );

    let invalidated = sso.deregister(&id).unwrap();
    assert_eq!(invalidated.len(), 2);
    assert!(matches!(sso.sessions_of(&id), Err(SsoError::NotFound { .. })));
}

#[test]
fn credentials_update_and_masking() {
    let sso = manager(1800);
    let id = sso.register(None);

    assert_eq!(sso.credentials(&id).unwrap(), None);

    sso.update_credentials(&id, Credentials::new("alice", "secret")).unwrap();
    let creds = sso.credentials(&id).unwrap().unwrap();
    assert_eq!(creds.username(), "alice");
    assert_eq!(creds.password(), "secret");

    let debug = format!("{creds:?}");
    assert!(debug.contains("alice"));
    assert!(!debug.contains("secret"));
}

#[test]
fn unknown_entries_are_errors() {
    let sso = manager(1800);
    assert!(matches!(sso.associate("nope", "web", "s-1"), Err(SsoError::NotFound { .. })));
    assert!(matches!(sso.deregister("nope"), Err(SsoError::NotFound { .. })));
    assert!(matches!(
        sso.update_credentials("nope", Credentials::new("a", "b")),
        Err(SsoError::NotFound { .. })
    ));
}

#[test]
fn empty_entries_expire_after_the_grace_period() {
    let sso = manager(0);

    let abandoned = sso.register(None);
    let kept = sso.register(None);
    sso.associate(&kept, "web", "s-1").unwrap();

    std::thread::sleep(Duration::from_millis(20));
    sso.process_expires();

    assert!(matches!(sso.sessions_of(&abandoned), Err(SsoError::NotFound { .. })));
    assert!(sso.sessions_of(&kept).is_ok());
    assert_eq!(sso.entry_count(), 1);
}

#[test]
fn reassociation_cancels_the_grace_period() {
    let sso = manager(0);

    let id = sso.register(None);
    sso.associate(&id, "web", "s-1").unwrap();
    sso.disassociate(&id, "web", "s-1").unwrap();
    // Entry is now empty, but a new session arrives before the sweep.
    sso.associate(&id, "web", "s-2").unwrap();

    std::thread::sleep(Duration::from_millis(20));
    sso.process_expires();

    assert!(sso.sessions_of(&id).is_ok());
}

#[test]
fn lifecycle_events_are_published() {
    let hub = hub();
    let mut rx = hub.subscribe_sso();
    let sso = SsoManager::new(
        SsoConfig { enabled: true, max_empty_life_secs: 1800, process_expires_interval_secs: 60 },
        hub.clone(),
    );

    let id = sso.register(None);
    sso.associate(&id, "web", "s-1").unwrap();
    sso.disassociate(&id, "web", "s-1").unwrap();
    sso.associate(&id, "web", "s-2").unwrap();
    sso.deregister(&id).unwrap();

    let kinds: Vec<SsoEventKind> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|event| event.kind)
        .collect();

    assert_eq!(
        kinds,
        vec![
            SsoEventKind::Registered,
            SsoEventKind::NotEmpty,
            SsoEventKind::Empty,
            SsoEventKind::NotEmpty,
            SsoEventKind::Deregistered,
            SsoEventKind::SessionsInvalidated { sessions: vec!["s-2".to_owned()] },
        ]
    );
}
