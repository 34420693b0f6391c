use sgrid_domain::config::{
    GridConfig, Granularity, PassivationConfig, SessionManagementConfig,
};
use sgrid_domain::node::{NodeId, Topology};
use sgrid_events::{ClusterEvents, SessionEventKind};
use sgrid_sessions::{Delta, SessionManager, SessionsError, manager::StatsSnapshot};
use sgrid_store::{Compression, Store};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn events() -> ClusterEvents {
    ClusterEvents::new(Topology::new(NodeId::from("n1"), Vec::new()))
}

async fn store(tmp: &TempDir) -> Store {
    Store::builder()
        .root(tmp.path().join("data"))
        .compression(Compression::Lz4)
        .connect()
        .await
        .unwrap()
}

async fn manager(tmp: &TempDir, config: SessionManagementConfig) -> SessionManager {
    let store = store(tmp).await;
    SessionManager::new("web".to_owned(), config, store.namespace("web").unwrap(), events())
}

fn passivating(max_active: Option<u64>, max_idle: Option<u64>) -> SessionManagementConfig {
    SessionManagementConfig {
        max_active,
        passivation: Some(PassivationConfig { min_idle_secs: 0, max_idle_secs: max_idle }),
        ..SessionManagementConfig::default()
    }
}

#[tokio::test]
async fn attribute_roundtrip_and_deltas() {
    let tmp = TempDir::new().unwrap();
    let manager = manager(
        &tmp,
        SessionManagementConfig {
            granularity: Granularity::Attribute,
            ..SessionManagementConfig::default()
        },
    )
    .await;

    let id = manager.create();
    manager.set_attribute(&id, "user", b"alice".to_vec()).await.unwrap();
    manager.set_attribute(&id, "cart", b"3".to_vec()).await.unwrap();

    assert_eq!(manager.get_attribute(&id, "user").await.unwrap(), Some(b"alice".to_vec()));
    assert_eq!(manager.get_attribute(&id, "missing").await.unwrap(), None);

    match manager.take_delta(&id).unwrap() {
        Delta::Attributes { changed, removed, .. } => {
            assert_eq!(changed.len(), 2);
            assert!(removed.is_empty());
        },
        other => panic!("unexpected delta: {other:?}"),
    }
    assert_eq!(manager.take_delta(&id).unwrap(), Delta::Clean);

    manager.remove_attribute(&id, "user").await.unwrap();
    match manager.take_delta(&id).unwrap() {
        Delta::Attributes { changed, removed, .. } => {
            assert!(changed.is_empty());
            assert_eq!(removed, vec!["user".to_owned()]);
        },
        other => panic!("unexpected delta: {other:?}"),
    }
}

#[tokio::test]
async fn session_granularity_produces_whole_deltas() {
    let tmp = TempDir::new().unwrap();
    let manager = manager(&tmp, SessionManagementConfig::default()).await;

    let id = manager.create();
    manager.set_attribute(&id, "user", b"alice".to_vec()).await.unwrap();

    match manager.take_delta(&id).unwrap() {
        Delta::Whole(record) => assert_eq!(record.id, id),
        other => panic!("unexpected delta: {other:?}"),
    }
}

#[tokio::test]
async fn pressure_passivation_respects_the_cap() {
    let tmp = TempDir::new().unwrap();
    let manager = manager(&tmp, passivating(Some(1), None)).await;

    let ids: Vec<String> = (0..3).map(|_| manager.create()).collect();
    assert_eq!(manager.active_count(), 3);

    tokio::time::sleep(Duration::from_millis(10)).await;
    manager.process_expiration().await;

    assert_eq!(manager.active_count(), 1);
    let stats = manager.stats();
    assert_eq!(stats.passivated, 2);
    assert_eq!(stats.max_concurrent, 3);

    // Every session is still reachable: access activates passivated ones.
    for id in &ids {
        manager.access(id).await.unwrap();
    }
    assert_eq!(manager.active_count(), 3);
    assert_eq!(manager.stats().activated, 2);
}

#[tokio::test]
async fn max_idle_forces_passivation_without_pressure() {
    let tmp = TempDir::new().unwrap();
    let manager = manager(&tmp, passivating(None, Some(0))).await;

    let id = manager.create();
    tokio::time::sleep(Duration::from_millis(10)).await;
    manager.process_expiration().await;

    assert_eq!(manager.active_count(), 0);
    assert_eq!(manager.stats().passivated, 1);

    manager.access(&id).await.unwrap();
    assert_eq!(manager.active_count(), 1);
}

#[tokio::test]
async fn idle_sessions_expire_in_memory_and_in_the_store() {
    let tmp = TempDir::new().unwrap();
    let manager = manager(
        &tmp,
        SessionManagementConfig {
            idle_timeout_secs: 0,
            passivation: Some(PassivationConfig { min_idle_secs: 0, max_idle_secs: None }),
            ..SessionManagementConfig::default()
        },
    )
    .await;

    let active = manager.create();
    let parked = manager.create();
    manager.passivate(&parked).await.unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    manager.process_expiration().await;

    assert_eq!(manager.active_count(), 0);
    assert_eq!(manager.stats().expired, 2);
    assert!(matches!(
        manager.access(&active).await,
        Err(SessionsError::NotFound { .. })
    ));
    assert!(matches!(
        manager.access(&parked).await,
        Err(SessionsError::NotFound { .. })
    ));
}

#[tokio::test]
async fn expiration_beats_passivation_for_the_same_session() {
    let tmp = TempDir::new().unwrap();
    let manager = manager(
        &tmp,
        SessionManagementConfig {
            idle_timeout_secs: 0,
            passivation: Some(PassivationConfig { min_idle_secs: 0, max_idle_secs: Some(0) }),
            ..SessionManagementConfig::default()
        },
    )
    .await;

    let id = manager.create();
    tokio::time::sleep(Duration::from_millis(10)).await;
    manager.process_expiration().await;

    // Idle past the timeout expires; it must not have passivated first.
    let stats = manager.stats();
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.passivated, 0);
    assert!(manager.access(&id).await.is_err());
}

#[tokio::test]
async fn invalidate_reaches_passivated_sessions() {
    let tmp = TempDir::new().unwrap();
    let manager = manager(&tmp, passivating(None, None)).await;

    let id = manager.create();
    manager.passivate(&id).await.unwrap();
    assert_eq!(manager.active_count(), 0);

    manager.invalidate(&id).await.unwrap();
    assert!(matches!(
        manager.invalidate(&id).await,
        Err(SessionsError::NotFound { .. })
    ));
    assert_eq!(manager.stats().invalidated, 1);
}

#[tokio::test]
async fn passivation_survives_a_manager_restart() {
    let tmp = TempDir::new().unwrap();
    let store = store(&tmp).await;

    let id = {
        let manager = SessionManager::new(
            "web".to_owned(),
            passivating(None, None),
            store.namespace("web").unwrap(),
            events(),
        );
        let id = manager.create();
        manager.set_attribute(&id, "user", b"alice".to_vec()).await.unwrap();
        manager.passivate(&id).await.unwrap();
        id
    };

    let manager = SessionManager::new(
        "web".to_owned(),
        passivating(None, None),
        store.namespace("web").unwrap(),
        events(),
    );
    assert_eq!(manager.get_attribute(&id, "user").await.unwrap(), Some(b"alice".to_vec()));
}

#[tokio::test]
async fn lifecycle_events_are_published() {
    let tmp = TempDir::new().unwrap();
    let hub = events();
    let mut rx = hub.subscribe_sessions();

    let store = store(&tmp).await;
    let manager = Arc::new(SessionManager::new(
        "web".to_owned(),
        passivating(None, None),
        store.namespace("web").unwrap(),
        hub.clone(),
    ));

    let id = manager.create();
    manager.passivate(&id).await.unwrap();
    manager.access(&id).await.unwrap();
    manager.invalidate(&id).await.unwrap();

    let kinds: Vec<SessionEventKind> = (0..4).map(|_| rx.try_recv().unwrap().kind).collect();
    assert_eq!(
        kinds,
        vec![
            SessionEventKind::Created,
            SessionEventKind::Passivated,
            SessionEventKind::Activated,
            SessionEventKind::Invalidated,
        ]
    );
}

#[tokio::test]
async fn sweeper_runs_on_its_interval() {
    let tmp = TempDir::new().unwrap();
    let manager = Arc::new(
        manager(
            &tmp,
            SessionManagementConfig {
                idle_timeout_secs: 0,
                sweep_interval_secs: 1,
                ..SessionManagementConfig::default()
            },
        )
        .await,
    );

    let _id = manager.create();
    let handle = sgrid_sessions::spawn_sweeper(Arc::clone(&manager));

    tokio::time::sleep(Duration::from_millis(2200)).await;
    assert_eq!(manager.active_count(), 0);
    assert!(manager.stats().expired >= 1);

    handle.abort();
}

#[tokio::test]
async fn init_builds_one_manager_per_instance() {
    let tmp = TempDir::new().unwrap();
    let store = store(&tmp).await;
    let hub = events();

    let mut config = GridConfig::default();
    config.session_managers.insert("web".to_owned(), SessionManagementConfig::default());
    config.session_managers.insert("api".to_owned(), SessionManagementConfig::default());

    let slice = sgrid_sessions::init(&config, &hub, &store).unwrap();
    let sessions = slice.state.as_any().downcast_ref::<sgrid_sessions::Sessions>().unwrap();

    assert!(sessions.manager("web").is_some());
    assert!(sessions.manager("api").is_some());
    assert!(sessions.manager("missing").is_none());

    let stats: Vec<StatsSnapshot> = sessions.stats();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].name, "api");
}
