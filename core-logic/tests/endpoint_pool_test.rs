use async_trait::async_trait;
use core_logic::{Connector, EndpointError, EndpointPool, EndpointStatus};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Connection is just the URL it was opened against.
#[derive(Clone, Default)]
struct MockConnector {
    down: Arc<Mutex<HashSet<String>>>,
    connects: Arc<AtomicUsize>,
}

impl MockConnector {
    fn take_down(&self, url: &str) {
        self.down.lock().unwrap().insert(url.to_string());
    }

    fn bring_up(&self, url: &str) {
        self.down.lock().unwrap().remove(url);
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Conn = String;

    async fn connect(&self, url: &str) -> Result<String, EndpointError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.down.lock().unwrap().contains(url) {
            return Err(EndpointError::UnreachableEndpoint {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(url.to_string())
    }

    async fn is_reachable(&self, conn: &String) -> bool {
        !self.down.lock().unwrap().contains(conn)
    }
}

fn urls(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("http://rpc-{}.test", i)).collect()
}

#[tokio::test]
async fn test_bootstrap_picks_first_reachable() {
    let connector = MockConnector::default();
    connector.take_down("http://rpc-0.test");

    let pool = EndpointPool::bootstrap(connector, &urls(3)).await.unwrap();
    assert_eq!(pool.active_index(), 1);
    assert_eq!(pool.active_url(), "http://rpc-1.test");
    assert_eq!(pool.endpoints()[0].status(), EndpointStatus::Unreachable);
}

#[tokio::test]
async fn test_bootstrap_all_down_is_fatal() {
    let connector = MockConnector::default();
    for url in urls(3) {
        connector.take_down(&url);
    }

    let err = EndpointPool::bootstrap(connector, &urls(3))
        .await
        .err()
        .unwrap();
    assert_eq!(err, EndpointError::AllEndpointsExhausted { count: 3 });
}

#[tokio::test]
async fn test_bootstrap_empty_list() {
    let err = EndpointPool::bootstrap(MockConnector::default(), &[])
        .await
        .err()
        .unwrap();
    assert_eq!(err, EndpointError::NoEndpoints);
}

#[tokio::test]
async fn test_rotation_index_is_n_mod_k() {
    let mut pool = EndpointPool::bootstrap(MockConnector::default(), &urls(3))
        .await
        .unwrap();

    for n in 1..=7 {
        let conn = pool.rotate().await.unwrap();
        assert_eq!(pool.active_index(), n % 3);
        assert_eq!(*conn, format!("http://rpc-{}.test", n % 3));
    }
}

#[tokio::test]
async fn test_rotate_into_dead_endpoint_still_advances() {
    let connector = MockConnector::default();
    let mut pool = EndpointPool::bootstrap(connector.clone(), &urls(3))
        .await
        .unwrap();
    connector.take_down("http://rpc-1.test");

    assert!(pool.rotate().await.is_err());
    assert_eq!(pool.active_index(), 1);

    // current() must not hand back the old endpoint's connection
    assert!(pool.current().await.is_err());

    // the dead endpoint is not retired: it comes back on the next wrap
    connector.bring_up("http://rpc-1.test");
    pool.rotate().await.unwrap();
    pool.rotate().await.unwrap();
    let conn = pool.rotate().await.unwrap();
    assert_eq!(*conn, "http://rpc-1.test");
    assert_eq!(pool.endpoints()[1].status(), EndpointStatus::Reachable);
}

#[tokio::test]
async fn test_current_reuses_live_connection() {
    let connector = MockConnector::default();
    let mut pool = EndpointPool::bootstrap(connector.clone(), &urls(2))
        .await
        .unwrap();
    let before = connector.connects.load(Ordering::SeqCst);

    let a = pool.current().await.unwrap();
    let b = pool.current().await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(connector.connects.load(Ordering::SeqCst), before);
}

#[tokio::test]
async fn test_current_reconnects_when_unreachable() {
    let connector = MockConnector::default();
    let mut pool = EndpointPool::bootstrap(connector.clone(), &urls(2))
        .await
        .unwrap();
    let first = pool.current().await.unwrap();

    // liveness check fails, reconnect to the same endpoint succeeds once it is back
    connector.take_down("http://rpc-0.test");
    assert!(pool.current().await.is_err());
    connector.bring_up("http://rpc-0.test");

    let second = pool.current().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(pool.active_index(), 0);
}
