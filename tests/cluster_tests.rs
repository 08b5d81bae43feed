//! Cluster Tests
//!
//! Runs real nodes on loopback sockets and checks how misses are routed
//! between them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use distcache::{
    create_router, AppState, CacheError, Group, GroupRegistry, HttpPool, LoaderFn,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct Node {
    addr: String,
    group: Group,
    pool: Arc<HttpPool>,
    loads: Arc<AtomicUsize>,
    server: Option<JoinHandle<()>>,
}

/// Starts a node on an ephemeral port with an empty membership.
async fn spawn_node() -> Node {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = format!("http://{}", listener.local_addr().unwrap());

    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let registry = Arc::new(GroupRegistry::new());
    let group = registry
        .new_group(
            "scores",
            0,
            LoaderFn(move |key: String| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if key.starts_with("missing") {
                        return Err(CacheError::NotFound(key));
                    }
                    Ok(format!("value-of-{}", key).into_bytes())
                }
            }),
        )
        .unwrap();

    let pool = Arc::new(HttpPool::new(addr.clone(), 50, Duration::from_secs(2)).unwrap());
    group.register_peers(pool.clone()).unwrap();

    let app = create_router(AppState::new(registry).with_pool(pool.clone()));
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Node {
        addr,
        group,
        pool,
        loads,
        server: Some(server),
    }
}

async fn cluster() -> (Node, Node) {
    let a = spawn_node().await;
    let b = spawn_node().await;
    let members = [a.addr.clone(), b.addr.clone()];
    a.pool.set_peers(members.clone());
    b.pool.set_peers(members);
    (a, b)
}

/// Finds a key that `owner` holds on the ring.
fn key_owned_by(node: &Node, owner: &str, prefix: &str) -> String {
    (0..10_000)
        .map(|i| format!("{}-{}", prefix, i))
        .find(|key| node.pool.owner(key).unwrap() == owner)
        .expect("no key maps to owner")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remote_owner_serves_and_caches() {
    let (a, b) = cluster().await;
    let key = key_owned_by(&a, &b.addr, "remote");

    let value = a.group.get(&key).await.unwrap();
    assert_eq!(value.to_string(), format!("value-of-{}", key));

    // The owner loaded and cached it; the requester did neither.
    assert_eq!(b.loads.load(Ordering::SeqCst), 1);
    assert_eq!(a.loads.load(Ordering::SeqCst), 0);
    assert!(b.group.is_cached(&key));
    assert!(!a.group.is_cached(&key));

    // A second request goes back over the network but hits b's cache.
    a.group.get(&key).await.unwrap();
    assert_eq!(b.loads.load(Ordering::SeqCst), 1);
    assert_eq!(a.group.stats().peer_loads, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_self_owned_key_stays_local() {
    let (a, b) = cluster().await;
    let key = key_owned_by(&a, &a.addr, "local");

    a.group.get(&key).await.unwrap();

    assert_eq!(a.loads.load(Ordering::SeqCst), 1);
    assert_eq!(b.loads.load(Ordering::SeqCst), 0);
    assert!(a.group.is_cached(&key));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dead_peer_falls_back_to_local_load() {
    let (a, mut b) = cluster().await;
    let key = key_owned_by(&a, &b.addr, "fallback");

    if let Some(server) = b.server.take() {
        server.abort();
        let _ = server.await;
    }

    let value = a.group.get(&key).await.unwrap();
    assert_eq!(value.to_string(), format!("value-of-{}", key));
    assert_eq!(a.loads.load(Ordering::SeqCst), 1);
    assert!(a.group.is_cached(&key));
    assert_eq!(a.group.stats().peer_failures, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remote_not_found_falls_back_and_surfaces() {
    let (a, b) = cluster().await;
    let key = key_owned_by(&a, &b.addr, "missing");

    let err = a.group.get(&key).await.unwrap_err();

    assert_eq!(err, CacheError::NotFound(key));
    assert_eq!(b.loads.load(Ordering::SeqCst), 1);
    assert_eq!(a.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_remote_gets_are_coalesced() {
    let (a, b) = cluster().await;
    let key = key_owned_by(&a, &b.addr, "burst");

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let group = a.group.clone();
            let key = key.clone();
            tokio::spawn(async move { group.get(&key).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(b.loads.load(Ordering::SeqCst), 1);
    assert_eq!(a.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_external_deadline_does_not_cancel_load() {
    let registry = GroupRegistry::new();
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let group = registry
        .new_group(
            "slow",
            0,
            LoaderFn(move |key: String| {
                let counter = counter.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(key.into_bytes())
                }
            }),
        )
        .unwrap();

    let timed_out = tokio::time::timeout(Duration::from_millis(20), group.get("Tom")).await;
    assert!(timed_out.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(group.is_cached("Tom"));

    // the abandoned load populated the cache, so no second load happens
    assert_eq!(group.get("Tom").await.unwrap().to_string(), "Tom");
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}
