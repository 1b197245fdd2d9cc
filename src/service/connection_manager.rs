//! Owns the single connection shared by every request handler.
//!
//! `open` and `close` serialize on an async lifecycle lock held across the
//! driver I/O. The live handle is published in a separate slot so `get`
//! never waits behind a connect or close in progress.

use crate::config::{Credentials, DatabaseTarget};
use crate::error::ConnectionError;
use crate::service::connector::{Connector, SqliteConnector, authenticated_url, redact};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub type StockConnectionManager = ConnectionManager<SqliteConnector>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Empty,
    Open,
}

/// Cloneable reference to the shared connection.
///
/// All clones see the same underlying session. After the manager closes it,
/// `acquire` on any clone fails with [`ConnectionError::NotInitialized`].
pub struct ConnectionHandle<T> {
    inner: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for ConnectionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> ConnectionHandle<T> {
    fn new(conn: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// Lock the connection for the duration of a query.
    pub async fn acquire(&self) -> Result<MappedMutexGuard<'_, T>, ConnectionError> {
        MutexGuard::try_map(self.inner.lock().await, Option::as_mut)
            .map_err(|_| ConnectionError::NotInitialized)
    }

    #[cfg(test)]
    async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }

    #[cfg(test)]
    fn same_session(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Waits for any in-flight query, then detaches the connection.
    async fn release(&self) -> Option<T> {
        self.inner.lock().await.take()
    }
}

pub struct ConnectionManager<C: Connector> {
    target: DatabaseTarget,
    credentials: Credentials,
    connector: C,
    lifecycle: Mutex<()>,
    slot: RwLock<Option<ConnectionHandle<C::Connection>>>,
}

impl StockConnectionManager {
    pub fn from_config(target: DatabaseTarget, credentials: Credentials) -> Self {
        let connector = SqliteConnector::new(target.connect_timeout());
        Self::new(target, credentials, connector)
    }
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(target: DatabaseTarget, credentials: Credentials, connector: C) -> Self {
        Self {
            target,
            credentials,
            connector,
            lifecycle: Mutex::new(()),
            slot: RwLock::new(None),
        }
    }

    pub fn target(&self) -> &DatabaseTarget {
        &self.target
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn build_authenticated_url(&self) -> String {
        authenticated_url(
            self.target.url(),
            self.credentials.username(),
            self.credentials.password(),
        )
    }

    pub fn state(&self) -> ConnectionState {
        if self.published().is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Empty
        }
    }

    /// Open the shared connection unless one is already live.
    pub async fn open(&self) -> Result<(), ConnectionError> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.published().is_some() {
            debug!("shared connection already open");
            return Ok(());
        }

        let url = self.build_authenticated_url();
        info!(url = %redact(&url), "opening shared database connection");
        let conn = self
            .connector
            .establish(&url)
            .await
            .map_err(ConnectionError::EstablishFailed)?;

        *self.slot.write().unwrap_or_else(PoisonError::into_inner) =
            Some(ConnectionHandle::new(conn));
        info!("shared database connection open");
        Ok(())
    }

    /// Empty the slot and close whatever connection was in it.
    ///
    /// The slot is empty afterwards even when the driver reports a failure.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        let _lifecycle = self.lifecycle.lock().await;
        let taken = self
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(handle) = taken else {
            debug!("close requested with no open connection");
            return Ok(());
        };
        let Some(conn) = handle.release().await else {
            return Ok(());
        };

        match self.connector.close(conn).await {
            Ok(()) => {
                info!("shared database connection closed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "closing shared database connection failed");
                Err(ConnectionError::CloseFailed(e))
            }
        }
    }

    pub fn get(&self) -> Result<ConnectionHandle<C::Connection>, ConnectionError> {
        self.published().ok_or(ConnectionError::NotInitialized)
    }

    fn published(&self) -> Option<ConnectionHandle<C::Connection>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory connector counting every driver call.
    #[derive(Default)]
    struct CountingConnector {
        established: AtomicUsize,
        closed: AtomicUsize,
        fail_establish: AtomicBool,
        fail_close: AtomicBool,
        seen_url: std::sync::Mutex<Option<String>>,
    }

    struct FakeConnection {
        serial: usize,
    }

    impl Connector for Arc<CountingConnector> {
        type Connection = FakeConnection;

        async fn establish(&self, url: &str) -> Result<FakeConnection, sqlx::Error> {
            // Widen the window for racing callers.
            tokio::time::sleep(Duration::from_millis(20)).await;
            *self.seen_url.lock().unwrap() = Some(url.to_string());
            if self.fail_establish.load(Ordering::SeqCst) {
                return Err(sqlx::Error::Protocol("connection refused".into()));
            }
            let serial = self.established.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(FakeConnection { serial })
        }

        async fn validate(&self, _conn: &mut FakeConnection) -> Result<(), sqlx::Error> {
            Ok(())
        }

        async fn close(&self, _conn: FakeConnection) -> Result<(), sqlx::Error> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            if self.fail_close.load(Ordering::SeqCst) {
                return Err(sqlx::Error::Protocol("socket reset".into()));
            }
            Ok(())
        }
    }

    fn manager() -> (Arc<ConnectionManager<Arc<CountingConnector>>>, Arc<CountingConnector>) {
        let connector = Arc::new(CountingConnector::default());
        let mgr = ConnectionManager::new(
            DatabaseTarget::new("jdbc:phoenix:thin:url=http://host:8765"),
            Credentials::new("alice", "s3cret"),
            Arc::clone(&connector),
        );
        (Arc::new(mgr), connector)
    }

    #[test]
    fn authenticated_url_appends_credentials() {
        let (mgr, _) = manager();
        assert_eq!(
            mgr.build_authenticated_url(),
            "jdbc:phoenix:thin:url=http://host:8765;avatica_user=alice;avatica_password=s3cret"
        );
    }

    #[tokio::test]
    async fn open_uses_authenticated_url() {
        let (mgr, connector) = manager();
        mgr.open().await.unwrap();
        let seen = connector.seen_url.lock().unwrap().clone();
        assert_eq!(seen, Some(mgr.build_authenticated_url()));
    }

    #[tokio::test]
    async fn second_open_is_a_noop() {
        let (mgr, connector) = manager();
        mgr.open().await.unwrap();
        let first = mgr.get().unwrap();
        mgr.open().await.unwrap();

        assert_eq!(connector.established.load(Ordering::SeqCst), 1);
        assert!(first.same_session(&mgr.get().unwrap()));
        assert_eq!(mgr.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn close_on_empty_is_ok() {
        let (mgr, connector) = manager();
        mgr.close().await.unwrap();
        mgr.close().await.unwrap();
        assert_eq!(connector.closed.load(Ordering::SeqCst), 0);
        assert_eq!(mgr.state(), ConnectionState::Empty);
    }

    #[tokio::test]
    async fn get_before_open_is_not_initialized() {
        let (mgr, _) = manager();
        assert!(matches!(mgr.get(), Err(ConnectionError::NotInitialized)));
    }

    #[tokio::test]
    async fn get_after_close_is_not_initialized() {
        let (mgr, connector) = manager();
        mgr.open().await.unwrap();
        mgr.close().await.unwrap();

        assert!(matches!(mgr.get(), Err(ConnectionError::NotInitialized)));
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_handle_is_unusable_after_close() {
        let (mgr, _) = manager();
        mgr.open().await.unwrap();
        let stale = mgr.get().unwrap();
        assert_eq!(stale.acquire().await.unwrap().serial, 1);

        mgr.close().await.unwrap();
        assert!(stale.is_closed().await);
        assert!(matches!(
            stale.acquire().await,
            Err(ConnectionError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn reopen_creates_a_fresh_handle() {
        let (mgr, connector) = manager();
        mgr.open().await.unwrap();
        let old = mgr.get().unwrap();
        mgr.close().await.unwrap();
        mgr.open().await.unwrap();

        let new = mgr.get().unwrap();
        assert!(!old.same_session(&new));
        assert_eq!(new.acquire().await.unwrap().serial, 2);
        assert_eq!(connector.established.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_opens_establish_once() {
        let (mgr, connector) = manager();
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let mgr = Arc::clone(&mgr);
                tokio::spawn(async move { mgr.open().await })
            })
            .collect();

        for result in join_all(tasks).await {
            result.expect("task panicked").expect("open failed");
        }
        assert_eq!(connector.established.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.state(), ConnectionState::Open);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_closes_close_once() {
        let (mgr, connector) = manager();
        mgr.open().await.unwrap();
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let mgr = Arc::clone(&mgr);
                tokio::spawn(async move { mgr.close().await })
            })
            .collect();

        for result in join_all(tasks).await {
            result.expect("task panicked").expect("close failed");
        }
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_open_is_not_cached() {
        let (mgr, connector) = manager();
        connector.fail_establish.store(true, Ordering::SeqCst);
        let err = mgr.open().await.unwrap_err();
        assert!(matches!(err, ConnectionError::EstablishFailed(_)));
        assert_eq!(mgr.state(), ConnectionState::Empty);

        connector.fail_establish.store(false, Ordering::SeqCst);
        mgr.open().await.unwrap();
        assert_eq!(mgr.state(), ConnectionState::Open);
        assert_eq!(connector.established.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_failure_still_empties_slot() {
        let (mgr, connector) = manager();
        mgr.open().await.unwrap();
        connector.fail_close.store(true, Ordering::SeqCst);

        let err = mgr.close().await.unwrap_err();
        assert!(matches!(err, ConnectionError::CloseFailed(_)));
        assert_eq!(mgr.state(), ConnectionState::Empty);
        assert!(matches!(mgr.get(), Err(ConnectionError::NotInitialized)));

        // Nothing left to close.
        mgr.close().await.unwrap();
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_does_not_wait_for_open_in_progress() {
        let (mgr, _) = manager();
        let opener = {
            let mgr = Arc::clone(&mgr);
            tokio::spawn(async move { mgr.open().await })
        };
        tokio::task::yield_now().await;
        // The establish sleeps while holding the lifecycle lock.
        assert!(mgr.get().is_err());
        opener.await.unwrap().unwrap();
        assert!(mgr.get().is_ok());
    }
}
