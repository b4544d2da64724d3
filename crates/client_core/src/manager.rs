use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use shared::{domain::Truck, protocol::decode_truck_snapshot, status::ConnectionStatus};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::ClientError,
    transport::{Transport, TransportConnection, TransportEvent, WsTransport},
};

const DECODE_FAILURE_CAPACITY: usize = 64;

/// Latest successfully decoded truck sequence of an endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub trucks: Vec<Truck>,
    /// Number of snapshots accepted on the connection that delivered this
    /// one, starting at 1. Restarts after a reconnect.
    pub sequence: u64,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DecodeFailure {
    pub endpoint: String,
    pub reason: String,
    pub received_at: DateTime<Utc>,
}

/// Hands out [`Subscription`]s to named endpoints, sharing one connection per
/// endpoint among all of its holders.
#[derive(Clone)]
pub struct ConnectionManager {
    registry: Arc<Registry>,
}

struct Registry {
    ws_base: String,
    transport: Arc<dyn Transport>,
    endpoints: Mutex<HashMap<String, EndpointEntry>>,
}

struct EndpointEntry {
    shared: Arc<EndpointShared>,
    holders: usize,
}

struct EndpointShared {
    name: String,
    url: Url,
    status: watch::Sender<ConnectionStatus>,
    snapshot: watch::Sender<Option<Arc<Snapshot>>>,
    failures: broadcast::Sender<DecodeFailure>,
    shutdown: watch::Sender<bool>,
}

impl ConnectionManager {
    pub fn new(server_url: &str, transport: Arc<dyn Transport>) -> Result<Self, ClientError> {
        let ws_base = websocket_base(server_url)?;
        Ok(Self {
            registry: Arc::new(Registry {
                ws_base,
                transport,
                endpoints: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn websocket(server_url: &str) -> Result<Self, ClientError> {
        Self::new(server_url, Arc::new(WsTransport))
    }

    /// Acquires a hold on `endpoint`, connecting it if nobody holds it yet or
    /// if its previous connection has closed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self, endpoint: &str) -> Result<Subscription, ClientError> {
        validate_endpoint_name(endpoint)?;
        let registry = &self.registry;
        let mut endpoints = registry.lock_endpoints();

        let shared = match endpoints.get_mut(endpoint) {
            Some(entry) => {
                entry.holders += 1;
                debug!(endpoint, holders = entry.holders, "reusing live connection");
                if entry.shared.current_status().is_closed() {
                    entry.shared.start(Arc::clone(&registry.transport));
                }
                Arc::clone(&entry.shared)
            }
            None => {
                let url = registry.endpoint_url(endpoint)?;
                let shared = Arc::new(EndpointShared::new(endpoint, url));
                endpoints.insert(
                    endpoint.to_string(),
                    EndpointEntry {
                        shared: Arc::clone(&shared),
                        holders: 1,
                    },
                );
                shared.start(Arc::clone(&registry.transport));
                shared
            }
        };
        drop(endpoints);

        Ok(Subscription::new(Arc::clone(registry), shared))
    }

    pub fn endpoint_holders(&self, endpoint: &str) -> usize {
        self.registry
            .lock_endpoints()
            .get(endpoint)
            .map_or(0, |entry| entry.holders)
    }
}

impl Registry {
    fn lock_endpoints(&self) -> MutexGuard<'_, HashMap<String, EndpointEntry>> {
        self.endpoints.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves `{ws_base}/ws/{endpoint}`. The parsed path must still end in
    /// exactly that segment, so dot segments and escapes cannot move it.
    fn endpoint_url(&self, endpoint: &str) -> Result<Url, ClientError> {
        let raw = format!("{}/ws/{endpoint}", self.ws_base);
        let url = Url::parse(&raw).map_err(|source| ClientError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;
        let base_path = Url::parse(&self.ws_base)
            .map(|base| base.path().trim_end_matches('/').to_string())
            .map_err(|source| ClientError::InvalidUrl { url: raw, source })?;
        if url.path() != format!("{base_path}/ws/{endpoint}") {
            return Err(ClientError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(url)
    }

    fn reconnect(&self, shared: &Arc<EndpointShared>) -> bool {
        let endpoints = self.lock_endpoints();
        let registered = endpoints
            .get(&shared.name)
            .is_some_and(|entry| Arc::ptr_eq(&entry.shared, shared));
        if !registered || !shared.current_status().is_closed() {
            return false;
        }
        shared.start(Arc::clone(&self.transport));
        true
    }

    fn release(&self, shared: &Arc<EndpointShared>) {
        let mut endpoints = self.lock_endpoints();
        let Some(entry) = endpoints.get_mut(&shared.name) else {
            return;
        };
        if !Arc::ptr_eq(&entry.shared, shared) {
            return;
        }

        entry.holders -= 1;
        debug!(endpoint = %shared.name, holders = entry.holders, "released live connection");
        if entry.holders == 0 {
            endpoints.remove(&shared.name);
            shared.shutdown.send_replace(true);
        }
    }
}

impl EndpointShared {
    fn new(name: &str, url: Url) -> Self {
        let (failures, _) = broadcast::channel(DECODE_FAILURE_CAPACITY);
        Self {
            name: name.to_string(),
            url,
            status: watch::Sender::new(ConnectionStatus::Connecting),
            snapshot: watch::Sender::new(None),
            failures,
            shutdown: watch::Sender::new(false),
        }
    }

    fn current_status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    fn set_status(&self, next: ConnectionStatus) {
        let changed = self.status.send_if_modified(|status| {
            if *status == next {
                return false;
            }
            *status = next;
            true
        });
        if changed {
            debug!(endpoint = %self.name, status = %next, "connection status changed");
        }
    }

    /// Called with the registry lock held, so two starts never race.
    fn start(self: &Arc<Self>, transport: Arc<dyn Transport>) {
        self.set_status(ConnectionStatus::Connecting);
        let shutdown = self.shutdown.subscribe();
        tokio::spawn(run_connection(Arc::clone(self), transport, shutdown));
    }

    /// `accepted` counts the snapshots taken on the calling connection.
    fn accept_message(&self, text: &str, accepted: &mut u64) {
        match decode_truck_snapshot(text) {
            Ok(trucks) => {
                *accepted += 1;
                self.snapshot.send_replace(Some(Arc::new(Snapshot {
                    trucks,
                    sequence: *accepted,
                    received_at: Utc::now(),
                })));
            }
            Err(err) => {
                warn!(endpoint = %self.name, error = %err, "dropping undecodable snapshot");
                let _ = self.failures.send(DecodeFailure {
                    endpoint: self.name.clone(),
                    reason: err.to_string(),
                    received_at: Utc::now(),
                });
            }
        }
    }
}

/// Owns one connection attempt. `Closed` is always the last status it
/// writes, which lets a later `start` take over the endpoint safely.
async fn run_connection(
    shared: Arc<EndpointShared>,
    transport: Arc<dyn Transport>,
    mut shutdown: watch::Receiver<bool>,
) {
    let endpoint = shared.name.as_str();

    let mut connection: Box<dyn TransportConnection> = tokio::select! {
        result = transport.connect(&shared.url) => match result {
            Ok(connection) => connection,
            Err(err) => {
                warn!(endpoint, url = %shared.url, error = %err, "live connection failed");
                shared.set_status(ConnectionStatus::Closed);
                return;
            }
        },
        _ = stop_requested(&mut shutdown) => {
            shared.set_status(ConnectionStatus::Closed);
            return;
        }
    };

    shared.set_status(ConnectionStatus::Open);
    info!(endpoint, url = %shared.url, "live connection open");
    let mut accepted = 0;

    loop {
        tokio::select! {
            _ = stop_requested(&mut shutdown) => {
                shared.set_status(ConnectionStatus::Closing);
                if let Err(err) = connection.close().await {
                    debug!(endpoint, error = %err, "close handshake failed");
                }
                info!(endpoint, "live connection released");
                break;
            }
            event = connection.next_event() => match event {
                Some(TransportEvent::Message(text)) => shared.accept_message(&text, &mut accepted),
                Some(TransportEvent::Closed { reason }) => {
                    info!(endpoint, reason = reason.as_deref().unwrap_or(""), "remote closed live connection");
                    break;
                }
                Some(TransportEvent::Failed(error)) => {
                    warn!(endpoint, %error, "live connection failed");
                    break;
                }
                None => {
                    info!(endpoint, "live connection ended");
                    break;
                }
            }
        }
    }

    shared.set_status(ConnectionStatus::Closed);
}

async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// A consumer's hold on an endpoint. Released on [`Subscription::unsubscribe`]
/// or drop; once released the handle keeps the last values it saw and
/// receives nothing further.
pub struct Subscription {
    registry: Arc<Registry>,
    shared: Arc<EndpointShared>,
    status: watch::Receiver<ConnectionStatus>,
    snapshot: watch::Receiver<Option<Arc<Snapshot>>>,
    released: bool,
}

impl Subscription {
    fn new(registry: Arc<Registry>, shared: Arc<EndpointShared>) -> Self {
        let status = shared.status.subscribe();
        let snapshot = shared.snapshot.subscribe();
        Self {
            registry,
            shared,
            status,
            snapshot,
            released: false,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.shared.name
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.borrow().clone()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Decoding failures reported from now on. Closed immediately for a
    /// released handle.
    pub fn decode_failures(&self) -> broadcast::Receiver<DecodeFailure> {
        if self.released {
            return broadcast::channel(1).1;
        }
        self.shared.failures.subscribe()
    }

    /// Waits for the next status or snapshot change. Returns `false` once the
    /// handle has been released.
    pub async fn changed(&mut self) -> bool {
        let alive = tokio::select! {
            result = self.status.changed() => result.is_ok(),
            result = self.snapshot.changed() => result.is_ok(),
        };
        self.status.borrow_and_update();
        self.snapshot.borrow_and_update();
        alive
    }

    /// Starts a fresh connection if the endpoint is `Closed`. Every holder
    /// observes the new attempt. Returns whether a connection was started.
    pub fn reconnect(&self) -> bool {
        if self.released {
            return false;
        }
        let started = self.registry.reconnect(&self.shared);
        if started {
            info!(endpoint = %self.shared.name, "reconnecting live connection");
        }
        started
    }

    pub fn unsubscribe(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let status = *self.status.borrow();
        let snapshot = self.snapshot.borrow().clone();
        self.status = watch::channel(status).1;
        self.snapshot = watch::channel(snapshot).1;

        self.registry.release(&self.shared);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

fn websocket_base(server_url: &str) -> Result<String, ClientError> {
    let server_url = server_url.trim().trim_end_matches('/');
    let ws_base = if let Some(rest) = server_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if server_url.starts_with("ws://") || server_url.starts_with("wss://") {
        server_url.to_string()
    } else {
        return Err(ClientError::UnsupportedScheme(server_url.to_string()));
    };

    let parsed = Url::parse(&ws_base).map_err(|source| ClientError::InvalidUrl {
        url: ws_base.clone(),
        source,
    })?;
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(ClientError::UnsupportedBase(server_url.to_string()));
    }
    Ok(ws_base)
}

fn validate_endpoint_name(endpoint: &str) -> Result<(), ClientError> {
    let valid = !matches!(endpoint, "" | "." | "..")
        && !endpoint
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace());
    if valid {
        Ok(())
    } else {
        Err(ClientError::InvalidEndpoint(endpoint.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/manager_tests.rs"]
mod tests;
