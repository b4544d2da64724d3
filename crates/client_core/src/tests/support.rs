//! Hand-driven transport for exercising the connection manager without a
//! network.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::{
    sync::{mpsc, oneshot},
    time::{sleep, timeout},
};
use url::Url;

use crate::{
    manager::Subscription,
    transport::{Transport, TransportConnection, TransportEvent},
};

const WAIT: Duration = Duration::from_secs(2);

pub(crate) struct FakeTransport {
    attempts: mpsc::UnboundedSender<FakeRemote>,
}

impl FakeTransport {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeRemote>) {
        let (attempts, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { attempts }), rx)
    }
}

/// The server side of one connection attempt.
pub(crate) struct FakeRemote {
    pub(crate) url: Url,
    gate: Option<oneshot::Sender<Result<(), String>>>,
    events: mpsc::UnboundedSender<TransportEvent>,
    closed: Arc<AtomicBool>,
}

impl FakeRemote {
    pub(crate) fn open(&mut self) {
        if let Some(gate) = self.gate.take() {
            let _ = gate.send(Ok(()));
        }
    }

    pub(crate) fn refuse(&mut self, reason: &str) {
        if let Some(gate) = self.gate.take() {
            let _ = gate.send(Err(reason.to_string()));
        }
    }

    pub(crate) fn send(&self, text: &str) {
        let _ = self.events.send(TransportEvent::Message(text.to_string()));
    }

    pub(crate) fn close(&self) {
        let _ = self.events.send(TransportEvent::Closed {
            reason: Some("server shutting down".to_string()),
        });
    }

    pub(crate) fn fail(&self, error: &str) {
        let _ = self.events.send(TransportEvent::Failed(error.to_string()));
    }

    pub(crate) fn is_closed_by_client(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_closed_by_client(&self) {
        timeout(WAIT, async {
            while !self.is_closed_by_client() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("client never closed the connection");
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, url: &Url) -> Result<Box<dyn TransportConnection>> {
        let (gate, gate_rx) = oneshot::channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        self.attempts
            .send(FakeRemote {
                url: url.clone(),
                gate: Some(gate),
                events,
                closed: Arc::clone(&closed),
            })
            .map_err(|_| anyhow!("nobody is accepting fake connections"))?;

        match gate_rx.await {
            Ok(Ok(())) => Ok(Box::new(FakeConnection {
                events: events_rx,
                closed,
            })),
            Ok(Err(reason)) => Err(anyhow!(reason)),
            Err(_) => Err(anyhow!("remote went away before the handshake")),
        }
    }
}

struct FakeConnection {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl TransportConnection for FakeConnection {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) async fn next_remote(remotes: &mut mpsc::UnboundedReceiver<FakeRemote>) -> FakeRemote {
    timeout(WAIT, remotes.recv())
        .await
        .expect("no connection attempt")
        .expect("transport dropped")
}

/// Waits until `ready` holds for the subscription.
pub(crate) async fn wait_until(
    subscription: &mut Subscription,
    mut ready: impl FnMut(&Subscription) -> bool,
) {
    timeout(WAIT, async {
        while !ready(subscription) {
            assert!(
                subscription.changed().await,
                "subscription released while waiting"
            );
        }
    })
    .await
    .expect("timed out waiting for subscription");
}
