//! # Upstream Connection
//!
//! The single, shared handle to the upstream gRPC server, together with its connectivity state.
//!
//! The transport (a `tonic` [`Channel`] in production) multiplexes concurrent calls, so every
//! caller works on a cheap clone of it and no extra locking is needed.
//!
//! Readiness follows the gRPC connectivity vocabulary. A lazily connected upstream starts
//! [`Connectivity::Idle`] and a background monitor moves it between `Connecting`, `Ready` and
//! `TransientFailure` by dialing the endpoint periodically. Calls that fail because the upstream
//! is unavailable also mark it `TransientFailure` until the next successful probe.
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tonic::transport::{Channel, Endpoint};

/// Connectivity state of the upstream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// No connection attempt has completed yet.
    Idle,
    Connecting,
    Ready,
    /// The last attempt failed; the monitor keeps retrying.
    TransientFailure,
}

/// The shared upstream transport and its connectivity state.
#[derive(Debug, Clone)]
pub struct Upstream<S = Channel> {
    service: S,
    state: Arc<watch::Sender<Connectivity>>,
    monitored: bool,
}

impl Upstream<Channel> {
    /// Creates a lazily connected channel to `endpoint` and starts monitoring it.
    ///
    /// Construction never blocks or fails on an unreachable upstream: the upstream is simply
    /// not ready until the monitor manages to connect. Must be called within a Tokio runtime.
    pub fn connect_lazy(endpoint: Endpoint, probe_interval: Duration) -> Self {
        let service = endpoint.connect_lazy();
        let (sender, _) = watch::channel(Connectivity::Idle);
        let state = Arc::new(sender);

        tokio::spawn(monitor(endpoint, Arc::downgrade(&state), probe_interval));

        Self {
            service,
            state,
            monitored: true,
        }
    }
}

impl<S: Clone> Upstream<S> {
    /// Wraps an already usable service (e.g. an in-process `tonic` router). It is always ready.
    pub fn from_service(service: S) -> Self {
        let (sender, _) = watch::channel(Connectivity::Ready);

        Self {
            service,
            state: Arc::new(sender),
            monitored: false,
        }
    }

    /// A handle to the transport, sharing its connections.
    pub fn service(&self) -> S {
        self.service.clone()
    }
}

impl<S> Upstream<S> {
    pub fn connectivity(&self) -> Connectivity {
        *self.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.connectivity() == Connectivity::Ready
    }

    /// Watches connectivity changes.
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }

    /// Records that a call found the upstream unavailable.
    pub(crate) fn report_unavailable(&self) {
        if !self.monitored {
            return;
        }

        let previous = self.state.send_replace(Connectivity::TransientFailure);
        if previous == Connectivity::Ready {
            tracing::warn!("upstream became unavailable");
        }
    }
}

async fn monitor(endpoint: Endpoint, state: Weak<watch::Sender<Connectivity>>, interval: Duration) {
    loop {
        let Some(sender) = state.upgrade() else {
            return;
        };

        if *sender.borrow() != Connectivity::Ready {
            sender.send_replace(Connectivity::Connecting);
        }

        let next = match endpoint.connect().await {
            Ok(_) => Connectivity::Ready,
            Err(err) => {
                tracing::debug!(uri = %endpoint.uri(), error = %err, "upstream probe failed");
                Connectivity::TransientFailure
            }
        };

        let previous = sender.send_replace(next);
        match (previous, next) {
            (Connectivity::Ready, Connectivity::Ready) => {}
            (_, Connectivity::Ready) => {
                tracing::info!(uri = %endpoint.uri(), "upstream is ready")
            }
            (Connectivity::Ready, _) => {
                tracing::warn!(uri = %endpoint.uri(), "upstream connection lost")
            }
            _ => {}
        }
        drop(sender);

        tokio::time::sleep(interval).await;
    }
}
