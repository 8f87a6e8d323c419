//! # Peer Core
//!
//! The public surface: `set_transport_sink`, `register_handler`, `request`,
//! `notify`, `encode_notification`, `from_transport`, `clean`. Everything
//! else in the crate exists to support these seven operations.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::builder::PeerConfig;
use crate::dispatcher::{
    make_decoder, make_invoke, run_guards, Dispatcher, HandlerEntry, HandlerHandle,
};
use crate::envelope::{self, MessageType, ID_ALL_ONES};
use crate::error::PeerError;
use crate::pending::PendingTable;
use crate::timeout::TimeoutChecker;
use crate::wire::{HandlerError, WireDecode, WireEncode};

/// Process-wide correlation-id counter, shared across every [`Peer`]
/// instance in this process: a single monotonic `u32`, wrapping, incremented
/// with `Relaxed` ordering since correctness only needs uniqueness among
/// concurrently outstanding requests, not a total order.
static NEXT_CORRELATION_ID: AtomicU32 = AtomicU32::new(1);

type Sink<AppData> = Box<dyn Fn(&[u8], &AppData) + Send + Sync>;

/// A schema-driven, transport-agnostic RPC endpoint.
///
/// `AppData` is the per-message application context type for this peer
/// instance (session state, a connection handle, whatever the integrator's
/// transport layer wants to thread through to handlers and the outbound
/// sink). It is fixed once per `Peer<AppData>` and cloned per call, so it
/// must be cheap to clone, typically an `Arc<...>` or a small `Copy` type.
///
/// Operations that may schedule handler work (`from_transport`) take
/// `self: &Arc<Self>`, since the dispatched handler future and its eventual
/// response both need to outlive the call that scheduled them.
pub struct Peer<AppData> {
    config: PeerConfig,
    sink: Mutex<Option<Sink<AppData>>>,
    dispatcher: Dispatcher<AppData>,
    pending: Arc<PendingTable>,
    timeout_checker: TimeoutChecker,
    scratch: Mutex<Vec<u8>>,
}

impl<AppData> Peer<AppData>
where
    AppData: Clone + Send + Sync + 'static,
{
    /// Builds a new, inert peer: no transport sink, no handlers, no pending
    /// requests.
    pub fn new(config: PeerConfig) -> Self {
        let scratch = Vec::with_capacity(config.builder_initial_size_bytes);
        Self {
            config,
            sink: Mutex::new(None),
            dispatcher: Dispatcher::new(),
            pending: Arc::new(PendingTable::new()),
            timeout_checker: TimeoutChecker::new(),
            scratch: Mutex::new(scratch),
        }
    }

    /// Returns this peer's active configuration.
    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    /// Registers (or replaces) the sink that outbound frames are handed to.
    /// The sink is called synchronously from whichever task produced the
    /// frame. It should not block; handing bytes to an async transport
    /// queue is the caller's job.
    pub fn set_transport_sink<F>(&self, sink: F)
    where
        F: Fn(&[u8], &AppData) + Send + Sync + 'static,
    {
        *self.sink.lock().unwrap() = Some(Box::new(sink));
    }

    /// Installs a handler for `method`, overwriting any prior handler for
    /// that method id. Returns a [`HandlerHandle`] for chaining guards onto
    /// the entry just installed.
    ///
    /// `Res` doubles as the declaration of whether the method has a response
    /// body: use `()` for a void-declared method (its `WireEncode` impl
    /// always produces zero bytes), any other `WireEncode` type otherwise.
    /// See DESIGN.md for why this replaces a dynamically-typed "optional
    /// response constructor" with a static one.
    pub fn register_handler<Req, Res, F, Fut>(&self, method: u16, handler: F) -> HandlerHandle<AppData, Req>
    where
        Req: WireDecode + Send + Sync + 'static,
        Res: WireEncode + Send + 'static,
        F: Fn(Req, AppData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, HandlerError>> + Send + 'static,
    {
        let entry = Arc::new(HandlerEntry {
            method,
            decode_request: make_decoder::<Req>(),
            guards: Mutex::new(Vec::new()),
            invoke: make_invoke::<AppData, Req, Res, F, Fut>(handler),
        });
        self.dispatcher.insert(Arc::clone(&entry));
        HandlerHandle {
            entry,
            _marker: PhantomData,
        }
    }

    /// Allocates a correlation id, serializes `value`, emits a Request
    /// frame, and awaits a matching Response, ErrorResponse, timeout, or
    /// teardown.
    ///
    /// Resolves `Ok(Some(res))` when the method declares a non-void
    /// response and one arrived, `Ok(None)` for a void response (or a
    /// zero-length body), and `Err` for a method-not-found, decode failure,
    /// guard rejection, application error, timeout, or teardown.
    pub async fn request<Req, Res>(
        &self,
        method: u16,
        value: &Req,
        app_data: AppData,
    ) -> Result<Option<Res>, PeerError>
    where
        Req: WireEncode,
        Res: WireDecode + Send + 'static,
    {
        let id = Self::next_correlation_id();
        let frame = self.encode_frame(MessageType::Request, id, method, value);

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, method, tx);
        self.timeout_checker
            .ensure_running(Arc::clone(&self.pending), self.config.request_timeout);

        tracing::debug!(id, method, "sending request");
        self.emit(&frame, &app_data);

        match rx.await {
            Ok(Ok(bytes)) if bytes.is_empty() => Ok(None),
            Ok(Ok(bytes)) => Res::decode_from(&bytes)
                .map(Some)
                .map_err(|e| PeerError::invalid_request(e.to_string()).with_correlation_id(id)),
            Ok(Err(err)) => Err(err),
            Err(_recv_error) => {
                Err(PeerError::internal_error("peer torn down while request was pending")
                    .with_correlation_id(id))
            }
        }
    }

    /// Emits a Notification frame (correlation id 0). Never registers a
    /// waiter; there is no completion to observe.
    pub fn notify<Req>(&self, method: u16, value: &Req, app_data: AppData)
    where
        Req: WireEncode,
    {
        let frame = self.encode_frame(MessageType::Notification, 0, method, value);
        self.emit(&frame, &app_data);
    }

    /// Encodes a Notification frame without sending it, for callers that
    /// want to batch frames over a transport this crate doesn't drive
    /// directly.
    pub fn encode_notification<Req>(&self, method: u16, value: &Req) -> Vec<u8>
    where
        Req: WireEncode,
    {
        self.encode_frame(MessageType::Notification, 0, method, value)
    }

    /// Entry point for inbound frames. `bytes` must be exactly one complete
    /// encoded frame; this crate does not frame streaming transports.
    ///
    /// Dispatch of Requests and Notifications schedules handler work on the
    /// current `tokio` runtime and returns without waiting for it; Response
    /// and ErrorResponse completion happens inline since it only involves a
    /// map lookup and a oneshot send.
    pub fn from_transport(self: &Arc<Self>, bytes: &[u8], app_data: AppData) {
        let env = match envelope::decode(bytes) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(error = %e, "envelope decode failed");
                self.emit_error_frame(
                    ID_ALL_ONES,
                    PeerError::parse_error(e.to_string()),
                    &app_data,
                );
                return;
            }
        };

        match env.kind {
            MessageType::Request => {
                self.dispatch_inbound(true, env.id, env.method, env.body.to_vec(), app_data)
            }
            MessageType::Notification => {
                self.dispatch_inbound(false, env.id, env.method, env.body.to_vec(), app_data)
            }
            MessageType::Response => self.complete_response(env.id, env.body),
            MessageType::ErrorResponse => self.complete_error(env.id, env.body),
        }
    }

    /// Teardown: rejects every pending waiter with `INTERNAL_ERROR`,
    /// clears the dispatcher and its guard chains, stops the timeout
    /// checker, and clears the transport sink. The peer is inert afterward,
    /// but not closed: further `request` calls still allocate waiters and
    /// produce no output, since the sink is gone, and will only ever
    /// resolve via their own timeout.
    pub fn clean(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::info!(reason = %reason, "peer torn down");

        for (id, waiter) in self.pending.drain_all() {
            let _ = waiter
                .tx
                .send(Err(PeerError::internal_error(reason.clone()).with_correlation_id(id)));
        }
        self.timeout_checker.stop();
        self.dispatcher.clear();
        *self.sink.lock().unwrap() = None;
    }

    fn next_correlation_id() -> u32 {
        loop {
            let id = NEXT_CORRELATION_ID.fetch_add(1, Ordering::Relaxed);
            // id 0 is reserved for Notifications on the sender side.
            if id != 0 {
                return id;
            }
        }
    }

    /// Serializes `value` into the peer's reusable scratch buffer and wraps
    /// it in a complete frame. The buffer is cleared, written, and consumed
    /// (copied into the returned, owned frame) while the lock is held, so
    /// no view of it escapes across calls.
    fn encode_frame<Req: WireEncode>(
        &self,
        kind: MessageType,
        id: u32,
        method: u16,
        value: &Req,
    ) -> Vec<u8> {
        let mut buf = self.scratch.lock().unwrap();
        buf.clear();
        value.encode_into(&mut buf);
        envelope::encode(kind, id, method, &buf)
    }

    fn emit(&self, frame: &[u8], app_data: &AppData) {
        let sink = self.sink.lock().unwrap();
        match sink.as_ref() {
            Some(sink) => sink(frame, app_data),
            None => tracing::debug!("no transport sink registered; dropping outbound frame"),
        }
    }

    fn emit_response(&self, id: u32, method: u16, body: Vec<u8>, app_data: &AppData) {
        let frame = envelope::encode(MessageType::Response, id, method, &body);
        self.emit(&frame, app_data);
    }

    fn emit_error_frame(&self, id: u32, err: PeerError, app_data: &AppData) {
        tracing::debug!(id, code = err.code, message = %err.message, "emitting error response");
        let frame = envelope::encode_error(id, err.code, &err.message);
        self.emit(&frame, app_data);
    }

    fn dispatch_inbound(
        self: &Arc<Self>,
        is_request: bool,
        id: u32,
        method: u16,
        body: Vec<u8>,
        app_data: AppData,
    ) {
        let Some(entry) = self.dispatcher.get(method) else {
            if is_request {
                tracing::debug!(method, id, "no handler registered for method");
                self.emit_error_frame(
                    id,
                    PeerError::method_not_found().with_correlation_id(id),
                    &app_data,
                );
            }
            return;
        };

        let decoded = match (entry.decode_request)(&body) {
            Ok(decoded) => decoded,
            Err(e) => {
                if is_request {
                    tracing::debug!(method, id, error = %e, "request body decode failed");
                    self.emit_error_frame(
                        id,
                        PeerError::invalid_request(e.to_string()).with_correlation_id(id),
                        &app_data,
                    );
                }
                return;
            }
        };

        let guard_result = {
            let guards = entry.guards.lock().unwrap();
            run_guards(&guards, &decoded, &app_data)
        };
        if let Err(e) = guard_result {
            if is_request {
                tracing::debug!(method, id, error = %e, "guard rejected request");
                self.emit_error_frame(
                    id,
                    PeerError::guard_error(e.to_string()).with_correlation_id(id),
                    &app_data,
                );
            }
            return;
        }

        let peer = Arc::clone(self);
        let response_app_data = app_data.clone();
        tokio::spawn(async move {
            let outcome = (entry.invoke)(decoded, app_data).await;
            if !is_request {
                // Notifications never produce output, including on failure.
                if let Err(e) = outcome {
                    tracing::debug!(method, error = %e, "notification handler failed, dropping");
                }
                return;
            }
            match outcome {
                Ok(Some(body)) => peer.emit_response(id, method, body, &response_app_data),
                Ok(None) => peer.emit_response(id, method, Vec::new(), &response_app_data),
                Err(e) => {
                    tracing::warn!(method, id, error = %e, "handler failed");
                    peer.emit_error_frame(
                        id,
                        PeerError::application_error(e.to_string()).with_correlation_id(id),
                        &response_app_data,
                    );
                }
            }
        });
    }

    fn complete_response(&self, id: u32, body: &[u8]) {
        let (waiter, is_empty) = self.pending.remove(id);
        let Some(waiter) = waiter else {
            tracing::trace!(id, "response for unknown correlation id, dropping");
            return;
        };
        if is_empty {
            self.timeout_checker.stop();
        }
        tracing::trace!(id, method = waiter.method, "completing request with response");
        let _ = waiter.tx.send(Ok(body.to_vec()));
    }

    fn complete_error(&self, id: u32, body: &[u8]) {
        let (waiter, is_empty) = self.pending.remove(id);
        let Some(waiter) = waiter else {
            tracing::trace!(id, "error response for unknown correlation id, dropping");
            return;
        };
        if is_empty {
            self.timeout_checker.stop();
        }
        let result = match envelope::decode_error(body) {
            Ok((code, message)) => Err(PeerError::new(code, message.to_string()).with_correlation_id(id)),
            Err(e) => Err(PeerError::parse_error(e.to_string()).with_correlation_id(id)),
        };
        tracing::trace!(id, method = waiter.method, "completing request with error");
        let _ = waiter.tx.send(result);
    }
}
