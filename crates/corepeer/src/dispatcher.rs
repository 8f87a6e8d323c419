//! # Dispatcher
//!
//! Maps a method id to its handler entry: the type-erased request decoder,
//! the guard chain, and the boxed call that decodes, guards, invokes, and
//! re-encodes in one step.
//!
//! Method ids are known only at runtime, but each handler's request and
//! response types are known at registration time, so the erasure boundary
//! here is [`std::any::Any`] rather than a dynamically-typed schema object:
//! [`Peer::register_handler`] is generic over the concrete request/response
//! types and builds the erased closures once, at registration time.
//! Everything downstream (guard chain, sweep, dispatch) works with the
//! type-erased [`AnyBox`] and never needs to name `Req`/`Res` again.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::wire::{DecodeError, HandlerError, WireDecode, WireEncode};
use crate::{AnyBox, BoxFuture};

/// A guard's failure. Kept distinct from [`HandlerError`] because a failing
/// guard maps to `GUARD_ERROR` on the wire, not `APPLICATION_ERROR`.
#[derive(Debug, Clone)]
pub struct GuardFailure(pub String);

impl std::fmt::Display for GuardFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for GuardFailure {}

impl From<&str> for GuardFailure {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GuardFailure {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One pre-handler check, tagged by which arguments it wants. Stored
/// type-erased on the request side (downcast happens inside the closure,
/// installed with the concrete `Req` type known at [`HandlerHandle`]
/// construction time) and concrete on the `AppData` side, since `AppData` is
/// uniform for the whole peer.
pub(crate) enum Guard<AppData> {
    WithBoth(Box<dyn Fn(&AnyBox, &AppData) -> Result<(), GuardFailure> + Send + Sync>),
    RequestOnly(Box<dyn Fn(&AnyBox) -> Result<(), GuardFailure> + Send + Sync>),
    AppDataOnly(Box<dyn Fn(&AppData) -> Result<(), GuardFailure> + Send + Sync>),
}

impl<AppData> Guard<AppData> {
    fn run(&self, req: &AnyBox, app_data: &AppData) -> Result<(), GuardFailure> {
        match self {
            Guard::WithBoth(f) => f(req, app_data),
            Guard::RequestOnly(f) => f(req),
            Guard::AppDataOnly(f) => f(app_data),
        }
    }
}

/// A registered method's full dispatch recipe.
pub(crate) struct HandlerEntry<AppData> {
    pub method: u16,
    pub decode_request: Box<dyn Fn(&[u8]) -> Result<AnyBox, DecodeError> + Send + Sync>,
    pub guards: Mutex<Vec<Guard<AppData>>>,
    /// Decodes the handler's result, already past the guard chain (guards
    /// run separately, before this is called, since a guard failure never
    /// reaches the handler at all). Returns `Ok(None)` for a void response,
    /// `Ok(Some(bytes))` for an encoded response body, and `Err` mapped by
    /// the caller to `APPLICATION_ERROR`.
    #[allow(clippy::type_complexity)]
    pub invoke: Box<
        dyn Fn(AnyBox, AppData) -> BoxFuture<'static, Result<Option<Vec<u8>>, HandlerError>>
            + Send
            + Sync,
    >,
}

/// A handle returned by `register_handler`, used to chain guards onto the
/// handler entry just installed. Generic over `Req` so its three append
/// methods can take typed closures while storing them erased.
pub struct HandlerHandle<AppData, Req> {
    pub(crate) entry: Arc<HandlerEntry<AppData>>,
    pub(crate) _marker: std::marker::PhantomData<fn(Req)>,
}

impl<AppData, Req> HandlerHandle<AppData, Req>
where
    AppData: Send + Sync + 'static,
    Req: Send + Sync + 'static,
{
    /// Appends a guard that sees both the decoded request and the app data.
    pub fn add_guard<F>(self, guard: F) -> Self
    where
        F: Fn(&Req, &AppData) -> Result<(), GuardFailure> + Send + Sync + 'static,
    {
        let wrapped = move |req: &AnyBox, app_data: &AppData| {
            // Infallible: `Req` here is the same type parameter the entry was
            // registered with in `Peer::register_handler`, which is the only
            // place an `AnyBox` for this entry's guards is ever constructed.
            let req = req
                .downcast_ref::<Req>()
                .expect("guard request type does not match handler's registered request type");
            guard(req, app_data)
        };
        self.entry
            .guards
            .lock()
            .unwrap()
            .push(Guard::WithBoth(Box::new(wrapped)));
        self
    }

    /// Appends a guard that only sees the decoded request.
    pub fn add_request_guard<F>(self, guard: F) -> Self
    where
        F: Fn(&Req) -> Result<(), GuardFailure> + Send + Sync + 'static,
    {
        let wrapped = move |req: &AnyBox| {
            // Infallible for the same reason as `add_guard`'s downcast above.
            let req = req
                .downcast_ref::<Req>()
                .expect("guard request type does not match handler's registered request type");
            guard(req)
        };
        self.entry
            .guards
            .lock()
            .unwrap()
            .push(Guard::RequestOnly(Box::new(wrapped)));
        self
    }

    /// Appends a guard that only sees the app data.
    pub fn add_app_data_guard<F>(self, guard: F) -> Self
    where
        F: Fn(&AppData) -> Result<(), GuardFailure> + Send + Sync + 'static,
    {
        self.entry
            .guards
            .lock()
            .unwrap()
            .push(Guard::AppDataOnly(Box::new(guard)));
        self
    }
}

/// The method-id to handler-entry map. A single writer registers handlers
/// (typically during setup); dispatch reads concurrently.
pub(crate) struct Dispatcher<AppData> {
    handlers: DashMap<u16, Arc<HandlerEntry<AppData>>>,
}

impl<AppData> Dispatcher<AppData> {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    pub fn insert(&self, entry: Arc<HandlerEntry<AppData>>) {
        self.handlers.insert(entry.method, entry);
    }

    pub fn get(&self, method: u16) -> Option<Arc<HandlerEntry<AppData>>> {
        self.handlers.get(&method).map(|e| Arc::clone(e.value()))
    }

    pub fn clear(&self) {
        self.handlers.clear();
    }
}

/// Builds the erased `invoke` closure for a concrete `Req`/`Res` pair. Kept
/// free-standing (rather than inlined into `Peer::register_handler`) so the
/// generic plumbing is easy to read in isolation from the peer's own state
/// management.
pub(crate) fn make_invoke<AppData, Req, Res, F, Fut>(
    handler: F,
) -> Box<dyn Fn(AnyBox, AppData) -> BoxFuture<'static, Result<Option<Vec<u8>>, HandlerError>> + Send + Sync>
where
    AppData: Send + Sync + 'static,
    Req: Send + Sync + 'static,
    Res: WireEncode + Send + 'static,
    F: Fn(Req, AppData) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Res, HandlerError>> + Send + 'static,
{
    let handler = Arc::new(handler);
    Box::new(move |req_any: AnyBox, app_data: AppData| {
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            // Infallible: this closure and `make_decoder::<Req>` are built
            // from the same `Req` type parameter in one `register_handler`
            // call, and the dispatcher only ever feeds this entry's `invoke`
            // the `AnyBox` that entry's own `decode_request` just produced.
            let req: Box<Req> = req_any
                .downcast()
                .expect("dispatcher request type does not match handler's registered type");
            let result = handler(*req, app_data).await?;
            let mut buf = Vec::new();
            result.encode_into(&mut buf);
            if buf.is_empty() {
                Ok(None)
            } else {
                Ok(Some(buf))
            }
        })
    })
}

pub(crate) fn make_decoder<Req>(
) -> Box<dyn Fn(&[u8]) -> Result<AnyBox, DecodeError> + Send + Sync>
where
    Req: WireDecode + Send + Sync + 'static,
{
    Box::new(|bytes: &[u8]| -> Result<AnyBox, DecodeError> {
        let value = Req::decode_from(bytes)?;
        Ok(Box::new(value) as AnyBox)
    })
}

pub(crate) fn run_guards<AppData>(
    guards: &[Guard<AppData>],
    req: &AnyBox,
    app_data: &AppData,
) -> Result<(), GuardFailure> {
    for guard in guards {
        guard.run(req, app_data)?;
    }
    Ok(())
}
