//! # corepeer
//!
//! A schema-driven, transport-agnostic binary RPC core.
//!
//! A [`Peer`] is a bidirectional endpoint: it encodes outbound requests,
//! notifications, responses, and error responses into a compact fixed-header
//! framed binary format; decodes inbound frames and routes them to
//! registered handlers or awaiting callers; tracks in-flight requests with
//! per-request timeout enforcement; and exposes a handler-registration
//! surface with a chained guard (middleware) model.
//!
//! ## What this crate does not do
//!
//! It does not own a transport (sockets, pipes, stdio framing), does not
//! define a payload serialization format (request/response bodies are
//! opaque byte blobs produced/consumed via the [`WireEncode`]/[`WireDecode`]
//! traits), and does not generate code from an interface description file.
//! Those are the caller's concern; this crate is the wire contract and the
//! concurrent request lifecycle around it.

mod builder;
mod dispatcher;
mod envelope;
mod error;
mod pending;
mod peer;
mod timeout;
mod wire;

pub use builder::{PeerConfig, PeerConfigBuilder};
pub use dispatcher::{GuardFailure, HandlerHandle};
pub use envelope::{MessageType, ParseError, ID_ALL_ONES};
pub use error::{codes, PeerError};
pub use peer::Peer;
pub use wire::{DecodeError, HandlerError, WireDecode, WireEncode};

use std::future::Future;
use std::pin::Pin;

/// A boxed, `Send`, `'static`-ish future: the currency handlers hand back to
/// the core so it can drive them on its own task without knowing their
/// concrete type.
pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased, boxed value produced by a [`WireDecode`] constructor.
///
/// Used internally by the dispatcher to carry decoded request bodies (and
/// handler return values before encoding) through the handler/guard chain
/// without the dispatcher needing to be generic over every registered
/// method's request/response types.
pub(crate) type AnyBox = Box<dyn std::any::Any + Send>;
