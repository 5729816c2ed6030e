//! session-protocol: wire contract of the pin-map session management service
//!
//! The session management service is the remote authority that owns pin maps,
//! registered instrument sessions and the cross-process reservation locks.
//! This crate only describes what goes over the wire:
//!
//! - [`messages`]: request and response messages, serialized with the
//!   service's JSON field naming (camelCase)
//! - [`SessionManagementTransport`]: the blocking request/response contract a
//!   concrete transport (gRPC, HTTP, in-process) implements
//! - [`TransportError`]: failures reported by a transport
//!
//! No resolution or locking logic lives here.

pub mod error;
pub mod messages;
pub mod transport;

pub use error::{Result, TransportError};
pub use messages::{
    ChannelMapping, GetMultiplexerSessionsRequest, GetMultiplexerSessionsResponse,
    MultiplexerSessionInformation, PinMapContext, RegisterMultiplexerSessionsRequest,
    RegisterSessionsRequest, ReserveAllRegisteredSessionsRequest, ReserveSessionsRequest,
    ReserveSessionsResponse, ResolvedPinsOrRelays, Session, SessionInformation,
    UnregisterMultiplexerSessionsRequest, UnregisterSessionsRequest, UnreserveSessionsRequest,
};
pub use transport::SessionManagementTransport;
