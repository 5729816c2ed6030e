//! The transport contract.

use crate::error::Result;
use crate::messages::{
    GetMultiplexerSessionsRequest, GetMultiplexerSessionsResponse,
    RegisterMultiplexerSessionsRequest, RegisterSessionsRequest,
    ReserveAllRegisteredSessionsRequest, ReserveSessionsRequest, ReserveSessionsResponse,
    UnregisterMultiplexerSessionsRequest, UnregisterSessionsRequest, UnreserveSessionsRequest,
};

/// Blocking request/response access to the session management service.
///
/// Every call may block on the network. Reservation timeouts are carried in
/// the request and enforced by the service; a transport reports an expired
/// wait as [`TransportError::ReservationTimeout`](crate::TransportError::ReservationTimeout).
pub trait SessionManagementTransport: Send + Sync {
    /// Reserve sessions for pins or relays in a pin map context.
    fn reserve_sessions(&self, request: ReserveSessionsRequest)
    -> Result<ReserveSessionsResponse>;

    /// Release a reservation.
    fn unreserve_sessions(&self, request: UnreserveSessionsRequest) -> Result<()>;

    /// Reserve every registered session.
    fn reserve_all_registered_sessions(
        &self,
        request: ReserveAllRegisteredSessionsRequest,
    ) -> Result<ReserveSessionsResponse>;

    /// Register sessions.
    fn register_sessions(&self, request: RegisterSessionsRequest) -> Result<()>;

    /// Unregister sessions.
    fn unregister_sessions(&self, request: UnregisterSessionsRequest) -> Result<()>;

    /// Register multiplexer sessions.
    fn register_multiplexer_sessions(&self, request: RegisterMultiplexerSessionsRequest)
    -> Result<()>;

    /// Unregister multiplexer sessions.
    fn unregister_multiplexer_sessions(
        &self,
        request: UnregisterMultiplexerSessionsRequest,
    ) -> Result<()>;

    /// Query multiplexer sessions.
    fn get_multiplexer_sessions(
        &self,
        request: GetMultiplexerSessionsRequest,
    ) -> Result<GetMultiplexerSessionsResponse>;
}
