//! Scripted session management transport.
//!
//! [`MockTransport`] stands in for the session management service: reserve
//! responses are queued up front, every request is recorded, and registered
//! sessions are kept in memory.
//!
//! # Example
//!
//! ```rust
//! use pin_session::mock::MockTransport;
//! use pin_session::{PinMapContext, SessionManagementClient};
//! use session_protocol::ReserveSessionsResponse;
//!
//! let transport = MockTransport::new();
//! transport.queue_reserve_response(ReserveSessionsResponse::default());
//!
//! let client = SessionManagementClient::new(transport.clone());
//! let reservation = client
//!     .reserve_sessions(&PinMapContext::new("MyPinMap"), None, None, None)
//!     .unwrap();
//! assert!(reservation.session_info().is_empty());
//! assert_eq!(transport.reserve_requests().len(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use session_protocol::messages::{
    GetMultiplexerSessionsRequest, GetMultiplexerSessionsResponse, MultiplexerSessionInformation,
    RegisterMultiplexerSessionsRequest, RegisterSessionsRequest,
    ReserveAllRegisteredSessionsRequest, ReserveSessionsRequest, ReserveSessionsResponse,
    SessionInformation, UnregisterMultiplexerSessionsRequest, UnregisterSessionsRequest,
    UnreserveSessionsRequest,
};
use session_protocol::{Result, SessionManagementTransport, TransportError};

/// A request received by a [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
    /// `reserve_sessions`.
    ReserveSessions(ReserveSessionsRequest),
    /// `reserve_all_registered_sessions`.
    ReserveAllRegisteredSessions(ReserveAllRegisteredSessionsRequest),
    /// `unreserve_sessions`.
    UnreserveSessions(UnreserveSessionsRequest),
    /// `register_sessions`.
    RegisterSessions(RegisterSessionsRequest),
    /// `unregister_sessions`.
    UnregisterSessions(UnregisterSessionsRequest),
    /// `register_multiplexer_sessions`.
    RegisterMultiplexerSessions(RegisterMultiplexerSessionsRequest),
    /// `unregister_multiplexer_sessions`.
    UnregisterMultiplexerSessions(UnregisterMultiplexerSessionsRequest),
    /// `get_multiplexer_sessions`.
    GetMultiplexerSessions(GetMultiplexerSessionsRequest),
}

/// Shared state for the mock transport.
#[derive(Debug, Default)]
struct MockState {
    /// Outcomes of upcoming reserve calls.
    reserve_outcomes: VecDeque<Result<ReserveSessionsResponse>>,
    /// Failures for upcoming unreserve calls.
    unreserve_failures: VecDeque<TransportError>,
    /// Registered sessions.
    sessions: Vec<SessionInformation>,
    /// Registered multiplexer sessions.
    multiplexer_sessions: Vec<MultiplexerSessionInformation>,
    /// Every request, in order.
    requests: Vec<RecordedRequest>,
}

/// An in-memory session management service.
///
/// Clones share state, so a test can keep one clone to inspect what the
/// client sent.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a mock with nothing queued or registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response of the next reserve call.
    pub fn queue_reserve_response(&self, response: ReserveSessionsResponse) {
        self.state.lock().reserve_outcomes.push_back(Ok(response));
    }

    /// Make the next reserve call fail.
    pub fn queue_reserve_error(&self, error: TransportError) {
        self.state.lock().reserve_outcomes.push_back(Err(error));
    }

    /// Make the next unreserve call fail.
    pub fn fail_next_unreserve(&self, error: TransportError) {
        self.state.lock().unreserve_failures.push_back(error);
    }

    /// Every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// The reserve requests received.
    #[must_use]
    pub fn reserve_requests(&self) -> Vec<ReserveSessionsRequest> {
        self.state
            .lock()
            .requests
            .iter()
            .filter_map(|request| match request {
                RecordedRequest::ReserveSessions(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// The session lists of the unreserve requests received.
    #[must_use]
    pub fn unreserved(&self) -> Vec<Vec<SessionInformation>> {
        self.state
            .lock()
            .requests
            .iter()
            .filter_map(|request| match request {
                RecordedRequest::UnreserveSessions(request) => Some(request.sessions.clone()),
                _ => None,
            })
            .collect()
    }

    /// Currently registered sessions.
    #[must_use]
    pub fn registered_sessions(&self) -> Vec<SessionInformation> {
        self.state.lock().sessions.clone()
    }

    /// Currently registered multiplexer sessions.
    #[must_use]
    pub fn registered_multiplexer_sessions(&self) -> Vec<MultiplexerSessionInformation> {
        self.state.lock().multiplexer_sessions.clone()
    }

    fn record(&self, request: RecordedRequest) {
        tracing::trace!(?request, "Mock transport request");
        self.state.lock().requests.push(request);
    }
}

impl SessionManagementTransport for MockTransport {
    fn reserve_sessions(&self, request: ReserveSessionsRequest) -> Result<ReserveSessionsResponse> {
        self.record(RecordedRequest::ReserveSessions(request));
        self.state
            .lock()
            .reserve_outcomes
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::rejected("no reserve response queued")))
    }

    fn unreserve_sessions(&self, request: UnreserveSessionsRequest) -> Result<()> {
        self.record(RecordedRequest::UnreserveSessions(request));
        self.state
            .lock()
            .unreserve_failures
            .pop_front()
            .map_or(Ok(()), Err)
    }

    /// Returns the next queued response, or else every registered session of
    /// the requested instrument type.
    fn reserve_all_registered_sessions(
        &self,
        request: ReserveAllRegisteredSessionsRequest,
    ) -> Result<ReserveSessionsResponse> {
        let instrument_type_id = request.instrument_type_id.clone();
        self.record(RecordedRequest::ReserveAllRegisteredSessions(request));

        let mut state = self.state.lock();
        if let Some(outcome) = state.reserve_outcomes.pop_front() {
            return outcome;
        }
        Ok(ReserveSessionsResponse {
            sessions: state
                .sessions
                .iter()
                .filter(|info| {
                    instrument_type_id.is_empty() || info.instrument_type_id == instrument_type_id
                })
                .cloned()
                .collect(),
            ..ReserveSessionsResponse::default()
        })
    }

    fn register_sessions(&self, request: RegisterSessionsRequest) -> Result<()> {
        self.record(RecordedRequest::RegisterSessions(request.clone()));
        let mut state = self.state.lock();
        for info in request.sessions {
            state
                .sessions
                .retain(|registered| registered.session.name != info.session.name);
            state.sessions.push(info);
        }
        Ok(())
    }

    fn unregister_sessions(&self, request: UnregisterSessionsRequest) -> Result<()> {
        self.record(RecordedRequest::UnregisterSessions(request.clone()));
        self.state.lock().sessions.retain(|registered| {
            !request
                .sessions
                .iter()
                .any(|info| info.session.name == registered.session.name)
        });
        Ok(())
    }

    fn register_multiplexer_sessions(
        &self,
        request: RegisterMultiplexerSessionsRequest,
    ) -> Result<()> {
        self.record(RecordedRequest::RegisterMultiplexerSessions(request.clone()));
        let mut state = self.state.lock();
        for info in request.multiplexer_sessions {
            state
                .multiplexer_sessions
                .retain(|registered| registered.session.name != info.session.name);
            state.multiplexer_sessions.push(info);
        }
        Ok(())
    }

    fn unregister_multiplexer_sessions(
        &self,
        request: UnregisterMultiplexerSessionsRequest,
    ) -> Result<()> {
        self.record(RecordedRequest::UnregisterMultiplexerSessions(request.clone()));
        self.state.lock().multiplexer_sessions.retain(|registered| {
            !request
                .multiplexer_sessions
                .iter()
                .any(|info| info.session.name == registered.session.name)
        });
        Ok(())
    }

    fn get_multiplexer_sessions(
        &self,
        request: GetMultiplexerSessionsRequest,
    ) -> Result<GetMultiplexerSessionsResponse> {
        let multiplexer_type_id = request.multiplexer_type_id.clone();
        self.record(RecordedRequest::GetMultiplexerSessions(request));
        Ok(GetMultiplexerSessionsResponse {
            multiplexer_sessions: self
                .state
                .lock()
                .multiplexer_sessions
                .iter()
                .filter(|info| {
                    multiplexer_type_id.is_empty()
                        || info.multiplexer_type_id == multiplexer_type_id
                })
                .cloned()
                .collect(),
        })
    }
}
