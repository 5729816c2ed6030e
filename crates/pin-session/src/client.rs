//! Session management client.
//!
//! Marshals calls to the session management service and turns reserve
//! responses into [`Reservation`]s. No resolution happens here.

use std::fmt;
use std::sync::Arc;

use session_protocol::messages as wire;
use session_protocol::SessionManagementTransport;

use crate::config::ClientConfig;
use crate::error::{Result, SessionError};
use crate::reservation::Reservation;
use crate::resolver::ReservedResources;
use crate::types::{
    MultiplexerSessionInformation, OneOrMany, PinMapContext, ReservationTimeout,
    SessionInformation,
};

/// Client of the session management service.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct SessionManagementClient {
    transport: Arc<dyn SessionManagementTransport>,
    config: ClientConfig,
}

impl fmt::Debug for SessionManagementClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManagementClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionManagementClient {
    /// Create a client over a transport, with default configuration.
    #[must_use]
    pub fn new(transport: impl SessionManagementTransport + 'static) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    /// Create a client over a shared transport.
    #[must_use]
    pub fn from_shared(transport: Arc<dyn SessionManagementTransport>) -> Self {
        Self {
            transport,
            config: ClientConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub const fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// The client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Reserve exactly one session.
    ///
    /// Fails with [`SessionError::NotFound`] or [`SessionError::AmbiguousMatch`]
    /// if the service reserved zero or several sessions; the reservation is
    /// released in that case.
    pub fn reserve_session(
        &self,
        context: &PinMapContext,
        pin_or_relay_names: Option<OneOrMany<String>>,
        instrument_type_id: Option<&str>,
        timeout: Option<ReservationTimeout>,
    ) -> Result<Reservation> {
        let reservation =
            self.reserve_sessions(context, pin_or_relay_names, instrument_type_id, timeout)?;
        let count = reservation.session_info().len();
        let err = match count {
            1 => return Ok(reservation),
            0 => SessionError::not_found("no reserved sessions matched the specified criteria"),
            _ => SessionError::ambiguous(
                "too many reserved sessions matched the specified criteria",
                count,
            ),
        };
        if let Err(unreserve_err) = reservation.unreserve() {
            tracing::warn!(error = %unreserve_err, "Failed to unreserve sessions");
        }
        Err(err)
    }

    /// Reserve the sessions for pins or relays in a pin map context.
    ///
    /// `None` names reserve everything in the context. Names and sites are
    /// remembered, in order, as the reservation's ordering.
    pub fn reserve_sessions(
        &self,
        context: &PinMapContext,
        pin_or_relay_names: Option<OneOrMany<String>>,
        instrument_type_id: Option<&str>,
        timeout: Option<ReservationTimeout>,
    ) -> Result<Reservation> {
        context.validate()?;
        let pin_or_relay_names = pin_or_relay_names.map(OneOrMany::into_vec);
        let timeout = timeout.unwrap_or(self.config.default_timeout);

        tracing::info!(
            pin_map_id = %context.pin_map_id,
            pins = ?pin_or_relay_names,
            sites = ?context.sites,
            instrument_type_id = ?instrument_type_id,
            %timeout,
            "Reserving sessions"
        );

        let response = self.transport.reserve_sessions(wire::ReserveSessionsRequest {
            pin_map_context: context.to_wire(),
            pin_or_relay_names: pin_or_relay_names.clone().unwrap_or_default(),
            instrument_type_id: instrument_type_id.unwrap_or_default().to_string(),
            timeout_in_milliseconds: timeout.as_millis(),
        })?;
        self.reservation_from(response, pin_or_relay_names, context.sites.clone())
    }

    /// Reserve every registered session.
    pub fn reserve_all_registered_sessions(
        &self,
        instrument_type_id: Option<&str>,
        timeout: Option<ReservationTimeout>,
    ) -> Result<Reservation> {
        let timeout = timeout.unwrap_or(self.config.default_timeout);
        tracing::info!(
            instrument_type_id = ?instrument_type_id,
            %timeout,
            "Reserving all registered sessions"
        );

        let response = self.transport.reserve_all_registered_sessions(
            wire::ReserveAllRegisteredSessionsRequest {
                instrument_type_id: instrument_type_id.unwrap_or_default().to_string(),
                timeout_in_milliseconds: timeout.as_millis(),
            },
        )?;
        self.reservation_from(response, None, None)
    }

    /// Release reserved sessions.
    pub fn unreserve_sessions(&self, session_info: &[SessionInformation]) -> Result<()> {
        self.transport
            .unreserve_sessions(wire::UnreserveSessionsRequest {
                sessions: session_info.iter().map(Into::into).collect(),
            })?;
        tracing::info!(sessions = session_info.len(), "Unreserved sessions");
        Ok(())
    }

    /// Register sessions with the service.
    pub fn register_sessions(&self, session_info: &[SessionInformation]) -> Result<()> {
        tracing::debug!(sessions = session_info.len(), "Registering sessions");
        self.transport
            .register_sessions(wire::RegisterSessionsRequest {
                sessions: session_info.iter().map(Into::into).collect(),
            })
            .map_err(Into::into)
    }

    /// Unregister sessions from the service.
    pub fn unregister_sessions(&self, session_info: &[SessionInformation]) -> Result<()> {
        tracing::debug!(sessions = session_info.len(), "Unregistering sessions");
        self.transport
            .unregister_sessions(wire::UnregisterSessionsRequest {
                sessions: session_info.iter().map(Into::into).collect(),
            })
            .map_err(Into::into)
    }

    /// Register multiplexer sessions with the service.
    pub fn register_multiplexer_sessions(
        &self,
        multiplexer_session_info: &[MultiplexerSessionInformation],
    ) -> Result<()> {
        tracing::debug!(
            sessions = multiplexer_session_info.len(),
            "Registering multiplexer sessions"
        );
        self.transport
            .register_multiplexer_sessions(wire::RegisterMultiplexerSessionsRequest {
                multiplexer_sessions: multiplexer_session_info.iter().map(Into::into).collect(),
            })
            .map_err(Into::into)
    }

    /// Unregister multiplexer sessions from the service.
    pub fn unregister_multiplexer_sessions(
        &self,
        multiplexer_session_info: &[MultiplexerSessionInformation],
    ) -> Result<()> {
        tracing::debug!(
            sessions = multiplexer_session_info.len(),
            "Unregistering multiplexer sessions"
        );
        self.transport
            .unregister_multiplexer_sessions(wire::UnregisterMultiplexerSessionsRequest {
                multiplexer_sessions: multiplexer_session_info.iter().map(Into::into).collect(),
            })
            .map_err(Into::into)
    }

    /// Multiplexer sessions connected in a pin map context, optionally of one type.
    pub fn get_multiplexer_sessions(
        &self,
        context: &PinMapContext,
        multiplexer_type_id: Option<&str>,
    ) -> Result<Vec<MultiplexerSessionInformation>> {
        context.validate()?;
        self.query_multiplexer_sessions(Some(context.to_wire()), multiplexer_type_id)
    }

    /// Every registered multiplexer session, optionally of one type.
    pub fn get_all_registered_multiplexer_sessions(
        &self,
        multiplexer_type_id: Option<&str>,
    ) -> Result<Vec<MultiplexerSessionInformation>> {
        self.query_multiplexer_sessions(None, multiplexer_type_id)
    }

    fn query_multiplexer_sessions(
        &self,
        pin_map_context: Option<wire::PinMapContext>,
        multiplexer_type_id: Option<&str>,
    ) -> Result<Vec<MultiplexerSessionInformation>> {
        let response = self
            .transport
            .get_multiplexer_sessions(wire::GetMultiplexerSessionsRequest {
                pin_map_context,
                multiplexer_type_id: multiplexer_type_id.unwrap_or_default().to_string(),
            })?;
        Ok(response
            .multiplexer_sessions
            .into_iter()
            .map(Into::into)
            .collect())
    }

    fn reservation_from(
        &self,
        response: wire::ReserveSessionsResponse,
        reserved_pin_or_relay_names: Option<Vec<String>>,
        reserved_sites: Option<Vec<i32>>,
    ) -> Result<Reservation> {
        let reserved = response.sessions.clone();
        match ReservedResources::from_response(response, reserved_pin_or_relay_names, reserved_sites)
        {
            Ok(resources) => {
                tracing::info!(
                    sessions = resources.session_info().len(),
                    multiplexer_sessions = resources.multiplexer_session_info().len(),
                    "Reserved sessions"
                );
                Ok(Reservation::with_client(
                    resources,
                    Some(self.clone()),
                    self.config.initialization_behavior,
                ))
            }
            Err(err) => {
                // the service holds the lock regardless; hand it back as received
                if let Err(unreserve_err) = self
                    .transport
                    .unreserve_sessions(wire::UnreserveSessionsRequest { sessions: reserved })
                {
                    tracing::warn!(error = %unreserve_err, "Failed to unreserve sessions");
                }
                Err(err)
            }
        }
    }
}
