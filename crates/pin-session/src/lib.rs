//! pin-session: instrument session reservation and connection resolution
//!
//! Cooperating processes share stateful instrument sessions through a
//! session management service that maps pins, relays and sites of a pin map
//! to instrument channels. This crate is the client side of that contract:
//!
//! - **Reserve** a subset of a pin map through a [`SessionManagementClient`]
//! - **Initialize** driver sessions for the reserved resources with a
//!   caller-supplied [`SessionConstructor`]; sessions are torn down when their
//!   guard drops
//! - **Resolve** connections: which channel on which session serves a pin at a
//!   site, optionally routed through a multiplexer
//! - **Release** the reservation when the [`Reservation`] drops
//!
//! # Features
//!
//! - **Scripted transport** for testing (feature: `mock`)
//! - **Fake sessions and fixtures** for testing (feature: `test-utils`)
//!
//! # Example
//!
//! ```ignore
//! use pin_session::prelude::*;
//!
//! let client = SessionManagementClient::new(transport);
//! let context = PinMapContext::new(pin_map_id).sites([0, 1]);
//! let reservation = client.reserve_sessions(&context, Some(["Pin1", "Pin2"].into()), None, None)?;
//!
//! let _sessions = reservation.initialize_sessions(
//!     |info: &SessionInformation, behavior| DcPower::open(&info.resource_name, behavior),
//!     INSTRUMENT_TYPE_NI_DCPOWER,
//!     reservation.default_initialization_behavior(),
//! )?;
//! for connection in reservation.get_connections::<Arc<DcPower>>(&ConnectionFilter::new())? {
//!     connection.session.force_voltage(connection.channel_name, 3.3)?;
//! }
//! ```

pub mod client;
pub mod config;
pub mod construct;
pub mod error;
pub mod prelude;
pub mod reservation;
pub mod resolver;
pub mod types;

#[cfg(feature = "mock")]
pub mod mock;

pub use client::SessionManagementClient;
pub use config::ClientConfig;
pub use construct::{
    Closable, InitializationBehavior, ScopedResource, SessionClose, SessionConstructor,
    SessionHandle, SessionOpen,
};
pub use error::{DriverError, Result, SessionError};
pub use reservation::{
    MultiplexerSessionGuard, MultiplexerSessionsGuard, Reservation, SessionGuard, SessionsGuard,
};
pub use resolver::{
    AnySession, Connection, ConnectionFilter, ConnectionWithMultiplexer, ReservedResources,
    ResolvedMapping, SessionBinding,
};
pub use types::{
    ChannelMapping, MultiplexerSessionInformation, OneOrMany, PinMapContext, ReservationTimeout,
    SITE_SYSTEM_PINS, SessionInformation, SessionRecord,
};

#[cfg(feature = "mock")]
pub use mock::{MockTransport, RecordedRequest};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::{
    FakeSession, ReservationFixture, ScopedFakeSession, fake_constructor,
    fake_multiplexer_constructor,
};
