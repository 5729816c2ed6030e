//! Convenient re-exports for common pin-session usage.
//!
//! ```ignore
//! use pin_session::prelude::*;
//! ```

// Client and configuration
pub use crate::client::SessionManagementClient;
pub use crate::config::ClientConfig;

// Error handling
pub use crate::error::{Result, SessionError};

// Session construction
pub use crate::construct::{
    Closable, InitializationBehavior, ScopedResource, SessionClose, SessionHandle,
};

// Reservations and guards
pub use crate::reservation::{Reservation, SessionGuard, SessionsGuard};

// Connection resolution
pub use crate::resolver::{AnySession, Connection, ConnectionFilter, ConnectionWithMultiplexer};

// Data model
pub use crate::types::{
    ChannelMapping, INSTRUMENT_TYPE_NI_DAQMX, INSTRUMENT_TYPE_NI_DCPOWER,
    INSTRUMENT_TYPE_NI_DIGITAL_PATTERN, INSTRUMENT_TYPE_NI_DMM, INSTRUMENT_TYPE_NI_FGEN,
    INSTRUMENT_TYPE_NI_MODEL_BASED_INSTRUMENT, INSTRUMENT_TYPE_NI_RELAY_DRIVER,
    INSTRUMENT_TYPE_NI_SCOPE, INSTRUMENT_TYPE_NI_SWITCH, MultiplexerSessionInformation,
    PinMapContext, ReservationTimeout, SITE_SYSTEM_PINS, SessionInformation,
};

pub use std::sync::Arc;
