//! Common types for pin-session.
//!
//! These records describe what a reservation holds. They are built once from
//! the session management response and never change afterwards; live driver
//! handles are kept by the [`Reservation`](crate::Reservation), not here.

use std::fmt;
use std::time::Duration;

use session_protocol::messages as wire;

use crate::error::{Result, SessionError};

/// Site number of system pins (pins not scoped to a site).
pub const SITE_SYSTEM_PINS: i32 = -1;

/// Instrument type ID of NI-DCPower instruments.
pub const INSTRUMENT_TYPE_NI_DCPOWER: &str = "niDCPower";
/// Instrument type ID of NI-DMM instruments.
pub const INSTRUMENT_TYPE_NI_DMM: &str = "niDMM";
/// Instrument type ID of NI-Digital Pattern instruments.
pub const INSTRUMENT_TYPE_NI_DIGITAL_PATTERN: &str = "niDigitalPattern";
/// Instrument type ID of NI-FGEN instruments.
pub const INSTRUMENT_TYPE_NI_FGEN: &str = "niFGen";
/// Instrument type ID of NI-DAQmx devices.
pub const INSTRUMENT_TYPE_NI_DAQMX: &str = "niDAQmx";
/// Instrument type ID of NI relay drivers.
pub const INSTRUMENT_TYPE_NI_RELAY_DRIVER: &str = "niRelayDriver";
/// Instrument type ID of NI-SCOPE instruments.
pub const INSTRUMENT_TYPE_NI_SCOPE: &str = "niScope";
/// Instrument type ID of NI-SWITCH instruments.
pub const INSTRUMENT_TYPE_NI_SWITCH: &str = "niSwitch";
/// Instrument type ID of model-based instruments.
pub const INSTRUMENT_TYPE_NI_MODEL_BASED_INSTRUMENT: &str = "niModelBasedInstrument";

/// Identifies which pin map and sites a reservation concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinMapContext {
    /// Registered pin map ID.
    pub pin_map_id: String,

    /// Sites to reserve, in order. `None` means all sites.
    pub sites: Option<Vec<i32>>,
}

impl PinMapContext {
    /// Create a context covering all sites of a pin map.
    #[must_use]
    pub fn new(pin_map_id: impl Into<String>) -> Self {
        Self {
            pin_map_id: pin_map_id.into(),
            sites: None,
        }
    }

    /// Restrict the context to the given sites.
    #[must_use]
    pub fn sites(mut self, sites: impl IntoIterator<Item = i32>) -> Self {
        self.sites = Some(sites.into_iter().collect());
        self
    }

    /// Check the context before it is sent to the service.
    pub fn validate(&self) -> Result<()> {
        if self.pin_map_id.is_empty() {
            return Err(SessionError::invalid_argument(
                "pin_map_id",
                "''",
                "a pin map ID is required",
            ));
        }
        if let Some(site) = self.sites.iter().flatten().find(|site| **site < 0) {
            return Err(SessionError::invalid_argument(
                "sites",
                site.to_string(),
                "sites must be non-negative",
            ));
        }
        Ok(())
    }

    pub(crate) fn to_wire(&self) -> wire::PinMapContext {
        wire::PinMapContext {
            pin_map_id: self.pin_map_id.clone(),
            sites: self.sites.clone().unwrap_or_default(),
        }
    }
}

/// Binding of one pin or relay at one site to an instrument channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMapping {
    /// Pin or relay name.
    pub pin_or_relay_name: String,

    /// Site number, or [`SITE_SYSTEM_PINS`].
    pub site: i32,

    /// Instrument channel name.
    pub channel: String,

    /// Multiplexer resource name, empty when the channel is not multiplexed.
    pub multiplexer_resource_name: String,

    /// Route through the multiplexer.
    pub multiplexer_route: String,
}

impl ChannelMapping {
    /// Create an unmultiplexed channel mapping.
    #[must_use]
    pub fn new(pin_or_relay_name: impl Into<String>, site: i32, channel: impl Into<String>) -> Self {
        Self {
            pin_or_relay_name: pin_or_relay_name.into(),
            site,
            channel: channel.into(),
            multiplexer_resource_name: String::new(),
            multiplexer_route: String::new(),
        }
    }

    /// Route the channel through a multiplexer.
    #[must_use]
    pub fn via_multiplexer(
        mut self,
        resource_name: impl Into<String>,
        route: impl Into<String>,
    ) -> Self {
        self.multiplexer_resource_name = resource_name.into();
        self.multiplexer_route = route.into();
        self
    }

    /// Check if this is a system pin.
    #[must_use]
    pub const fn is_system_pin(&self) -> bool {
        self.site == SITE_SYSTEM_PINS
    }

    /// Check if the channel is routed through a multiplexer.
    #[must_use]
    pub fn is_multiplexed(&self) -> bool {
        !self.multiplexer_resource_name.is_empty()
    }
}

impl From<wire::ChannelMapping> for ChannelMapping {
    fn from(mapping: wire::ChannelMapping) -> Self {
        Self {
            pin_or_relay_name: mapping.pin_or_relay_name,
            site: mapping.site,
            channel: mapping.channel,
            multiplexer_resource_name: mapping.multiplexer_resource_name,
            multiplexer_route: mapping.multiplexer_route,
        }
    }
}

impl From<&ChannelMapping> for wire::ChannelMapping {
    fn from(mapping: &ChannelMapping) -> Self {
        Self {
            pin_or_relay_name: mapping.pin_or_relay_name.clone(),
            site: mapping.site,
            channel: mapping.channel.clone(),
            multiplexer_resource_name: mapping.multiplexer_resource_name.clone(),
            multiplexer_route: mapping.multiplexer_route.clone(),
        }
    }
}

/// A reserved instrument session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInformation {
    /// Session name, unique within a reservation.
    pub session_name: String,

    /// Instrument resource name.
    pub resource_name: String,

    /// Comma-separated channel list.
    pub channel_list: String,

    /// Instrument type ID.
    pub instrument_type_id: String,

    /// Whether the session was already open on the server before this reservation.
    pub session_exists: bool,

    /// Channel mappings owned by this session, in service order.
    pub channel_mappings: Vec<ChannelMapping>,
}

impl SessionInformation {
    /// Create a session record without channel mappings.
    #[must_use]
    pub fn new(
        session_name: impl Into<String>,
        resource_name: impl Into<String>,
        instrument_type_id: impl Into<String>,
    ) -> Self {
        Self {
            session_name: session_name.into(),
            resource_name: resource_name.into(),
            channel_list: String::new(),
            instrument_type_id: instrument_type_id.into(),
            session_exists: false,
            channel_mappings: Vec::new(),
        }
    }

    /// Add a channel mapping and append its channel to the channel list.
    #[must_use]
    pub fn with_mapping(mut self, mapping: ChannelMapping) -> Self {
        if !self.channel_list.is_empty() {
            self.channel_list.push_str(", ");
        }
        self.channel_list.push_str(&mapping.channel);
        self.channel_mappings.push(mapping);
        self
    }

    /// Mark whether the session already exists on the server.
    #[must_use]
    pub const fn session_exists(mut self, exists: bool) -> Self {
        self.session_exists = exists;
        self
    }
}

impl TryFrom<wire::SessionInformation> for SessionInformation {
    type Error = SessionError;

    fn try_from(info: wire::SessionInformation) -> Result<Self> {
        let session_name = info.session.name;
        let channel_mappings: Vec<ChannelMapping> =
            info.channel_mappings.into_iter().map(Into::into).collect();

        for (index, mapping) in channel_mappings.iter().enumerate() {
            let duplicate = channel_mappings[..index].iter().any(|earlier| {
                earlier.pin_or_relay_name == mapping.pin_or_relay_name
                    && earlier.site == mapping.site
            });
            if duplicate {
                return Err(SessionError::protocol(format!(
                    "session '{session_name}' maps pin or relay '{}' at site {} more than once",
                    mapping.pin_or_relay_name, mapping.site
                )));
            }
        }

        Ok(Self {
            session_name,
            resource_name: info.resource_name,
            channel_list: info.channel_list,
            instrument_type_id: info.instrument_type_id,
            session_exists: info.session_exists,
            channel_mappings,
        })
    }
}

impl From<&SessionInformation> for wire::SessionInformation {
    fn from(info: &SessionInformation) -> Self {
        Self {
            session: wire::Session {
                name: info.session_name.clone(),
            },
            resource_name: info.resource_name.clone(),
            channel_list: info.channel_list.clone(),
            instrument_type_id: info.instrument_type_id.clone(),
            session_exists: info.session_exists,
            channel_mappings: info.channel_mappings.iter().map(Into::into).collect(),
        }
    }
}

/// A reserved multiplexer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplexerSessionInformation {
    /// Session name, unique within a reservation.
    pub session_name: String,

    /// Multiplexer resource name.
    pub resource_name: String,

    /// Multiplexer type ID.
    pub multiplexer_type_id: String,

    /// Whether the session was already open on the server before this reservation.
    pub session_exists: bool,
}

impl MultiplexerSessionInformation {
    /// Create a multiplexer session record.
    #[must_use]
    pub fn new(
        session_name: impl Into<String>,
        resource_name: impl Into<String>,
        multiplexer_type_id: impl Into<String>,
    ) -> Self {
        Self {
            session_name: session_name.into(),
            resource_name: resource_name.into(),
            multiplexer_type_id: multiplexer_type_id.into(),
            session_exists: false,
        }
    }

    /// Mark whether the session already exists on the server.
    #[must_use]
    pub const fn session_exists(mut self, exists: bool) -> Self {
        self.session_exists = exists;
        self
    }
}

impl From<wire::MultiplexerSessionInformation> for MultiplexerSessionInformation {
    fn from(info: wire::MultiplexerSessionInformation) -> Self {
        Self {
            session_name: info.session.name,
            resource_name: info.resource_name,
            multiplexer_type_id: info.multiplexer_type_id,
            session_exists: info.session_exists,
        }
    }
}

impl From<&MultiplexerSessionInformation> for wire::MultiplexerSessionInformation {
    fn from(info: &MultiplexerSessionInformation) -> Self {
        Self {
            session: wire::Session {
                name: info.session_name.clone(),
            },
            resource_name: info.resource_name.clone(),
            multiplexer_type_id: info.multiplexer_type_id.clone(),
            session_exists: info.session_exists,
        }
    }
}

/// A record that names a session in a reservation.
pub trait SessionRecord: fmt::Debug + Send + Sync {
    /// The session name.
    fn session_name(&self) -> &str;

    /// Whether the session was already open on the server.
    fn session_exists(&self) -> bool;
}

impl SessionRecord for SessionInformation {
    fn session_name(&self) -> &str {
        &self.session_name
    }

    fn session_exists(&self) -> bool {
        self.session_exists
    }
}

impl SessionRecord for MultiplexerSessionInformation {
    fn session_name(&self) -> &str {
        &self.session_name
    }

    fn session_exists(&self) -> bool {
        self.session_exists
    }
}

/// A filter value that is either one item or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOrMany<T> {
    /// A single value.
    Single(T),
    /// An ordered list of values.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// View the values as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }

    /// Convert into an ordered list.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Single(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

impl From<&str> for OneOrMany<String> {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for OneOrMany<String> {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for OneOrMany<String> {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

impl From<Vec<&str>> for OneOrMany<String> {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for OneOrMany<String> {
    fn from(values: &[&str]) -> Self {
        Self::Many(values.iter().map(|value| (*value).to_string()).collect())
    }
}

impl From<&[String]> for OneOrMany<String> {
    fn from(values: &[String]) -> Self {
        Self::Many(values.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for OneOrMany<String> {
    fn from(values: [&str; N]) -> Self {
        Self::Many(values.iter().map(|value| (*value).to_string()).collect())
    }
}

impl From<i32> for OneOrMany<i32> {
    fn from(value: i32) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<i32>> for OneOrMany<i32> {
    fn from(values: Vec<i32>) -> Self {
        Self::Many(values)
    }
}

impl From<&[i32]> for OneOrMany<i32> {
    fn from(values: &[i32]) -> Self {
        Self::Many(values.to_vec())
    }
}

impl<const N: usize> From<[i32; N]> for OneOrMany<i32> {
    fn from(values: [i32; N]) -> Self {
        Self::Many(values.to_vec())
    }
}

/// How long a reserve call may wait for resources held by other clients.
///
/// The wait is enforced by the service; an expired wait surfaces as a
/// transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReservationTimeout {
    /// Fail immediately if the resources are unavailable.
    #[default]
    Immediate,
    /// Wait indefinitely.
    Infinite,
    /// Wait up to the given duration.
    Within(Duration),
}

impl ReservationTimeout {
    /// Wait up to the given number of seconds.
    #[must_use]
    pub const fn seconds(seconds: u64) -> Self {
        Self::Within(Duration::from_secs(seconds))
    }

    /// The wire encoding: 0, -1, or whole milliseconds.
    #[must_use]
    pub fn as_millis(self) -> i32 {
        match self {
            Self::Immediate => 0,
            Self::Infinite => -1,
            Self::Within(duration) => {
                i32::try_from(duration.as_millis()).unwrap_or(i32::MAX).max(1)
            }
        }
    }
}

impl From<f64> for ReservationTimeout {
    /// Interpret a number of seconds: 0 fails immediately, negative waits forever.
    fn from(seconds: f64) -> Self {
        if seconds < 0.0 || seconds.is_infinite() {
            Self::Infinite
        } else if seconds > 0.0 {
            Duration::try_from_secs_f64(seconds).map_or(Self::Infinite, Self::Within)
        } else {
            // zero or NaN
            Self::Immediate
        }
    }
}

impl From<Duration> for ReservationTimeout {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            Self::Immediate
        } else {
            Self::Within(duration)
        }
    }
}

impl fmt::Display for ReservationTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => write!(f, "immediate"),
            Self::Infinite => write!(f, "infinite"),
            Self::Within(duration) => write!(f, "{duration:?}"),
        }
    }
}
