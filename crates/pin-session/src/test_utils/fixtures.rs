//! Reservation fixtures.

use session_protocol::messages as wire;

use crate::error::Result;
use crate::reservation::Reservation;
use crate::resolver::ReservedResources;
use crate::types::{
    ChannelMapping, INSTRUMENT_TYPE_NI_DAQMX, INSTRUMENT_TYPE_NI_DCPOWER, INSTRUMENT_TYPE_NI_DMM,
    INSTRUMENT_TYPE_NI_SCOPE, MultiplexerSessionInformation, SITE_SYSTEM_PINS, SessionInformation,
};

/// Builds the same reserved sessions as a [`ReservedResources`] snapshot or
/// as a service response.
#[derive(Debug, Clone, Default)]
pub struct ReservationFixture {
    sessions: Vec<SessionInformation>,
    multiplexer_sessions: Vec<MultiplexerSessionInformation>,
    groups: Vec<(String, Vec<String>)>,
}

impl ReservationFixture {
    /// Create an empty fixture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reserved session.
    #[must_use]
    pub fn session(mut self, info: SessionInformation) -> Self {
        self.sessions.push(info);
        self
    }

    /// Add a reserved multiplexer session.
    #[must_use]
    pub fn multiplexer_session(mut self, info: MultiplexerSessionInformation) -> Self {
        self.multiplexer_sessions.push(info);
        self
    }

    /// Add a pin or relay group.
    #[must_use]
    pub fn group<I, S>(mut self, name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .push((name.into(), members.into_iter().map(Into::into).collect()));
        self
    }

    /// The reserved sessions.
    #[must_use]
    pub fn sessions(&self) -> &[SessionInformation] {
        &self.sessions
    }

    /// The snapshot, with no reservation order.
    #[must_use]
    pub fn resources(&self) -> ReservedResources {
        self.groups.iter().fold(
            ReservedResources::new(self.sessions.clone())
                .with_multiplexer_sessions(self.multiplexer_sessions.clone()),
            |resources, (name, members)| resources.with_group_mapping(name, members),
        )
    }

    /// A reservation over the snapshot, not held by any service.
    pub fn reservation(&self) -> Result<Reservation> {
        Reservation::new(self.resources())
    }

    /// The snapshot as a reserve response.
    #[must_use]
    pub fn response(&self) -> wire::ReserveSessionsResponse {
        wire::ReserveSessionsResponse {
            sessions: self.sessions.iter().map(Into::into).collect(),
            multiplexer_sessions: self.multiplexer_sessions.iter().map(Into::into).collect(),
            group_mappings: self
                .groups
                .iter()
                .map(|(name, members)| {
                    (
                        name.clone(),
                        wire::ResolvedPinsOrRelays {
                            pin_or_relay_names: members.clone(),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Two DAQ devices: `Pin1` and `Pin2` at site 0 on `Dev1`, `Pin1` at site 1 on `Dev2`.
#[must_use]
pub fn daq_fixture() -> ReservationFixture {
    ReservationFixture::new()
        .session(
            SessionInformation::new("Dev1", "Dev1", INSTRUMENT_TYPE_NI_DAQMX)
                .with_mapping(ChannelMapping::new("Pin1", 0, "Dev1/ai0"))
                .with_mapping(ChannelMapping::new("Pin2", 0, "Dev1/ai1")),
        )
        .session(
            SessionInformation::new("Dev2", "Dev2", INSTRUMENT_TYPE_NI_DAQMX)
                .with_mapping(ChannelMapping::new("Pin1", 1, "Dev2/ai2")),
        )
}

/// Two sites of DC power and DMM pins, plus a DC power system pin `VCC`.
#[must_use]
pub fn dcpower_dmm_fixture() -> ReservationFixture {
    ReservationFixture::new()
        .session(
            SessionInformation::new("DCPower1", "PXI1Slot2", INSTRUMENT_TYPE_NI_DCPOWER)
                .with_mapping(ChannelMapping::new("Pin1", 0, "0"))
                .with_mapping(ChannelMapping::new("Pin1", 1, "1"))
                .with_mapping(ChannelMapping::new("VCC", SITE_SYSTEM_PINS, "2")),
        )
        .session(
            SessionInformation::new("DMM1", "PXI1Slot3", INSTRUMENT_TYPE_NI_DMM)
                .with_mapping(ChannelMapping::new("Pin2", 0, "0")),
        )
        .session(
            SessionInformation::new("DMM2", "PXI1Slot4", INSTRUMENT_TYPE_NI_DMM)
                .with_mapping(ChannelMapping::new("Pin2", 1, "0")),
        )
        .group("PinGroup1", ["Pin1", "Pin2"])
}

/// One scope whose site 0 channel is routed through `Mux1`; site 1 is direct.
#[must_use]
pub fn multiplexed_scope_fixture() -> ReservationFixture {
    ReservationFixture::new()
        .session(
            SessionInformation::new("Scope1", "PXI1Slot5", INSTRUMENT_TYPE_NI_SCOPE)
                .with_mapping(ChannelMapping::new("Pin1", 0, "0").via_multiplexer("SCX1Mod1", "R0"))
                .with_mapping(ChannelMapping::new("Pin1", 1, "1")),
        )
        .multiplexer_session(MultiplexerSessionInformation::new(
            "Mux1",
            "SCX1Mod1",
            "NI-SWITCH",
        ))
        .multiplexer_session(MultiplexerSessionInformation::new(
            "Mux2",
            "SCX1Mod2",
            "NI-SWITCH",
        ))
}
