//! Request and response messages of the session management service.
//!
//! Field names follow the service's JSON mapping (camelCase). Fields the
//! service may omit deserialize to their defaults.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identifies the pin map and sites a request concerns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PinMapContext {
    /// Registered pin map ID.
    pub pin_map_id: String,
    /// Sites to operate on. Empty means all sites in the pin map.
    pub sites: Vec<i32>,
}

/// Named driver session reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Session {
    /// Session name, unique within a reservation.
    pub name: String,
}

/// Binding of one pin or relay at one site to an instrument channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelMapping {
    /// Pin or relay name.
    pub pin_or_relay_name: String,
    /// Site number, or -1 for system pins.
    pub site: i32,
    /// Instrument channel name.
    pub channel: String,
    /// Resource name of the multiplexer, empty when not multiplexed.
    pub multiplexer_resource_name: String,
    /// Route through the multiplexer.
    pub multiplexer_route: String,
}

/// A reserved or registered instrument session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionInformation {
    /// Session reference.
    pub session: Session,
    /// Instrument resource name.
    pub resource_name: String,
    /// Comma-separated channel list.
    pub channel_list: String,
    /// Instrument type ID.
    pub instrument_type_id: String,
    /// Whether the session was already registered before this request.
    pub session_exists: bool,
    /// Channel mappings owned by this session.
    pub channel_mappings: Vec<ChannelMapping>,
}

/// A reserved or registered multiplexer session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MultiplexerSessionInformation {
    /// Session reference.
    pub session: Session,
    /// Multiplexer resource name.
    pub resource_name: String,
    /// Multiplexer type ID.
    pub multiplexer_type_id: String,
    /// Whether the session was already registered before this request.
    pub session_exists: bool,
}

/// Members of a pin or relay group, already flattened by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolvedPinsOrRelays {
    /// Member pin or relay names, in pin map order.
    pub pin_or_relay_names: Vec<String>,
}

/// Reserve sessions for pins or relays in a pin map context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReserveSessionsRequest {
    /// Pin map context.
    pub pin_map_context: PinMapContext,
    /// Pin, relay or group names. Empty reserves everything in the context.
    pub pin_or_relay_names: Vec<String>,
    /// Optional instrument type filter. Empty means all types.
    pub instrument_type_id: String,
    /// 0 fails immediately, -1 waits forever, positive waits that many milliseconds.
    pub timeout_in_milliseconds: i32,
}

/// Result of a reserve call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReserveSessionsResponse {
    /// Reserved sessions, in service order.
    pub sessions: Vec<SessionInformation>,
    /// Multiplexer sessions routing the reserved channels.
    pub multiplexer_sessions: Vec<MultiplexerSessionInformation>,
    /// Group name to flattened members, for every group named in the request.
    pub group_mappings: HashMap<String, ResolvedPinsOrRelays>,
}

/// Reserve every registered session, optionally filtered by instrument type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReserveAllRegisteredSessionsRequest {
    /// Optional instrument type filter. Empty means all types.
    pub instrument_type_id: String,
    /// 0 fails immediately, -1 waits forever, positive waits that many milliseconds.
    pub timeout_in_milliseconds: i32,
}

/// Release a reservation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnreserveSessionsRequest {
    /// The sessions exactly as they were reserved.
    pub sessions: Vec<SessionInformation>,
}

/// Register sessions so other processes can attach to them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterSessionsRequest {
    /// Sessions to register.
    pub sessions: Vec<SessionInformation>,
}

/// Unregister sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnregisterSessionsRequest {
    /// Sessions to unregister.
    pub sessions: Vec<SessionInformation>,
}

/// Register multiplexer sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterMultiplexerSessionsRequest {
    /// Multiplexer sessions to register.
    pub multiplexer_sessions: Vec<MultiplexerSessionInformation>,
}

/// Unregister multiplexer sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnregisterMultiplexerSessionsRequest {
    /// Multiplexer sessions to unregister.
    pub multiplexer_sessions: Vec<MultiplexerSessionInformation>,
}

/// Query multiplexer sessions in a pin map context.
///
/// An absent `pin_map_context` asks for every registered multiplexer session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetMultiplexerSessionsRequest {
    /// Pin map context, if scoped to one pin map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_map_context: Option<PinMapContext>,
    /// Optional multiplexer type filter. Empty means all types.
    pub multiplexer_type_id: String,
}

/// Multiplexer sessions returned by a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetMultiplexerSessionsResponse {
    /// Matching multiplexer sessions.
    pub multiplexer_sessions: Vec<MultiplexerSessionInformation>,
}
