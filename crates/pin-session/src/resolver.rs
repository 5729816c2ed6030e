//! Connection resolution.
//!
//! Resolution is a pure function of the reserved snapshot and a
//! [`ConnectionFilter`]: no I/O, no locking. It proceeds in fixed steps:
//!
//! 1. Validate the filter values
//! 2. Expand group names to their members
//! 3. Select channel mappings by instrument type, name and site; system pins
//!    pass every site filter
//! 4. Drop repeated `(pin or relay, site, instrument type)` entries, keeping
//!    the first
//! 5. Report filter values that matched nothing
//! 6. Order the survivors
//!
//! Ordering follows the first rule that applies:
//!
//! - names or sites in the filter: name-major, site-minor, in filter order;
//!   a dimension the filter leaves open follows the reservation order, or
//!   first appearance, with system pins first
//! - the reservation was made with explicit names or sites: site-major,
//!   name-minor, in reservation order
//! - otherwise the service's order, with system pins moved to the front

mod connection;
mod filter;

use std::collections::{HashMap, HashSet};

use session_protocol::messages as wire;

pub use connection::{AnySession, Connection, ConnectionWithMultiplexer, SessionBinding};
pub use filter::ConnectionFilter;

use crate::error::{Result, SessionError};
use crate::types::{
    ChannelMapping, MultiplexerSessionInformation, SITE_SYSTEM_PINS, SessionInformation,
};
use filter::{describe_criteria, describe_names, describe_sites, expand_groups, no_match_message};

/// The immutable result set of a reservation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservedResources {
    session_info: Vec<SessionInformation>,
    multiplexer_session_info: Vec<MultiplexerSessionInformation>,
    group_mappings: HashMap<String, Vec<String>>,
    reserved_pin_or_relay_names: Option<Vec<String>>,
    reserved_sites: Option<Vec<i32>>,
}

/// A channel mapping selected by [`ReservedResources::resolve`], with its owning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMapping<'a> {
    /// The session owning the channel.
    pub session_info: &'a SessionInformation,

    /// The selected mapping.
    pub channel_mapping: &'a ChannelMapping,
}

impl ReservedResources {
    /// Create a snapshot from reserved sessions, in service order.
    #[must_use]
    pub fn new(session_info: Vec<SessionInformation>) -> Self {
        Self {
            session_info,
            ..Self::default()
        }
    }

    /// Add the reserved multiplexer sessions.
    #[must_use]
    pub fn with_multiplexer_sessions(
        mut self,
        multiplexer_session_info: Vec<MultiplexerSessionInformation>,
    ) -> Self {
        self.multiplexer_session_info = multiplexer_session_info;
        self
    }

    /// Add a pin or relay group and its flattened members.
    #[must_use]
    pub fn with_group_mapping<I, S>(mut self, group: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_mappings
            .insert(group.into(), members.into_iter().map(Into::into).collect());
        self
    }

    /// Record the pin or relay names the reservation was made with.
    #[must_use]
    pub fn with_reserved_pin_or_relay_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_pin_or_relay_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Record the sites the reservation was made with.
    #[must_use]
    pub fn with_reserved_sites(mut self, sites: impl IntoIterator<Item = i32>) -> Self {
        self.reserved_sites = Some(sites.into_iter().collect());
        self
    }

    /// Reserved sessions, in service order.
    #[must_use]
    pub fn session_info(&self) -> &[SessionInformation] {
        &self.session_info
    }

    /// Reserved multiplexer sessions, in service order.
    #[must_use]
    pub fn multiplexer_session_info(&self) -> &[MultiplexerSessionInformation] {
        &self.multiplexer_session_info
    }

    /// Pin or relay groups and their members.
    #[must_use]
    pub const fn group_mappings(&self) -> &HashMap<String, Vec<String>> {
        &self.group_mappings
    }

    /// The pin or relay names the reservation was made with.
    #[must_use]
    pub fn reserved_pin_or_relay_names(&self) -> Option<&[String]> {
        self.reserved_pin_or_relay_names.as_deref()
    }

    /// The sites the reservation was made with.
    #[must_use]
    pub fn reserved_sites(&self) -> Option<&[i32]> {
        self.reserved_sites.as_deref()
    }

    /// Check that session names are unique in each collection.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for info in &self.session_info {
            if !names.insert(info.session_name.as_str()) {
                return Err(SessionError::protocol(format!(
                    "session name '{}' appears more than once",
                    info.session_name
                )));
            }
        }
        names.clear();
        for info in &self.multiplexer_session_info {
            if !names.insert(info.session_name.as_str()) {
                return Err(SessionError::protocol(format!(
                    "multiplexer session name '{}' appears more than once",
                    info.session_name
                )));
            }
        }
        Ok(())
    }

    /// Build a snapshot from a reserve response.
    pub(crate) fn from_response(
        response: wire::ReserveSessionsResponse,
        reserved_pin_or_relay_names: Option<Vec<String>>,
        reserved_sites: Option<Vec<i32>>,
    ) -> Result<Self> {
        let session_info = response
            .sessions
            .into_iter()
            .map(SessionInformation::try_from)
            .collect::<Result<Vec<_>>>()?;
        let resources = Self {
            session_info,
            multiplexer_session_info: response
                .multiplexer_sessions
                .into_iter()
                .map(Into::into)
                .collect(),
            group_mappings: response
                .group_mappings
                .into_iter()
                .map(|(group, members)| (group, members.pin_or_relay_names))
                .collect(),
            reserved_pin_or_relay_names,
            reserved_sites,
        };
        resources.validate()?;
        Ok(resources)
    }

    /// Select and order the channel mappings matching `filter`.
    ///
    /// With no criteria every mapping is returned and an empty reservation
    /// yields an empty list. Any filter value that matches nothing is an
    /// error naming that value.
    pub fn resolve(&self, filter: &ConnectionFilter) -> Result<Vec<ResolvedMapping<'_>>> {
        filter.validate()?;

        let requested_names = filter
            .pin_or_relay_names
            .as_ref()
            .map(|names| expand_groups(names.as_slice(), &self.group_mappings));
        let requested_names = requested_names.as_deref();
        let requested_sites = filter.sites.as_ref().map(|sites| sites.as_slice());
        let instrument_type_id = filter.instrument_type_id.as_deref();

        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for session_info in &self.session_info {
            if instrument_type_id.is_some_and(|id| session_info.instrument_type_id != id) {
                continue;
            }
            for channel_mapping in &session_info.channel_mappings {
                if requested_names.is_some_and(|names| {
                    !names.contains(&channel_mapping.pin_or_relay_name)
                }) {
                    continue;
                }
                if requested_sites.is_some_and(|sites| {
                    !channel_mapping.is_system_pin() && !sites.contains(&channel_mapping.site)
                }) {
                    continue;
                }
                let key = (
                    channel_mapping.pin_or_relay_name.as_str(),
                    channel_mapping.site,
                    session_info.instrument_type_id.as_str(),
                );
                if seen.insert(key) {
                    resolved.push(ResolvedMapping {
                        session_info,
                        channel_mapping,
                    });
                }
            }
        }

        check_matching_criteria(&resolved, requested_names, requested_sites, instrument_type_id)?;
        self.order(&mut resolved, filter.is_ordered(), requested_names, requested_sites);

        tracing::debug!(
            connections = resolved.len(),
            filtered = !filter.is_unfiltered(),
            "Resolved reserved connections"
        );
        Ok(resolved)
    }

    /// The multiplexer session a mapping is routed through.
    ///
    /// Returns `None` for an unmultiplexed mapping, and an error if the
    /// multiplexer resource is not part of the reservation.
    pub fn multiplexer_for(
        &self,
        channel_mapping: &ChannelMapping,
    ) -> Result<Option<&MultiplexerSessionInformation>> {
        if !channel_mapping.is_multiplexed() {
            return Ok(None);
        }
        self.multiplexer_session_info
            .iter()
            .find(|info| info.resource_name == channel_mapping.multiplexer_resource_name)
            .map(Some)
            .ok_or_else(|| {
                SessionError::not_found(format!(
                    "no reserved multiplexer session matched multiplexer resource name '{}' for pin or relay '{}' at site {}",
                    channel_mapping.multiplexer_resource_name,
                    channel_mapping.pin_or_relay_name,
                    channel_mapping.site
                ))
            })
    }

    fn order(
        &self,
        resolved: &mut [ResolvedMapping<'_>],
        ordered: bool,
        requested_names: Option<&[String]>,
        requested_sites: Option<&[i32]>,
    ) {
        let reserved_names = self
            .reserved_pin_or_relay_names
            .as_deref()
            .map(|names| expand_groups(names, &self.group_mappings));
        let reserved_names = reserved_names.as_deref();
        let reserved_sites = self.reserved_sites.as_deref();

        if !ordered && reserved_names.is_none() && reserved_sites.is_none() {
            // stable: keeps service order within each partition
            resolved.sort_by_key(|r| !r.channel_mapping.is_system_pin());
            return;
        }

        let name_order = NameOrder::new(requested_names.or(reserved_names), resolved);
        let site_order = SiteOrder::new(requested_sites.or(reserved_sites));

        if ordered {
            resolved.sort_by_key(|r| {
                (
                    name_order.rank(&r.channel_mapping.pin_or_relay_name),
                    site_order.rank(r.channel_mapping.site),
                )
            });
        } else {
            resolved.sort_by_key(|r| {
                (
                    site_order.rank(r.channel_mapping.site),
                    name_order.rank(&r.channel_mapping.pin_or_relay_name),
                )
            });
        }
    }
}

/// Position of a pin or relay name in an explicit order, or in order of first
/// appearance with system pins first.
struct NameOrder<'a> {
    order: Vec<&'a str>,
}

impl<'a> NameOrder<'a> {
    fn new(explicit: Option<&'a [String]>, resolved: &[ResolvedMapping<'a>]) -> Self {
        let order = match explicit {
            Some(names) => names.iter().map(String::as_str).collect(),
            None => {
                let (system, scoped): (Vec<_>, Vec<_>) = resolved
                    .iter()
                    .map(|r| r.channel_mapping)
                    .partition(|mapping| mapping.is_system_pin());
                let mut order: Vec<&'a str> = Vec::new();
                for mapping in system.into_iter().chain(scoped) {
                    let name = mapping.pin_or_relay_name.as_str();
                    if !order.contains(&name) {
                        order.push(name);
                    }
                }
                order
            }
        };
        Self { order }
    }

    fn rank(&self, name: &str) -> usize {
        self.order
            .iter()
            .position(|candidate| *candidate == name)
            .unwrap_or(self.order.len())
    }
}

/// Position of a site in an explicit order. Without one, every site ranks
/// equal so a stable sort keeps service order within each name. System pins
/// rank first unless the order places them explicitly.
struct SiteOrder {
    order: Vec<i32>,
}

impl SiteOrder {
    fn new(explicit: Option<&[i32]>) -> Self {
        Self {
            order: explicit.map(<[i32]>::to_vec).unwrap_or_default(),
        }
    }

    fn rank(&self, site: i32) -> (u8, usize) {
        match self.order.iter().position(|candidate| *candidate == site) {
            Some(position) => (1, position),
            None if site == SITE_SYSTEM_PINS => (0, 0),
            None => (1, self.order.len()),
        }
    }
}

/// Fail if a requested name, site or instrument type matched nothing.
fn check_matching_criteria(
    resolved: &[ResolvedMapping<'_>],
    requested_names: Option<&[String]>,
    requested_sites: Option<&[i32]>,
    instrument_type_id: Option<&str>,
) -> Result<()> {
    if let Some(names) = requested_names {
        let mut missing: Vec<&str> = Vec::new();
        for name in names {
            let matched = resolved
                .iter()
                .any(|r| r.channel_mapping.pin_or_relay_name == *name);
            if !matched && !missing.contains(&name.as_str()) {
                missing.push(name);
            }
        }
        if !missing.is_empty() {
            return Err(SessionError::not_found(no_match_message(
                "pin or relay name(s)",
                &describe_names(missing),
                &describe_criteria(None, requested_sites, instrument_type_id),
            )));
        }
    }

    if let Some(sites) = requested_sites {
        let has_system_pins = resolved.iter().any(|r| r.channel_mapping.is_system_pin());
        let mut missing: Vec<i32> = Vec::new();
        for site in sites {
            let matched =
                has_system_pins || resolved.iter().any(|r| r.channel_mapping.site == *site);
            if !matched && !missing.contains(site) {
                missing.push(*site);
            }
        }
        if !missing.is_empty() {
            return Err(SessionError::not_found(no_match_message(
                "site(s)",
                &describe_sites(&missing),
                &describe_criteria(requested_names, None, instrument_type_id),
            )));
        }
    }

    if let Some(instrument_type_id) = instrument_type_id {
        if resolved.is_empty() {
            return Err(SessionError::not_found(no_match_message(
                "instrument type ID",
                &format!("'{instrument_type_id}'"),
                &describe_criteria(requested_names, requested_sites, None),
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{INSTRUMENT_TYPE_NI_DCPOWER, INSTRUMENT_TYPE_NI_DMM};

    fn names(resolved: &[ResolvedMapping<'_>]) -> Vec<(String, i32)> {
        resolved
            .iter()
            .map(|r| {
                (
                    r.channel_mapping.pin_or_relay_name.clone(),
                    r.channel_mapping.site,
                )
            })
            .collect()
    }

    fn pairs(expected: &[(&str, i32)]) -> Vec<(String, i32)> {
        expected
            .iter()
            .map(|(name, site)| ((*name).to_string(), *site))
            .collect()
    }

    fn daq_resources() -> ReservedResources {
        ReservedResources::new(vec![
            SessionInformation::new("Dev1", "Dev1", "niDAQmx")
                .with_mapping(ChannelMapping::new("Pin1", 0, "Dev1/ai0"))
                .with_mapping(ChannelMapping::new("Pin2", 0, "Dev1/ai1")),
            SessionInformation::new("Dev2", "Dev2", "niDAQmx")
                .with_mapping(ChannelMapping::new("Pin1", 1, "Dev2/ai2")),
        ])
    }

    #[test]
    fn unfiltered_keeps_service_order() {
        let resources = daq_resources();
        let resolved = resources.resolve(&ConnectionFilter::new()).unwrap();
        assert_eq!(
            names(&resolved),
            pairs(&[("Pin1", 0), ("Pin2", 0), ("Pin1", 1)])
        );
    }

    #[test]
    fn unfiltered_empty_reservation_is_empty() {
        let resources = ReservedResources::default();
        assert!(resources.resolve(&ConnectionFilter::new()).unwrap().is_empty());
    }

    #[test]
    fn name_and_site_filters() {
        let resources = daq_resources();

        let resolved = resources
            .resolve(&ConnectionFilter::new().pin_or_relay_names("Pin1"))
            .unwrap();
        assert_eq!(names(&resolved), pairs(&[("Pin1", 0), ("Pin1", 1)]));

        let resolved = resources.resolve(&ConnectionFilter::new().sites(1)).unwrap();
        assert_eq!(names(&resolved), pairs(&[("Pin1", 1)]));
        assert_eq!(resolved[0].channel_mapping.channel, "Dev2/ai2");
    }

    #[test]
    fn system_pins_pass_site_filter_and_sort_first() {
        let resources = ReservedResources::new(vec![
            SessionInformation::new("DCPower1", "PXI1Slot2", INSTRUMENT_TYPE_NI_DCPOWER)
                .with_mapping(ChannelMapping::new("Pin1", 0, "0"))
                .with_mapping(ChannelMapping::new("VCC", SITE_SYSTEM_PINS, "2")),
        ]);

        let resolved = resources.resolve(&ConnectionFilter::new()).unwrap();
        assert_eq!(names(&resolved), pairs(&[("VCC", -1), ("Pin1", 0)]));

        let resolved = resources.resolve(&ConnectionFilter::new().sites(0)).unwrap();
        assert_eq!(names(&resolved), pairs(&[("VCC", -1), ("Pin1", 0)]));
    }

    #[test]
    fn explicit_filter_order_is_authoritative() {
        let resources = daq_resources().with_reserved_pin_or_relay_names(["Pin1", "Pin2"]);

        let resolved = resources
            .resolve(&ConnectionFilter::new().pin_or_relay_names(["Pin2", "Pin1"]))
            .unwrap();
        assert_eq!(
            names(&resolved),
            pairs(&[("Pin2", 0), ("Pin1", 0), ("Pin1", 1)])
        );

        let resolved = resources
            .resolve(&ConnectionFilter::new().sites([1, 0]))
            .unwrap();
        assert_eq!(
            names(&resolved),
            pairs(&[("Pin1", 1), ("Pin1", 0), ("Pin2", 0)])
        );
    }

    #[test]
    fn reservation_order_is_site_major() {
        let resources = daq_resources()
            .with_reserved_pin_or_relay_names(["Pin2", "Pin1"])
            .with_reserved_sites([1, 0]);

        let resolved = resources.resolve(&ConnectionFilter::new()).unwrap();
        assert_eq!(
            names(&resolved),
            pairs(&[("Pin1", 1), ("Pin2", 0), ("Pin1", 0)])
        );
    }

    #[test]
    fn groups_expand_and_duplicates_collapse() {
        let resources = daq_resources().with_group_mapping("PinGroup1", ["Pin1", "Pin2"]);

        let resolved = resources
            .resolve(&ConnectionFilter::new().pin_or_relay_names("PinGroup1"))
            .unwrap();
        assert_eq!(
            names(&resolved),
            pairs(&[("Pin1", 0), ("Pin1", 1), ("Pin2", 0)])
        );

        let resolved = resources
            .resolve(
                &ConnectionFilter::new()
                    .pin_or_relay_names(["Pin1", "Pin1"])
                    .sites(0),
            )
            .unwrap();
        assert_eq!(names(&resolved), pairs(&[("Pin1", 0)]));
    }

    #[test]
    fn missing_names_are_reported_with_other_criteria() {
        let resources = daq_resources();
        let err = resources
            .resolve(
                &ConnectionFilter::new()
                    .pin_or_relay_names(["Pin2", "Pin9"])
                    .sites(1),
            )
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "no reserved connections matched pin or relay name(s) 'Pin2', 'Pin9' with the specified criteria: site(s) 1"
        );
    }

    #[test]
    fn missing_sites_and_types_are_reported() {
        let resources = daq_resources();

        let err = resources
            .resolve(&ConnectionFilter::new().sites([0, 3]))
            .unwrap_err();
        assert_eq!(err.to_string(), "no reserved connections matched site(s) 3");

        let err = resources
            .resolve(&ConnectionFilter::new().instrument_type_id(INSTRUMENT_TYPE_NI_DMM))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "no reserved connections matched instrument type ID 'niDMM'"
        );
    }

    #[test]
    fn multiplexer_lookup() {
        let resources = ReservedResources::new(Vec::new()).with_multiplexer_sessions(vec![
            MultiplexerSessionInformation::new("Mux1", "SCX1Mod1", "NI-SWITCH"),
        ]);

        let plain = ChannelMapping::new("Pin1", 0, "0");
        assert!(resources.multiplexer_for(&plain).unwrap().is_none());

        let routed = ChannelMapping::new("Pin1", 0, "0").via_multiplexer("SCX1Mod1", "R0");
        assert_eq!(
            resources.multiplexer_for(&routed).unwrap().unwrap().session_name,
            "Mux1"
        );

        let unknown = ChannelMapping::new("Pin1", 0, "0").via_multiplexer("SCX1Mod9", "R0");
        let err = resources.multiplexer_for(&unknown).unwrap_err();
        assert!(err.to_string().contains("SCX1Mod9"));
    }

    #[test]
    fn validate_rejects_duplicate_session_names() {
        let resources = ReservedResources::new(vec![
            SessionInformation::new("DMM1", "PXI1Slot3", INSTRUMENT_TYPE_NI_DMM),
            SessionInformation::new("DMM1", "PXI1Slot4", INSTRUMENT_TYPE_NI_DMM),
        ]);
        assert!(matches!(
            resources.validate(),
            Err(SessionError::Protocol { .. })
        ));
    }
}
