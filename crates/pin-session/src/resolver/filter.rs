//! Connection filter criteria.

use std::collections::HashMap;

use crate::error::{Result, SessionError};
use crate::types::{OneOrMany, SITE_SYSTEM_PINS};

/// Criteria for selecting reserved connections.
///
/// An absent criterion matches everything. Passing pin or relay names or
/// sites also makes their order the order of the results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionFilter {
    /// Pin, relay or group names.
    pub pin_or_relay_names: Option<OneOrMany<String>>,

    /// Site numbers.
    pub sites: Option<OneOrMany<i32>>,

    /// Instrument type ID.
    pub instrument_type_id: Option<String>,
}

impl ConnectionFilter {
    /// Create a filter that matches every reserved connection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Match these pin, relay or group names.
    #[must_use]
    pub fn pin_or_relay_names(mut self, names: impl Into<OneOrMany<String>>) -> Self {
        self.pin_or_relay_names = Some(names.into());
        self
    }

    /// Match these sites.
    #[must_use]
    pub fn sites(mut self, sites: impl Into<OneOrMany<i32>>) -> Self {
        self.sites = Some(sites.into());
        self
    }

    /// Match this instrument type ID.
    #[must_use]
    pub fn instrument_type_id(mut self, instrument_type_id: impl Into<String>) -> Self {
        self.instrument_type_id = Some(instrument_type_id.into());
        self
    }

    /// Check if no criterion is set.
    #[must_use]
    pub const fn is_unfiltered(&self) -> bool {
        self.pin_or_relay_names.is_none() && self.sites.is_none() && self.instrument_type_id.is_none()
    }

    /// Check if the filter dictates result order.
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.pin_or_relay_names.is_some() || self.sites.is_some()
    }

    /// Reject values that can never match.
    pub fn validate(&self) -> Result<()> {
        if let Some(names) = &self.pin_or_relay_names {
            if names.as_slice().iter().any(String::is_empty) {
                return Err(SessionError::invalid_argument(
                    "pin_or_relay_names",
                    format!("{:?}", names.as_slice()),
                    "pin or relay names must not be empty",
                ));
            }
        }
        if let Some(site) = self
            .sites
            .as_ref()
            .and_then(|sites| sites.as_slice().iter().find(|site| **site < SITE_SYSTEM_PINS))
        {
            return Err(SessionError::invalid_argument(
                "sites",
                site.to_string(),
                "sites must be non-negative or -1 for system pins",
            ));
        }
        if self.instrument_type_id.as_deref() == Some("") {
            return Err(SessionError::invalid_argument(
                "instrument_type_id",
                "''",
                "instrument type ID must not be empty",
            ));
        }
        Ok(())
    }
}

/// Replace group names with their members. Groups are already flattened, so
/// one lookup per name suffices.
pub(crate) fn expand_groups(names: &[String], groups: &HashMap<String, Vec<String>>) -> Vec<String> {
    let mut expanded = Vec::with_capacity(names.len());
    for name in names {
        match groups.get(name) {
            Some(members) => expanded.extend(members.iter().cloned()),
            None => expanded.push(name.clone()),
        }
    }
    expanded
}

pub(crate) fn describe_names<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn describe_sites<'a>(sites: impl IntoIterator<Item = &'a i32>) -> String {
    sites
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Describe the criteria that were in effect, for error messages.
pub(crate) fn describe_criteria(
    names: Option<&[String]>,
    sites: Option<&[i32]>,
    instrument_type_id: Option<&str>,
) -> String {
    let mut criteria = Vec::new();
    if let Some(names) = names {
        criteria.push(format!(
            "pin or relay name(s) {}",
            describe_names(names.iter().map(String::as_str))
        ));
    }
    if let Some(sites) = sites {
        criteria.push(format!("site(s) {}", describe_sites(sites)));
    }
    if let Some(instrument_type_id) = instrument_type_id {
        criteria.push(format!("instrument type ID '{instrument_type_id}'"));
    }
    criteria.join(", ")
}

/// Build the "no reserved connections matched" message.
pub(crate) fn no_match_message(what: &str, values: &str, criteria: &str) -> String {
    if criteria.is_empty() {
        format!("no reserved connections matched {what} {values}")
    } else {
        format!("no reserved connections matched {what} {values} with the specified criteria: {criteria}")
    }
}
