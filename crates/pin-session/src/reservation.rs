//! Reservations.
//!
//! A [`Reservation`] owns the result set of one reserve call together with the
//! live sessions created against it. Sessions are created through
//! [`initialize_session`](Reservation::initialize_session) and friends, which
//! return guards; connections are resolved through
//! [`get_connection`](Reservation::get_connection) and friends.
//!
//! # Example
//!
//! ```ignore
//! let reservation = client.reserve_sessions(&context, Some("Pin1".into()), None, None)?;
//! let _dmm = reservation.initialize_session(open_dmm, INSTRUMENT_TYPE_NI_DMM, InitializationBehavior::Auto)?;
//! let connection = reservation.get_connection::<Arc<DmmSession>>(&ConnectionFilter::new().sites(0))?;
//! connection.session.measure(connection.channel_name)?;
//! ```

mod cache;
mod guard;

use std::sync::Arc;

pub use guard::{MultiplexerSessionGuard, MultiplexerSessionsGuard, SessionGuard, SessionsGuard};

use crate::client::SessionManagementClient;
use crate::construct::{
    InitializationBehavior, SessionConstructor, SessionHandle, abandon, prepare, teardown,
};
use crate::error::{Result, SessionError};
use crate::resolver::{
    AnySession, Connection, ConnectionFilter, ConnectionWithMultiplexer, ReservedResources,
    ResolvedMapping, SessionBinding,
};
use crate::types::{MultiplexerSessionInformation, SessionInformation, SessionRecord};
use cache::SessionCache;

/// Reserved sessions, their live handles and connection resolution.
///
/// A reservation obtained from a [`SessionManagementClient`] releases the
/// server-side lock when dropped or [`unreserve`](Self::unreserve)d. Guards
/// borrow the reservation, so every session is torn down before that happens.
#[derive(Debug)]
pub struct Reservation {
    resources: ReservedResources,
    sessions: SessionCache,
    multiplexer_sessions: SessionCache,
    client: Option<SessionManagementClient>,
    default_initialization_behavior: InitializationBehavior,
}

impl Reservation {
    /// Create a reservation over resources that are not held by a service.
    ///
    /// Nothing is released when it is dropped.
    pub fn new(resources: ReservedResources) -> Result<Self> {
        resources.validate()?;
        Ok(Self::with_client(resources, None, InitializationBehavior::default()))
    }

    pub(crate) fn with_client(
        resources: ReservedResources,
        client: Option<SessionManagementClient>,
        default_initialization_behavior: InitializationBehavior,
    ) -> Self {
        Self {
            resources,
            sessions: SessionCache::new(),
            multiplexer_sessions: SessionCache::new(),
            client,
            default_initialization_behavior,
        }
    }

    /// Set the behavior callers fall back to when they do not pick one.
    #[must_use]
    pub const fn with_default_initialization_behavior(
        mut self,
        behavior: InitializationBehavior,
    ) -> Self {
        self.default_initialization_behavior = behavior;
        self
    }

    /// The configured default initialization behavior.
    #[must_use]
    pub const fn default_initialization_behavior(&self) -> InitializationBehavior {
        self.default_initialization_behavior
    }

    /// The reserved snapshot.
    #[must_use]
    pub const fn resources(&self) -> &ReservedResources {
        &self.resources
    }

    /// Reserved sessions, in service order.
    #[must_use]
    pub fn session_info(&self) -> &[SessionInformation] {
        self.resources.session_info()
    }

    /// Reserved multiplexer sessions, in service order.
    #[must_use]
    pub fn multiplexer_session_info(&self) -> &[MultiplexerSessionInformation] {
        self.resources.multiplexer_session_info()
    }

    /// The live handle of a reserved session, if initialized.
    #[must_use]
    pub fn session(&self, session_info: &SessionInformation) -> AnySession {
        self.sessions.get(&session_info.session_name)
    }

    /// The live handle of a reserved multiplexer session, if initialized.
    #[must_use]
    pub fn multiplexer_session(&self, session_info: &MultiplexerSessionInformation) -> AnySession {
        self.multiplexer_sessions.get(&session_info.session_name)
    }

    /// Check if the named session is initialized.
    #[must_use]
    pub fn is_initialized(&self, session_name: &str) -> bool {
        self.sessions.contains(session_name)
    }

    /// Check if the named multiplexer session is initialized.
    #[must_use]
    pub fn is_multiplexer_initialized(&self, session_name: &str) -> bool {
        self.multiplexer_sessions.contains(session_name)
    }

    /// Initialize the single reserved session of an instrument type.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Configuration`] if `instrument_type_id` is empty
    /// - [`SessionError::NotFound`] if no session has that type
    /// - [`SessionError::AmbiguousMatch`] if several do
    /// - [`SessionError::AlreadyInitialized`] if it is already initialized
    /// - [`SessionError::Construction`] or [`SessionError::UnsupportedSessionType`]
    ///   if the constructor fails or returns an unusable handle
    pub fn initialize_session<C>(
        &self,
        mut constructor: C,
        instrument_type_id: &str,
        initialization_behavior: InitializationBehavior,
    ) -> Result<SessionGuard<'_, C::Session>>
    where
        C: SessionConstructor<SessionInformation>,
    {
        let matching = self.sessions_of_type(instrument_type_id)?;
        if matching.len() > 1 {
            return Err(SessionError::ambiguous(
                format!(
                    "too many reserved sessions matched instrument type ID '{instrument_type_id}'. Expected single session, got {} sessions. Use initialize_sessions to initialize all of them",
                    matching.len()
                ),
                matching.len(),
            ));
        }
        initialize(
            &self.sessions,
            matching[0],
            &mut constructor,
            initialization_behavior,
        )
    }

    /// Initialize every reserved session of an instrument type.
    ///
    /// If one fails, the ones already initialized are torn down before the
    /// error is returned.
    pub fn initialize_sessions<C>(
        &self,
        mut constructor: C,
        instrument_type_id: &str,
        initialization_behavior: InitializationBehavior,
    ) -> Result<SessionsGuard<'_, C::Session>>
    where
        C: SessionConstructor<SessionInformation>,
    {
        let matching = self.sessions_of_type(instrument_type_id)?;
        let mut guards = Vec::with_capacity(matching.len());
        for info in matching {
            guards.push(initialize(
                &self.sessions,
                info,
                &mut constructor,
                initialization_behavior,
            )?);
        }
        Ok(SessionsGuard::new(guards))
    }

    /// Initialize the single reserved multiplexer session, optionally of one type.
    pub fn initialize_multiplexer_session<C>(
        &self,
        mut constructor: C,
        multiplexer_type_id: Option<&str>,
        initialization_behavior: InitializationBehavior,
    ) -> Result<MultiplexerSessionGuard<'_, C::Session>>
    where
        C: SessionConstructor<MultiplexerSessionInformation>,
    {
        let matching = self.multiplexer_sessions_of_type(multiplexer_type_id)?;
        if matching.len() > 1 {
            let message = match multiplexer_type_id {
                Some(id) => format!(
                    "too many multiplexer sessions matched multiplexer type ID '{id}'. Expected single multiplexer session, got {} sessions",
                    matching.len()
                ),
                None => format!(
                    "too many multiplexer sessions matched the specified criteria. Expected single multiplexer session, got {} sessions",
                    matching.len()
                ),
            };
            return Err(SessionError::ambiguous(message, matching.len()));
        }
        initialize(
            &self.multiplexer_sessions,
            matching[0],
            &mut constructor,
            initialization_behavior,
        )
    }

    /// Initialize every reserved multiplexer session, optionally of one type.
    pub fn initialize_multiplexer_sessions<C>(
        &self,
        mut constructor: C,
        multiplexer_type_id: Option<&str>,
        initialization_behavior: InitializationBehavior,
    ) -> Result<MultiplexerSessionsGuard<'_, C::Session>>
    where
        C: SessionConstructor<MultiplexerSessionInformation>,
    {
        let matching = self.multiplexer_sessions_of_type(multiplexer_type_id)?;
        let mut guards = Vec::with_capacity(matching.len());
        for info in matching {
            guards.push(initialize(
                &self.multiplexer_sessions,
                info,
                &mut constructor,
                initialization_behavior,
            )?);
        }
        Ok(SessionsGuard::new(guards))
    }

    /// Resolve exactly one connection.
    ///
    /// `S` is [`AnySession`] to accept any (or no) session, or `Arc<T>` to
    /// require an initialized session of type `T`.
    pub fn get_connection<S: SessionBinding>(
        &self,
        filter: &ConnectionFilter,
    ) -> Result<Connection<'_, S>> {
        let resolved = single(self.resources.resolve(filter)?)?;
        self.bind(resolved)
    }

    /// Resolve every matching connection.
    pub fn get_connections<S: SessionBinding>(
        &self,
        filter: &ConnectionFilter,
    ) -> Result<Vec<Connection<'_, S>>> {
        self.resources
            .resolve(filter)?
            .into_iter()
            .map(|resolved| self.bind(resolved))
            .collect()
    }

    /// Resolve exactly one connection, including its multiplexer.
    pub fn get_connection_with_multiplexer<S, M>(
        &self,
        filter: &ConnectionFilter,
    ) -> Result<ConnectionWithMultiplexer<'_, S, M>>
    where
        S: SessionBinding,
        M: SessionBinding,
    {
        let resolved = single(self.resources.resolve(filter)?)?;
        self.bind_with_multiplexer(resolved)
    }

    /// Resolve every matching connection, including multiplexers.
    pub fn get_connections_with_multiplexer<S, M>(
        &self,
        filter: &ConnectionFilter,
    ) -> Result<Vec<ConnectionWithMultiplexer<'_, S, M>>>
    where
        S: SessionBinding,
        M: SessionBinding,
    {
        self.resources
            .resolve(filter)?
            .into_iter()
            .map(|resolved| self.bind_with_multiplexer(resolved))
            .collect()
    }

    /// Release the reservation on the service.
    pub fn unreserve(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        match self.client.take() {
            Some(client) => client.unreserve_sessions(self.resources.session_info()),
            None => Ok(()),
        }
    }

    fn sessions_of_type(&self, instrument_type_id: &str) -> Result<Vec<&SessionInformation>> {
        if instrument_type_id.is_empty() {
            return Err(SessionError::configuration(
                "this operation requires an instrument type ID",
            ));
        }
        let matching: Vec<_> = self
            .session_info()
            .iter()
            .filter(|info| info.instrument_type_id == instrument_type_id)
            .collect();
        if matching.is_empty() {
            return Err(SessionError::not_found(format!(
                "no reserved sessions matched instrument type ID '{instrument_type_id}'"
            )));
        }
        Ok(matching)
    }

    fn multiplexer_sessions_of_type(
        &self,
        multiplexer_type_id: Option<&str>,
    ) -> Result<Vec<&MultiplexerSessionInformation>> {
        if multiplexer_type_id == Some("") {
            return Err(SessionError::invalid_argument(
                "multiplexer_type_id",
                "''",
                "multiplexer type ID must not be empty",
            ));
        }
        let matching: Vec<_> = self
            .multiplexer_session_info()
            .iter()
            .filter(|info| multiplexer_type_id.is_none_or(|id| info.multiplexer_type_id == id))
            .collect();
        if matching.is_empty() {
            let message = match multiplexer_type_id {
                Some(id) => {
                    format!("no reserved multiplexer sessions matched multiplexer type ID '{id}'")
                }
                None => "no multiplexer sessions are reserved".to_string(),
            };
            return Err(SessionError::not_found(message));
        }
        Ok(matching)
    }

    fn bind<'a, S: SessionBinding>(&'a self, resolved: ResolvedMapping<'a>) -> Result<Connection<'a, S>> {
        let ResolvedMapping {
            session_info,
            channel_mapping,
        } = resolved;
        let session = S::bind(
            &session_info.session_name,
            self.sessions.get(&session_info.session_name),
        )?;
        Ok(Connection {
            pin_or_relay_name: &channel_mapping.pin_or_relay_name,
            site: channel_mapping.site,
            channel_name: &channel_mapping.channel,
            session_info,
            session,
        })
    }

    fn bind_with_multiplexer<'a, S, M>(
        &'a self,
        resolved: ResolvedMapping<'a>,
    ) -> Result<ConnectionWithMultiplexer<'a, S, M>>
    where
        S: SessionBinding,
        M: SessionBinding,
    {
        let channel_mapping = resolved.channel_mapping;
        let multiplexer_session_info = self.resources.multiplexer_for(channel_mapping)?;
        let multiplexer_session = multiplexer_session_info
            .map(|info| {
                M::bind(
                    &info.session_name,
                    self.multiplexer_sessions.get(&info.session_name),
                )
            })
            .transpose()?;
        let connection = self.bind::<S>(resolved)?;

        Ok(ConnectionWithMultiplexer {
            pin_or_relay_name: connection.pin_or_relay_name,
            site: connection.site,
            channel_name: connection.channel_name,
            session_info: connection.session_info,
            session: connection.session,
            multiplexer_resource_name: &channel_mapping.multiplexer_resource_name,
            multiplexer_route: &channel_mapping.multiplexer_route,
            multiplexer_session_info,
            multiplexer_session,
        })
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(
                sessions = self.resources.session_info().len(),
                error = %err,
                "Failed to unreserve sessions"
            );
        }
    }
}

/// Construct, prepare and cache one session.
fn initialize<'r, I, C>(
    cache: &'r SessionCache,
    info: &'r I,
    constructor: &mut C,
    initialization_behavior: InitializationBehavior,
) -> Result<SessionGuard<'r, C::Session, I>>
where
    I: SessionRecord,
    C: SessionConstructor<I>,
{
    let session_name = info.session_name();
    if cache.contains(session_name) {
        return Err(SessionError::already_initialized(session_name));
    }

    let (open, close) = initialization_behavior.resolve(info.session_exists());
    tracing::debug!(
        session = %session_name,
        behavior = %initialization_behavior,
        ?open,
        "Initializing session"
    );

    let session = constructor
        .construct(info, initialization_behavior)
        .map_err(|e| SessionError::construction(session_name, e))?;
    let session = Arc::new(session);
    if let Err(err) = prepare(session_name, session.as_ref()) {
        abandon(session_name, session.as_ref(), close);
        return Err(err);
    }

    let handle: Arc<dyn SessionHandle> = session.clone();
    if let Err(err) = cache.insert(session_name, Arc::clone(&handle), close) {
        // lost a race with another initializer of the same name
        if let Err(teardown_err) = teardown(session_name, handle.as_ref(), close) {
            tracing::warn!(session = %session_name, error = %teardown_err, "Failed to tear down session");
        }
        return Err(err);
    }

    Ok(SessionGuard::new(cache, info, session))
}

fn single(mut resolved: Vec<ResolvedMapping<'_>>) -> Result<ResolvedMapping<'_>> {
    match resolved.len() {
        0 => Err(SessionError::not_found(
            "no reserved connections matched the specified criteria",
        )),
        1 => Ok(resolved.remove(0)),
        count => Err(SessionError::ambiguous(
            "too many reserved connections matched the specified criteria",
            count,
        )),
    }
}
