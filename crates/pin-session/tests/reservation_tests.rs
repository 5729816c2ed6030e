//! Integration tests for session initialization and teardown.
//!
//! These tests require the `test-utils` feature to be enabled.

#![cfg(feature = "test-utils")]

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use pin_session::construct::{Closable, ScopedResource, SessionHandle, SessionOpen};
use pin_session::test_utils::{
    BareSession, FakeSession, ReservationFixture, ScopedFakeSession, dcpower_dmm_fixture,
    failing_constructor, fake_constructor,
};
use pin_session::types::{INSTRUMENT_TYPE_NI_DCPOWER, INSTRUMENT_TYPE_NI_DMM, INSTRUMENT_TYPE_NI_SCOPE};
use pin_session::{
    ChannelMapping, DriverError, InitializationBehavior, Reservation, SessionClose, SessionError,
    SessionInformation,
};

fn existing_session_fixture() -> ReservationFixture {
    ReservationFixture::new()
        .session(
            SessionInformation::new("DCPower1", "PXI1Slot2", INSTRUMENT_TYPE_NI_DCPOWER)
                .with_mapping(ChannelMapping::new("Pin1", 0, "0")),
        )
        .session(
            SessionInformation::new("DMM1", "PXI1Slot3", INSTRUMENT_TYPE_NI_DMM)
                .with_mapping(ChannelMapping::new("Pin2", 0, "0"))
                .session_exists(true),
        )
}

/// A session whose teardown can be observed after its guard is gone.
#[derive(Debug)]
struct Tracked {
    closed: Arc<AtomicBool>,
}

impl Closable for Tracked {
    fn close(&self) -> Result<(), DriverError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl SessionHandle for Tracked {
    fn as_closable(&self) -> Option<&dyn Closable> {
        Some(self)
    }
}

#[test]
fn initialize_twice_fails_until_released() {
    let reservation = dcpower_dmm_fixture().reservation().unwrap();
    let guard = reservation
        .initialize_session(
            fake_constructor(),
            INSTRUMENT_TYPE_NI_DCPOWER,
            InitializationBehavior::Auto,
        )
        .unwrap();

    let err = reservation
        .initialize_session(
            fake_constructor(),
            INSTRUMENT_TYPE_NI_DCPOWER,
            InitializationBehavior::Auto,
        )
        .unwrap_err();
    assert!(err.is_already_initialized());
    assert_eq!(err.session_name(), Some("DCPower1"));

    guard.release().unwrap();
    let guard = reservation
        .initialize_session(
            fake_constructor(),
            INSTRUMENT_TYPE_NI_DCPOWER,
            InitializationBehavior::Auto,
        )
        .unwrap();
    assert!(reservation.is_initialized("DCPower1"));
    drop(guard);
}

#[test]
fn initialize_requires_exactly_one_match() {
    let reservation = dcpower_dmm_fixture().reservation().unwrap();

    let err = reservation
        .initialize_session(
            fake_constructor(),
            INSTRUMENT_TYPE_NI_SCOPE,
            InitializationBehavior::Auto,
        )
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("niScope"));

    let err = reservation
        .initialize_session(
            fake_constructor(),
            INSTRUMENT_TYPE_NI_DMM,
            InitializationBehavior::Auto,
        )
        .unwrap_err();
    assert!(matches!(err, SessionError::AmbiguousMatch { count: 2, .. }));
    assert!(err.to_string().contains("initialize_sessions"));
}

#[test]
fn cached_only_during_scope() {
    let reservation = dcpower_dmm_fixture().reservation().unwrap();
    let info = reservation.session_info()[0].clone();
    assert!(reservation.session(&info).is_none());

    {
        let guard = reservation
            .initialize_session(
                fake_constructor(),
                INSTRUMENT_TYPE_NI_DCPOWER,
                InitializationBehavior::Auto,
            )
            .unwrap();
        assert_eq!(guard.session_info(), &info);
        assert!(reservation.is_initialized("DCPower1"));
        assert!(reservation.session(&info).is_some());
    }

    assert!(!reservation.is_initialized("DCPower1"));
    assert!(reservation.session(&info).is_none());
}

#[test]
fn auto_mirrors_how_the_session_was_opened() {
    let reservation = existing_session_fixture().reservation().unwrap();

    let created = reservation
        .initialize_session(
            fake_constructor(),
            INSTRUMENT_TYPE_NI_DCPOWER,
            InitializationBehavior::Auto,
        )
        .unwrap();
    let attached = reservation
        .initialize_session(
            fake_constructor(),
            INSTRUMENT_TYPE_NI_DMM,
            InitializationBehavior::Auto,
        )
        .unwrap();
    let created_session = Arc::clone(created.session());
    let attached_session = Arc::clone(attached.session());
    assert_eq!(created_session.open_mode(), SessionOpen::Create);
    assert_eq!(attached_session.open_mode(), SessionOpen::Attach);

    drop(created);
    drop(attached);

    assert!(created_session.is_closed());
    assert!(!created_session.is_detached());
    assert!(attached_session.is_detached());
    assert!(!attached_session.is_closed());
}

#[test]
fn explicit_behaviors_override_exit_action() {
    let cases = [
        (InitializationBehavior::InitializeServerSession, true),
        (InitializationBehavior::AttachToServerSession, false),
        (InitializationBehavior::InitializeSessionThenDetach, false),
        (InitializationBehavior::AttachToSessionThenClose, true),
    ];

    for (behavior, expect_closed) in cases {
        let reservation = existing_session_fixture().reservation().unwrap();
        let guard = reservation
            .initialize_session(fake_constructor(), INSTRUMENT_TYPE_NI_DMM, behavior)
            .unwrap();
        let session = Arc::clone(guard.session());
        assert_eq!(session.behavior(), behavior);

        guard.release().unwrap();
        assert_eq!(session.is_closed(), expect_closed, "{behavior}");
        assert_eq!(session.is_detached(), !expect_closed, "{behavior}");
    }
}

#[test]
fn initialize_sessions_covers_every_match() {
    let reservation = dcpower_dmm_fixture().reservation().unwrap();
    let guard = reservation
        .initialize_sessions(
            fake_constructor(),
            INSTRUMENT_TYPE_NI_DMM,
            InitializationBehavior::Auto,
        )
        .unwrap();

    assert_eq!(guard.len(), 2);
    assert_eq!(
        guard
            .sessions()
            .map(|session| session.name().to_string())
            .collect::<Vec<_>>(),
        vec!["DMM1", "DMM2"]
    );
    assert!(reservation.is_initialized("DMM1"));
    assert!(reservation.is_initialized("DMM2"));

    let sessions: Vec<_> = guard.sessions().cloned().collect();
    drop(guard);
    assert!(!reservation.is_initialized("DMM1"));
    assert!(!reservation.is_initialized("DMM2"));
    assert!(sessions.iter().all(|session| session.is_closed()));
}

#[test]
fn failed_initialize_sessions_tears_down_earlier_sessions() {
    let reservation = dcpower_dmm_fixture().reservation().unwrap();
    let closed = Arc::new(AtomicBool::new(false));
    let constructed = AtomicUsize::new(0);

    let err = reservation
        .initialize_sessions(
            |info: &SessionInformation, _: InitializationBehavior| {
                constructed.fetch_add(1, Ordering::SeqCst);
                if info.session_name == "DMM2" {
                    return Err("instrument not responding");
                }
                Ok(Tracked {
                    closed: Arc::clone(&closed),
                })
            },
            INSTRUMENT_TYPE_NI_DMM,
            InitializationBehavior::Auto,
        )
        .unwrap_err();

    assert!(matches!(err, SessionError::Construction { .. }));
    assert_eq!(err.session_name(), Some("DMM2"));
    assert_eq!(constructed.load(Ordering::SeqCst), 2);
    assert!(!reservation.is_initialized("DMM1"));
    assert!(closed.load(Ordering::SeqCst));
}

/// A scoped session whose `enter` always fails.
#[derive(Debug)]
struct FailsToEnter {
    closed: Arc<AtomicBool>,
    detached: Arc<AtomicBool>,
}

impl Closable for FailsToEnter {
    fn close(&self) -> Result<(), DriverError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn detach(&self) -> Result<(), DriverError> {
        self.detached.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl ScopedResource for FailsToEnter {
    fn enter(&self) -> Result<(), DriverError> {
        Err("enter failed".into())
    }

    fn exit(&self, _: SessionClose) -> Result<(), DriverError> {
        Ok(())
    }
}

impl SessionHandle for FailsToEnter {
    fn as_closable(&self) -> Option<&dyn Closable> {
        Some(self)
    }

    fn as_scoped(&self) -> Option<&dyn ScopedResource> {
        Some(self)
    }
}

#[test]
fn failed_enter_tears_down_the_constructed_session() {
    // Auto closes a session it created and detaches from one it attached to
    for session_exists in [false, true] {
        let reservation = ReservationFixture::new()
            .session(
                SessionInformation::new("DMM1", "PXI1Slot3", INSTRUMENT_TYPE_NI_DMM)
                    .with_mapping(ChannelMapping::new("Pin2", 0, "0"))
                    .session_exists(session_exists),
            )
            .reservation()
            .unwrap();
        let closed = Arc::new(AtomicBool::new(false));
        let detached = Arc::new(AtomicBool::new(false));

        let err = reservation
            .initialize_session(
                |_: &SessionInformation, _: InitializationBehavior| {
                    Ok::<_, Infallible>(FailsToEnter {
                        closed: Arc::clone(&closed),
                        detached: Arc::clone(&detached),
                    })
                },
                INSTRUMENT_TYPE_NI_DMM,
                InitializationBehavior::Auto,
            )
            .unwrap_err();

        assert!(matches!(err, SessionError::Construction { .. }));
        assert_eq!(err.session_name(), Some("DMM1"));
        assert!(err.to_string().contains("enter failed"));
        assert!(!reservation.is_initialized("DMM1"));
        assert_eq!(closed.load(Ordering::SeqCst), !session_exists);
        assert_eq!(detached.load(Ordering::SeqCst), session_exists);
    }
}

#[test]
fn construction_failure_leaves_cache_empty() {
    let reservation = dcpower_dmm_fixture().reservation().unwrap();
    let err = reservation
        .initialize_session(
            failing_constructor("DCPower1"),
            INSTRUMENT_TYPE_NI_DCPOWER,
            InitializationBehavior::Auto,
        )
        .unwrap_err();

    assert!(err.to_string().contains("DCPower1"));
    assert!(err.to_string().contains("PXI1Slot2"));
    assert!(!reservation.is_initialized("DCPower1"));
}

#[test]
fn handle_without_teardown_is_unsupported() {
    let reservation = dcpower_dmm_fixture().reservation().unwrap();
    let err = reservation
        .initialize_session(
            |_: &SessionInformation, _: InitializationBehavior| {
                Ok::<_, Infallible>(BareSession)
            },
            INSTRUMENT_TYPE_NI_DCPOWER,
            InitializationBehavior::Auto,
        )
        .unwrap_err();

    assert!(matches!(err, SessionError::UnsupportedSessionType { .. }));
    assert!(err.to_string().contains("BareSession"));
    assert!(!reservation.is_initialized("DCPower1"));
}

#[test]
fn scoped_resources_are_entered_and_exited() {
    let reservation = existing_session_fixture().reservation().unwrap();
    let constructor = |info: &SessionInformation, _: InitializationBehavior| {
        Ok::<_, Infallible>(ScopedFakeSession::named(&info.session_name))
    };

    let created = reservation
        .initialize_session(constructor, INSTRUMENT_TYPE_NI_DCPOWER, InitializationBehavior::Auto)
        .unwrap();
    let attached = reservation
        .initialize_session(constructor, INSTRUMENT_TYPE_NI_DMM, InitializationBehavior::Auto)
        .unwrap();
    let created_session = Arc::clone(created.session());
    let attached_session = Arc::clone(attached.session());
    assert!(created_session.is_entered());
    assert_eq!(created_session.exit_action(), None);

    drop(created);
    drop(attached);
    assert_eq!(created_session.exit_action(), Some(SessionClose::Close));
    assert_eq!(attached_session.exit_action(), Some(SessionClose::Detach));
}

#[test]
fn release_reports_teardown_failure() {
    let reservation = dcpower_dmm_fixture().reservation().unwrap();
    let guard = reservation
        .initialize_session(
            |info: &SessionInformation, behavior: InitializationBehavior| {
                Ok::<_, Infallible>(FakeSession::open(info, behavior).failing_teardown())
            },
            INSTRUMENT_TYPE_NI_DCPOWER,
            InitializationBehavior::Auto,
        )
        .unwrap();

    let err = guard.release().unwrap_err();
    assert!(matches!(err, SessionError::Teardown { .. }));
    assert_eq!(err.session_name(), Some("DCPower1"));
    assert!(!reservation.is_initialized("DCPower1"));
}

#[test]
fn dropped_guard_swallows_teardown_failure() {
    let reservation = dcpower_dmm_fixture().reservation().unwrap();
    {
        let _guard = reservation
            .initialize_session(
                |info: &SessionInformation, behavior: InitializationBehavior| {
                    Ok::<_, Infallible>(FakeSession::open(info, behavior).failing_teardown())
                },
                INSTRUMENT_TYPE_NI_DCPOWER,
                InitializationBehavior::Auto,
            )
            .unwrap();
    }
    assert!(!reservation.is_initialized("DCPower1"));
}

#[test]
fn different_sessions_initialize_from_different_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Reservation>();

    let reservation = existing_session_fixture().reservation().unwrap();
    std::thread::scope(|scope| {
        let dcpower = scope.spawn(|| {
            reservation.initialize_session(
                fake_constructor(),
                INSTRUMENT_TYPE_NI_DCPOWER,
                InitializationBehavior::Auto,
            )
        });
        let dmm = scope.spawn(|| {
            reservation.initialize_session(
                fake_constructor(),
                INSTRUMENT_TYPE_NI_DMM,
                InitializationBehavior::Auto,
            )
        });
        let dcpower = dcpower.join().unwrap().unwrap();
        let dmm = dmm.join().unwrap().unwrap();
        assert!(reservation.is_initialized("DCPower1"));
        assert!(reservation.is_initialized("DMM1"));
        drop((dcpower, dmm));
    });
    assert!(!reservation.is_initialized("DCPower1"));
}

#[test]
fn default_initialization_behavior() {
    let reservation = dcpower_dmm_fixture().reservation().unwrap();
    assert_eq!(
        reservation.default_initialization_behavior(),
        InitializationBehavior::Auto
    );

    let reservation = reservation
        .with_default_initialization_behavior(InitializationBehavior::AttachToServerSession);
    let guard = reservation
        .initialize_session(
            fake_constructor(),
            INSTRUMENT_TYPE_NI_DCPOWER,
            reservation.default_initialization_behavior(),
        )
        .unwrap();
    assert_eq!(guard.session().open_mode(), SessionOpen::Attach);
}
