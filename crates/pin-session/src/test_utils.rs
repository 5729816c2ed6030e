//! Test utilities for pin-session.
//!
//! Fake driver sessions, constructors and reservation fixtures for testing
//! code that initializes sessions and resolves connections without real
//! instruments.

mod fake_session;
mod fixtures;

pub use fake_session::{
    BareSession, FakeDriverError, FakeSession, ScopedFakeSession, failing_constructor,
    fake_constructor, fake_multiplexer_constructor,
};
pub use fixtures::{
    ReservationFixture, daq_fixture, dcpower_dmm_fixture, multiplexed_scope_fixture,
};
