//! Tournament logic: the draw, fixtures, tables and knockout progression.
//!
//! Everything here is pure. Persistence and events live in
//! [`crate::service::tournaments`].

pub mod fixtures;
pub mod knockout;
pub mod seeding;
pub mod standings;

pub use fixtures::{generate_fixture, round_robin, stage_name, Fixture, Pairing, Seed};
pub use knockout::{resolve_round, seed_from_groups, RoundOutcome};
pub use seeding::{partition_groups, shuffle};
pub use standings::{classified, compute_standings, StandingRow};
