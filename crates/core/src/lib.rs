//! # EventDesk Core
//!
//! Domain types and pure business rules shared by the database and API crates:
//! the event status clock, the participation ledger policy, catalog filtering
//! and the access rules that gate event management.

pub mod access;
pub mod catalog;
pub mod clock;
pub mod errors;
pub mod ledger;
pub mod models;
