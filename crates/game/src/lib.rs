//! game
//!
//! This crate models the authoritative simulation core of the Riftvale
//! server: characters, slotted inventories, transient groups, and ranked
//! guilds. Everything here is synchronous and in-memory; the surrounding
//! world service owns the single task that mutates this state, and the
//! async persistence traits are implemented by the `mysql-characters`
//! crate.

#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications,
    clippy::useless_conversion,
    clippy::unwrap_used,
    clippy::todo,
    clippy::unimplemented
)]

pub mod characters;
pub mod groups;
pub mod guilds;
pub mod inventory;
pub mod items;
