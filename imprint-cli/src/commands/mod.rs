//! Subcommand implementations.

pub mod check;
pub mod embed;
pub mod extract;
pub mod inspect;
pub mod register;
pub mod registry;
