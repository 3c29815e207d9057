//! Unit tests of the public helpers, from outside the crate

pub mod dj_checks;
pub mod play_args;
