//! Functional core for taxlab.
//!
//! Pure types and functions shared by the authentication shell and the CLI.
//! Nothing in this crate performs I/O; side effects live behind the traits in
//! [`auth`].

pub mod auth;
