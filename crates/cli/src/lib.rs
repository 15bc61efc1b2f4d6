//! taxlab_cli - command-line front end for taxlab authentication.

pub mod app;
pub mod cli;
pub mod output;
#[cfg(feature = "firebase")]
pub mod prompt;
