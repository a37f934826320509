//! salon-probador: command-line front end for salon-probar
//!
//! Inspects environment profiles and runs the data fix-ups e2e suites need
//! between runs: membership status changes, course archiving and appointment
//! deletion.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;

pub use commands::{
    AppointmentAction, AppointmentArgs, Cli, ClientArg, ColorArg, Commands, CourseAction,
    CourseArgs, EnvArgs, EnvCommand, MembershipAction, MembershipArgs, TOKEN_ENV_VAR,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
