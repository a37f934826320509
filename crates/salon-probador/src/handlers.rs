//! Subcommand handlers
//!
//! Each handler returns the line printed on success. Gateway handlers are
//! generic over [`GraphqlTransport`] so they run against a `MockTransport`
//! in tests.

use crate::commands::{AppointmentAction, Commands, CourseAction, EnvCommand, MembershipAction};
use crate::error::{CliError, CliResult};
use chrono::{NaiveDate, Utc};
use salon_probar::memberships::{Memberships, Transition};
use salon_probar::{appointments, courses, Environment, GraphqlTransport, SalonError, SuiteConfig};
use std::fmt::Write as _;
use tracing::info;

// =============================================================================
// ENV
// =============================================================================

/// Run an `env` subcommand against the loaded configuration
pub fn env(config: &SuiteConfig, selected: Option<&str>, command: &EnvCommand) -> CliResult<String> {
    match command {
        EnvCommand::List => Ok(env_list(config)),
        EnvCommand::Show { name } => {
            let env = match name.as_deref() {
                Some(name) => config.environment(name)?,
                None => config.select(selected)?,
            };
            env_show(&env)
        }
    }
}

/// Run a subcommand that needs no gateway
pub fn local_command(
    config: &SuiteConfig,
    selected: Option<&str>,
    command: &Commands,
) -> CliResult<String> {
    match command {
        Commands::Env(args) => env(config, selected, &args.command),
        _ => Err(CliError::invalid_argument(
            "this subcommand needs the gateway",
        )),
    }
}

/// Known environments, default marked with `*`
#[must_use]
pub fn env_list(config: &SuiteConfig) -> String {
    let mut out = String::new();
    for name in config.environment_names() {
        let marker = if name == config.default_env() { '*' } else { ' ' };
        let _ = writeln!(out, "{marker} {name}");
    }
    out.trim_end().to_string()
}

/// YAML rendering of `env`; the password is never serialized
pub fn env_show(env: &Environment) -> CliResult<String> {
    let yaml = serde_yaml_ng::to_string(env).map_err(SalonError::from)?;
    Ok(yaml.trim_end().to_string())
}

// =============================================================================
// GATEWAY
// =============================================================================

fn require_non_empty(flag: &str, value: &str) -> CliResult<()> {
    if value.trim().is_empty() {
        return Err(CliError::invalid_argument(format!("{flag} must not be empty")));
    }
    Ok(())
}

/// Apply a membership status change
pub async fn membership<R>(gateway: &R, action: &MembershipAction) -> CliResult<String>
where
    R: GraphqlTransport + ?Sized,
{
    let client = action.client();
    require_non_empty("--client", client)?;

    let memberships = Memberships::new(gateway);
    let transition = match action {
        MembershipAction::Freeze(_) => memberships.freeze_by_client(client).await?,
        MembershipAction::Unfreeze(_) => memberships.unfreeze_by_client(client).await?,
        MembershipAction::Cancel(_) => memberships.cancel_by_client(client).await?,
    };

    Ok(match transition {
        Transition::Applied { id, status } => {
            format!("membership {id} of '{client}' is now {status}")
        }
        Transition::Unchanged { id, status } => {
            format!("membership {id} of '{client}' already {status}, nothing to do")
        }
    })
}

/// Archive the course called `name`
pub async fn archive_course<R>(gateway: &R, name: &str) -> CliResult<String>
where
    R: GraphqlTransport + ?Sized,
{
    require_non_empty("--name", name)?;
    let id = courses::find_course_id(gateway, name).await?;
    let archived = courses::archive_course(gateway, &id).await?;
    info!(course = %id, archived, "course archive finished");
    Ok(format!("archived course '{name}' ({id}), {archived} affected"))
}

/// Run a gateway subcommand; `date` defaults to today (UTC)
pub async fn gateway_command<R>(gateway: &R, command: &Commands) -> CliResult<String>
where
    R: GraphqlTransport + ?Sized,
{
    match command {
        Commands::Membership(args) => membership(gateway, &args.action).await,
        Commands::Course(args) => match &args.action {
            CourseAction::Archive { name } => archive_course(gateway, name).await,
        },
        Commands::Appointment(args) => match &args.action {
            AppointmentAction::Delete { staff, date } => {
                let date = date.unwrap_or_else(|| Utc::now().date_naive());
                delete_appointment(gateway, staff, date).await
            }
        },
        Commands::Env(_) => Err(CliError::invalid_argument(
            "env subcommands do not talk to the gateway",
        )),
    }
}

/// Delete the first appointment of `staff` on `date`
pub async fn delete_appointment<R>(gateway: &R, staff: &str, date: NaiveDate) -> CliResult<String>
where
    R: GraphqlTransport + ?Sized,
{
    require_non_empty("--staff", staff)?;
    let id = appointments::find_appointment_for_staff(gateway, staff, date).await?;
    let deleted = appointments::delete_appointment(gateway, &id).await?;
    Ok(format!(
        "deleted appointment {id} for '{staff}' on {date} ({} removed)",
        deleted.len()
    ))
}
