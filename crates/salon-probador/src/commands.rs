//! CLI command definitions

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Environment variable holding a ready-made access token
pub const TOKEN_ENV_VAR: &str = "SALON_ACCESS_TOKEN";

/// salon-probador: data fix-ups and environment checks for salon e2e suites
#[derive(Parser, Debug)]
#[command(name = "salon-probador")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Environment profile (defaults to $SALON_ENV, then the config default)
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    /// YAML file overlaying the built-in environments and timeouts
    #[arg(short, long, global = true, value_name = "YAML")]
    pub config: Option<PathBuf>,

    /// Bearer token; fetched with the staff credentials when absent
    #[arg(long, global = true, env = TOKEN_ENV_VAR, hide_env_values = true)]
    pub token: Option<String>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect environment profiles
    Env(EnvArgs),

    /// Change a client's membership status
    Membership(MembershipArgs),

    /// Course maintenance
    Course(CourseArgs),

    /// Appointment maintenance
    Appointment(AppointmentArgs),
}

impl Commands {
    /// True when the command talks to the gateway
    #[must_use]
    pub const fn needs_gateway(&self) -> bool {
        !matches!(self, Self::Env(_))
    }
}

// =============================================================================
// ENV
// =============================================================================

/// Arguments for `env`
#[derive(Args, Debug)]
pub struct EnvArgs {
    /// Env subcommand
    #[command(subcommand)]
    pub command: EnvCommand,
}

/// Env subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum EnvCommand {
    /// List known environments
    List,
    /// Show one environment (credentials omitted)
    Show {
        /// Environment name (defaults to the selected one)
        name: Option<String>,
    },
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

/// Arguments for `membership`
#[derive(Args, Debug)]
pub struct MembershipArgs {
    /// Status change to apply
    #[command(subcommand)]
    pub action: MembershipAction,
}

/// Membership status changes
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum MembershipAction {
    /// Freeze the client's membership
    Freeze(ClientArg),
    /// Reactivate the client's membership
    Unfreeze(ClientArg),
    /// Cancel the client's membership
    Cancel(ClientArg),
}

impl MembershipAction {
    /// Client named by the action
    #[must_use]
    pub fn client(&self) -> &str {
        match self {
            Self::Freeze(arg) | Self::Unfreeze(arg) | Self::Cancel(arg) => &arg.client,
        }
    }
}

/// Client selector shared by membership actions
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ClientArg {
    /// Client full name, as shown in the app
    #[arg(long)]
    pub client: String,
}

// =============================================================================
// COURSE
// =============================================================================

/// Arguments for `course`
#[derive(Args, Debug)]
pub struct CourseArgs {
    /// Course action
    #[command(subcommand)]
    pub action: CourseAction,
}

/// Course actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CourseAction {
    /// Archive the course with this exact name
    Archive {
        /// Course name
        #[arg(long)]
        name: String,
    },
}

// =============================================================================
// APPOINTMENT
// =============================================================================

/// Arguments for `appointment`
#[derive(Args, Debug)]
pub struct AppointmentArgs {
    /// Appointment action
    #[command(subcommand)]
    pub action: AppointmentAction,
}

/// Appointment actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AppointmentAction {
    /// Delete the staff member's first appointment on a day
    Delete {
        /// Staff member name, as shown on the calendar
        #[arg(long)]
        staff: String,
        /// Day to look at, YYYY-MM-DD (defaults to today, UTC)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

/// Color output argument
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_env_list() {
            let cli = Cli::parse_from(["salon-probador", "env", "list"]);
            match cli.command {
                Commands::Env(args) => assert_eq!(args.command, EnvCommand::List),
                other => panic!("expected env, got {other:?}"),
            }
        }

        #[test]
        fn test_parse_env_show_named() {
            let cli = Cli::parse_from(["salon-probador", "env", "show", "prod"]);
            match cli.command {
                Commands::Env(args) => assert_eq!(
                    args.command,
                    EnvCommand::Show {
                        name: Some("prod".into())
                    }
                ),
                other => panic!("expected env, got {other:?}"),
            }
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = Cli::parse_from([
                "salon-probador",
                "membership",
                "freeze",
                "--client",
                "Jane Doe",
                "--env",
                "prod",
                "-vv",
            ]);
            assert_eq!(cli.env.as_deref(), Some("prod"));
            assert_eq!(cli.verbose, 2);
            assert!(cli.command.needs_gateway());
        }

        #[test]
        fn test_default_color() {
            let cli = Cli::parse_from(["salon-probador", "env", "list"]);
            assert_eq!(cli.color, ColorArg::Auto);
            assert!(!cli.json_logs);
        }
    }

    mod membership_tests {
        use super::*;

        #[test]
        fn test_parse_each_action() {
            for (verb, expected) in [
                ("freeze", "Freeze"),
                ("unfreeze", "Unfreeze"),
                ("cancel", "Cancel"),
            ] {
                let cli = Cli::parse_from(["salon-probador", "membership", verb, "--client", "Ann"]);
                let Commands::Membership(args) = cli.command else {
                    panic!("expected membership");
                };
                assert_eq!(args.action.client(), "Ann");
                assert!(format!("{:?}", args.action).starts_with(expected));
            }
        }

        #[test]
        fn test_client_is_required() {
            let result = Cli::try_parse_from(["salon-probador", "membership", "freeze"]);
            assert!(result.is_err());
        }
    }

    mod appointment_tests {
        use super::*;

        #[test]
        fn test_parse_with_date() {
            let cli = Cli::parse_from([
                "salon-probador",
                "appointment",
                "delete",
                "--staff",
                "Mary",
                "--date",
                "2024-03-01",
            ]);
            let Commands::Appointment(args) = cli.command else {
                panic!("expected appointment");
            };
            assert_eq!(
                args.action,
                AppointmentAction::Delete {
                    staff: "Mary".into(),
                    date: NaiveDate::from_ymd_opt(2024, 3, 1),
                }
            );
        }

        #[test]
        fn test_bad_date_rejected() {
            let result = Cli::try_parse_from([
                "salon-probador",
                "appointment",
                "delete",
                "--staff",
                "Mary",
                "--date",
                "01/03/2024",
            ]);
            assert!(result.is_err());
        }

        #[test]
        fn test_env_does_not_need_gateway() {
            let cli = Cli::parse_from(["salon-probador", "env", "show"]);
            assert!(!cli.command.needs_gateway());
        }
    }

    mod color_tests {
        use super::*;
        use crate::config::ColorChoice;

        #[test]
        fn test_color_arg_conversion() {
            assert_eq!(ColorChoice::from(ColorArg::Auto), ColorChoice::Auto);
            assert_eq!(ColorChoice::from(ColorArg::Always), ColorChoice::Always);
            assert_eq!(ColorChoice::from(ColorArg::Never), ColorChoice::Never);
        }
    }
}
