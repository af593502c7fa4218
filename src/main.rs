use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use p4m_client::config::ClientConfig;
use p4m_client::form::TrackedProject;
use p4m_client::forms::FormKind;
use p4m_client::logging::{Verbosity, init_subscriber};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "p4m")]
#[command(version, about = "Projects4Me tracker client: forms, sign-in and session upkeep")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Answer confirmation prompts with yes
    #[arg(long, global = true)]
    pub yes: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// API host, overriding client.toml and P4M_API_HOST
    #[arg(long, global = true)]
    pub api_host: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a JSON or TOML data file against a form schema
    Validate {
        /// Data file holding the record attributes
        data: PathBuf,

        /// Built-in form to validate against
        #[arg(short, long, value_enum, required_unless_present = "metadata")]
        form: Option<FormKind>,

        /// Form metadata file (JSON or TOML) instead of a built-in form
        #[arg(long, conflicts_with = "form")]
        metadata: Option<PathBuf>,

        /// Section of the metadata file to validate (defaults to the first)
        #[arg(long, requires = "metadata")]
        section: Option<String>,

        /// Stop at the first failing rule
        #[arg(long)]
        abort_early: bool,
    },
    /// List, show or submit the built-in forms
    Forms {
        #[command(subcommand)]
        command: Option<FormsCommands>,
    },
    /// Sign in with a username and password
    Signin {
        username: String,

        /// Read from a prompt when omitted
        #[arg(long, env = "P4M_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[arg(long)]
        remember_me: bool,

        /// Requested scopes
        #[arg(long = "scope")]
        scope: Vec<String>,
    },
    /// Show how a milestone block would be rendered
    Milestone {
        #[arg(long)]
        status: String,

        /// End date as YYYY-MM-DD
        #[arg(long)]
        end_date: Option<String>,

        /// Status of one issue in the milestone (repeatable)
        #[arg(long = "issue")]
        issues: Vec<String>,

        /// Evaluate as of this date instead of today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum FormsCommands {
    /// List the built-in forms
    List,
    /// Print a form's metadata as JSON
    Show {
        #[arg(value_enum)]
        form: FormKind,
    },
    /// Run a data file through validation, save and navigation
    Submit {
        #[arg(value_enum)]
        form: FormKind,

        data: PathBuf,

        /// Keep records in memory instead of calling the API
        #[arg(long)]
        dry_run: bool,

        /// Issue type to create with a new project (repeatable)
        #[arg(long = "issue-type")]
        issue_types: Vec<String>,

        /// User id stamped as the issue reporter
        #[arg(long)]
        reporter: Option<String>,

        /// Token from the password reset mail
        #[arg(long)]
        reset_token: Option<String>,

        /// Tracked project as ID:SHORTCODE
        #[arg(long)]
        project: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default client.toml file
    Init,
}

fn parse_project(value: &str) -> Result<TrackedProject> {
    let (id, short_code) = value
        .split_once(':')
        .context("--project must look like ID:SHORTCODE")?;
    Ok(TrackedProject {
        id: id.to_string(),
        short_code: short_code.to_string(),
        name: short_code.to_string(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_subscriber(Verbosity::from_flags(cli.verbose, cli.quiet), cli.log_json)?;

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let load_config =
        || ClientConfig::with_cli_args(project_dir.clone(), cli.verbose, cli.api_host.clone());

    match &cli.command {
        Commands::Validate {
            data,
            form,
            metadata,
            section,
            abort_early,
        } => {
            let source = match (form, metadata) {
                (_, Some(path)) => cmd::validate::SchemaSource::File {
                    path,
                    section: section.as_deref(),
                },
                (Some(kind), None) => cmd::validate::SchemaSource::Builtin(*kind),
                (None, None) => anyhow::bail!("Pass --form or --metadata"),
            };
            cmd::cmd_validate(&load_config()?, source, data, *abort_early)?;
        }
        Commands::Forms { command } => match command.clone() {
            None | Some(FormsCommands::List) => cmd::cmd_forms_list()?,
            Some(FormsCommands::Show { form }) => cmd::cmd_forms_show(form)?,
            Some(FormsCommands::Submit {
                form,
                data,
                dry_run,
                issue_types,
                reporter,
                reset_token,
                project,
            }) => {
                let options = cmd::SubmitOptions {
                    dry_run,
                    assume_yes: cli.yes,
                    issue_types,
                    reporter,
                    reset_token,
                    project: project.as_deref().map(parse_project).transpose()?,
                };
                cmd::cmd_submit(&load_config()?, form, &data, options).await?;
            }
        },
        Commands::Signin {
            username,
            password,
            remember_me,
            scope,
        } => {
            cmd::cmd_signin(&load_config()?, username, password.clone(), *remember_me, scope).await?;
        }
        Commands::Milestone {
            status,
            end_date,
            issues,
            today,
        } => cmd::cmd_milestone(status, end_date.as_deref(), issues, *today)?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
