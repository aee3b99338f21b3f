//! `fete` command-line front end.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use fete::config::{PlannerConfig, build_backend, load_config};
use fete::flows::{
    DecorationRequest, EventType, PartyPlanner, VendorRequest, decoration_definition,
    vendor_definition,
};
use fete::kernel::{FlowError, TracingFlowObserver};
use fete::prompts::{Stage, ValidationError};
use fete::telemetry::init_tracing;
use tracing::{error, info};

const EXIT_FAILURE: u8 = 1;
const EXIT_INVALID_INPUT: u8 = 2;

const DECORATION_FAILURE: &str = "Failed to generate decoration ideas. Please try again.";
const VENDOR_FAILURE: &str = "Failed to get vendor recommendations. Please try again.";

#[derive(Debug, Parser)]
#[command(name = "fete", version)]
#[command(about = "Decoration ideas and vendor recommendations for your party")]
struct Cli {
    /// Configuration file (JSON or YAML); defaults to ./fete.{json,yml,yaml}.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the rendered prompt instead of calling the backend.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print the result as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate decoration and arrangement ideas.
    Decorations {
        /// Desired party theme.
        #[arg(long)]
        theme: String,
        /// Preferred color palette.
        #[arg(long)]
        palette: String,
        /// Description of the venue.
        #[arg(long)]
        venue: String,
    },
    /// Recommend vendors for an event.
    Vendors {
        /// Kind of event.
        #[arg(long, value_enum)]
        event_type: EventKind,
        /// Budget in USD.
        #[arg(long, allow_negative_numbers = true)]
        budget: f64,
        /// Venue name or description.
        #[arg(long)]
        venue: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EventKind {
    Birthday,
    Wedding,
    Corporate,
    Other,
}

impl From<EventKind> for EventType {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Birthday => Self::Birthday,
            EventKind::Wedding => Self::Wedding,
            EventKind::Corporate => Self::Corporate,
            EventKind::Other => Self::Other,
        }
    }
}

/// How a command failed, and therefore what the user sees.
#[derive(Debug)]
enum Failure {
    /// Configuration or startup problem.
    Setup(anyhow::Error),
    /// The user's input was rejected; one line per field.
    Input(ValidationError),
    /// Generation failed; the user gets a generic message.
    Generation {
        message: &'static str,
        source: anyhow::Error,
    },
}

impl Failure {
    fn from_flow(message: &'static str, err: FlowError) -> Self {
        match err {
            FlowError::Validation(validation) if validation.stage() == Stage::Input => {
                Self::Input(validation)
            }
            other => Self::Generation {
                message,
                source: other.into(),
            },
        }
    }

    fn report(self) -> ExitCode {
        match self {
            Self::Setup(err) => {
                eprintln!("error: {err:#}");
                ExitCode::from(EXIT_FAILURE)
            }
            Self::Input(validation) => {
                for violation in validation.violations() {
                    eprintln!("{violation}");
                }
                ExitCode::from(EXIT_INVALID_INPUT)
            }
            Self::Generation { message, source } => {
                error!(error = %format!("{source:#}"), "generation failed");
                eprintln!("{message}");
                ExitCode::from(EXIT_FAILURE)
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => failure.report(),
    }
}

async fn run(cli: Cli) -> Result<(), Failure> {
    let config = load_config(cli.config.as_deref()).map_err(Failure::Setup)?;
    init_tracing(&config.telemetry).map_err(Failure::Setup)?;

    match cli.command {
        Command::Decorations {
            theme,
            palette,
            venue,
        } => {
            let request = DecorationRequest::new(theme, palette, venue);
            if cli.dry_run {
                let definition = decoration_definition()
                    .map_err(|err| Failure::from_flow(DECORATION_FAILURE, err))?;
                let prompt = definition
                    .render_prompt(&request)
                    .map_err(|err| Failure::from_flow(DECORATION_FAILURE, err))?;
                println!("{prompt}");
                return Ok(());
            }

            let response = planner(&config)?
                .generate_decoration_ideas(&request)
                .await
                .map_err(|err| Failure::from_flow(DECORATION_FAILURE, err))?;

            if cli.json {
                print_json(&response)?;
            } else {
                println!("{}", response.decoration_ideas);
            }
        }
        Command::Vendors {
            event_type,
            budget,
            venue,
        } => {
            let request = VendorRequest::new(event_type.into(), budget, venue);
            if cli.dry_run {
                let definition = vendor_definition()
                    .map_err(|err| Failure::from_flow(VENDOR_FAILURE, err))?;
                let prompt = definition
                    .render_prompt(&request)
                    .map_err(|err| Failure::from_flow(VENDOR_FAILURE, err))?;
                println!("{prompt}");
                return Ok(());
            }

            let response = planner(&config)?
                .get_vendor_recommendations(&request)
                .await
                .map_err(|err| Failure::from_flow(VENDOR_FAILURE, err))?;

            if cli.json {
                print_json(&response)?;
            } else {
                for (index, vendor) in response.vendor_recommendations.iter().enumerate() {
                    println!("{}. {vendor}", index + 1);
                }
            }
        }
    }

    Ok(())
}

fn planner(config: &PlannerConfig) -> Result<PartyPlanner, Failure> {
    let backend = build_backend(&config.backend).map_err(Failure::Setup)?;
    info!(backend = %backend.metadata(), "planner ready");
    let planner = PartyPlanner::new(backend)
        .context("failed to build planning flows")
        .map_err(Failure::Setup)?;
    Ok(planner.with_observer(Arc::new(TracingFlowObserver)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Failure> {
    let rendered = serde_json::to_string_pretty(value)
        .context("failed to serialize result")
        .map_err(Failure::Setup)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use fete::adapters::BackendError;

    use super::*;

    #[test]
    fn parses_vendor_command() {
        let cli = Cli::try_parse_from([
            "fete",
            "vendors",
            "--event-type",
            "wedding",
            "--budget",
            "5000",
            "--venue",
            "Lakeside pavilion",
            "--dry-run",
        ])
        .unwrap();

        assert!(cli.dry_run);
        let Command::Vendors {
            event_type,
            budget,
            venue,
        } = cli.command
        else {
            panic!("expected vendors command");
        };
        assert_eq!(EventType::from(event_type), EventType::Wedding);
        assert!((budget - 5000.0).abs() < f64::EPSILON);
        assert_eq!(venue, "Lakeside pavilion");
    }

    #[test]
    fn negative_budget_reaches_validation() {
        let cli = Cli::try_parse_from([
            "fete",
            "vendors",
            "--event-type",
            "birthday",
            "--budget",
            "-20",
            "--venue",
            "Park",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Vendors { budget, .. } if budget < 0.0));
    }

    #[test]
    fn rejects_unknown_event_type() {
        let result = Cli::try_parse_from([
            "fete",
            "vendors",
            "--event-type",
            "gala",
            "--budget",
            "100",
            "--venue",
            "Hall",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn input_errors_are_reported_per_field() {
        let definition = decoration_definition().unwrap();
        let err = definition
            .render_prompt(&DecorationRequest::new("", "", "Barn"))
            .unwrap_err();

        let failure = Failure::from_flow(DECORATION_FAILURE, err);
        let Failure::Input(validation) = &failure else {
            panic!("expected input failure, got {failure:?}");
        };
        assert_eq!(validation.violations().len(), 2);
    }

    #[test]
    fn backend_errors_use_generic_message() {
        let err = FlowError::Backend {
            provider: "gemini",
            model: "gemini-2.0-flash".to_owned(),
            source: BackendError::transport("connection refused"),
        };
        assert!(matches!(
            Failure::from_flow(VENDOR_FAILURE, err),
            Failure::Generation {
                message: VENDOR_FAILURE,
                ..
            }
        ));
    }
}
