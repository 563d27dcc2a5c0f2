//! churnconf: consola de operador para cambiar la configuración del modelo de
//! churn.
//!
//! Subcomandos:
//! - `show --env <stage|prod>`: configuración vigente.
//! - `promote --env <stage|prod> [--entry <TXT>] [--yes]`: validate → stage →
//!   verify → promote → audit. Sin `--entry` se usa la config de prod vigente.
//! - `refresh --env <local|stage|prod> [--times N]`: sólo notifica.
//! - `history --env <stage|prod> [--limit N]`: últimas versiones.
//!
//! Códigos de salida: 0 ok, 2 uso, 4 rechazado o no promovido, 5 fatal.

mod settings;

use std::io::{BufRead, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use conf_adapters::{EndpointConfig, FsBlobStore, HttpBlobStore, HttpPredictionClient, HttpRefreshNotifier};
use conf_core::{BlobStore, ConfigStore, Disposition, InMemoryEventStore, OperatorAction, PromotionWorkflow,
                RefreshNotifier, StepReport, WorkflowError};
use conf_domain::{render_entry, Environment};
use conf_persistence::{build_pool, DbConfig, PgConfigStore, PoolProvider};
use tracing::{debug, info};

use settings::{AuditTarget, CliSettings};

const EXIT_USAGE: u8 = 2;
const EXIT_REJECTED: u8 = 4;
const EXIT_FATAL: u8 = 5;

#[derive(Parser)]
#[command(name = "churnconf")]
#[command(about = "Validate, verify and promote churn model configuration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Muestra la configuración vigente de un entorno
    Show {
        #[arg(long, default_value = "prod")]
        env: Environment,
    },
    /// Valida, pone en staging, verifica y (si corresponde) promueve
    Promote {
        #[arg(long, default_value = "stage")]
        env: Environment,
        /// Entrada estilo dict, p.ej. "{'proba_cutoff': 0.5}"
        #[arg(long)]
        entry: Option<String>,
        /// No pedir confirmación interactiva
        #[arg(long)]
        yes: bool,
    },
    /// Pide a las instancias de un entorno que recarguen su configuración
    Refresh {
        #[arg(long)]
        env: Environment,
        #[arg(long, default_value_t = 1)]
        times: u32,
    },
    /// Lista las últimas versiones de un entorno
    History {
        #[arg(long, default_value = "prod")]
        env: Environment,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

/// Resultado de un comando que no es un error fatal.
enum Outcome {
    Done,
    Usage(String),
    Rejected(String),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                                 tracing_subscriber::EnvFilter::new("info")
                             }))
                             .with_writer(std::io::stderr)
                             .init();
    conf_persistence::init_dotenv();

    let cli = Cli::parse();
    match run(cli) {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::Usage(msg)) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_USAGE)
        }
        Ok(Outcome::Rejected(msg)) => {
            eprintln!("rejected: {msg}");
            ExitCode::from(EXIT_REJECTED)
        }
        Err(e) => {
            eprintln!("fatal: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    let endpoints = EndpointConfig::from_env()?;
    if let Command::Refresh { env, times } = cli.command {
        // refresh no necesita base de datos
        let notifier = HttpRefreshNotifier::new(endpoints)?;
        return match notifier.notify(env, times) {
            Ok(()) => {
                println!("refresh requested: env={env} times={times}");
                Ok(Outcome::Done)
            }
            Err(WorkflowError::InvalidEnvironment(e)) => Ok(Outcome::Usage(format!("no endpoint for '{e}'"))),
            Err(e) => Err(e.into()),
        };
    }

    let db = DbConfig::from_env()?;
    let settings = CliSettings::from_env(&db.schema_name)?;
    let pool = build_pool(&db.url, db.min_connections, db.max_connections).context("connecting to config database")?;
    let store = PgConfigStore::new(PoolProvider { pool });

    match cli.command {
        Command::Show { env } => show(&store, &settings, env),
        Command::History { env, limit } => history(&store, &settings, env, limit),
        Command::Promote { env, entry, yes } => promote(store, settings, endpoints, env, entry, yes),
        Command::Refresh { .. } => Ok(Outcome::Done),
    }
}

fn show(store: &impl ConfigStore, settings: &CliSettings, env: Environment) -> Result<Outcome> {
    match store.latest(&settings.workflow.schema_name, env) {
        Ok(entries) => {
            println!("{}", render_entry(&entries));
            Ok(Outcome::Done)
        }
        Err(WorkflowError::InvalidEnvironment(e)) => Ok(Outcome::Usage(format!("'{e}' has no config table"))),
        Err(e) => Err(e.into()),
    }
}

fn history(store: &impl ConfigStore, settings: &CliSettings, env: Environment, limit: usize) -> Result<Outcome> {
    let versions = match store.history(&settings.workflow.schema_name, env, limit) {
        Ok(v) => v,
        Err(WorkflowError::InvalidEnvironment(e)) => return Ok(Outcome::Usage(format!("'{e}' has no config table"))),
        Err(e) => return Err(e.into()),
    };
    for v in versions {
        println!("{}  {}  {}", v.inserted_at.to_rfc3339(), v.version_id, render_entry(&v.entries));
    }
    Ok(Outcome::Done)
}

fn blob_store(settings: &CliSettings, endpoints: &EndpointConfig) -> Result<Box<dyn BlobStore>> {
    Ok(match &settings.audit_target {
        AuditTarget::Dir(dir) => Box::new(FsBlobStore::new(dir.clone())),
        AuditTarget::Endpoint(url) => Box::new(HttpBlobStore::new(endpoints.http_client()?, url)),
    })
}

fn ask_confirmation(env: Environment) -> Result<bool> {
    print!("Apply this change to {env}? [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Primer destino de refresh sin URL configurada para una promoción a `env`.
fn missing_refresh_target(settings: &CliSettings, endpoints: &EndpointConfig, env: Environment) -> Option<Environment> {
    let mut targets = vec![settings.workflow.stage_refresh_target];
    if env == Environment::Prod {
        targets.push(settings.workflow.prod_refresh_target);
    }
    targets.into_iter().find(|t| endpoints.base_url(*t).is_err())
}

fn promote<S: ConfigStore>(store: S,
                           settings: CliSettings,
                           endpoints: EndpointConfig,
                           env: Environment,
                           entry: Option<String>,
                           yes: bool)
                           -> Result<Outcome> {
    if let Some(target) = missing_refresh_target(&settings, &endpoints, env) {
        return Ok(Outcome::Usage(format!("no refresh endpoint configured for '{target}'")));
    }
    let probe_target = if settings.use_local_targets { Environment::Local } else { Environment::Stage };
    let notifier = HttpRefreshNotifier::new(endpoints.clone())?;
    let client = HttpPredictionClient::new(&endpoints, probe_target)?;
    let blobs = blob_store(&settings, &endpoints)?;
    let mut wf = PromotionWorkflow::builder(store, InMemoryEventStore::default()).notifier(notifier)
                                                                                .prediction_client(client)
                                                                                .blob_store(blobs)
                                                                                .settings(settings.workflow)
                                                                                .build()?;

    let mut session = wf.open_session()?;
    if let Some(text) = entry {
        session = step(&mut wf, session, OperatorAction::Edit(text))?.0;
    }
    let (session, report) = match wf.handle(session, OperatorAction::SelectEnvironment(env)).into_parts() {
        (s, Ok(r)) => (s, r),
        (_, Err(WorkflowError::InvalidEnvironment(e))) => return Ok(Outcome::Usage(format!("cannot promote to '{e}'"))),
        (_, Err(e)) => return Err(e.into()),
    };
    debug!(?report, "environment selected");

    let (session, report) = step(&mut wf, session, OperatorAction::Submit)?;
    let entries = match report {
        StepReport::AwaitingConfirmation { entries, .. } => entries,
        StepReport::Rejected(e) => return Ok(Outcome::Rejected(e.to_string())),
        other => return Ok(Outcome::Usage(format!("unexpected report after submit: {other:?}"))),
    };
    println!("validated: {}", render_entry(&entries));
    if !yes && !ask_confirmation(env)? {
        return Ok(Outcome::Rejected("not confirmed by operator".into()));
    }

    let (session, report) = step(&mut wf, session, OperatorAction::Confirm)?;
    for ev in wf.events_for(session.id) {
        debug!(seq = ev.seq, kind = ?ev.kind, "event");
    }
    let StepReport::Completed(outcome) = report else {
        return Ok(Outcome::Usage(format!("unexpected report after confirm: {report:?}")));
    };
    info!(audit_id = %outcome.audit_id, disposition = ?outcome.disposition, "promotion finished");
    match outcome.disposition {
        Disposition::Promoted => {
            println!("promoted to prod (version {})", outcome.promoted_version.map(|v| v.to_string()).unwrap_or_default());
            Ok(Outcome::Done)
        }
        Disposition::StagedOnly => {
            println!("staged and verified (version {}); prod untouched", outcome.staged_version);
            Ok(Outcome::Done)
        }
        Disposition::ProbeFailed => {
            for m in &outcome.probe.messages {
                println!("  - {m}");
            }
            Ok(Outcome::Rejected("verification failed; prod untouched".into()))
        }
    }
}

fn step<S: ConfigStore>(wf: &mut PromotionWorkflow<S, InMemoryEventStore>,
                        session: conf_core::WorkflowSession,
                        action: OperatorAction)
                        -> Result<(conf_core::WorkflowSession, StepReport)> {
    let (session, result) = wf.handle(session, action).into_parts();
    Ok((session, result?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conf_core::WorkflowSettings;

    fn settings(workflow: WorkflowSettings) -> CliSettings {
        CliSettings { workflow,
                      use_local_targets: false,
                      audit_target: AuditTarget::Dir("audit".into()) }
    }

    #[test]
    fn prod_promotion_requires_both_refresh_endpoints() {
        let endpoints = EndpointConfig::default().with_url(Environment::Stage, "http://stage.internal");
        let s = settings(WorkflowSettings::default());
        assert_eq!(missing_refresh_target(&s, &endpoints, Environment::Prod), Some(Environment::Prod));
        assert_eq!(missing_refresh_target(&s, &endpoints, Environment::Stage), None);

        let endpoints = endpoints.with_url(Environment::Prod, "http://prod.internal");
        assert_eq!(missing_refresh_target(&s, &endpoints, Environment::Prod), None);
    }

    #[test]
    fn local_targets_only_need_the_local_endpoint() {
        let s = settings(WorkflowSettings::default().with_local_targets());
        assert_eq!(missing_refresh_target(&s, &EndpointConfig::default(), Environment::Prod), None);
    }
}
