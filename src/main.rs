use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod domain;
mod package;
mod services;

use cli::Cli;
use domain::models::{ErrorBody, ErrorOut};
use services::cache::CacheError;
use services::cloud::{CloudError, HttpCloudClient};
use services::evaluator::EngineError;
use services::packaging::PackageError;
use services::settings::Settings;

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(err) = run(&cli) {
        emit_failure(cli.json, &err);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;

    if commands::handle_local_commands(cli, &settings)? {
        return Ok(());
    }

    let client = HttpCloudClient::from_settings(&settings)?;
    commands::handle_cloud_commands(cli, &settings, &client)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn emit_failure(json: bool, err: &anyhow::Error) {
    let code = error_code(err);
    if json {
        let out = ErrorOut {
            ok: false,
            error: ErrorBody {
                code: code.to_string(),
                message: format!("{:#}", err),
            },
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&out).unwrap_or_else(|_| format!("{:#}", err))
        );
    } else {
        eprintln!("error[{}]: {:#}", code, err);
    }
}

/// Stable error codes surfaced in `--json` mode; the message carries the
/// underlying platform or filesystem detail verbatim.
fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(pkg) = err.downcast_ref::<PackageError>() {
        return match pkg {
            PackageError::AlreadyExists(_) => "PACKAGE_EXISTS",
            PackageError::DescriptorMissing(_) => "PRECONDITION",
        };
    }
    if err.downcast_ref::<CacheError>().is_some() {
        return "CACHE_CLEAR_FAILED";
    }
    if err.downcast_ref::<EngineError>().is_some() {
        return "ENGINE_FAILED";
    }
    if err.downcast_ref::<CloudError>().is_some() {
        return "CLOUD_FAILED";
    }
    "PRECONDITION"
}
