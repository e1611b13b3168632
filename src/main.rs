use anyhow::Context;
use pageflow::cli::commands::{self, SimulateOptions};
use pageflow::cli::init::{self, InitConfig, InitResult};
use pageflow::cli::output::Output;
use pageflow::cli::{Cli, Commands};
use pageflow::utils::toml_config::{LogFormat, LoggingConfig, PageflowConfig};
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Commands::Init { path, force, title } => {
            init_tracing(&LoggingConfig::default(), cli.verbose);
            match init::run(InitConfig { path, force, title }, &output) {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => anyhow::bail!(e),
            }
        }
        Commands::Routes { json } => {
            let config = load_config(&cli.config, cli.verbose)?;
            commands::routes(&config, json, &output)
        }
        Commands::Check => {
            let config = load_config(&cli.config, cli.verbose)?;
            commands::check(&config, &output)
        }
        Commands::Simulate {
            steps,
            authenticated,
            replace,
            saved_redirect,
            start_at,
            redirect_file,
        } => {
            let config = load_config(&cli.config, cli.verbose)?;
            let options = SimulateOptions {
                steps,
                authenticated,
                replace,
                saved_redirect,
                start_at,
                redirect_file,
            };
            commands::simulate(&config, options, &output).await
        }
    }
}

fn load_config(path: &Path, verbose: bool) -> anyhow::Result<PageflowConfig> {
    let config = PageflowConfig::load(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    init_tracing(&config.logging, verbose);
    Ok(config)
}

/// Install the global subscriber. `RUST_LOG` wins over `--verbose`, which wins over the config.
fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "pageflow=debug"
        } else {
            logging.level.as_str()
        })
    });

    let registry = tracing_subscriber::registry().with(filter);
    // Logs go to stderr so command output stays pipeable.
    let result = match logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("tracing already initialized: {}", e);
    }
}
