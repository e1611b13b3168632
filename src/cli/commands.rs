//! Route listing, config checks and navigation replay.

use super::output::Output;
use crate::router::Router;
use crate::runtime::memory::{
    MemoryDocument, MemoryHistory, MemoryRedirectStore, StaticAuth, StaticModuleSource,
};
use crate::runtime::store::FileRedirectStore;
use crate::runtime::{History, LinkDisposition, LinkEvent, RedirectStore, View};
use crate::types::{NavigateOptions, NavigationOutcome};
use crate::utils::toml_config::PageflowConfig;
use anyhow::{bail, Context};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// How long a replayed history move or link activation may take to settle.
const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Print the route table derived from the navigation entries
pub fn routes(config: &PageflowConfig, json: bool, output: &Output) -> anyhow::Result<()> {
    let routes = config.routes()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&routes)?);
        return Ok(());
    }

    output.header(&format!("Routes ({})", routes.len()));
    let rows: Vec<Vec<String>> = routes
        .iter()
        .map(|route| {
            vec![
                route.path.clone(),
                route.module_name.clone(),
                route.module_file.clone(),
                if route.require_auth { "yes" } else { "no" }.to_string(),
                route.title.clone(),
            ]
        })
        .collect();
    output.table(&["Path", "Module", "File", "Auth", "Title"], &rows);
    Ok(())
}

/// Validate the configuration and print warnings
pub fn check(config: &PageflowConfig, output: &Output) -> anyhow::Result<()> {
    let warnings = config.validate_with_warnings()?;
    let routes = config.routes()?;

    output.success(&format!(
        "Configuration is valid ({} nav entries, {} routes)",
        config.nav.len(),
        routes.len()
    ));
    for warning in &warnings {
        output.warning(&warning.to_string());
    }
    if warnings.is_empty() {
        output.info("No warnings");
    }
    Ok(())
}

/// Options for `simulate`
#[derive(Debug, Clone, Default)]
pub struct SimulateOptions {
    pub steps: Vec<String>,
    pub authenticated: bool,
    pub replace: bool,
    pub saved_redirect: Option<String>,
    pub start_at: Option<String>,
    pub redirect_file: Option<PathBuf>,
}

/// Boot a router on the in-memory runtime and replay `options.steps`
pub async fn simulate(
    config: &PageflowConfig,
    options: SimulateOptions,
    output: &Output,
) -> anyhow::Result<()> {
    let routes = config.routes()?;
    let history = Arc::new(MemoryHistory::new(
        options
            .start_at
            .clone()
            .unwrap_or_else(|| config.app.home_path.clone()),
    ));
    let document = Arc::new(MemoryDocument::new());
    let redirects: Arc<dyn RedirectStore> = match &options.redirect_file {
        Some(file) => Arc::new(FileRedirectStore::new(file)),
        None => Arc::new(MemoryRedirectStore::new()),
    };
    if let Some(path) = &options.saved_redirect {
        redirects
            .save(path)
            .context("Failed to seed the redirect-after-login slot")?;
    }

    let router = Router::builder()
        .with_config(config.app.clone())
        .with_route_source(Arc::new(config.clone()))
        .with_module_source(Arc::new(StaticModuleSource::placeholders(
            &routes,
            &config.app.title,
        )))
        .with_history(history.clone())
        .with_document(document.clone())
        .with_auth(Arc::new(StaticAuth::new(options.authenticated)))
        .with_redirect_store(redirects.clone())
        .build()
        .context("Failed to build router")?;

    output.header("Navigation");
    let mut events = router.subscribe();
    let outcome = router.start().await;
    // start() publishes its own outcome; drop it from the stream.
    let _ = events.try_recv();
    output.step(0, "start", &describe(&outcome, output));

    for (index, step) in options.steps.iter().enumerate() {
        let index = index + 1;
        let result = match step.as_str() {
            "@back" | "@forward" => {
                let delta: isize = if step == "@back" { -1 } else { 1 };
                let target = history.index() as isize + delta;
                if target < 0 || target >= history.len() as isize {
                    "no history entry in that direction".to_string()
                } else {
                    if delta < 0 {
                        router.back();
                    } else {
                        router.forward();
                    }
                    describe(&next_event(&mut events).await?, output)
                }
            }
            other if other.starts_with("@click:") => {
                let href = &other["@click:".len()..];
                match document.activate_link(&LinkEvent::click(href)) {
                    LinkDisposition::Intercepted => {
                        describe(&next_event(&mut events).await?, output)
                    }
                    LinkDisposition::PassThrough => {
                        format!("default action (full load of {})", href)
                    }
                }
            }
            other if other.starts_with('@') => bail!("Unknown step '{}'", other),
            path => {
                let nav_options = NavigateOptions {
                    replace: options.replace,
                };
                let outcome = router.navigate_with_outcome(path, nav_options).await;
                let _ = events.try_recv();
                describe(&outcome, output)
            }
        };
        output.step(index, step, &result);
    }

    output.header("Final State");
    output.kv("current path", &router.current_path());
    output.kv("phase", &format!("{:?}", router.phase()).to_lowercase());
    output.kv(
        "view",
        match document.view() {
            View::Home => "home",
            View::Page => "page",
        },
    );
    output.kv("title", &document.title());
    let entries: Vec<String> = history
        .entries()
        .iter()
        .enumerate()
        .map(|(i, url)| {
            if i == history.index() {
                format!("[{}]", url)
            } else {
                url.clone()
            }
        })
        .collect();
    output.kv("history", &entries.join(" "));
    let loaded = router.loaded_module_files();
    let loaded = if loaded.is_empty() {
        "none".to_string()
    } else {
        loaded.join(", ")
    };
    output.kv("loaded modules", &loaded);
    if let Some(saved) = redirects.peek() {
        output.kv("saved redirect", &saved);
    }
    for redirect in document.redirects() {
        output.list_item(&format!("full redirect to {}", redirect));
    }

    router.stop();
    Ok(())
}

async fn next_event(
    events: &mut broadcast::Receiver<NavigationOutcome>,
) -> anyhow::Result<NavigationOutcome> {
    match tokio::time::timeout(EVENT_TIMEOUT, events.recv()).await {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(e)) => bail!("Navigation event stream failed: {}", e),
        Err(_) => bail!("Timed out waiting for navigation to settle"),
    }
}

fn describe(outcome: &NavigationOutcome, output: &Output) -> String {
    let text = match outcome {
        NavigationOutcome::Settled { path } => format!("settled at {}", path),
        NavigationOutcome::Redirected { href, reason } => {
            format!("redirected to {} ({:?})", href, reason)
        }
        NavigationOutcome::Vetoed { path } => format!("vetoed ({})", path),
        NavigationOutcome::Failed { path, error } => format!("failed at {}: {}", path, error),
        NavigationOutcome::Superseded { path } => format!("superseded ({})", path),
    };

    if !output.colored {
        return text;
    }
    match outcome {
        NavigationOutcome::Settled { .. } => text.green().to_string(),
        NavigationOutcome::Failed { .. } => text.red().to_string(),
        _ => text.yellow().to_string(),
    }
}
