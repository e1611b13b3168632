//! Init command implementation
//!
//! Writes a starter `pageflow.toml` with a handful of navigation entries.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// pageflow.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite an existing file
    pub force: bool,
    /// Application title written into `[app]`
    pub title: String,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Pageflow");

    let config_path = config.path.join("pageflow.toml");
    if config_path.exists() && !config.force {
        output.warning("pageflow.toml already exists!");
        output.hint("Use --force to overwrite it");
        return InitResult::AlreadyExists;
    }

    if let Err(e) = write_config(&config_path, &generate_pageflow_toml(&config.title)) {
        output.error(&format!("Failed to create pageflow.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "pageflow.toml");

    output.header("Next Steps");
    output.info("List the derived routes:");
    output.command("pageflow routes");
    output.info("Replay a navigation:");
    output.command("pageflow simulate /chat.html @back");

    InitResult::Success
}

fn write_config(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)
}

fn generate_pageflow_toml(title: &str) -> String {
    let title = title.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        r#"# Pageflow configuration

[app]
title = "{title}"
home_path = "/"
login_path = "/login.html"
origin = "http://localhost"
# One code unit per page module: {{module_dir}}/{{module_name}}.js
module_dir = "/js/pages"

[logging]
# EnvFilter directive; RUST_LOG takes precedence
level = "info"
# pretty or json
format = "pretty"

# Navigation entries, in sidebar order. Each internal entry becomes a route.

[[nav]]
href = "/chat.html"
label = "Chat"
require_auth = true
css = ["/css/chat.css"]

[[nav]]
href = "/files.html"
label = "Files"
require_auth = true
css = ["/css/files.css"]

[[nav]]
href = "/settings.html"
label = "Settings"
title = "Account Settings"
require_auth = true

[[nav]]
href = "/about.html"
label = "About"
"#
    )
}
