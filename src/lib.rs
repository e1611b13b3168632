//! # Pageflow - client-side navigation engine
//!
//! Pageflow keeps a single-page client from reloading the document. It intercepts
//! navigation and swaps "page modules" in and out of one content region while
//! keeping the runtime's native back/forward history in sync with a virtual
//! route table.
//!
//! ## Overview
//!
//! The engine is made of small parts that the [`Router`] orchestrates:
//!
//! - [`routes`] - path normalization, the route registry, and the declarative route source
//! - [`modules`] - the page module contract, the load-once module loader, scoped
//!   stylesheets, and the `init`/`cleanup` lifecycle
//! - [`router`] - the navigation pipeline, hooks, link interception, and history sync
//! - [`runtime`] - traits for the UI runtime (history, document, auth, redirect
//!   store) plus a complete in-memory implementation
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pageflow::runtime::memory::{PlaceholderModule, StaticModuleSource};
//! use pageflow::{NavigateOptions, RouteDescriptor, Router};
//! use std::sync::Arc;
//!
//! let source = StaticModuleSource::new().with_module(
//!     "/js/pages/chat.js",
//!     "chat",
//!     Arc::new(PlaceholderModule::new("Chat")),
//! );
//! let router = Router::builder()
//!     .with_module_source(Arc::new(source))
//!     .build()?;
//!
//! router.register(
//!     "/chat.html",
//!     RouteDescriptor::new("/chat.html", "chat", "/js/pages/chat.js").with_title("Chat"),
//! );
//! router.start().await;
//! assert!(router.navigate("/chat.html", NavigateOptions::default()).await);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `cli` | The `pageflow` binary: route listing, config checks, navigation replay (default) |

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line front end.
#[cfg(feature = "cli")]
pub mod cli;
/// Page module contract, loader, stylesheets and lifecycle.
pub mod modules;
/// Navigation pipeline and the public router.
pub mod router;
/// Path normalization, route registry and route sources.
pub mod routes;
/// UI runtime traits and the in-memory runtime.
pub mod runtime;
/// Core types (routes, outcomes, errors).
pub mod types;
/// Configuration utilities (TOML) and shared helpers.
pub mod utils;

// Re-export commonly used types
pub use modules::{ModuleRegistry, ModuleSource, MountedModule, PageModule};
pub use router::{
    HookRegistration, Navigated, NavigationDecision, Router, RouterBuilder, RouterState,
};
pub use routes::{NavEntry, PathNormalizer, RouteRegistry, RouteSource};
pub use runtime::{AuthProvider, Document, History, LinkEvent, RedirectStore};
pub use types::{
    ActiveRoute, NavError, NavigateOptions, NavigationOutcome, NavigationPhase, RedirectReason,
    Result, RouteChange, RouteDescriptor,
};
pub use utils::toml_config::{AppConfig, PageflowConfig};
