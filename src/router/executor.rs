//! Navigation executor
//!
//! Runs one navigation through the pipeline:
//! normalize → guard → before-hooks → teardown → history → load → mount → after-hooks.
//!
//! A navigation is split in two. [`RouterInner::begin`] is synchronous and
//! covers everything up to the history update, so callers that feed commands
//! in order get history and generations in that same order. [`RouterInner::finish`]
//! loads and mounts the module and may suspend.
//!
//! There is no lock held across a suspension point. A navigation takes a new
//! generation once it passes the hook stage and re-checks it before every
//! write that follows a suspension point; when a newer navigation has started
//! it abandons with [`NavigationOutcome::Superseded`] and leaves shared state
//! alone. Those checks and writes happen under the render lock so a newer
//! navigation cannot begin between them.

use super::hooks::{Navigated, NavigationDecision};
use super::RouterInner;
use crate::modules::MountedModule;
use crate::routes::is_page_file;
use crate::runtime::{HistoryEntry, View};
use crate::types::{
    ActiveRoute, NavError, NavigationOutcome, NavigationPhase, RedirectReason, RouteChange,
    RouteDescriptor,
};
use crate::utils::escape_html;
use std::ops::ControlFlow;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

/// Markup shown in the page-content region while a module loads.
pub const DEFAULT_LOADING_HTML: &str =
    r#"<div class="page-loading" aria-busy="true">Loading&hellip;</div>"#;

/// How a navigation was triggered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationRequest {
    pub replace: bool,
    /// Triggered by native back/forward; history already moved.
    pub from_pop_state: bool,
}

/// A navigation that has committed to history and still has to render.
#[derive(Debug)]
pub(crate) struct PendingNavigation {
    generation: u64,
    from: String,
    target: String,
    descriptor: Option<RouteDescriptor>,
}

pub(crate) fn navigation_span(raw_path: &str) -> Span {
    info_span!(
        "navigate",
        path = %raw_path,
        generation = tracing::field::Empty
    )
}

impl RouterInner {
    pub(crate) async fn execute(
        &self,
        raw_path: &str,
        request: NavigationRequest,
    ) -> NavigationOutcome {
        let span = navigation_span(raw_path);
        let outcome = match span.in_scope(|| self.begin(raw_path, request)) {
            ControlFlow::Break(outcome) => outcome,
            ControlFlow::Continue(pending) => self.finish(pending).instrument(span).await,
        };
        self.publish(outcome)
    }

    /// Broadcast a finished navigation to subscribers.
    pub(crate) fn publish(&self, outcome: NavigationOutcome) -> NavigationOutcome {
        // No receivers is fine.
        let _ = self.events.send(outcome.clone());
        outcome
    }

    /// Guard, run before-hooks, tear down and update history.
    ///
    /// Breaks with the outcome when the navigation ends here (redirect or veto).
    pub(crate) fn begin(
        &self,
        raw_path: &str,
        request: NavigationRequest,
    ) -> ControlFlow<NavigationOutcome, PendingNavigation> {
        let normalizer = self.routes.normalizer();
        let mut target = normalizer.normalize(raw_path);
        let (from, previous_phase) = {
            let mut state = self.state.write();
            let snapshot = (state.current_path().to_string(), state.phase);
            state.phase = NavigationPhase::Guarding;
            snapshot
        };
        debug!(from = %from, to = %target, ?request, "Navigation requested");

        if target == self.config.login_path {
            let href = normalizer.href_for(raw_path);
            return ControlFlow::Break(self.redirect(&href, RedirectReason::Login, previous_phase));
        }

        let descriptor = self.routes.resolve(&target);
        if descriptor.is_none() && target != self.config.home_path {
            if is_page_file(&target) {
                let href = normalizer.href_for(raw_path);
                return ControlFlow::Break(self.redirect(
                    &href,
                    RedirectReason::LegacyDestination,
                    previous_phase,
                ));
            }
            debug!(path = %target, "Unregistered route, falling back to home");
            target = self.config.home_path.clone();
        }

        if let Some(descriptor) = &descriptor {
            if descriptor.require_auth && !self.auth.is_authenticated() {
                if let Err(e) = self.redirects.save(&target) {
                    warn!(path = %target, error = %e, "Failed to save redirect-after-login path");
                }
                let login = self.config.login_path.clone();
                return ControlFlow::Break(self.redirect(
                    &login,
                    RedirectReason::AuthRequired,
                    previous_phase,
                ));
            }
        }

        let change = RouteChange {
            from: from.clone(),
            to: target.clone(),
        };
        if self.hooks.run_before(&change) == NavigationDecision::Cancel {
            warn!(to = %target, "Navigation vetoed by before-navigate hook");
            self.state.write().phase = previous_phase;
            return ControlFlow::Break(NavigationOutcome::Vetoed { path: target });
        }

        let _render = self.render.lock();
        let generation = {
            let mut state = self.state.write();
            state.generation += 1;
            state.phase = NavigationPhase::Unmounting;
            state.generation
        };
        Span::current().record("generation", generation);

        if let Some(previous) = self.lifecycle.teardown() {
            self.styles.remove(&previous.name);
        }

        if !request.from_pop_state {
            let entry = HistoryEntry::new(target.clone());
            if request.replace {
                self.history.replace_state(entry, &target);
            } else {
                self.history.push_state(entry, &target);
            }
        }

        ControlFlow::Continue(PendingNavigation {
            generation,
            from,
            target,
            descriptor,
        })
    }

    /// Render a navigation that [`begin`](Self::begin) committed.
    pub(crate) async fn finish(&self, pending: PendingNavigation) -> NavigationOutcome {
        let PendingNavigation {
            generation,
            from,
            target,
            descriptor,
        } = pending;
        match descriptor {
            Some(descriptor) if target != self.config.home_path => {
                self.mount_route(generation, from, descriptor).await
            }
            _ => self.settle_home(generation, from, target),
        }
    }

    fn settle_home(&self, generation: u64, from: String, target: String) -> NavigationOutcome {
        {
            let _render = self.render.lock();
            if self.is_stale(generation) {
                return self.superseded(&target);
            }
            self.document.show_view(View::Home);
            self.document.set_page_content("");
            self.document.set_title(&self.config.title);
            self.document.mark_active_links(&target);
        }

        self.hooks.run_after(&Navigated {
            from,
            to: target.clone(),
            module: None,
        });

        let mut state = self.state.write();
        if state.generation != generation {
            return NavigationOutcome::Superseded { path: target };
        }
        state.current = ActiveRoute::Home {
            path: target.clone(),
        };
        state.phase = NavigationPhase::Settled;
        info!(path = %target, "Navigation settled at home");
        NavigationOutcome::Settled { path: target }
    }

    async fn mount_route(
        &self,
        generation: u64,
        from: String,
        descriptor: RouteDescriptor,
    ) -> NavigationOutcome {
        let target = descriptor.path.clone();

        {
            let _render = self.render.lock();
            if self.is_stale(generation) {
                return self.superseded(&target);
            }
            self.document.show_view(View::Page);
            self.document.set_page_content(
                self.config
                    .loading_html
                    .as_deref()
                    .unwrap_or(DEFAULT_LOADING_HTML),
            );
            self.set_phase(generation, NavigationPhase::Loading);
        }

        let loaded = self.loader.load(&descriptor.module_file).await;
        let module = {
            let _render = self.render.lock();
            if self.is_stale(generation) {
                return self.superseded(&target);
            }
            if let Err(e) = loaded {
                return self.fail(generation, &target, e);
            }

            let Some(module) = self.loader.registry().resolve(&descriptor.module_name) else {
                return self.fail(
                    generation,
                    &target,
                    NavError::ModuleNotRegistered {
                        module_name: descriptor.module_name.clone(),
                        module_file: descriptor.module_file.clone(),
                    },
                );
            };

            self.set_phase(generation, NavigationPhase::Mounting);
            self.document.set_page_content(&page_markup(
                &self.config.home_path,
                &descriptor.module_name,
                &module.html(),
            ));
            module
        };

        self.styles
            .apply(&descriptor.module_name, &descriptor.css_files)
            .await;
        let mounted = {
            let _render = self.render.lock();
            if self.is_stale(generation) {
                let active = self.lifecycle.active();
                if active.is_none_or(|active| active.name != descriptor.module_name) {
                    self.styles.remove(&descriptor.module_name);
                }
                return self.superseded(&target);
            }
            let mounted = MountedModule::new(descriptor.module_name.clone(), module);
            self.lifecycle.mount(mounted.clone());
            mounted
        };

        let initialized = self.lifecycle.initialize(&mounted).await;
        {
            let _render = self.render.lock();
            if self.is_stale(generation) {
                self.lifecycle.release_stale(&mounted);
                return self.superseded(&target);
            }
            if let Err(e) = initialized {
                return self.fail(generation, &target, e);
            }

            let title = if descriptor.title.is_empty() {
                self.config.title.clone()
            } else {
                format!("{} - {}", descriptor.title, self.config.title)
            };
            self.document.set_title(&title);
            self.document.scroll_to_top();
            self.document.mark_active_links(&target);
        }

        self.hooks.run_after(&Navigated {
            from,
            to: target.clone(),
            module: Some(mounted),
        });

        let mut state = self.state.write();
        if state.generation != generation {
            return NavigationOutcome::Superseded { path: target };
        }
        state.current = ActiveRoute::Page(descriptor);
        state.phase = NavigationPhase::Settled;
        info!(path = %target, "Navigation settled");
        NavigationOutcome::Settled { path: target }
    }

    fn redirect(
        &self,
        href: &str,
        reason: RedirectReason,
        previous_phase: NavigationPhase,
    ) -> NavigationOutcome {
        warn!(href = %href, ?reason, "Leaving virtual routing with a full redirect");
        self.state.write().phase = previous_phase;
        self.document.redirect(href);
        NavigationOutcome::Redirected {
            href: href.to_string(),
            reason,
        }
    }

    fn fail(&self, generation: u64, target: &str, error: NavError) -> NavigationOutcome {
        error!(path = %target, error = %error, "Navigation failed");
        self.set_phase(generation, NavigationPhase::Failed);
        self.document
            .set_page_content(&error_markup(&self.config.home_path, &error));
        NavigationOutcome::Failed {
            path: target.to_string(),
            error,
        }
    }

    fn superseded(&self, target: &str) -> NavigationOutcome {
        debug!(path = %target, "Navigation superseded by a newer one");
        NavigationOutcome::Superseded {
            path: target.to_string(),
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.state.read().generation != generation
    }

    fn set_phase(&self, generation: u64, phase: NavigationPhase) {
        let mut state = self.state.write();
        if state.generation == generation {
            state.phase = phase;
        }
    }
}

/// Module markup wrapped with the engine's own back-navigation link.
fn page_markup(home_path: &str, module_name: &str, html: &str) -> String {
    format!(
        r#"<div class="page-module" data-module="{}"><a href="{}" class="page-back" data-page-back>&larr; Back</a>{}</div>"#,
        escape_html(module_name),
        escape_html(home_path),
        html
    )
}

/// Recoverable error view with a return-home action.
fn error_markup(home_path: &str, error: &NavError) -> String {
    format!(
        r#"<div class="page-error" role="alert"><h2>This page could not be loaded</h2><p>{}</p><a href="{}" class="page-error-home">Return home</a></div>"#,
        escape_html(&error.to_string()),
        escape_html(home_path)
    )
}
