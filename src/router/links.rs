//! Link interception
//!
//! One listener at the document root sees every link activation. The filter
//! is a pure predicate over the event; the router only performs the virtual
//! navigation when the predicate accepts.

use crate::routes::PathNormalizer;
use crate::runtime::LinkEvent;

#[derive(Debug, Clone)]
pub struct LinkInterceptor {
    normalizer: PathNormalizer,
    login_path: String,
}

impl LinkInterceptor {
    pub fn new(normalizer: PathNormalizer, login_path: impl Into<String>) -> Self {
        Self {
            normalizer,
            login_path: login_path.into(),
        }
    }

    /// Whether the activation should become a virtual navigation.
    ///
    /// Relative hrefs are resolved against `current_path`.
    pub fn should_intercept(&self, event: &LinkEvent, current_path: &str) -> bool {
        self.intercept(event, current_path).is_some()
    }

    /// The normalized destination of an interceptable activation.
    pub fn intercept(&self, event: &LinkEvent, current_path: &str) -> Option<String> {
        if event.default_prevented
            || event.button != 0
            || event.modifiers.any()
            || event.opt_out
            || event.download
        {
            return None;
        }

        if let Some(target) = event.target.as_deref() {
            if !target.is_empty() && !target.eq_ignore_ascii_case("_self") {
                return None;
            }
        }

        let href = event.href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }

        let url = self.normalizer.resolve(href, current_path)?;
        if !self.normalizer.is_same_origin(&url) {
            return None;
        }

        let path = url.path().to_string();
        if path == self.login_path {
            return None;
        }

        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Modifiers;
    use rstest::rstest;

    fn interceptor() -> LinkInterceptor {
        LinkInterceptor::new(
            PathNormalizer::new("http://localhost").unwrap(),
            "/login.html",
        )
    }

    #[test]
    fn test_plain_internal_click_is_intercepted() {
        let links = interceptor();
        assert_eq!(
            links.intercept(&LinkEvent::click("/chat.html?tab=1"), "/"),
            Some("/chat.html".to_string())
        );
    }

    #[test]
    fn test_relative_href_resolves_from_current_path() {
        let links = interceptor();
        assert_eq!(
            links.intercept(&LinkEvent::click("profile.html"), "/settings/index.html"),
            Some("/settings/profile.html".to_string())
        );
    }

    #[rstest]
    #[case::meta(LinkEvent { modifiers: Modifiers { meta: true, ..Default::default() }, ..LinkEvent::click("/a.html") })]
    #[case::ctrl(LinkEvent { modifiers: Modifiers { ctrl: true, ..Default::default() }, ..LinkEvent::click("/a.html") })]
    #[case::shift(LinkEvent { modifiers: Modifiers { shift: true, ..Default::default() }, ..LinkEvent::click("/a.html") })]
    #[case::alt(LinkEvent { modifiers: Modifiers { alt: true, ..Default::default() }, ..LinkEvent::click("/a.html") })]
    #[case::middle_button(LinkEvent { button: 1, ..LinkEvent::click("/a.html") })]
    #[case::opt_out(LinkEvent { opt_out: true, ..LinkEvent::click("/a.html") })]
    #[case::prevented(LinkEvent { default_prevented: true, ..LinkEvent::click("/a.html") })]
    #[case::download(LinkEvent { download: true, ..LinkEvent::click("/a.html") })]
    #[case::blank_target(LinkEvent { target: Some("_blank".into()), ..LinkEvent::click("/a.html") })]
    #[case::named_frame(LinkEvent { target: Some("preview".into()), ..LinkEvent::click("/a.html") })]
    #[case::fragment(LinkEvent::click("#section"))]
    #[case::empty(LinkEvent::click(""))]
    #[case::external(LinkEvent::click("https://example.com/a.html"))]
    #[case::other_port(LinkEvent::click("http://localhost:9000/a.html"))]
    #[case::mailto(LinkEvent::click("mailto:team@example.com"))]
    #[case::login(LinkEvent::click("/login.html?next=/chat.html"))]
    fn test_ignored_activations(#[case] event: LinkEvent) {
        assert!(!interceptor().should_intercept(&event, "/"));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("_self"))]
    fn test_self_targets_are_intercepted(#[case] target: Option<&str>) {
        let event = LinkEvent {
            target: target.map(str::to_string),
            ..LinkEvent::click("/a.html")
        };
        assert!(interceptor().should_intercept(&event, "/"));
    }
}
