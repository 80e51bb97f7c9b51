//! Link eligibility filter.
//!
//! Pure decision over the link, the page location, the URL already being
//! prefetched and the configuration. Rules are checked in a fixed order and
//! the first failing one rejects the link.

use url::Url;

use crate::config::PrefetchConfig;
use crate::document::Link;

/// Why a link was rejected. Only used for trace logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoLink,
    NoHref,
    AlreadyTargeted,
    NotWhitelisted,
    External,
    UnsupportedScheme,
    InsecureFromSecure,
    QueryString,
    SamePageFragment,
    OptedOut,
}

/// Returns `Ok(())` when `link` may be prefetched from the page at `location`.
pub fn check(
    link: Option<&Link>,
    location: &Url,
    targeted: Option<&Url>,
    config: &PrefetchConfig,
) -> Result<(), Rejection> {
    let link = link.ok_or(Rejection::NoLink)?;
    let href = link.href.as_ref().ok_or(Rejection::NoHref)?;

    if targeted == Some(href) {
        return Err(Rejection::AlreadyTargeted);
    }

    if config.use_whitelist && !link.instant {
        return Err(Rejection::NotWhitelisted);
    }

    if !config.allow_external_links && href.origin() != location.origin() && !link.instant {
        return Err(Rejection::External);
    }

    if !matches!(href.scheme(), "http" | "https") {
        return Err(Rejection::UnsupportedScheme);
    }

    if href.scheme() == "http" && location.scheme() == "https" {
        return Err(Rejection::InsecureFromSecure);
    }

    if !config.allow_query_string && has_query(href) && !link.instant {
        return Err(Rejection::QueryString);
    }

    if is_same_page_fragment(href, location) {
        return Err(Rejection::SamePageFragment);
    }

    if link.no_instant {
        return Err(Rejection::OptedOut);
    }

    Ok(())
}

/// Boolean form of [`check`].
pub fn is_preloadable(
    link: Option<&Link>,
    location: &Url,
    targeted: Option<&Url>,
    config: &PrefetchConfig,
) -> bool {
    check(link, location, targeted, config).is_ok()
}

// `?` alone is an empty `search` in the DOM.
fn has_query(url: &Url) -> bool {
    url.query().is_some_and(|q| !q.is_empty())
}

fn is_same_page_fragment(href: &Url, location: &Url) -> bool {
    href.fragment().is_some_and(|f| !f.is_empty())
        && href.origin() == location.origin()
        && href.path() == location.path()
        && href.query().unwrap_or("") == location.query().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::NodeId;

    fn page() -> Url {
        Url::parse("https://example.com/docs/start").unwrap()
    }

    fn link(href: &str) -> Link {
        Link::resolve(NodeId(1), &page(), Some(href), false, false)
    }

    fn opted_in(href: &str) -> Link {
        Link::resolve(NodeId(1), &page(), Some(href), true, false)
    }

    fn verdict(link: &Link, config: &PrefetchConfig) -> Result<(), Rejection> {
        check(Some(link), &page(), None, config)
    }

    #[test]
    fn test_same_origin_link_is_eligible() {
        assert_eq!(verdict(&link("/docs/next"), &PrefetchConfig::default()), Ok(()));
    }

    #[test]
    fn test_missing_link_rejected() {
        let c = PrefetchConfig::default();
        assert_eq!(check(None, &page(), None, &c), Err(Rejection::NoLink));
    }

    #[test]
    fn test_missing_href_always_rejected() {
        let bare = Link::resolve(NodeId(1), &page(), None, true, false);
        let permissive = PrefetchConfig {
            allow_query_string: true,
            allow_external_links: true,
            ..Default::default()
        };
        assert_eq!(verdict(&bare, &permissive), Err(Rejection::NoHref));
        assert_eq!(verdict(&bare, &PrefetchConfig::default()), Err(Rejection::NoHref));
    }

    #[test]
    fn test_targeted_url_not_retriggered() {
        let l = link("/docs/next");
        let targeted = l.href.clone();
        assert_eq!(
            check(Some(&l), &page(), targeted.as_ref(), &PrefetchConfig::default()),
            Err(Rejection::AlreadyTargeted)
        );
    }

    #[test]
    fn test_whitelist_requires_data_instant() {
        let c = PrefetchConfig {
            use_whitelist: true,
            ..Default::default()
        };
        assert_eq!(verdict(&link("/docs/next"), &c), Err(Rejection::NotWhitelisted));
        assert_eq!(verdict(&opted_in("/docs/next"), &c), Ok(()));
    }

    #[test]
    fn test_external_link_rejected_by_default() {
        let c = PrefetchConfig::default();
        assert_eq!(
            verdict(&link("https://other.org/page"), &c),
            Err(Rejection::External)
        );
        assert_eq!(verdict(&opted_in("https://other.org/page"), &c), Ok(()));
    }

    #[test]
    fn test_external_link_allowed_by_config() {
        let c = PrefetchConfig {
            allow_external_links: true,
            ..Default::default()
        };
        assert_eq!(verdict(&link("https://other.org/page"), &c), Ok(()));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let c = PrefetchConfig {
            allow_external_links: true,
            ..Default::default()
        };
        assert_eq!(
            verdict(&link("mailto:someone@example.com"), &c),
            Err(Rejection::UnsupportedScheme)
        );
        assert_eq!(
            verdict(&link("ftp://example.com/file"), &c),
            Err(Rejection::UnsupportedScheme)
        );
    }

    #[test]
    fn test_http_from_https_rejected() {
        let c = PrefetchConfig::default();
        assert_eq!(
            verdict(&opted_in("http://example.com/docs/next"), &c),
            Err(Rejection::InsecureFromSecure)
        );
    }

    #[test]
    fn test_http_from_http_allowed() {
        let location = Url::parse("http://example.com/").unwrap();
        let l = Link::resolve(NodeId(1), &location, Some("/next"), false, false);
        assert!(is_preloadable(
            Some(&l),
            &location,
            None,
            &PrefetchConfig::default()
        ));
    }

    #[test]
    fn test_query_string_rejected_unless_opted_in() {
        let c = PrefetchConfig::default();
        assert_eq!(verdict(&link("/search?q=rust"), &c), Err(Rejection::QueryString));
        assert_eq!(verdict(&opted_in("/search?q=rust"), &c), Ok(()));
    }

    #[test]
    fn test_query_string_allowed_by_config() {
        let c = PrefetchConfig {
            allow_query_string: true,
            ..Default::default()
        };
        assert_eq!(verdict(&link("/search?q=rust"), &c), Ok(()));
    }

    #[test]
    fn test_empty_query_is_not_a_query_string() {
        assert_eq!(verdict(&link("/docs/next?"), &PrefetchConfig::default()), Ok(()));
    }

    #[test]
    fn test_hash_change_on_current_page_rejected() {
        let c = PrefetchConfig::default();
        assert_eq!(verdict(&link("#section"), &c), Err(Rejection::SamePageFragment));
        assert_eq!(
            verdict(&opted_in("/docs/start#section"), &c),
            Err(Rejection::SamePageFragment)
        );
    }

    #[test]
    fn test_hash_on_other_page_allowed() {
        assert_eq!(
            verdict(&link("/docs/next#section"), &PrefetchConfig::default()),
            Ok(())
        );
    }

    #[test]
    fn test_same_page_without_hash_allowed() {
        assert_eq!(verdict(&link("/docs/start"), &PrefetchConfig::default()), Ok(()));
    }

    #[test]
    fn test_data_no_instant_opts_out() {
        let l = Link::resolve(NodeId(1), &page(), Some("/docs/next"), true, true);
        assert_eq!(verdict(&l, &PrefetchConfig::default()), Err(Rejection::OptedOut));
    }
}
