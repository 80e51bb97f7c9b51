//! The prefetch hint: a single `<link rel="prefetch">` node whose `href`
//! is the only signal handed to the host's prefetch machinery.

use url::Url;

/// Side of the hint the detector writes to.
pub trait PrefetchHint {
    /// Sets `rel="prefetch"` and appends the node to the document head.
    fn mount(&mut self);

    /// Points the hint at `url`; the host starts a speculative fetch.
    fn set_href(&mut self, url: &Url);

    /// Removes the `href` attribute.
    fn remove_href(&mut self);

    /// Current `href`, if any.
    fn href(&self) -> Option<&Url>;
}

/// In-memory `<link rel="prefetch">` element.
#[derive(Debug, Clone, Default)]
pub struct HeadLinkHint {
    rel: Option<&'static str>,
    mounted: bool,
    href: Option<Url>,
    writes: usize,
}

impl HeadLinkHint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rel(&self) -> Option<&'static str> {
        self.rel
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Number of `href` assignments since creation.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PrefetchHint for HeadLinkHint {
    fn mount(&mut self) {
        self.rel = Some("prefetch");
        self.mounted = true;
    }

    fn set_href(&mut self, url: &Url) {
        self.href = Some(url.clone());
        self.writes += 1;
    }

    fn remove_href(&mut self) {
        self.href = None;
    }

    fn href(&self) -> Option<&Url> {
        self.href.as_ref()
    }
}
