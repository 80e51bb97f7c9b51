//! Détecteur d'intention et déclencheur de préchargement.
//!
//! Écoute les gestes pointeur (toucher, survol, clic) sur la page, remonte au
//! lien `<a>` le plus proche de la cible, le passe au filtre d'éligibilité
//! ([`crate::eligibility`]) et, si le lien est retenu, pointe l'unique
//! `<link rel="prefetch">` de la page dessus.
//!
//! ## Flux des gestes
//!
//! ```text
//! touchstart ──► éligible ? ──► prefetch immédiat ──► touchend/touchcancel ──► clear
//!
//! mouseover ──► (< 1100 ms après un touch ? ignoré)
//!           └─► éligible ? ──► échéance now + delay_on_hover
//!                                  │                  │
//!                              poll(now)          mouseout (hors du lien)
//!                                  ▼                  ▼
//!                              prefetch            annule + clear
//!
//! mousedown ──► éligible ? ──► prefetch immédiat ──► mouseout ──► clear
//! ```
//!
//! ## Minuterie
//!
//! Pas de thread ni de callback : le survol en attente est une simple
//! échéance ([`Instant`]). La boucle d'événements de l'hôte interroge
//! [`InstantPage::next_deadline`] pour dormir (`ControlFlow::WaitUntil` chez
//! winit) puis appelle [`InstantPage::poll`]. Annuler le survol revient à
//! oublier l'échéance.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};
use url::Url;

use crate::config::PrefetchConfig;
use crate::document::{Document, Environment, NodeId};
use crate::eligibility;
use crate::hint::PrefetchHint;

/// Browsers fire synthetic mouse events after a touch; hovers this close to
/// the last touchstart are ignored.
pub const TOUCH_HOVER_SUPPRESSION: Duration = Duration::from_millis(1100);

/// DOM event kinds the detector can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TouchStart,
    TouchEnd,
    TouchCancel,
    MouseOver,
    MouseOut,
    MouseDown,
}

impl EventKind {
    /// DOM event name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TouchStart => "touchstart",
            Self::TouchEnd => "touchend",
            Self::TouchCancel => "touchcancel",
            Self::MouseOver => "mouseover",
            Self::MouseOut => "mouseout",
            Self::MouseDown => "mousedown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "touchstart" => Some(Self::TouchStart),
            "touchend" => Some(Self::TouchEnd),
            "touchcancel" => Some(Self::TouchCancel),
            "mouseover" => Some(Self::MouseOver),
            "mouseout" => Some(Self::MouseOut),
            "mousedown" => Some(Self::MouseDown),
            _ => None,
        }
    }
}

/// A DOM-style pointer event delivered to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentEvent {
    TouchStart { target: NodeId },
    TouchEnd { target: NodeId },
    TouchCancel { target: NodeId },
    MouseOver { target: NodeId },
    /// `related` is the node the pointer moved to, `None` when it left the page.
    MouseOut {
        target: NodeId,
        related: Option<NodeId>,
    },
    MouseDown { target: NodeId },
}

impl IntentEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::TouchStart { .. } => EventKind::TouchStart,
            Self::TouchEnd { .. } => EventKind::TouchEnd,
            Self::TouchCancel { .. } => EventKind::TouchCancel,
            Self::MouseOver { .. } => EventKind::MouseOver,
            Self::MouseOut { .. } => EventKind::MouseOut,
            Self::MouseDown { .. } => EventKind::MouseDown,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingHover {
    deadline: Instant,
    url: Url,
}

/// Intent detector bound to one prefetch hint.
///
/// Built by [`InstantPage::install`]; starts attached. Handlers take the
/// document by reference so the detector never owns the page.
pub struct InstantPage<H: PrefetchHint> {
    config: PrefetchConfig,
    hint: H,
    attached: bool,
    /// Timestamp of the last touchstart, for synthetic-hover suppression.
    last_touch: Option<Instant>,
    pending_hover: Option<PendingHover>,
    /// URL most recently selected by a gesture.
    targeted: Option<Url>,
    /// Links with touchend/touchcancel listeners.
    touch_armed: HashSet<NodeId>,
    /// Links with a mouseout listener.
    mouseout_armed: HashSet<NodeId>,
}

impl<H: PrefetchHint> InstantPage<H> {
    /// Installs the detector, or returns `None` when the runtime cannot
    /// prefetch or the user asked to save data.
    pub fn install(config: PrefetchConfig, environment: Environment, mut hint: H) -> Option<Self> {
        if !environment.allows_prefetch() {
            info!(
                supports_prefetch = environment.supports_prefetch,
                save_data = environment.save_data,
                "Prefetch unavailable, intent detector not installed"
            );
            return None;
        }

        hint.mount();

        let page = Self {
            config,
            hint,
            attached: true,
            last_touch: None,
            pending_hover: None,
            targeted: None,
            touch_armed: HashSet::new(),
            mouseout_armed: HashSet::new(),
        };

        info!(
            delay_on_hover_ms = page.config.delay_on_hover_ms,
            subscriptions = ?page.subscriptions(),
            "Intent detector installed"
        );

        Some(page)
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    /// Stops listening. Any pending hover is dropped and the hint cleared.
    pub fn detach(&mut self) {
        self.attached = false;
        self.pending_hover = None;
        self.targeted = None;
        self.touch_armed.clear();
        self.mouseout_armed.clear();
        self.clear_prefetch();
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn config(&self) -> &PrefetchConfig {
        &self.config
    }

    pub fn hint(&self) -> &H {
        &self.hint
    }

    pub fn targeted_url(&self) -> Option<&Url> {
        self.targeted.as_ref()
    }

    pub fn has_pending_hover(&self) -> bool {
        self.pending_hover.is_some()
    }

    /// Document-level listeners currently registered.
    pub fn subscriptions(&self) -> Vec<EventKind> {
        if !self.attached {
            return Vec::new();
        }
        let mut kinds = Vec::with_capacity(2);
        if !self.config.use_mousedown_only {
            kinds.push(EventKind::TouchStart);
        }
        if self.config.mousedown_trigger() {
            kinds.push(EventKind::MouseDown);
        } else {
            kinds.push(EventKind::MouseOver);
        }
        kinds
    }

    /// Routes `event` to its handler. Document-level kinds are dropped when
    /// not subscribed; link-level kinds only act on armed links.
    pub fn handle(&mut self, doc: &impl Document, event: IntentEvent, now: Instant) {
        if !self.attached {
            return;
        }
        match event {
            IntentEvent::TouchStart { target } => {
                if self.listens(EventKind::TouchStart) {
                    self.on_touch_start(doc, target, now);
                }
            }
            IntentEvent::MouseOver { target } => {
                if self.listens(EventKind::MouseOver) {
                    self.on_mouse_over(doc, target, now);
                }
            }
            IntentEvent::MouseDown { target } => {
                if self.listens(EventKind::MouseDown) {
                    self.on_mouse_down(doc, target);
                }
            }
            IntentEvent::TouchEnd { target } => self.on_touch_end(doc, target),
            IntentEvent::TouchCancel { target } => self.on_touch_cancel(doc, target),
            IntentEvent::MouseOut { target, related } => self.on_mouse_out(doc, target, related),
        }
    }

    fn listens(&self, kind: EventKind) -> bool {
        self.subscriptions().contains(&kind)
    }

    pub fn on_touch_start(&mut self, doc: &impl Document, target: NodeId, now: Instant) {
        if !self.attached {
            return;
        }
        // Recorded before the eligibility check: the synthetic mouseover
        // follows any touch, link or not.
        self.last_touch = Some(now);

        let Some((node, url)) = self.eligible_link(doc, target) else {
            return;
        };

        self.touch_armed.insert(node);
        self.targeted = Some(url.clone());
        self.set_prefetch(&url);
    }

    pub fn on_touch_end(&mut self, doc: &impl Document, target: NodeId) {
        self.touch_released(doc, target, EventKind::TouchEnd);
    }

    pub fn on_touch_cancel(&mut self, doc: &impl Document, target: NodeId) {
        self.touch_released(doc, target, EventKind::TouchCancel);
    }

    fn touch_released(&mut self, doc: &impl Document, target: NodeId, kind: EventKind) {
        if !self.attached {
            return;
        }
        let Some(link) = doc.closest_link(target) else {
            return;
        };
        if !self.touch_armed.contains(&link.node) {
            return;
        }
        trace!(event = kind.as_str(), node = link.node.0, "Touch released");
        self.targeted = None;
        self.clear_prefetch();
    }

    pub fn on_mouse_over(&mut self, doc: &impl Document, target: NodeId, now: Instant) {
        if !self.attached {
            return;
        }
        if let Some(touched) = self.last_touch
            && now.saturating_duration_since(touched) < TOUCH_HOVER_SUPPRESSION
        {
            trace!(node = target.0, "Mouseover right after touch ignored");
            return;
        }

        let Some((node, url)) = self.eligible_link(doc, target) else {
            return;
        };

        self.mouseout_armed.insert(node);
        self.targeted = Some(url.clone());
        let deadline = now + self.config.delay_on_hover();
        debug!(url = %url, delay_ms = self.config.delay_on_hover_ms, "Hover prefetch armed");
        self.pending_hover = Some(PendingHover { deadline, url });
    }

    pub fn on_mouse_down(&mut self, doc: &impl Document, target: NodeId) {
        if !self.attached {
            return;
        }
        let Some((node, url)) = self.eligible_link(doc, target) else {
            return;
        };

        self.mouseout_armed.insert(node);
        self.targeted = Some(url.clone());
        self.set_prefetch(&url);
    }

    pub fn on_mouse_out(&mut self, doc: &impl Document, target: NodeId, related: Option<NodeId>) {
        if !self.attached {
            return;
        }
        let Some(link) = doc.closest_link(target) else {
            return;
        };
        if !self.mouseout_armed.contains(&link.node) {
            return;
        }
        // Moving between children of the same link is not leaving it.
        if let Some(related) = related
            && doc.closest_link(related).map(|l| l.node) == Some(link.node)
        {
            return;
        }

        if self.pending_hover.take().is_some() {
            debug!(node = link.node.0, "Hover prefetch cancelled");
        }
        self.targeted = None;
        self.clear_prefetch();
    }

    /// When the pending hover prefetch is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_hover.as_ref().map(|p| p.deadline)
    }

    /// Fires the pending hover prefetch if its deadline has passed.
    /// Returns `true` when a prefetch started.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.pending_hover.as_ref().is_some_and(|p| p.deadline <= now) {
            return false;
        }
        let Some(pending) = self.pending_hover.take() else {
            return false;
        };
        self.set_prefetch(&pending.url);
        true
    }

    /// Returns the resolved link around `target` if it passes the filter.
    fn eligible_link(&self, doc: &impl Document, target: NodeId) -> Option<(NodeId, Url)> {
        let link = doc.closest_link(target);
        if let Err(reason) = eligibility::check(
            link.as_ref(),
            doc.location(),
            self.targeted.as_ref(),
            &self.config,
        ) {
            trace!(node = target.0, ?reason, "Link not prefetched");
            return None;
        }
        let link = link?;
        Some((link.node, link.href?))
    }

    pub fn set_prefetch(&mut self, url: &Url) {
        debug!(url = %url, "Prefetch started");
        self.hint.set_href(url);
    }

    pub fn clear_prefetch(&mut self) {
        if self.hint.href().is_some() {
            debug!("Prefetch stopped");
        }
        self.hint.remove_href();
    }
}
