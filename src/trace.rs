//! Scripted gesture traces.
//!
//! A trace describes a page (location and node tree) and a timed list of
//! pointer events. Replaying it drives a real [`InstantPage`] against a
//! [`StaticDocument`] and records every change of the prefetch hint, which
//! makes the detector's behavior inspectable without a browser.
//!
//! ```toml
//! location = "https://example.com/"
//!
//! [prefetch]
//! delay_on_hover_ms = 100
//!
//! [[node]]
//! id = 0
//!
//! [[node]]
//! id = 1
//! parent = 0
//! href = "/docs"
//!
//! [[event]]
//! at_ms = 0
//! kind = "mouseover"
//! target = 1
//! ```

use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::{ConfigOverrides, PrefetchConfig};
use crate::document::{Environment, NodeId, StaticDocument};
use crate::hint::{HeadLinkHint, PrefetchHint};
use crate::intent::{EventKind, InstantPage, IntentEvent};

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Invalid trace file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid page location: {0}")]
    Location(#[from] url::ParseError),

    #[error("Node {0} declared twice")]
    DuplicateNode(u32),

    #[error("Unknown node {0}")]
    UnknownNode(u32),

    #[error("Unknown event kind '{0}'")]
    UnknownEvent(String),

    #[error("Event '{0}' needs no related target")]
    UnexpectedRelated(String),
}

#[derive(Debug, Deserialize)]
struct TraceFile {
    location: String,
    #[serde(default)]
    environment: EnvironmentEntry,
    #[serde(default)]
    prefetch: ConfigOverrides,
    #[serde(default, rename = "node")]
    nodes: Vec<NodeEntry>,
    #[serde(default, rename = "event")]
    events: Vec<EventEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EnvironmentEntry {
    supports_prefetch: bool,
    save_data: bool,
}

impl Default for EnvironmentEntry {
    fn default() -> Self {
        Self {
            supports_prefetch: true,
            save_data: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    id: u32,
    parent: Option<u32>,
    /// Present (even empty) only on anchors.
    href: Option<String>,
    #[serde(default)]
    anchor: bool,
    #[serde(default)]
    instant: bool,
    #[serde(default)]
    no_instant: bool,
}

#[derive(Debug, Deserialize)]
struct EventEntry {
    at_ms: u64,
    kind: String,
    target: u32,
    related: Option<u32>,
}

/// An event scheduled at an offset from the start of the replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    pub at: Duration,
    pub event: IntentEvent,
}

/// A parsed, validated trace.
#[derive(Debug, Clone)]
pub struct Trace {
    pub document: StaticDocument,
    pub environment: Environment,
    pub overrides: ConfigOverrides,
    /// Sorted by time; equal times keep file order.
    pub events: Vec<TimedEvent>,
}

/// One change of the hint `href`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintTransition {
    pub at: Duration,
    /// `None` when the href was removed.
    pub href: Option<Url>,
}

impl fmt::Display for HintTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.href {
            Some(ref url) => write!(f, "{:>6} ms  prefetch {}", self.at.as_millis(), url),
            None => write!(f, "{:>6} ms  clear", self.at.as_millis()),
        }
    }
}

/// Outcome of a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    /// `false` when the environment refused the install.
    pub installed: bool,
    pub transitions: Vec<HintTransition>,
}

impl Trace {
    pub fn parse(content: &str) -> Result<Self, TraceError> {
        let file: TraceFile = toml::from_str(content)?;
        let location = Url::parse(&file.location)?;

        let mut ids = HashSet::new();
        for node in &file.nodes {
            if !ids.insert(node.id) {
                return Err(TraceError::DuplicateNode(node.id));
            }
        }

        let mut document = StaticDocument::new(location);
        for node in &file.nodes {
            let parent = match node.parent {
                Some(p) if !ids.contains(&p) => return Err(TraceError::UnknownNode(p)),
                p => p.map(NodeId),
            };
            if node.anchor || node.href.is_some() {
                document.add_anchor(
                    NodeId(node.id),
                    parent,
                    node.href.as_deref(),
                    node.instant,
                    node.no_instant,
                );
            } else {
                document.add_element(NodeId(node.id), parent);
            }
        }

        let mut events = file
            .events
            .iter()
            .map(|entry| timed_event(entry, &document))
            .collect::<Result<Vec<_>, _>>()?;
        events.sort_by_key(|e| e.at);

        Ok(Self {
            document,
            environment: Environment {
                supports_prefetch: file.environment.supports_prefetch,
                save_data: file.environment.save_data,
            },
            overrides: file.prefetch,
            events,
        })
    }

    /// Replays the trace with the trace's overrides applied onto `base`.
    pub fn replay(&self, base: &PrefetchConfig) -> Replay {
        let config = self.overrides.apply(base);
        let Some(mut page) = InstantPage::install(config, self.environment, HeadLinkHint::new())
        else {
            return Replay {
                installed: false,
                transitions: Vec::new(),
            };
        };

        let start = Instant::now();
        let mut recorder = Recorder::default();

        for timed in &self.events {
            let now = start + timed.at;
            if let Some(deadline) = page.next_deadline()
                && deadline <= now
            {
                page.poll(deadline);
                recorder.observe(&page, deadline - start);
            }
            debug!(at_ms = timed.at.as_millis() as u64, event = ?timed.event, "Replaying event");
            page.handle(&self.document, timed.event, now);
            recorder.observe(&page, timed.at);
        }

        if let Some(deadline) = page.next_deadline() {
            page.poll(deadline);
            recorder.observe(&page, deadline - start);
        }

        Replay {
            installed: true,
            transitions: recorder.transitions,
        }
    }
}

fn timed_event(entry: &EventEntry, document: &StaticDocument) -> Result<TimedEvent, TraceError> {
    let kind = EventKind::from_name(&entry.kind)
        .ok_or_else(|| TraceError::UnknownEvent(entry.kind.clone()))?;
    let target = known_node(entry.target, document)?;
    let related = entry
        .related
        .map(|id| known_node(id, document))
        .transpose()?;

    if related.is_some() && kind != EventKind::MouseOut {
        return Err(TraceError::UnexpectedRelated(entry.kind.clone()));
    }

    let event = match kind {
        EventKind::TouchStart => IntentEvent::TouchStart { target },
        EventKind::TouchEnd => IntentEvent::TouchEnd { target },
        EventKind::TouchCancel => IntentEvent::TouchCancel { target },
        EventKind::MouseOver => IntentEvent::MouseOver { target },
        EventKind::MouseOut => IntentEvent::MouseOut { target, related },
        EventKind::MouseDown => IntentEvent::MouseDown { target },
    };

    Ok(TimedEvent {
        at: Duration::from_millis(entry.at_ms),
        event,
    })
}

fn known_node(id: u32, document: &StaticDocument) -> Result<NodeId, TraceError> {
    let node = NodeId(id);
    if document.contains_node(node) {
        Ok(node)
    } else {
        Err(TraceError::UnknownNode(id))
    }
}

#[derive(Default)]
struct Recorder {
    last: Option<Url>,
    transitions: Vec<HintTransition>,
}

impl Recorder {
    fn observe<H: PrefetchHint>(&mut self, page: &InstantPage<H>, at: Duration) {
        let current = page.hint().href().cloned();
        if current != self.last {
            self.transitions.push(HintTransition {
                at,
                href: current.clone(),
            });
            self.last = current;
        }
    }
}
