//! Conversion des événements pointeur Winit en événements d'intention.
//!
//! Winit ne connaît que des positions (curseur, doigts) ; le détecteur attend
//! des événements DOM (`mouseover`, `mouseout`, `touchstart`…) sur des nœuds.
//! Le [`PointerTracker`] fait le pont : un [`HitTest`] fourni par l'hôte
//! (layout du moteur) donne le nœud sous un point, et le tracker synthétise
//! les transitions de survol comme le ferait un navigateur.
//!
//! Les coordonnées sont celles de la fenêtre ; la zone au-dessus de
//! `content_top` (barre d'URL) n'appartient pas à la page.

use std::collections::HashMap;

use euclid::default::Point2D;
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, Touch, TouchPhase, WindowEvent};

use crate::document::NodeId;
use crate::intent::IntentEvent;

/// Host hit test: the innermost node at a point of the page content.
pub trait HitTest {
    fn node_at(&self, point: Point2D<f32>) -> Option<NodeId>;
}

impl<F> HitTest for F
where
    F: Fn(Point2D<f32>) -> Option<NodeId>,
{
    fn node_at(&self, point: Point2D<f32>) -> Option<NodeId> {
        self(point)
    }
}

/// Tracks the hovered node and active touches across window events.
#[derive(Debug, Default)]
pub struct PointerTracker {
    /// Window y coordinate where page content starts.
    content_top: f32,
    hovered: Option<NodeId>,
    /// Touch id → node under the finger at touchstart.
    touches: HashMap<u64, NodeId>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker for a window whose top `content_top` pixels are browser chrome.
    pub fn with_content_top(content_top: f32) -> Self {
        Self {
            content_top,
            ..Self::default()
        }
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    /// Translates one winit event. Most events produce nothing.
    pub fn translate(&mut self, event: &WindowEvent, hit: &impl HitTest) -> Vec<IntentEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => self.cursor_moved(*position, hit),
            WindowEvent::CursorLeft { .. } => self.cursor_left(),
            WindowEvent::MouseInput { state, button, .. } => self.mouse_input(*state, *button),
            WindowEvent::Touch(Touch {
                phase,
                location,
                id,
                ..
            }) => self.touch(*phase, *id, *location, hit),
            _ => Vec::new(),
        }
    }

    pub fn cursor_moved(
        &mut self,
        position: PhysicalPosition<f64>,
        hit: &impl HitTest,
    ) -> Vec<IntentEvent> {
        let node = self.content_point(position).and_then(|p| hit.node_at(p));
        self.hover(node)
    }

    pub fn cursor_left(&mut self) -> Vec<IntentEvent> {
        self.hover(None)
    }

    pub fn mouse_input(&mut self, state: ElementState, button: MouseButton) -> Vec<IntentEvent> {
        match (state, button, self.hovered) {
            (ElementState::Pressed, MouseButton::Left, Some(target)) => {
                vec![IntentEvent::MouseDown { target }]
            }
            _ => Vec::new(),
        }
    }

    pub fn touch(
        &mut self,
        phase: TouchPhase,
        id: u64,
        location: PhysicalPosition<f64>,
        hit: &impl HitTest,
    ) -> Vec<IntentEvent> {
        match phase {
            TouchPhase::Started => {
                let Some(target) = self.content_point(location).and_then(|p| hit.node_at(p))
                else {
                    return Vec::new();
                };
                self.touches.insert(id, target);
                vec![IntentEvent::TouchStart { target }]
            }
            // Touch events keep targeting the node where the touch began.
            TouchPhase::Moved => Vec::new(),
            TouchPhase::Ended => self
                .touches
                .remove(&id)
                .map(|target| vec![IntentEvent::TouchEnd { target }])
                .unwrap_or_default(),
            TouchPhase::Cancelled => self
                .touches
                .remove(&id)
                .map(|target| vec![IntentEvent::TouchCancel { target }])
                .unwrap_or_default(),
        }
    }

    fn hover(&mut self, node: Option<NodeId>) -> Vec<IntentEvent> {
        if node == self.hovered {
            return Vec::new();
        }
        let mut events = Vec::with_capacity(2);
        if let Some(previous) = self.hovered {
            events.push(IntentEvent::MouseOut {
                target: previous,
                related: node,
            });
        }
        if let Some(target) = node {
            events.push(IntentEvent::MouseOver { target });
        }
        self.hovered = node;
        events
    }

    fn content_point(&self, position: PhysicalPosition<f64>) -> Option<Point2D<f32>> {
        let y = position.y as f32;
        if y < self.content_top {
            return None;
        }
        Some(Point2D::new(position.x as f32, y - self.content_top))
    }
}
