// SPDX-License-Identifier: MIT OR Apache-2.0
//! egui front end for wiring gestures.
//!
//! [`ConnectionInteraction`] turns an [`egui::Response`] for the canvas into
//! [`PointerEvent`]s, feeds them to the [`DragMachine`] and paints wires and
//! pins with their connectable highlight. The egui frame loop is the only
//! pointer-move throttle: one move per frame at most.

use crate::connection::{Connection, ConnectionEnd};
use crate::drag::{DisconnectPhase, DragMachine, DragOutcome, DragState, EngineContext, NodeSearchRequest};
use crate::graph::Graph;
use crate::port::{Port, PortDirection, PortKey};
use crate::provider::resolve_port;
use crate::switch::SwitchBehavior;
use egui::{Color32, Pos2, Rect, Stroke, Vec2};

const PORT_RADIUS: f32 = 6.0;
const BEZIER_CURVATURE: f32 = 50.0;
const CONNECTION_THICKNESS: f32 = 2.5;

/// How a pin should be drawn while a gesture or hover is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortHighlight {
    /// Not connectable
    None,
    /// A drop here would append
    Connectable,
    /// A drop here would displace the current connection
    WillReplace,
    /// The port a release would use
    Candidate,
}

/// Pointer input in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Primary button pressed
    Pressed(Pos2),
    /// Pointer moved with the button held
    Moved(Pos2),
    /// Primary button released
    Released,
    /// Pointer moved with no button held
    Hover(Pos2),
    /// Escape pressed
    Cancel,
}

/// Pan and zoom of the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasView {
    /// Pan offset in canvas units
    pub pan: Vec2,
    /// Zoom factor
    pub zoom: f32,
}

impl Default for CanvasView {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl CanvasView {
    /// Screen position to canvas position
    pub fn screen_to_canvas(&self, screen_pos: Pos2, rect: Rect) -> Pos2 {
        let center = rect.center();
        Pos2::new(
            (screen_pos.x - center.x) / self.zoom - self.pan.x,
            (screen_pos.y - center.y) / self.zoom - self.pan.y,
        )
    }

    /// Canvas position to screen position
    pub fn canvas_to_screen(&self, canvas_pos: Pos2, rect: Rect) -> Pos2 {
        let center = rect.center();
        Pos2::new(
            (canvas_pos.x + self.pan.x) * self.zoom + center.x,
            (canvas_pos.y + self.pan.y) * self.zoom + center.y,
        )
    }
}

/// Canvas-side driver of the wiring state machine
#[derive(Debug, Default)]
pub struct ConnectionInteraction {
    machine: DragMachine,
    hovered: Option<PortKey>,
    pending_search: Option<NodeSearchRequest>,
}

impl ConnectionInteraction {
    /// Create an idle interaction
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying machine
    pub fn machine(&self) -> &DragMachine {
        &self.machine
    }

    /// Port under the pointer, outside a gesture
    pub fn hovered(&self) -> Option<&PortKey> {
        self.hovered.as_ref()
    }

    /// Take the node-creation request left by a drop on empty canvas
    pub fn take_search_request(&mut self) -> Option<NodeSearchRequest> {
        self.pending_search.take()
    }

    /// Translate this frame's canvas response into pointer events
    pub fn handle_response(
        &mut self,
        response: &egui::Response,
        view: &CanvasView,
        graph: &mut Graph,
        ctx: &EngineContext<'_>,
    ) -> Option<DragOutcome> {
        let rect = response.rect;
        let to_canvas = |pos: Pos2| view.screen_to_canvas(pos, rect);
        let primary = egui::PointerButton::Primary;
        let mut outcome = None;

        if response.ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            outcome = self.handle_event(PointerEvent::Cancel, graph, ctx);
        }

        if response.drag_started_by(primary) {
            let origin = response.ctx.input(|i| i.pointer.press_origin());
            if let Some(origin) = origin {
                self.handle_event(PointerEvent::Pressed(to_canvas(origin)), graph, ctx);
            }
        }
        if response.dragged_by(primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                self.handle_event(PointerEvent::Moved(to_canvas(pos)), graph, ctx);
            }
        } else if let Some(pos) = response.hover_pos() {
            self.handle_event(PointerEvent::Hover(to_canvas(pos)), graph, ctx);
        }
        if response.drag_stopped_by(primary) {
            outcome = outcome.or(self.handle_event(PointerEvent::Released, graph, ctx));
        }

        outcome
    }

    /// Feed one pointer event to the machine
    pub fn handle_event(
        &mut self,
        event: PointerEvent,
        graph: &mut Graph,
        ctx: &EngineContext<'_>,
    ) -> Option<DragOutcome> {
        match event {
            PointerEvent::Pressed(pos) => {
                let pressed = ctx.geometry.port_at(pos, ctx.config.port_hit_radius)?;
                self.hovered = None;
                self.machine.pointer_down(&pressed, pos, graph, ctx);
                None
            }
            PointerEvent::Moved(pos) => {
                self.machine.pointer_move(pos, graph, ctx);
                None
            }
            PointerEvent::Hover(pos) => {
                if self.machine.is_idle() {
                    let hovered = ctx.geometry.port_at(pos, ctx.config.port_hit_radius);
                    if hovered != self.hovered {
                        self.machine.preview_hover(hovered.as_ref(), graph, ctx);
                        self.hovered = hovered;
                    }
                }
                None
            }
            PointerEvent::Released => {
                let outcome = self.machine.pointer_up(graph, ctx)?;
                if let DragOutcome::SearchFallback(request) = &outcome {
                    self.pending_search = Some(request.clone());
                }
                Some(outcome)
            }
            PointerEvent::Cancel => {
                self.hovered = None;
                self.machine.cancel()
            }
        }
    }

    /// Highlight for a pin
    pub fn highlight(&self, key: &PortKey) -> PortHighlight {
        if self
            .machine
            .candidate()
            .is_some_and(|port| port.node_id == key.node_id && port.id == key.port_id)
        {
            return PortHighlight::Candidate;
        }
        match self.machine.connectable().descriptor(key) {
            Some(descriptor) if descriptor.behavior == SwitchBehavior::Replace => PortHighlight::WillReplace,
            Some(_) => PortHighlight::Connectable,
            None => PortHighlight::None,
        }
    }

    /// Paint committed wires, pins and the wire being dragged
    pub fn paint(&self, painter: &egui::Painter, view: &CanvasView, graph: &Graph, ctx: &EngineContext<'_>) {
        let rect = painter.clip_rect();
        let screen = |pos: Pos2| view.canvas_to_screen(pos, rect);

        for connection in graph.connections() {
            if let Some((from, to)) = wire_ends(connection, ctx) {
                let color = port_color(graph, ctx, &connection.source());
                draw_bezier(painter, view.zoom, screen(from), screen(to), color);
            }
        }

        for node in graph.nodes() {
            for port in ctx.ports.ports_of(node) {
                if let Some(point) = ctx.geometry.connection_point(&port.key()) {
                    self.draw_port(painter, view.zoom, &port, screen(point));
                }
            }
        }

        if let Some((anchor, direction, end)) = self.live_wire() {
            let Some(point) = ctx.geometry.connection_point(anchor) else {
                return;
            };
            let color = port_color(graph, ctx, anchor);
            let (from, to) = match direction {
                PortDirection::Output => (point, end),
                PortDirection::Input => (end, point),
            };
            draw_bezier(painter, view.zoom, screen(from), screen(to), color);
        }
    }

    /// Anchor, anchor direction and loose end of the wire being dragged
    fn live_wire(&self) -> Option<(&PortKey, PortDirection, Pos2)> {
        match self.machine.state() {
            DragState::Idle => None,
            DragState::Connecting(drag) => {
                let direction = self.machine.connectable().source.as_ref().map(|s| s.direction)?;
                Some((&drag.from_port, direction, drag.to_position))
            }
            DragState::Disconnecting(state) if state.phase == DisconnectPhase::Dragging => {
                let direction = match state.disconnected_end {
                    ConnectionEnd::To => PortDirection::Output,
                    ConnectionEnd::From => PortDirection::Input,
                };
                Some((&state.fixed_port, direction, state.dragging_position))
            }
            DragState::Disconnecting(_) => None,
        }
    }

    fn draw_port(&self, painter: &egui::Painter, zoom: f32, port: &Port, pos: Pos2) {
        let radius = PORT_RADIUS * zoom;
        let [r, g, b] = port.color();
        let color = Color32::from_rgb(r, g, b);

        match self.highlight(&port.key()) {
            PortHighlight::None => {
                painter.circle_filled(pos, radius, color);
            }
            PortHighlight::Connectable => {
                painter.circle_filled(pos, radius, color);
                painter.circle_stroke(pos, radius * 1.5, Stroke::new(1.5, Color32::from_gray(220)));
            }
            PortHighlight::WillReplace => {
                painter.circle_filled(pos, radius, color);
                painter.circle_stroke(pos, radius * 1.5, Stroke::new(1.5, Color32::from_rgb(230, 160, 60)));
            }
            PortHighlight::Candidate => {
                painter.circle_filled(pos, radius * 1.3, color);
                painter.circle_stroke(pos, radius * 1.6, Stroke::new(2.0, Color32::WHITE));
            }
        }
        painter.circle_stroke(pos, radius, Stroke::new(1.0, Color32::from_gray(30)));
    }
}

fn wire_ends(connection: &Connection, ctx: &EngineContext<'_>) -> Option<(Pos2, Pos2)> {
    let from = ctx.geometry.connection_point(&connection.source())?;
    let to = ctx.geometry.connection_point(&connection.target())?;
    Some((from, to))
}

fn port_color(graph: &Graph, ctx: &EngineContext<'_>, key: &PortKey) -> Color32 {
    resolve_port(graph, ctx.ports, key).map_or(Color32::GRAY, |port| {
        let [r, g, b] = port.color();
        Color32::from_rgb(r, g, b)
    })
}

fn draw_bezier(painter: &egui::Painter, zoom: f32, from: Pos2, to: Pos2, color: Color32) {
    let distance = (to.x - from.x).abs();
    let curvature = (BEZIER_CURVATURE * zoom).min(distance * 0.5);
    let ctrl1 = Pos2::new(from.x + curvature, from.y);
    let ctrl2 = Pos2::new(to.x - curvature, to.y);

    let points = bezier_points(from, ctrl1, ctrl2, to, 32);
    for pair in points.windows(2) {
        painter.line_segment([pair[0], pair[1]], Stroke::new(CONNECTION_THICKNESS * zoom, color));
    }
}

/// Generate points along a cubic bezier curve
fn bezier_points(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, segments: usize) -> Vec<Pos2> {
    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let mt = 1.0 - t;
            let a = mt * mt * mt;
            let b = 3.0 * mt * mt * t;
            let c = 3.0 * mt * t * t;
            let d = t * t * t;
            Pos2::new(
                a * p0.x + b * p1.x + c * p2.x + d * p3.x,
                a * p0.y + b * p1.y + c * p2.y + d * p3.y,
            )
        })
        .collect()
}
