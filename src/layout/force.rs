//! Force-directed layout engine.
//!
//! Implements a simple force-directed layout with:
//! - Repulsion between all nodes (Coulomb's law), O(n log n) via Barnes-Hut
//! - Attraction along links (Hooke's law)
//! - Centering force toward the origin
//! - Damping to settle the simulation
//!
//! Heavier (larger) boxes push harder and move less. Pinned nodes sit at the
//! origin and never move. The engine keeps simulating while the graph is
//! still loading; once the graph is ready it counts iterations, reports
//! completion, and raises [`LayoutEvent::Ready`] when the simulation settles
//! or the iteration cap is hit.

use super::quadtree::Quadtree;
use super::{LayoutEngine, LayoutEvent, LayoutFactory};
use crate::events::{EventBus, Subscription, SubscriptionId};
use crate::graph::{GraphNode, SharedGraph};
use crate::progress::SharedProgress;
use crate::render::style::NodeUiAttributes;
use egui::{Pos2, Vec2};
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f32::consts::TAU;

/// Where pinned nodes are held
const PIN_POSITION: Pos2 = Pos2::ZERO;

/// Force-directed layout parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceParams {
    /// Repulsion strength between nodes
    pub repulsion: f32,
    /// Attraction strength along links
    pub attraction: f32,
    /// Centering force strength
    pub centering: f32,
    /// Damping factor (0.0 - 1.0)
    pub damping: f32,
    /// Minimum distance to prevent division by zero
    pub min_distance: f32,
    /// Maximum velocity
    pub max_velocity: f32,
    /// Ideal link length
    pub ideal_length: f32,
    /// How much box area affects mass (0 = uniform)
    pub size_physics_weight: f32,
    /// Barnes-Hut approximation threshold
    pub theta: f32,
    /// Average velocity under which the layout counts as settled
    pub settle_velocity: f32,
    /// Iterations after the graph is ready before giving up on settling
    pub max_iterations: u32,
    /// New nodes appear within this distance of the origin
    pub spawn_radius: f32,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            repulsion: 12000.0,
            attraction: 0.08,
            centering: 0.0002,
            damping: 0.88,
            min_distance: 30.0,
            max_velocity: 50.0,
            ideal_length: 160.0,
            size_physics_weight: 1.0,
            theta: 1.0,
            settle_velocity: 0.5,
            max_iterations: 600,
            spawn_radius: 300.0,
        }
    }
}

struct Body {
    pos: Pos2,
    vel: Vec2,
    /// Box area, drives the mass
    area: f32,
    pinned: bool,
}

pub struct ForceLayoutEngine {
    graph: SharedGraph,
    progress: SharedProgress,
    params: ForceParams,
    bodies: IndexMap<String, Body>,
    /// Ids pinned before or after registration
    pinned: HashSet<String>,
    ready: EventBus<LayoutEvent>,
    graph_ready: bool,
    /// Iterations since the graph became ready
    iteration: u32,
    converged: bool,
}

impl ForceLayoutEngine {
    pub fn new(graph: SharedGraph, progress: SharedProgress, params: ForceParams) -> Self {
        Self {
            graph,
            progress,
            params,
            bodies: IndexMap::new(),
            pinned: HashSet::new(),
            ready: EventBus::new(),
            graph_ready: false,
            iteration: 0,
            converged: false,
        }
    }

    /// Factory producing a fresh engine with `params` for every render cycle
    pub fn factory(params: ForceParams) -> LayoutFactory {
        Box::new(move |graph: &SharedGraph, progress: &SharedProgress| -> Box<dyn LayoutEngine> {
            Box::new(ForceLayoutEngine::new(graph.clone(), progress.clone(), params.clone()))
        })
    }

    pub fn node_count(&self) -> usize {
        self.bodies.len()
    }

    /// Mass of every body, in registration order.
    ///
    /// mass = 1.0 + weight * normalized_area, so at weight 0 all masses are 1.0
    fn masses(&self) -> Vec<f32> {
        let (min_area, max_area) = self
            .bodies
            .values()
            .fold((f32::MAX, 0.0_f32), |(lo, hi), b| (lo.min(b.area), hi.max(b.area)));
        let span = (max_area - min_area).max(0.001);
        self.bodies
            .values()
            .map(|b| {
                let normalized = (b.area - min_area) / span;
                (1.0 + self.params.size_physics_weight * normalized).max(0.1)
            })
            .collect()
    }

    /// One iteration of the force simulation
    fn simulate(&mut self) {
        if self.bodies.is_empty() {
            return;
        }
        let p = &self.params;
        let masses = self.masses();

        let snapshot: Vec<(Pos2, f32)> = self
            .bodies
            .values()
            .zip(&masses)
            .map(|(b, &m)| (b.pos, m))
            .collect();
        let tree = Quadtree::build(&snapshot, p.theta);

        let mut forces: Vec<Vec2> = snapshot
            .iter()
            .map(|&(pos, _)| tree.repulsion(pos, p.repulsion, p.min_distance))
            .collect();

        // Springs along links whose endpoints are both registered.
        // Force scales with the geometric mean of the endpoint masses.
        let bodies = &self.bodies;
        self.graph.borrow().for_each_link(&mut |link| {
            let (Some(a), Some(b)) = (
                bodies.get_index_of(&link.from_id),
                bodies.get_index_of(&link.to_id),
            ) else {
                return;
            };
            if a == b {
                return;
            }
            let delta = snapshot[b].0 - snapshot[a].0;
            let distance = delta.length().max(p.min_distance);
            let displacement = distance - p.ideal_length;
            let mass_factor = (masses[a] * masses[b]).sqrt();
            let force = (delta / distance) * (p.attraction * displacement * mass_factor);
            forces[a] += force;
            forces[b] -= force;
        });

        for (force, &(pos, _)) in forces.iter_mut().zip(&snapshot) {
            *force += (PIN_POSITION - pos) * p.centering;
        }

        // F = ma: light nodes accelerate more from the same force
        for ((body, force), mass) in self.bodies.values_mut().zip(&forces).zip(&masses) {
            if body.pinned {
                continue;
            }
            body.vel = (body.vel + *force / *mass) * p.damping;
            if body.vel.length() > p.max_velocity {
                body.vel = body.vel.normalized() * p.max_velocity;
            }
            body.pos += body.vel;
        }
    }

    /// True once the average velocity of the movable nodes is small
    fn is_settled(&self) -> bool {
        let (total, count) = self
            .bodies
            .values()
            .filter(|b| !b.pinned)
            .fold((0.0, 0usize), |(sum, n), b| (sum + b.vel.length(), n + 1));
        total / (count.max(1) as f32) < self.params.settle_velocity
    }

    fn spawn_position(&self) -> Pos2 {
        let mut rng = rand::thread_rng();
        let angle = rng.gen_range(0.0..TAU);
        let radius = rng.gen_range(0.0..=self.params.spawn_radius.max(1.0));
        PIN_POSITION + Vec2::angled(angle) * radius
    }
}

/// Share of the iteration budget used so far, capped below 100 until convergence
fn completion_percent(iteration: u32, max_iterations: u32) -> u32 {
    let percent = u64::from(iteration) * 100 / u64::from(max_iterations.max(1));
    percent.min(99) as u32
}

impl LayoutEngine for ForceLayoutEngine {
    fn subscribe_ready(&self) -> Subscription<LayoutEvent> {
        self.ready.subscribe()
    }

    fn unsubscribe_ready(&self, id: SubscriptionId) {
        self.ready.unsubscribe(id);
    }

    fn step(&mut self) -> bool {
        if self.converged {
            return false;
        }
        self.simulate();
        if !self.graph_ready {
            return true;
        }

        self.iteration += 1;
        let finished = self.is_settled() || self.iteration >= self.params.max_iterations;
        let percent = if finished {
            100
        } else {
            completion_percent(self.iteration, self.params.max_iterations)
        };
        {
            let mut progress = self.progress.borrow_mut();
            progress.set_layout_iteration(self.iteration);
            progress.set_layout_completion(percent);
        }

        if finished {
            self.converged = true;
            tracing::info!(
                iterations = self.iteration,
                nodes = self.bodies.len(),
                "layout converged"
            );
            self.ready.publish(LayoutEvent::Ready);
            return false;
        }
        true
    }

    fn add_node(&mut self, id: &str, attributes: &NodeUiAttributes) {
        let area = attributes.width * attributes.height;
        if let Some(body) = self.bodies.get_mut(id) {
            body.area = area;
            return;
        }
        let pinned = self.pinned.contains(id);
        let pos = if pinned {
            PIN_POSITION
        } else {
            self.spawn_position()
        };
        self.bodies.insert(
            id.to_string(),
            Body {
                pos,
                vel: Vec2::ZERO,
                area,
                pinned,
            },
        );
    }

    fn pin_node(&mut self, node: &GraphNode) {
        self.pinned.insert(node.id.clone());
        if let Some(body) = self.bodies.get_mut(&node.id) {
            body.pinned = true;
            body.pos = PIN_POSITION;
            body.vel = Vec2::ZERO;
        }
    }

    fn is_pinned(&self, id: &str) -> bool {
        self.pinned.contains(id)
    }

    fn set_graph_ready(&mut self) {
        self.graph_ready = true;
    }

    fn node_position(&self, id: &str) -> Pos2 {
        self.bodies.get(id).map_or(PIN_POSITION, |b| b.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphLink, StreamingGraph};
    use crate::progress::{Phase, ProgressTracker};

    fn attrs(width: f32, height: f32) -> NodeUiAttributes {
        NodeUiAttributes {
            font_size: 12.0,
            width,
            height,
            x: -width / 2.0,
            y: -height / 2.0,
            rx: 2.0,
            ry: 2.0,
            px: 0.0,
            py: 0.0,
            stroke_width: 1.0,
        }
    }

    fn engine_with(links: &[(&str, &str)], ids: &[&str]) -> (ForceLayoutEngine, SharedProgress) {
        let mut graph = StreamingGraph::new(1);
        for id in ids {
            graph.add_node(GraphNode::new(*id, if *id == "root" { 0 } else { 1 }));
        }
        for (from, to) in links {
            graph.add_link(GraphLink::new(*from, *to));
        }
        let graph: SharedGraph = graph.into_shared();
        let progress = ProgressTracker::shared();
        let engine = ForceLayoutEngine::new(graph, progress.clone(), ForceParams::default());
        (engine, progress)
    }

    #[test]
    fn test_pinned_node_never_moves() {
        let (mut engine, _) = engine_with(&[("root", "a"), ("root", "b")], &["root", "a", "b"]);
        engine.pin_node(&GraphNode::new("root", 0));
        for id in ["root", "a", "b"] {
            engine.add_node(id, &attrs(80.0, 20.0));
        }

        let a_before = engine.node_position("a");
        for _ in 0..20 {
            engine.step();
            assert_eq!(engine.node_position("root"), PIN_POSITION);
        }
        assert!(engine.is_pinned("root"));
        assert!(!engine.is_pinned("a"));
        assert_ne!(engine.node_position("a"), a_before);
    }

    #[test]
    fn test_pinning_after_registration_recenters() {
        let (mut engine, _) = engine_with(&[], &["root"]);
        engine.add_node("root", &attrs(40.0, 20.0));
        engine.pin_node(&GraphNode::new("root", 0));
        assert_eq!(engine.node_position("root"), PIN_POSITION);
    }

    #[test]
    fn test_keeps_stepping_until_graph_ready() {
        let (mut engine, _) = engine_with(&[], &["root"]);
        engine.pin_node(&GraphNode::new("root", 0));
        engine.add_node("root", &attrs(40.0, 20.0));
        let ready = engine.subscribe_ready();

        for _ in 0..10 {
            assert!(engine.step());
        }
        assert!(ready.drain().is_empty());
    }

    #[test]
    fn test_ready_fires_once_and_reports_progress() {
        let (mut engine, progress) = engine_with(&[("root", "a")], &["root", "a"]);
        engine.pin_node(&GraphNode::new("root", 0));
        engine.add_node("root", &attrs(40.0, 20.0));
        engine.add_node("a", &attrs(40.0, 20.0));
        let ready = engine.subscribe_ready();
        progress.borrow_mut().start_layout();
        engine.set_graph_ready();

        let mut steps = 0;
        while engine.step() {
            steps += 1;
            assert!(steps <= ForceParams::default().max_iterations);
        }
        assert!(!engine.step());
        assert_eq!(ready.drain(), vec![LayoutEvent::Ready]);

        let state = progress.borrow().snapshot();
        assert_eq!(state.phase, Phase::Layout);
        assert!(state.layout.iteration >= 1);
        assert!(state.message.contains("100"));
    }

    #[test]
    fn test_completion_percent_with_large_budget() {
        assert_eq!(completion_percent(1, u32::MAX), 0);
        assert_eq!(completion_percent(u32::MAX - 1, u32::MAX), 99);
        assert_eq!(completion_percent(50, 200), 25);
        assert_eq!(completion_percent(500, 200), 99);
        assert_eq!(completion_percent(3, 0), 99);
    }

    #[test]
    fn test_settles_when_nodes_stop_moving() {
        let (mut engine, _) = engine_with(&[], &["root", "a"]);
        engine.pin_node(&GraphNode::new("root", 0));
        engine.add_node("root", &attrs(40.0, 20.0));
        engine.add_node("a", &attrs(40.0, 20.0));
        assert!(engine.is_settled());

        engine.bodies.get_mut("a").unwrap().vel = Vec2::new(50.0, 0.0);
        assert!(!engine.is_settled());
    }

    #[test]
    fn test_unknown_node_sits_at_origin() {
        let (engine, _) = engine_with(&[], &[]);
        assert_eq!(engine.node_position("nobody"), PIN_POSITION);
        assert_eq!(engine.node_count(), 0);
    }
}
