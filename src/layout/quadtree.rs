//! Barnes-Hut quadtree used for node repulsion.
//!
//! Distant groups of bodies are approximated by their center of mass, which
//! brings the repulsion pass from O(n²) down to O(n log n).

use egui::{Pos2, Rect, Vec2};

/// Recursion cap; coincident bodies would otherwise split forever
const MAX_DEPTH: u32 = 48;

/// Padding around the bodies when sizing the root cell
const ROOT_PADDING: f32 = 100.0;

#[derive(Debug, Default)]
enum Cell {
    #[default]
    Empty,
    Body {
        pos: Pos2,
        mass: f32,
    },
    Split {
        center_of_mass: Pos2,
        mass: f32,
        /// NW, NE, SW, SE
        quadrants: Box<[Cell; 4]>,
    },
}

impl Cell {
    fn mass(&self) -> f32 {
        match self {
            Cell::Empty => 0.0,
            Cell::Body { mass, .. } | Cell::Split { mass, .. } => *mass,
        }
    }
}

fn quadrant_of(bounds: Rect, pos: Pos2) -> usize {
    let center = bounds.center();
    match (pos.y >= center.y, pos.x >= center.x) {
        (false, false) => 0,
        (false, true) => 1,
        (true, false) => 2,
        (true, true) => 3,
    }
}

fn quadrant_bounds(bounds: Rect, quadrant: usize) -> Rect {
    let c = bounds.center();
    match quadrant {
        0 => Rect::from_min_max(bounds.min, c),
        1 => Rect::from_min_max(Pos2::new(c.x, bounds.min.y), Pos2::new(bounds.max.x, c.y)),
        2 => Rect::from_min_max(Pos2::new(bounds.min.x, c.y), Pos2::new(c.x, bounds.max.y)),
        _ => Rect::from_min_max(c, bounds.max),
    }
}

fn weighted(a: Pos2, a_mass: f32, b: Pos2, b_mass: f32) -> Pos2 {
    let total = a_mass + b_mass;
    Pos2::new(
        (a.x * a_mass + b.x * b_mass) / total,
        (a.y * a_mass + b.y * b_mass) / total,
    )
}

/// Repulsion tree over a snapshot of body positions and masses
pub struct Quadtree {
    root: Cell,
    bounds: Rect,
    /// Cell size / distance threshold under which a cell is approximated
    theta: f32,
}

impl Quadtree {
    pub fn build(bodies: &[(Pos2, f32)], theta: f32) -> Self {
        let mut bounds = Rect::NOTHING;
        for (pos, _) in bodies {
            bounds.extend_with(*pos);
        }
        let bounds = if bodies.is_empty() {
            Rect::from_min_max(Pos2::ZERO, Pos2::ZERO)
        } else {
            let padded = bounds.expand(ROOT_PADDING);
            let side = padded.width().max(padded.height());
            Rect::from_min_size(padded.min, Vec2::splat(side))
        };

        let mut tree = Self {
            root: Cell::Empty,
            bounds,
            theta,
        };
        for &(pos, mass) in bodies {
            let root = std::mem::take(&mut tree.root);
            tree.root = insert(root, pos, mass, tree.bounds, 0);
        }
        tree
    }

    pub fn total_mass(&self) -> f32 {
        self.root.mass()
    }

    /// Repulsive force felt by a body at `pos` (Coulomb: k·m / r²)
    pub fn repulsion(&self, pos: Pos2, strength: f32, min_distance: f32) -> Vec2 {
        self.force_from(&self.root, self.bounds, pos, strength, min_distance)
    }

    fn force_from(&self, cell: &Cell, bounds: Rect, pos: Pos2, strength: f32, min_distance: f32) -> Vec2 {
        match cell {
            Cell::Empty => Vec2::ZERO,
            Cell::Body { pos: other, mass } => {
                let delta = pos - *other;
                // The body itself
                if delta.length() < 0.01 {
                    return Vec2::ZERO;
                }
                push_away(delta, *mass, strength, min_distance)
            }
            Cell::Split {
                center_of_mass,
                mass,
                quadrants,
            } => {
                let delta = pos - *center_of_mass;
                let distance = delta.length().max(min_distance);
                let side = bounds.width().max(bounds.height());
                if side / distance < self.theta {
                    push_away(delta, *mass, strength, min_distance)
                } else {
                    quadrants
                        .iter()
                        .enumerate()
                        .map(|(q, child)| {
                            self.force_from(child, quadrant_bounds(bounds, q), pos, strength, min_distance)
                        })
                        .fold(Vec2::ZERO, |acc, f| acc + f)
                }
            }
        }
    }
}

fn push_away(delta: Vec2, mass: f32, strength: f32, min_distance: f32) -> Vec2 {
    let distance = delta.length().max(min_distance);
    let magnitude = strength * mass / (distance * distance);
    // distance is clamped, so no division by zero here
    (delta / distance) * magnitude
}

fn insert(cell: Cell, pos: Pos2, mass: f32, bounds: Rect, depth: u32) -> Cell {
    if depth > MAX_DEPTH {
        return cell;
    }
    match cell {
        Cell::Empty => Cell::Body { pos, mass },
        Cell::Body {
            pos: existing,
            mass: existing_mass,
        } => {
            let mut quadrants: Box<[Cell; 4]> = Box::default();
            let eq = quadrant_of(bounds, existing);
            quadrants[eq] = Cell::Body {
                pos: existing,
                mass: existing_mass,
            };
            let nq = quadrant_of(bounds, pos);
            let taken = std::mem::take(&mut quadrants[nq]);
            quadrants[nq] = insert(taken, pos, mass, quadrant_bounds(bounds, nq), depth + 1);
            Cell::Split {
                center_of_mass: weighted(existing, existing_mass, pos, mass),
                mass: existing_mass + mass,
                quadrants,
            }
        }
        Cell::Split {
            center_of_mass,
            mass: total,
            mut quadrants,
        } => {
            let q = quadrant_of(bounds, pos);
            let taken = std::mem::take(&mut quadrants[q]);
            quadrants[q] = insert(taken, pos, mass, quadrant_bounds(bounds, q), depth + 1);
            Cell::Split {
                center_of_mass: weighted(center_of_mass, total, pos, mass),
                mass: total + mass,
                quadrants,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_keeps_all_mass() {
        let bodies = vec![
            (Pos2::new(0.0, 0.0), 1.0),
            (Pos2::new(100.0, 0.0), 2.0),
            (Pos2::new(0.0, 100.0), 1.0),
            (Pos2::new(100.0, 100.0), 1.5),
        ];
        let tree = Quadtree::build(&bodies, 1.0);
        assert!((tree.total_mass() - 5.5).abs() < 1e-4);
    }

    #[test]
    fn test_repulsion_points_away() {
        let bodies = vec![(Pos2::new(0.0, 0.0), 1.0), (Pos2::new(100.0, 0.0), 1.0)];
        let tree = Quadtree::build(&bodies, 1.0);

        let force = tree.repulsion(Pos2::new(0.0, 0.0), 1000.0, 1.0);
        assert!(force.x < 0.0, "expected push to the left: {:?}", force);
        assert!(force.y.abs() < 1e-4);
    }

    #[test]
    fn test_empty_tree_has_no_force() {
        let tree = Quadtree::build(&[], 1.0);
        assert_eq!(tree.repulsion(Pos2::new(5.0, 5.0), 1000.0, 1.0), Vec2::ZERO);
    }
}
