//! A* pathfinding for battle grids
//!
//! 8-connected movement: cardinal steps cost 1.0, diagonal steps cost the
//! configured diagonal cost. Diagonals may not cut past a blocking corner.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

use ahash::AHashMap;
use ordered_float::OrderedFloat;

use crate::battle::constants::CARDINAL_MOVEMENT_COST;
use crate::battle::coord::GridCoord;
use crate::battle::grid::BattleGrid;
use crate::core::error::PathNotFound;

const COST_EPSILON: f32 = 1e-4;

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    coord: GridCoord,
    g_cost: f32,
    f_cost: OrderedFloat<f32>,   // g_cost + heuristic
    straight: OrderedFloat<f32>, // euclidean distance to goal, first tie-break
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap: lowest f, then closest to goal, then lowest (x, y)
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.straight.cmp(&self.straight))
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cost of a single step between adjacent cells
pub fn step_cost(from: GridCoord, to: GridCoord, diagonal_cost: f32) -> f32 {
    if from.x != to.x && from.y != to.y {
        diagonal_cost
    } else {
        CARDINAL_MOVEMENT_COST
    }
}

/// Can a unit step from `from` onto the adjacent cell `to`?
///
/// The destination must be walkable; a diagonal step also needs both
/// flanking orthogonal cells free of blocking terrain.
pub fn can_step(grid: &BattleGrid, from: GridCoord, to: GridCoord) -> bool {
    if !from.is_adjacent(&to) || !grid.is_walkable(to) {
        return false;
    }
    if from.x != to.x && from.y != to.y {
        let side_a = GridCoord::new(to.x, from.y);
        let side_b = GridCoord::new(from.x, to.y);
        if grid.blocks_corner(side_a) || grid.blocks_corner(side_b) {
            return false;
        }
    }
    true
}

fn heuristic(from: GridCoord, goal: GridCoord) -> f32 {
    from.chebyshev(&goal) as f32
}

/// Find path using A* algorithm
///
/// Returns the cells from `start` to `goal` inclusive, or None if the goal is
/// not walkable or cannot be reached within `max_cost`.
pub fn find_path(
    grid: &BattleGrid,
    start: GridCoord,
    goal: GridCoord,
    max_cost: f32,
    diagonal_cost: f32,
) -> Option<Vec<GridCoord>> {
    if start == goal {
        return Some(vec![start]);
    }
    if !grid.in_bounds(start) || !grid.is_walkable(goal) {
        return None;
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<GridCoord, GridCoord> = AHashMap::new();
    let mut g_scores: AHashMap<GridCoord, f32> = AHashMap::new();

    g_scores.insert(start, 0.0);
    open_set.push(PathNode {
        coord: start,
        g_cost: 0.0,
        f_cost: OrderedFloat(heuristic(start, goal)),
        straight: OrderedFloat(start.euclidean(&goal)),
    });

    while let Some(current) = open_set.pop() {
        if current.coord == goal {
            return Some(reconstruct_path(&came_from, current.coord));
        }

        let best_g = *g_scores.get(&current.coord).unwrap_or(&f32::INFINITY);
        if current.g_cost > best_g + COST_EPSILON {
            continue; // stale entry
        }

        for neighbor in current.coord.neighbors() {
            if !can_step(grid, current.coord, neighbor) {
                continue;
            }

            let tentative_g = current.g_cost + step_cost(current.coord, neighbor, diagonal_cost);
            if tentative_g > max_cost + COST_EPSILON {
                continue;
            }

            let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&f32::INFINITY);
            if tentative_g + COST_EPSILON < neighbor_g {
                came_from.insert(neighbor, current.coord);
                g_scores.insert(neighbor, tentative_g);

                open_set.push(PathNode {
                    coord: neighbor,
                    g_cost: tentative_g,
                    f_cost: OrderedFloat(tentative_g + heuristic(neighbor, goal)),
                    straight: OrderedFloat(neighbor.euclidean(&goal)),
                });
            }
        }
    }

    None // No path found
}

/// Same as `find_path` but reports failure as a typed error
pub fn plan_route(
    grid: &BattleGrid,
    start: GridCoord,
    goal: GridCoord,
    max_cost: f32,
    diagonal_cost: f32,
) -> Result<Vec<GridCoord>, PathNotFound> {
    find_path(grid, start, goal, max_cost, diagonal_cost).ok_or(PathNotFound {
        from: start,
        to: goal,
    })
}

/// Reconstruct path from came_from map
fn reconstruct_path(
    came_from: &AHashMap<GridCoord, GridCoord>,
    mut current: GridCoord,
) -> Vec<GridCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Calculate path cost: `k × diagonal + m × cardinal`
pub fn path_cost(path: &[GridCoord], diagonal_cost: f32) -> f32 {
    path.windows(2)
        .map(|step| step_cost(step[0], step[1], diagonal_cost))
        .sum()
}

/// Every cell reachable from `start` within `max_cost`, with its cheapest cost
///
/// Includes `start` at cost 0. Ordered by coordinate.
pub fn reachable_cells(
    grid: &BattleGrid,
    start: GridCoord,
    max_cost: f32,
    diagonal_cost: f32,
) -> BTreeMap<GridCoord, f32> {
    let mut costs: BTreeMap<GridCoord, f32> = BTreeMap::new();
    let mut frontier = BinaryHeap::new();

    costs.insert(start, 0.0);
    frontier.push(Reverse((OrderedFloat(0.0f32), start)));

    while let Some(Reverse((OrderedFloat(cost), coord))) = frontier.pop() {
        if cost > *costs.get(&coord).unwrap_or(&f32::INFINITY) + COST_EPSILON {
            continue;
        }
        for neighbor in coord.neighbors() {
            if !can_step(grid, coord, neighbor) {
                continue;
            }
            let next = cost + step_cost(coord, neighbor, diagonal_cost);
            if next > max_cost + COST_EPSILON {
                continue;
            }
            if next + COST_EPSILON < *costs.get(&neighbor).unwrap_or(&f32::INFINITY) {
                costs.insert(neighbor, next);
                frontier.push(Reverse((OrderedFloat(next), neighbor)));
            }
        }
    }

    costs
}

/// Best single legal step that gets strictly closer to `goal`
pub fn greedy_step_toward(grid: &BattleGrid, from: GridCoord, goal: GridCoord) -> Option<GridCoord> {
    let current = (from.chebyshev(&goal), OrderedFloat(from.euclidean(&goal)));
    from.neighbors()
        .into_iter()
        .filter(|n| can_step(grid, from, *n))
        .map(|n| ((n.chebyshev(&goal), OrderedFloat(n.euclidean(&goal)), n), n))
        .filter(|((cheb, straight, _), _)| (*cheb, *straight) < current)
        .min_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, n)| n)
}

/// Walk greedily toward `goal` while the budget allows
///
/// Fallback when A* finds no route (e.g. the goal tile is occupied). Always
/// starts with `start`; may contain only `start`.
pub fn greedy_path(
    grid: &BattleGrid,
    start: GridCoord,
    goal: GridCoord,
    max_cost: f32,
    diagonal_cost: f32,
) -> Vec<GridCoord> {
    let mut path = vec![start];
    let mut spent = 0.0;
    let mut current = start;

    while let Some(next) = greedy_step_toward(grid, current, goal) {
        let cost = step_cost(current, next, diagonal_cost);
        if spent + cost > max_cost + COST_EPSILON {
            break;
        }
        spent += cost;
        path.push(next);
        current = next;
    }

    path
}
