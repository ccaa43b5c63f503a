//! Same-depth neighbor resolution over the patch quadtree
//!
//! Siblings are not linked directly, so finding the patch that shares an
//! edge means walking up through the parents and back down the mirrored
//! child slots. A fixed transition table keyed by (quadrant, direction)
//! drives the walk: an entry with no direction stays within the current
//! parent, an entry with a direction continues the lookup one level up.
//! Running off the root means the edge borders the terrain boundary.

use super::patch::{PatchId, PatchTree};

/// Cardinal direction of a shared patch edge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    South = 0,
    East = 1,
    North = 2,
    West = 3,
}

use Direction::{East, North, South, West};

/// `TRANSITIONS[quadrant][direction] = (child slot in the resolved
/// parent, direction to keep resolving upward)`.
///
/// Quadrant layout: 0 = south-west, 1 = south-east, 2 = north-west,
/// 3 = north-east.
const TRANSITIONS: [[(usize, Option<Direction>); 4]; 4] = [
    [(2, Some(South)), (1, None), (2, None), (1, Some(West))],
    [(3, Some(South)), (0, Some(East)), (3, None), (0, None)],
    [(0, None), (3, None), (0, Some(North)), (3, Some(West))],
    [(1, None), (2, Some(East)), (1, Some(North)), (2, None)],
];

/// Outward edge directions stored per child slot: `neighbors[0]` holds
/// the south/north neighbor, `neighbors[1]` the west/east one.
const CHILD_DIRECTIONS: [(Direction, Direction); 4] = [
    (South, West),
    (South, East),
    (North, West),
    (North, East),
];

fn navigate(tree: &PatchTree, node: Option<PatchId>, dir: Option<Direction>) -> Option<PatchId> {
    let id = node?;
    let Some(dir) = dir else {
        return Some(id);
    };
    let (slot, next) = TRANSITIONS[tree.patch(id).quadrant()][dir as usize];
    let up = navigate(tree, tree.patch(id).parent, next)?;
    tree.patch(up).children[slot]
}

/// Find the same-depth neighbor of `id` in the given direction.
/// `None` when the edge lies on the terrain boundary.
pub fn neighbor(tree: &PatchTree, id: PatchId, dir: Direction) -> Option<PatchId> {
    navigate(tree, Some(id), Some(dir))
}

/// Resolve and store the two outward-edge neighbors for every descendant
/// of `id`. Run once after the hierarchy is loaded; topology never
/// changes afterward.
pub fn assign_neighbors(tree: &mut PatchTree, id: PatchId) {
    let children = tree.patch(id).children;
    for (slot, child) in children.into_iter().enumerate() {
        let Some(child) = child else { continue };
        let (d0, d1) = CHILD_DIRECTIONS[slot];
        let n0 = neighbor(tree, child, d0);
        let n1 = neighbor(tree, child, d1);
        tree.patch_mut(child).neighbors = [n0, n1];
        assign_neighbors(tree, child);
    }
}
