//! Depth-bounded breadth-first search over tiles that are walkable right now.

use std::collections::VecDeque;
use std::time::Duration;

use bomb_arena_core::CellCoord;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::grid::cardinal_neighbors;
use crate::hazard::HazardPredictor;

const UNVISITED: usize = usize::MAX;

/// Direct-movement planner restricted to open, hazard-free tiles.
///
/// A tile is passable when it is open floor, holds no live hazard and is not
/// predicted dangerous within `horizon`. The start tile is always accepted so
/// an agent standing on its own hazard can still leave it. Neighbour order is
/// shuffled per expansion so equal-length paths carry no directional bias.
#[derive(Clone, Copy, Debug)]
pub struct DirectSearch<'a> {
    predictor: HazardPredictor<'a>,
    max_depth: usize,
    horizon: Duration,
}

impl<'a> DirectSearch<'a> {
    /// Creates a search bounded to `max_depth` steps that avoids tiles
    /// dangerous within `horizon`.
    #[must_use]
    pub fn new(predictor: HazardPredictor<'a>, max_depth: usize, horizon: Duration) -> Self {
        Self {
            predictor,
            max_depth,
            horizon,
        }
    }

    /// Maximum number of steps any returned path may take.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Horizon used to reject tiles about to become dangerous.
    #[must_use]
    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    /// Reports whether the search may step onto `cell`.
    #[must_use]
    pub fn is_passable(&self, cell: CellCoord) -> bool {
        self.predictor.map().is_open(cell)
            && !self.predictor.is_occupied(cell)
            && !self.predictor.is_dangerous(cell, self.horizon)
    }

    /// Expands every tile reachable from `start` within the depth bound.
    pub fn flood<R>(&self, start: CellCoord, rng: &mut R) -> Flood
    where
        R: Rng + ?Sized,
    {
        self.flood_until(start, rng, |_| false)
    }

    fn flood_until<R, F>(&self, start: CellCoord, rng: &mut R, mut stop_at: F) -> Flood
    where
        R: Rng + ?Sized,
        F: FnMut(CellCoord) -> bool,
    {
        let map = self.predictor.map();
        let Some(start_index) = map.index(start) else {
            return Flood::empty();
        };

        let mut parents = vec![UNVISITED; map.len()];
        let mut depths = vec![0_usize; map.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        parents[start_index] = start_index;
        order.push(start);
        queue.push_back(start);

        if stop_at(start) {
            return Flood::new(map.columns(), start, parents, depths, order, Some(start));
        }

        while let Some(cell) = queue.pop_front() {
            let Some(current_index) = map.index(cell) else {
                continue;
            };
            let current_depth = depths[current_index];
            if current_depth >= self.max_depth {
                continue;
            }

            let mut neighbors: Vec<CellCoord> = cardinal_neighbors(map, cell).collect();
            neighbors.shuffle(rng);

            for neighbor in neighbors {
                let Some(neighbor_index) = map.index(neighbor) else {
                    continue;
                };
                if parents[neighbor_index] != UNVISITED {
                    continue;
                }
                if !self.is_passable(neighbor) {
                    continue;
                }

                parents[neighbor_index] = current_index;
                depths[neighbor_index] = current_depth + 1;
                order.push(neighbor);

                if stop_at(neighbor) {
                    return Flood::new(map.columns(), start, parents, depths, order, Some(neighbor));
                }

                queue.push_back(neighbor);
            }
        }

        Flood::new(map.columns(), start, parents, depths, order, None)
    }

    /// Shortest passable path from `start` to `goal`, inclusive on both ends.
    ///
    /// Returns `None` when the start tile is already dangerous, when the goal
    /// is not passable, or when the goal lies beyond the depth bound.
    pub fn path_to<R>(&self, start: CellCoord, goal: CellCoord, rng: &mut R) -> Option<Vec<CellCoord>>
    where
        R: Rng + ?Sized,
    {
        if start != goal && !self.is_passable(goal) {
            return None;
        }
        self.path_to_first(start, |cell| cell == goal, rng)
    }

    /// Shortest passable path from `start` to the nearest tile accepted by
    /// `is_goal`.
    pub fn path_to_first<R, F>(
        &self,
        start: CellCoord,
        is_goal: F,
        rng: &mut R,
    ) -> Option<Vec<CellCoord>>
    where
        R: Rng + ?Sized,
        F: FnMut(CellCoord) -> bool,
    {
        if self.predictor.is_dangerous(start, self.horizon) {
            return None;
        }

        let flood = self.flood_until(start, rng, is_goal);
        let found = flood.found?;
        flood.path_to(found)
    }

    /// Every tile reachable from `start` within the depth bound, in
    /// breadth-first order starting with `start` itself.
    pub fn reachable<R>(&self, start: CellCoord, rng: &mut R) -> Vec<CellCoord>
    where
        R: Rng + ?Sized,
    {
        self.flood(start, rng).order
    }
}

/// Result of a breadth-first expansion, able to reconstruct paths.
#[derive(Clone, Debug)]
pub struct Flood {
    width: u32,
    start: CellCoord,
    parents: Vec<usize>,
    depths: Vec<usize>,
    order: Vec<CellCoord>,
    found: Option<CellCoord>,
}

impl Flood {
    fn empty() -> Self {
        Self {
            width: 0,
            start: CellCoord::new(0, 0),
            parents: Vec::new(),
            depths: Vec::new(),
            order: Vec::new(),
            found: None,
        }
    }

    fn new(
        width: u32,
        start: CellCoord,
        parents: Vec<usize>,
        depths: Vec<usize>,
        order: Vec<CellCoord>,
        found: Option<CellCoord>,
    ) -> Self {
        Self {
            width,
            start,
            parents,
            depths,
            order,
            found,
        }
    }

    /// Tiles in the order they were reached, starting with the start tile.
    #[must_use]
    pub fn order(&self) -> &[CellCoord] {
        &self.order
    }

    /// Reports whether the expansion reached `cell`.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.slot(cell)
            .and_then(|index| self.parents.get(index))
            .is_some_and(|parent| *parent != UNVISITED)
    }

    /// Number of steps from the start tile to `cell`, if it was reached.
    #[must_use]
    pub fn depth(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        self.slot(cell).and_then(|index| self.depths.get(index).copied())
    }

    /// Reconstructs the path from the start tile to `cell`, inclusive.
    #[must_use]
    pub fn path_to(&self, cell: CellCoord) -> Option<Vec<CellCoord>> {
        if !self.contains(cell) {
            return None;
        }

        let width = usize::try_from(self.width).ok()?;
        let mut index = self.slot(cell)?;
        let mut path = vec![cell];
        while let Some(&parent) = self.parents.get(index) {
            if parent == index {
                break;
            }
            index = parent;
            path.push(coord(width, index)?);
        }
        path.reverse();

        (path.first() == Some(&self.start)).then_some(path)
    }

    fn slot(&self, cell: CellCoord) -> Option<usize> {
        let width = usize::try_from(self.width).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        if column >= width {
            return None;
        }
        let index = row.checked_mul(width)?.checked_add(column)?;
        (index < self.parents.len()).then_some(index)
    }
}

fn coord(width: usize, index: usize) -> Option<CellCoord> {
    if width == 0 {
        return None;
    }
    let column = u32::try_from(index % width).ok()?;
    let row = u32::try_from(index / width).ok()?;
    Some(CellCoord::new(column, row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bomb_arena_core::{AgentId, HazardSource, TileMap};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const SHORT: Duration = Duration::from_millis(250);

    fn open_room() -> TileMap {
        TileMap::from_rows(&["#######", "#.....#", "#.....#", "#.....#", "#######"])
            .expect("valid board")
    }

    #[test]
    fn finds_shortest_path() {
        let map = open_room();
        let predictor = HazardPredictor::new(&map, &[], &[], Duration::ZERO);
        let search = DirectSearch::new(predictor, 16, SHORT);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let path = search
            .path_to(CellCoord::new(1, 1), CellCoord::new(5, 3), &mut rng)
            .expect("path exists");
        assert_eq!(path.len(), 7);
        assert_eq!(path.first(), Some(&CellCoord::new(1, 1)));
        assert_eq!(path.last(), Some(&CellCoord::new(5, 3)));
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan_distance(pair[1]), 1);
        }
    }

    #[test]
    fn depth_bound_limits_reach() {
        let map = open_room();
        let predictor = HazardPredictor::new(&map, &[], &[], Duration::ZERO);
        let search = DirectSearch::new(predictor, 2, SHORT);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert!(search
            .path_to(CellCoord::new(1, 1), CellCoord::new(5, 1), &mut rng)
            .is_none());
        let reachable = search.reachable(CellCoord::new(1, 1), &mut rng);
        assert_eq!(reachable.first(), Some(&CellCoord::new(1, 1)));
        assert!(reachable
            .iter()
            .all(|cell| cell.manhattan_distance(CellCoord::new(1, 1)) <= 2));
        assert_eq!(reachable.len(), 6);
    }

    #[test]
    fn live_hazard_tiles_are_impassable_except_start() {
        let map = open_room();
        let hazards = [HazardSource {
            owner: AgentId::new(0),
            origin: CellCoord::new(2, 1),
            radius: 0,
            placed_at: Duration::ZERO,
            fuse: Duration::from_secs(10),
        }];
        let predictor = HazardPredictor::new(&map, &hazards, &[], Duration::ZERO);
        let search = DirectSearch::new(predictor, 16, SHORT);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let path = search
            .path_to(CellCoord::new(1, 1), CellCoord::new(3, 1), &mut rng)
            .expect("detour exists");
        assert!(!path.contains(&CellCoord::new(2, 1)));
        assert_eq!(path.len(), 5);

        let away = search
            .path_to(CellCoord::new(2, 1), CellCoord::new(2, 3), &mut rng)
            .expect("an agent can leave its own hazard tile");
        assert_eq!(away.first(), Some(&CellCoord::new(2, 1)));
    }

    #[test]
    fn dangerous_start_yields_nothing() {
        let map = open_room();
        let hazards = [HazardSource {
            owner: AgentId::new(0),
            origin: CellCoord::new(3, 2),
            radius: 2,
            placed_at: Duration::ZERO,
            fuse: Duration::from_millis(100),
        }];
        let predictor = HazardPredictor::new(&map, &hazards, &[], Duration::ZERO);
        let search = DirectSearch::new(predictor, 16, SHORT);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(search
            .path_to(CellCoord::new(3, 1), CellCoord::new(1, 1), &mut rng)
            .is_none());
    }

    #[test]
    fn flood_depths_follow_breadth_first_order() {
        let map = open_room();
        let predictor = HazardPredictor::new(&map, &[], &[], Duration::ZERO);
        let search = DirectSearch::new(predictor, 16, SHORT);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let flood = search.flood(CellCoord::new(3, 2), &mut rng);

        assert_eq!(flood.order().len(), 15);
        let mut last = 0;
        for cell in flood.order() {
            let depth = flood.depth(*cell).expect("visited");
            assert!(depth >= last, "order must be non-decreasing in depth");
            assert_eq!(depth as u32, cell.manhattan_distance(CellCoord::new(3, 2)));
            last = depth;
        }
        assert_eq!(flood.depth(CellCoord::new(0, 0)), None);
    }
}
