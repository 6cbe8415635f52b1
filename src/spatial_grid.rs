/*
 * Spatial Grid Module
 *
 * This module defines the SpatialGrid struct for efficient neighbor lookups.
 * It divides the simulation space into a uniform grid of fixed-capacity
 * buckets, so each agent's neighbor search scans at most the 3x3 block of
 * cells around its home cell instead of the full agent set.
 *
 * The grid is transient: it is cleared and rebuilt from scratch every frame
 * with no cross-frame lifetime guarantee. Storage is two flat arrays:
 * - slots: max_agents_per_cell agent indices per cell, EMPTY when unused
 * - counts: one atomic insert counter per cell
 *
 * Insertion uses atomic fetch-and-add on the cell counter so population can
 * run as a parallel-for over agents; a counter exceeding the cell capacity
 * means overflow, and the excess agents are silently dropped from that
 * cell's neighbor set (documented lossy behavior, not an error).
 */

use glam::Vec2;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::agent::Agent;

// Sentinel marking an unused slot; never a valid agent index
pub const EMPTY: u32 = u32::MAX;

pub struct SpatialGrid {
    pub cell_size: f32,
    pub grid_width: usize,
    pub grid_height: usize,
    pub max_agents_per_cell: usize,
    // Flat row-major bucket storage, max_agents_per_cell slots per cell.
    // Atomics so parallel population can write through &self.
    slots: Vec<AtomicU32>,
    counts: Vec<AtomicU32>,
}

impl SpatialGrid {
    pub fn new(
        cell_size: f32,
        world_width: f32,
        world_height: f32,
        max_agents_per_cell: usize,
    ) -> Self {
        let grid_width = ((world_width / cell_size).ceil() as usize).max(1);
        let grid_height = ((world_height / cell_size).ceil() as usize).max(1);
        let num_cells = grid_width * grid_height;

        let mut slots = Vec::with_capacity(num_cells * max_agents_per_cell);
        slots.resize_with(num_cells * max_agents_per_cell, || AtomicU32::new(EMPTY));
        let mut counts = Vec::with_capacity(num_cells);
        counts.resize_with(num_cells, || AtomicU32::new(0));

        Self {
            cell_size,
            grid_width,
            grid_height,
            max_agents_per_cell,
            slots,
            counts,
        }
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.grid_width * self.grid_height
    }

    // Convert world coordinates to grid cell coordinates. Clamping keeps
    // positions exactly on or drifted past the nominal boundary in a valid
    // cell.
    #[inline]
    pub fn world_to_cell(&self, position: Vec2) -> (usize, usize) {
        let cx = ((position.x / self.cell_size).floor() as isize)
            .clamp(0, self.grid_width as isize - 1) as usize;
        let cy = ((position.y / self.cell_size).floor() as isize)
            .clamp(0, self.grid_height as isize - 1) as usize;
        (cx, cy)
    }

    // Convert 2D cell coordinates to a row-major 1D index
    #[inline]
    pub fn cell_index(&self, cx: usize, cy: usize) -> usize {
        cy * self.grid_width + cx
    }

    // Reset the grid for the next frame: all counters to zero, all slots
    // back to the EMPTY sentinel
    pub fn clear(&mut self) {
        for count in &mut self.counts {
            *count.get_mut() = 0;
        }
        for slot in &mut self.slots {
            *slot.get_mut() = EMPTY;
        }
    }

    // Insert one agent index into its home cell. Returns false when the
    // cell is already full and the agent was dropped from the neighbor set.
    #[inline]
    pub fn insert(&self, agent_index: u32, position: Vec2) -> bool {
        let (cx, cy) = self.world_to_cell(position);
        let cell = self.cell_index(cx, cy);
        let slot = self.counts[cell].fetch_add(1, Ordering::Relaxed) as usize;
        if slot < self.max_agents_per_cell {
            self.slots[cell * self.max_agents_per_cell + slot].store(agent_index, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    // Insert every agent into its home cell. Must complete before any
    // neighbor queries for the frame begin; the parallel-for join is that
    // barrier. Returns the number of agents dropped to cell overflow.
    pub fn populate(&self, agents: &[Agent], parallel: bool) -> usize {
        if parallel {
            agents
                .par_iter()
                .enumerate()
                .filter(|(i, agent)| !self.insert(*i as u32, agent.position))
                .count()
        } else {
            agents
                .iter()
                .enumerate()
                .filter(|(i, agent)| !self.insert(*i as u32, agent.position))
                .count()
        }
    }

    // Iterate the valid agent indices stored in one cell
    pub fn cell_agents(&self, cell: usize) -> impl Iterator<Item = u32> + '_ {
        let count = (self.counts[cell].load(Ordering::Relaxed) as usize)
            .min(self.max_agents_per_cell);
        let base = cell * self.max_agents_per_cell;
        self.slots[base..base + count]
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec2;

    fn agent_at(x: f32, y: f32) -> Agent {
        Agent::new(vec2(x, y), Vec2::ZERO)
    }

    #[test]
    fn grid_dimensions_round_up() {
        let grid = SpatialGrid::new(50.0, 800.0, 600.0, 16);
        assert_eq!(grid.grid_width, 16);
        assert_eq!(grid.grid_height, 12);
        assert_eq!(grid.num_cells(), 192);

        // Non-divisible world size still covers the full area
        let grid = SpatialGrid::new(50.0, 810.0, 601.0, 16);
        assert_eq!(grid.grid_width, 17);
        assert_eq!(grid.grid_height, 13);
    }

    #[test]
    fn world_to_cell_clamps_out_of_range_positions() {
        let grid = SpatialGrid::new(50.0, 800.0, 600.0, 16);
        assert_eq!(grid.world_to_cell(vec2(0.0, 0.0)), (0, 0));
        assert_eq!(grid.world_to_cell(vec2(799.9, 599.9)), (15, 11));
        // Exactly on and past the boundary still map to valid cells
        assert_eq!(grid.world_to_cell(vec2(800.0, 600.0)), (15, 11));
        assert_eq!(grid.world_to_cell(vec2(-5.0, 1000.0)), (0, 11));
    }

    #[test]
    fn cell_index_is_row_major() {
        let grid = SpatialGrid::new(50.0, 800.0, 600.0, 16);
        assert_eq!(grid.cell_index(0, 0), 0);
        assert_eq!(grid.cell_index(3, 2), 2 * 16 + 3);
    }

    #[test]
    fn every_agent_findable_in_own_cell() {
        let grid = SpatialGrid::new(50.0, 800.0, 600.0, 16);
        let agents = vec![
            agent_at(10.0, 10.0),
            agent_at(60.0, 10.0),
            agent_at(10.0, 60.0),
            agent_at(790.0, 590.0),
        ];
        let dropped = grid.populate(&agents, false);
        assert_eq!(dropped, 0);

        for (i, agent) in agents.iter().enumerate() {
            let (cx, cy) = grid.world_to_cell(agent.position);
            let cell = grid.cell_index(cx, cy);
            let found: Vec<u32> = grid.cell_agents(cell).collect();
            assert!(found.contains(&(i as u32)), "agent {i} missing from home cell");
        }
    }

    #[test]
    fn findable_via_3x3_scan() {
        let grid = SpatialGrid::new(50.0, 800.0, 600.0, 16);
        // Fewer agents than one cell's capacity, spread across cells
        let agents: Vec<Agent> = (0..8).map(|i| agent_at(5.0 + i as f32 * 30.0, 40.0)).collect();
        grid.populate(&agents, false);

        for agent in &agents {
            let (cx, cy) = grid.world_to_cell(agent.position);
            let mut seen = Vec::new();
            for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    let (nx, ny) = (cx as isize + dx, cy as isize + dy);
                    if nx < 0
                        || ny < 0
                        || nx >= grid.grid_width as isize
                        || ny >= grid.grid_height as isize
                    {
                        continue;
                    }
                    seen.extend(grid.cell_agents(grid.cell_index(nx as usize, ny as usize)));
                }
            }
            // Every agent within one cell of this one must be visible
            for (j, other) in agents.iter().enumerate() {
                if (other.position - agent.position).abs().max_element() < grid.cell_size {
                    assert!(seen.contains(&(j as u32)));
                }
            }
        }
    }

    #[test]
    fn overflowing_cell_drops_excess_and_reports() {
        let grid = SpatialGrid::new(50.0, 800.0, 600.0, 4);
        // 10 agents, all in cell (0, 0)
        let agents: Vec<Agent> = (0..10).map(|i| agent_at(1.0 + i as f32, 1.0)).collect();
        let dropped = grid.populate(&agents, false);
        assert_eq!(dropped, 6);

        let cell = grid.cell_index(0, 0);
        let stored: Vec<u32> = grid.cell_agents(cell).filter(|&v| v != EMPTY).collect();
        assert_eq!(stored.len(), 4);
    }

    #[test]
    fn clear_resets_counters_and_slots() {
        let mut grid = SpatialGrid::new(50.0, 800.0, 600.0, 4);
        grid.populate(&[agent_at(10.0, 10.0)], false);
        grid.clear();
        let cell = grid.cell_index(0, 0);
        assert_eq!(grid.cell_agents(cell).count(), 0);
        grid.populate(&[agent_at(10.0, 10.0)], false);
        assert_eq!(grid.cell_agents(cell).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn parallel_and_sequential_population_store_same_sets() {
        let mut grid = SpatialGrid::new(50.0, 800.0, 600.0, 64);
        let agents: Vec<Agent> = (0..500)
            .map(|i| agent_at((i * 13 % 800) as f32, (i * 7 % 600) as f32))
            .collect();

        grid.populate(&agents, false);
        let sequential: Vec<Vec<u32>> = (0..grid.num_cells())
            .map(|c| {
                let mut v: Vec<u32> = grid.cell_agents(c).collect();
                v.sort_unstable();
                v
            })
            .collect();

        grid.clear();
        grid.populate(&agents, true);
        let parallel: Vec<Vec<u32>> = (0..grid.num_cells())
            .map(|c| {
                let mut v: Vec<u32> = grid.cell_agents(c).collect();
                v.sort_unstable();
                v
            })
            .collect();

        // Slot order may differ under parallel insertion; the per-cell sets
        // may not (no cell overflows here)
        assert_eq!(sequential, parallel);
    }
}
