/*
 * Simulation Module
 *
 * This module owns the per-frame pipeline and the double-buffered agent
 * state. Each frame runs a fixed sequence:
 *
 *   clear grid -> populate grid -> evaluate + integrate -> swap buffers
 *
 * with two hard ordering barriers: the grid is fully cleared before
 * population begins, and population fully completes before any evaluation
 * reads the grid. Evaluation reads exclusively from the read buffer and
 * writes exclusively to the write buffer, so no agent ever observes a
 * value written earlier in the same frame; after integration the two
 * buffers swap roles.
 *
 * Parameter changes are whole-record replacements applied between frames,
 * never field patches visible mid-frame.
 */

use bytemuck::Zeroable;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::agent::Agent;
use crate::params::{ParamsError, SimParams};
use crate::physics::step_agents;
use crate::spatial_grid::SpatialGrid;
use crate::REFERENCE_FRAME_SECONDS;

// Per-frame telemetry surfaced to the caller and the log
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub frame: u64,
    // Effective timestep after frame-rate scaling
    pub dt: f32,
    // Agents dropped from overflowing grid cells this frame
    pub grid_dropped: usize,
}

pub struct Simulation {
    params: SimParams,
    // Two physical buffers; read_index selects which one holds the
    // latest fully integrated state
    buffers: [Vec<Agent>; 2],
    read_index: usize,
    grid: SpatialGrid,
    rng: StdRng,
    seed: u64,
    frame: u64,
}

impl Simulation {
    pub fn new(params: SimParams, seed: u64) -> Result<Self, ParamsError> {
        params.validate()?;
        let grid = SpatialGrid::new(
            params.cell_size(),
            params.world_width,
            params.world_height,
            params.max_agents_per_cell,
        );
        let mut sim = Self {
            buffers: [Vec::new(), Vec::new()],
            read_index: 0,
            grid,
            rng: StdRng::seed_from_u64(seed),
            seed,
            frame: 0,
            params,
        };
        sim.respawn_agents();
        Ok(sim)
    }

    // Full reallocation of both buffers with freshly randomized agents
    fn respawn_agents(&mut self) {
        let count = self.params.num_agents;
        let spawned: Vec<Agent> = (0..count)
            .map(|_| Agent::spawn(&mut self.rng, &self.params))
            .collect();
        self.buffers = [spawned, vec![Agent::zeroed(); count]];
        self.read_index = 0;
    }

    // Restart from the stored seed
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.frame = 0;
        self.respawn_agents();
        log::debug!("simulation reset, seed {}", self.seed);
    }

    // Replace the whole parameter record between frames. Grid geometry is
    // recomputed when the neighbor radius or world size changed; an agent
    // count change triggers a full reallocation, never incremental edits.
    pub fn set_params(&mut self, params: SimParams) -> Result<(), ParamsError> {
        params.validate()?;

        let geometry_changed = params.cell_size() != self.params.cell_size()
            || params.world_width != self.params.world_width
            || params.world_height != self.params.world_height
            || params.max_agents_per_cell != self.params.max_agents_per_cell;
        let count_changed = params.num_agents != self.params.num_agents;

        self.params = params;

        if geometry_changed {
            self.grid = SpatialGrid::new(
                self.params.cell_size(),
                self.params.world_width,
                self.params.world_height,
                self.params.max_agents_per_cell,
            );
            log::debug!(
                "grid rebuilt: {}x{} cells, cell size {:.1}",
                self.grid.grid_width,
                self.grid.grid_height,
                self.grid.cell_size
            );
        }
        if count_changed {
            self.respawn_agents();
        }
        Ok(())
    }

    // Advance one frame. `frame_seconds` is the wall-clock interval since
    // the previous frame; it is scaled against the 60 Hz reference period
    // so dynamics stay approximately frame-rate invariant. Large spikes
    // (e.g. after a suspend) pass through and may cause visible jumps.
    pub fn step(&mut self, frame_seconds: f32) -> FrameStats {
        let dt = self.params.delta_time * (frame_seconds / REFERENCE_FRAME_SECONDS);

        // Clear, then populate from the read buffer. populate() joins all
        // insert work before returning, which is the population barrier.
        self.grid.clear();
        let grid_dropped = self
            .grid
            .populate(&self.buffers[self.read_index], self.params.enable_parallel);
        if grid_dropped > 0 {
            log::debug!(
                "frame {}: {} agents dropped from overflowing grid cells",
                self.frame,
                grid_dropped
            );
        }

        // Evaluate and integrate: previous frame in, next frame out
        let [first, second] = &mut self.buffers;
        let (read, write) = if self.read_index == 0 {
            (&*first, second)
        } else {
            (&*second, first)
        };
        step_agents(read, write, &self.grid, &self.params, dt);

        // Swap read/write roles for the next frame
        self.read_index ^= 1;
        self.frame += 1;

        FrameStats {
            frame: self.frame,
            dt,
            grid_dropped,
        }
    }

    // The latest fully integrated agent state, read-only. This is the
    // renderer-facing view: final position + velocity per agent.
    #[inline]
    pub fn agents(&self) -> &[Agent] {
        &self.buffers[self.read_index]
    }

    // Raw little-endian byte view of the agent buffer for transport to the
    // rendering collaborator
    #[inline]
    pub fn agent_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.agents())
    }

    #[inline]
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    // Mean speed across the flock, useful for telemetry
    pub fn mean_speed(&self) -> f32 {
        let agents = self.agents();
        if agents.is_empty() {
            return 0.0;
        }
        agents.iter().map(|a| a.velocity.length()).sum::<f32>() / agents.len() as f32
    }

    pub fn colliding_count(&self) -> usize {
        self.agents().iter().filter(|a| a.is_colliding()).count()
    }
}
