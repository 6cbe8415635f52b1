/*
 * Simulation Parameters Module
 *
 * This module defines the SimParams struct that contains all the adjustable
 * parameters for the flocking simulation. A SimParams value is immutable for
 * the duration of a frame: live tuning replaces the whole record between
 * frames, never individual fields mid-frame.
 *
 * Grid geometry (cell size, grid dimensions) is derived here so every
 * consumer computes it the same way: the cell size equals the largest
 * interaction radius, which guarantees a 3x3 cell neighborhood covers the
 * full interaction range around any point in the center cell.
 */

use thiserror::Error;

// Errors rejected at the configuration boundary; the kernel itself never
// sees an invalid SimParams.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    pub num_agents: usize,
    pub world_width: f32,
    pub world_height: f32,

    // Interaction radii for the three flocking rules
    pub separation_radius: f32,
    pub alignment_radius: f32,
    pub cohesion_radius: f32,

    // Force strengths
    pub separation_force: f32,
    pub alignment_force: f32,
    pub cohesion_force: f32,

    pub max_speed: f32,
    // Base timestep; the scheduler scales it by the wall-clock frame
    // interval against the reference frame period
    pub delta_time: f32,

    pub max_agents_per_cell: usize,

    // Edge avoidance: force ramps up linearly inside this distance from
    // each boundary
    pub edge_avoidance_distance: f32,
    pub edge_avoidance_force: f32,

    // Momentum smoothing: lerp factor toward the new acceleration (1.0 =
    // no smoothing), then amplitude reduction by (1 - damping)
    pub momentum_smoothing: f32,
    pub momentum_damping: f32,

    // Close-range repulsion shaping for the separation rule
    pub collision_radius: f32,
    pub collision_force: f32,
    pub collision_scaling: f32,

    // Soft cap on neighbors processed per agent in dense clusters
    pub max_neighbors: usize,

    pub enable_parallel: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            num_agents: 1000,
            world_width: 800.0,
            world_height: 600.0,
            separation_radius: 25.0,
            alignment_radius: 50.0,
            cohesion_radius: 50.0,
            separation_force: 1.5,
            alignment_force: 1.0,
            cohesion_force: 1.0,
            max_speed: 4.0,
            delta_time: 1.0,
            max_agents_per_cell: 64,
            edge_avoidance_distance: 50.0,
            edge_avoidance_force: 0.5,
            momentum_smoothing: 0.25,
            momentum_damping: 0.05,
            collision_radius: 8.0,
            collision_force: 1.0,
            collision_scaling: 2.0,
            max_neighbors: 128,
            enable_parallel: true,
        }
    }
}

impl SimParams {
    // The largest interaction radius in use; doubles as the grid cell size
    #[inline]
    pub fn neighbor_radius(&self) -> f32 {
        self.separation_radius
            .max(self.alignment_radius)
            .max(self.cohesion_radius)
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.neighbor_radius()
    }

    #[inline]
    pub fn grid_width(&self) -> usize {
        ((self.world_width / self.cell_size()).ceil() as usize).max(1)
    }

    #[inline]
    pub fn grid_height(&self) -> usize {
        ((self.world_height / self.cell_size()).ceil() as usize).max(1)
    }

    // Validate before the record is allowed into a frame
    pub fn validate(&self) -> Result<(), ParamsError> {
        use ParamsError::InvalidConfig;

        if self.num_agents == 0 {
            return Err(InvalidConfig("num_agents must be positive"));
        }
        if !(self.world_width > 0.0 && self.world_width.is_finite()) {
            return Err(InvalidConfig("world_width must be positive and finite"));
        }
        if !(self.world_height > 0.0 && self.world_height.is_finite()) {
            return Err(InvalidConfig("world_height must be positive and finite"));
        }
        for (radius, name) in [
            (self.separation_radius, "separation_radius must be positive"),
            (self.alignment_radius, "alignment_radius must be positive"),
            (self.cohesion_radius, "cohesion_radius must be positive"),
        ] {
            if !(radius > 0.0 && radius.is_finite()) {
                return Err(InvalidConfig(name));
            }
        }
        for (force, name) in [
            (self.separation_force, "separation_force out of range"),
            (self.alignment_force, "alignment_force out of range"),
            (self.cohesion_force, "cohesion_force out of range"),
            (self.edge_avoidance_force, "edge_avoidance_force out of range"),
            (self.collision_force, "collision_force out of range"),
        ] {
            if !(force >= 0.0 && force.is_finite()) {
                return Err(InvalidConfig(name));
            }
        }
        if !(self.max_speed > 0.0 && self.max_speed.is_finite()) {
            return Err(InvalidConfig("max_speed must be positive"));
        }
        if !(self.delta_time > 0.0 && self.delta_time.is_finite()) {
            return Err(InvalidConfig("delta_time must be positive"));
        }
        if self.max_agents_per_cell == 0 {
            return Err(InvalidConfig("max_agents_per_cell must be positive"));
        }
        if !(self.edge_avoidance_distance >= 0.0 && self.edge_avoidance_distance.is_finite()) {
            return Err(InvalidConfig("edge_avoidance_distance must be non-negative"));
        }
        if !(self.momentum_smoothing > 0.0 && self.momentum_smoothing <= 1.0) {
            return Err(InvalidConfig("momentum_smoothing must be in (0, 1]"));
        }
        if !(self.momentum_damping >= 0.0 && self.momentum_damping < 1.0) {
            return Err(InvalidConfig("momentum_damping must be in [0, 1)"));
        }
        if !(self.collision_radius > 0.0 && self.collision_radius.is_finite()) {
            return Err(InvalidConfig("collision_radius must be positive"));
        }
        if !(self.collision_scaling >= 0.0 && self.collision_scaling.is_finite()) {
            return Err(InvalidConfig("collision_scaling must be non-negative"));
        }
        if self.max_neighbors == 0 {
            return Err(InvalidConfig("max_neighbors must be positive"));
        }
        Ok(())
    }
}
