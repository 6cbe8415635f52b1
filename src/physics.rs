/*
 * Physics Module
 *
 * This module contains the per-agent update kernel for the flocking
 * simulation: neighbor force accumulation over the spatial grid
 * (separation, alignment, cohesion) followed by motion integration
 * (edge avoidance, momentum smoothing, speed limiting, bounds clamping).
 *
 * Each agent's update reads only the previous frame's agent buffer and the
 * freshly built grid, never another agent's same-frame update, so the
 * kernel runs as an independent parallel-for over agents with no shared
 * mutable state.
 *
 * Documented variant choices:
 * - Separation is distance-scaled: per-neighbor repulsion magnitude is
 *   max(1, (collision_radius/dist)^collision_scaling * collision_force),
 *   so overlapping agents are pushed apart much harder than merely close
 *   ones. A neighbor closer than 1.0 units sets the colliding flag.
 * - Speed limiting is soft-exponential: a velocity over max_speed is
 *   scaled by exp(1 - speed_ratio). Since r*exp(1-r) <= 1 for r >= 1,
 *   the post-limit speed never exceeds max_speed, without the velocity
 *   discontinuity of a hard clamp.
 * - Boundary policy is clamp: edge-avoidance forces do the steering and
 *   the clamp is only the containment backstop.
 * - The max_neighbors cap is a soft early-exit over unsorted candidates,
 *   not a nearest-k guarantee; results in dense clusters are an accepted
 *   order-dependent approximation.
 */

use glam::{vec2, Vec2};
use rayon::prelude::*;

use crate::agent::{Agent, COLLIDING};
use crate::params::SimParams;
use crate::spatial_grid::{SpatialGrid, EMPTY};

// Raw per-agent sums gathered from the 3x3 cell neighborhood
#[derive(Debug, Default, Clone, Copy)]
pub struct NeighborAccum {
    pub separation: Vec2,
    pub alignment: Vec2,
    pub cohesion: Vec2,
    pub separation_count: u32,
    pub alignment_count: u32,
    pub cohesion_count: u32,
    pub colliding: bool,
}

// Walk the 3x3 block of cells around agent `index` and accumulate the raw
// separation/alignment/cohesion contributions
pub fn accumulate_neighbor_forces(
    index: usize,
    agents: &[Agent],
    grid: &SpatialGrid,
    params: &SimParams,
) -> NeighborAccum {
    let agent = &agents[index];
    let sep_radius_sq = params.separation_radius * params.separation_radius;
    let align_radius_sq = params.alignment_radius * params.alignment_radius;
    let cohesion_radius_sq = params.cohesion_radius * params.cohesion_radius;

    let (cx, cy) = grid.world_to_cell(agent.position);
    let mut accum = NeighborAccum::default();
    let mut processed = 0usize;

    'cells: for y_offset in -1isize..=1 {
        let check_y = cy as isize + y_offset;
        if check_y < 0 || check_y >= grid.grid_height as isize {
            continue;
        }
        for x_offset in -1isize..=1 {
            let check_x = cx as isize + x_offset;
            if check_x < 0 || check_x >= grid.grid_width as isize {
                continue;
            }
            let cell = grid.cell_index(check_x as usize, check_y as usize);

            for other_index in grid.cell_agents(cell) {
                if other_index == EMPTY || other_index as usize == index {
                    continue;
                }
                // Out-of-range indices are skipped, not trusted
                let Some(other) = agents.get(other_index as usize) else {
                    continue;
                };

                let offset = agent.position - other.position;
                let d_squared = offset.length_squared();
                let mut counted = false;

                // Separation: distance-scaled repulsion away from neighbor
                if d_squared < sep_radius_sq && d_squared > 0.0 {
                    let dist = d_squared.sqrt();
                    let repulsion = ((params.collision_radius / dist)
                        .powf(params.collision_scaling)
                        * params.collision_force)
                        .max(1.0);
                    accum.separation += (offset / dist) * repulsion;
                    accum.separation_count += 1;
                    if dist < 1.0 {
                        accum.colliding = true;
                    }
                    counted = true;
                }

                // Alignment: sum neighbor velocities for averaging
                if d_squared < align_radius_sq {
                    accum.alignment += other.velocity;
                    accum.alignment_count += 1;
                    counted = true;
                }

                // Cohesion: sum neighbor positions for the centroid
                if d_squared < cohesion_radius_sq {
                    accum.cohesion += other.position;
                    accum.cohesion_count += 1;
                    counted = true;
                }

                // Soft cap on per-agent work in dense clusters
                if counted {
                    processed += 1;
                    if processed >= params.max_neighbors {
                        break 'cells;
                    }
                }
            }
        }
    }

    accum
}

impl NeighborAccum {
    // Derive the flocking acceleration from the raw sums. Each term is zero
    // when its neighbor count is zero; normalize_or_zero guards the rest.
    pub fn acceleration(&self, agent: &Agent, params: &SimParams) -> Vec2 {
        let mut accel = Vec2::ZERO;

        if self.separation_count > 0 {
            let mean = self.separation / self.separation_count as f32;
            // Crowded agents push harder
            let density_scale = 1.0 + (self.separation_count - 1) as f32 * 0.05;
            accel += mean.normalize_or_zero() * params.separation_force * density_scale;
        }

        if self.alignment_count > 0 {
            let mean = self.alignment / self.alignment_count as f32;
            accel += mean.normalize_or_zero() * params.alignment_force;
        }

        if self.cohesion_count > 0 {
            let centroid = self.cohesion / self.cohesion_count as f32;
            accel += (centroid - agent.position).normalize_or_zero() * params.cohesion_force;
        }

        accel
    }
}

// Inward push that ramps up linearly inside edge_avoidance_distance of each
// of the four world boundaries
pub fn edge_avoidance(position: Vec2, params: &SimParams) -> Vec2 {
    let margin = params.edge_avoidance_distance;
    if margin <= 0.0 {
        return Vec2::ZERO;
    }

    let mut force = Vec2::ZERO;
    if position.x < margin {
        force.x += (margin - position.x) / margin * params.edge_avoidance_force;
    }
    if position.x > params.world_width - margin {
        force.x -= (margin - (params.world_width - position.x)) / margin
            * params.edge_avoidance_force;
    }
    if position.y < margin {
        force.y += (margin - position.y) / margin * params.edge_avoidance_force;
    }
    if position.y > params.world_height - margin {
        force.y -= (margin - (params.world_height - position.y)) / margin
            * params.edge_avoidance_force;
    }
    force
}

// Combine the accumulated forces into the agent's next-frame state
pub fn integrate(agent: &Agent, accum: &NeighborAccum, params: &SimParams, dt: f32) -> Agent {
    let acceleration = accum.acceleration(agent, params) + edge_avoidance(agent.position, params);

    // Momentum smoothing: blend toward the new acceleration, then damp
    let smoothed = agent.prev_accel.lerp(acceleration, params.momentum_smoothing);
    let damped = smoothed * (1.0 - params.momentum_damping);

    let mut velocity = agent.velocity + damped * dt;

    // Soft speed limit; r*exp(1-r) <= 1 keeps the result within max_speed
    let speed = velocity.length();
    if speed > params.max_speed {
        let speed_ratio = speed / params.max_speed;
        velocity *= (1.0 - speed_ratio).exp();
    }

    // Clamp is the backstop; edge avoidance alone cannot guarantee
    // containment under all force combinations
    let position = (agent.position + velocity * dt)
        .clamp(Vec2::ZERO, vec2(params.world_width, params.world_height));

    Agent {
        position,
        velocity,
        prev_accel: damped,
        collision_flag: if accum.colliding { COLLIDING } else { 0.0 },
        _padding: 0.0,
    }
}

// Evaluate and integrate every agent: reads exclusively from `read`, writes
// exclusively to `write`. The grid must already be populated from `read`.
pub fn step_agents(
    read: &[Agent],
    write: &mut [Agent],
    grid: &SpatialGrid,
    params: &SimParams,
    dt: f32,
) {
    debug_assert_eq!(read.len(), write.len());

    let update_one = |index: usize| {
        let accum = accumulate_neighbor_forces(index, read, grid, params);
        integrate(&read[index], &accum, params, dt)
    };

    if params.enable_parallel {
        write
            .par_iter_mut()
            .enumerate()
            .for_each(|(index, out)| *out = update_one(index));
    } else {
        for (index, out) in write.iter_mut().enumerate() {
            *out = update_one(index);
        }
    }
}
