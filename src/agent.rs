/*
 * Agent Module
 *
 * This module defines the Agent record, the unit of simulation.
 * The layout is the interface contract with the rendering collaborator:
 * a fixed-size 32-byte little-endian record of position, velocity,
 * previous acceleration, and a collision-flag float plus padding.
 */

use glam::{vec2, Vec2};
use rand::Rng;
use std::f32::consts::TAU;

use crate::params::SimParams;

// Written into `collision_flag` when a neighbor is closer than 1.0 world
// units; the renderer reads it, the kernel only writes it.
pub const COLLIDING: f32 = 1.0;

// `repr(C)` keeps the field order and padding fixed so the buffer can be
// handed to the renderer as raw bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Agent {
    pub position: Vec2,
    pub velocity: Vec2,
    // Last frame's damped acceleration, carried for momentum smoothing
    pub prev_accel: Vec2,
    pub collision_flag: f32,
    pub _padding: f32,
}

impl Agent {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self {
            position,
            velocity,
            prev_accel: Vec2::ZERO,
            collision_flag: 0.0,
            _padding: 0.0,
        }
    }

    // Spawn an agent at a random position with a random heading
    pub fn spawn<R: Rng>(rng: &mut R, params: &SimParams) -> Self {
        let position = vec2(
            rng.gen_range(0.0..params.world_width),
            rng.gen_range(0.0..params.world_height),
        );
        let heading = Vec2::from_angle(rng.gen_range(0.0..TAU));
        Self::new(position, heading * params.max_speed * 0.5)
    }

    #[inline]
    pub fn is_colliding(&self) -> bool {
        self.collision_flag == COLLIDING
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn record_is_32_bytes() {
        assert_eq!(std::mem::size_of::<Agent>(), 32);
        assert_eq!(std::mem::align_of::<Agent>(), 4);
    }

    #[test]
    fn byte_view_starts_with_position() {
        let agents = [Agent::new(vec2(1.0, 2.0), vec2(3.0, 4.0))];
        let bytes: &[u8] = bytemuck::cast_slice(&agents);
        assert_eq!(bytes.len(), 32);
        assert_eq!(f32::from_le_bytes(bytes[0..4].try_into().unwrap()), 1.0);
        assert_eq!(f32::from_le_bytes(bytes[4..8].try_into().unwrap()), 2.0);
        assert_eq!(f32::from_le_bytes(bytes[8..12].try_into().unwrap()), 3.0);
    }

    #[test]
    fn spawn_stays_in_bounds() {
        let params = SimParams::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let agent = Agent::spawn(&mut rng, &params);
            assert!(agent.position.x >= 0.0 && agent.position.x <= params.world_width);
            assert!(agent.position.y >= 0.0 && agent.position.y <= params.world_height);
            assert!(agent.velocity.length() <= params.max_speed);
        }
    }
}
