/*
 * Flocking Simulation Kernel - Module Definitions
 *
 * This file defines the module structure for the grid-accelerated boid
 * simulation kernel: agent state, parameters, the spatial grid neighbor
 * index, the per-agent physics kernel, and the double-buffered frame
 * scheduler.
 */

// Re-export key components for easier access
pub use agent::Agent;
pub use params::{ParamsError, SimParams};
pub use sim::{FrameStats, Simulation};
pub use spatial_grid::SpatialGrid;

// Define modules
pub mod agent;
pub mod params;
pub mod physics;
pub mod sim;
pub mod spatial_grid;

// Reference frame period; wall-clock frame intervals are scaled against
// this so dynamics stay approximately frame-rate invariant
pub const REFERENCE_FRAME_SECONDS: f32 = 1.0 / 60.0;
