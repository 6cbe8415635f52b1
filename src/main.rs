/*
 * Headless Driver
 *
 * Runs the flocking kernel without any rendering: spawns a flock, steps it
 * at the reference frame rate for a fixed number of frames, and logs
 * per-second statistics. Rendering and UI are external collaborators; this
 * binary exists to exercise and profile the simulation core on its own.
 */

use std::time::Instant;

use flocksim::{SimParams, Simulation, REFERENCE_FRAME_SECONDS};

const FRAMES: u64 = 600;
const REPORT_INTERVAL: u64 = 60;

fn main() {
    env_logger::init();

    let params = SimParams {
        num_agents: 2000,
        ..SimParams::default()
    };
    let seed = rand::random();
    let mut sim = match Simulation::new(params, seed) {
        Ok(sim) => sim,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };

    log::info!(
        "flock of {} agents, world {}x{}, seed {}",
        sim.params().num_agents,
        sim.params().world_width,
        sim.params().world_height,
        seed
    );

    let mut dropped_total = 0usize;
    let started = Instant::now();
    let mut last_report = started;

    for _ in 0..FRAMES {
        let stats = sim.step(REFERENCE_FRAME_SECONDS);
        dropped_total += stats.grid_dropped;

        if stats.frame % REPORT_INTERVAL == 0 {
            let elapsed = last_report.elapsed();
            last_report = Instant::now();
            log::info!(
                "frame {:4}: {:.2} ms/frame, mean speed {:.2}, {} colliding, {} grid drops",
                stats.frame,
                elapsed.as_secs_f64() * 1000.0 / REPORT_INTERVAL as f64,
                sim.mean_speed(),
                sim.colliding_count(),
                dropped_total
            );
            dropped_total = 0;
        }
    }

    log::info!(
        "{} frames in {:.2}s",
        FRAMES,
        started.elapsed().as_secs_f64()
    );
}
