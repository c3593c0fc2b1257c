//! Canvas Arcade entry point
//!
//! The games run in a browser; the native binary is a headless smoke run
//! that drives a couple of simulations with scripted input and logs the
//! outcome.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Canvas Arcade (native) starting...");
    log::info!("Games are web targets - build with wasm-pack or trunk for the browser");

    println!("\nRunning headless sim demos...");
    demo_snake();
    demo_breakout();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry points are the per-game start_* exports
}

/// Greedy snake bot: walk toward the food, preferring turns that stay legal
#[cfg(not(target_arch = "wasm32"))]
fn demo_snake() {
    use canvas_arcade::games::snake::sim::{Dir, SnakeSim, StepOutcome};

    let mut sim = SnakeSim::new(0xC0FFEE);
    let mut steps = 0u32;
    loop {
        let (hx, hy) = sim.body[0];
        let (fx, fy) = sim.food;
        let dir = if fx > hx {
            Dir::Right
        } else if fx < hx {
            Dir::Left
        } else if fy > hy {
            Dir::Down
        } else {
            Dir::Up
        };
        sim.queue_turn(dir);
        match sim.step() {
            StepOutcome::Died | StepOutcome::Won => break,
            _ => {}
        }
        steps += 1;
        if steps > 5_000 {
            break;
        }
    }
    println!(
        "✓ Snake bot: {} points in {} steps",
        sim.score, steps
    );
}

/// Breakout with a ball-tracking paddle for a few simulated minutes
#[cfg(not(target_arch = "wasm32"))]
fn demo_breakout() {
    use canvas_arcade::games::breakout::sim::{BreakoutSim, GamePhase, SIM_DT, TickInput};

    let mut sim = BreakoutSim::new(0xBADA55);
    let mut input = TickInput {
        launch: true,
        ..Default::default()
    };
    for _ in 0..(120 * 180) {
        if sim.phase == GamePhase::GameOver {
            break;
        }
        input.target_x = Some(sim.ball_pos.x);
        sim.tick(&input, SIM_DT);
    }
    println!(
        "✓ Breakout tracker: {} points, wave {}, {} lives left",
        sim.score, sim.wave, sim.lives
    );
}
