use comfy_table::{ContentArrangement, Table};
use smp_world::{StepClock, StepScheduler, WorldConfig};

pub fn run(deltas: &[f32], tick: Option<f32>, max_substeps: Option<u32>) -> Result<(), String> {
    let mut config = WorldConfig::default();
    if let Some(tick) = tick {
        config = config.with_time_tick(tick);
    }
    if let Some(max) = max_substeps {
        config = config.with_max_substeps(max);
    }
    config.validate().map_err(|e| e.to_string())?;

    let params = config.step_params();
    let scheduler = StepScheduler::new();
    let mut clock = StepClock::new();
    let mut total = 0;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Frame", "Delta", "Sub-steps", "Leftover", "Clamped"]);

    for (i, delta) in deltas.iter().enumerate() {
        let plan = scheduler
            .plan(*delta, clock.remainder(), &params)
            .map_err(|e| format!("frame {}: {e}", i + 1))?;
        clock.set_remainder(plan.leftover);
        for _ in 0..plan.substeps {
            clock.advance(plan.substep_duration);
        }
        total += plan.substeps;

        table.add_row(vec![
            (i + 1).to_string(),
            format!("{delta:.4}"),
            plan.substeps.to_string(),
            format!("{:.4}", plan.leftover),
            if plan.clamped { "yes" } else { "" }.to_string(),
        ]);
    }

    println!("{table}");
    println!(
        "  {total} sub-steps, {:.4}s simulated, {:.4}s carried",
        clock.simulated_seconds(),
        clock.remainder()
    );
    Ok(())
}
