// Runs the full two-phase experiment and writes the comparison profiles.
//
//   cargo run --release --example misi_experiment [config.json] [output.csv]

use colored::Colorize;
use misi_rust::config::ExperimentConfig;
use misi_rust::experiment::Experiment;
use misi_rust::MisiError;
use std::process::ExitCode;

fn run() -> Result<(), MisiError> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => ExperimentConfig::from_json_file(&path)?,
        None => ExperimentConfig::default(),
    };
    let output = args.next().unwrap_or_else(|| "misi_profiles.csv".to_string());

    let experiment = Experiment::new(config)?.with_progress_interval(100);
    let result = experiment.run()?;

    println!("\n{}", "=== MISI experiment ===".bold());
    println!(
        "{:>8} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10}",
        "x (km)", "bed", "s steady", "zb steady", "s pert.", "zb pert."
    );
    let stride = (result.steady_state.len() / 10).max(1);
    for i in (0..result.steady_state.len()).step_by(stride) {
        let row = format!(
            "{:>8.1} | {:>10.1} | {:>10.1} | {:>10.1} | {:>10.1} | {:>10.1}",
            result.steady_state.x[i] / 1000.0,
            result.steady_state.bed[i],
            result.steady_state.surface[i],
            result.steady_state.base[i],
            result.perturbed.surface[i],
            result.perturbed.base[i]
        );
        if result.perturbation_thinning_at(i) > 0.0 {
            println!("{}", row.blue());
        } else {
            println!("{}", row.yellow());
        }
    }

    let out = result.outflow_index();
    println!(
        "outflow thinning: spin-up {:.1} m, perturbed {:.1} m",
        result.steady_thinning_at(out),
        result.perturbed_thinning_at(out)
    );
    if result.floor_steps > 0 {
        println!(
            "{}",
            format!(
                "thickness floor raised {} nodes over {} steps",
                result.floor_node_activations, result.floor_steps
            )
            .yellow()
        );
    }

    result.write_csv(&output)?;
    println!("profiles written to {}", output.green());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let at = err
                .step()
                .map(|step| format!(" at step {}", step))
                .unwrap_or_default();
            eprintln!("{} {}{}: {}", "run failed".red().bold(), err.kind(), at, err);
            ExitCode::FAILURE
        }
    }
}
