use std::time::Instant;

use clap::Parser;

use dslab_vm_scheduling::core::config::sim_config::SimulationConfig;
use dslab_vm_scheduling::core::error::SimulationError;
use dslab_vm_scheduling::experiment::{run_single, Experiment, SimulationCallbacks};
use dslab_vm_scheduling::log_info;
use dslab_vm_scheduling::simulation::CloudSimulation;

fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to simulation config
    #[clap(short, long)]
    config: String,

    /// Schedulers to compare, e.g. FirstFit,BFD (default - run the scheduler from config)
    #[clap(short, long, use_value_delimiter = true)]
    schedulers: Vec<String>,

    /// Number of threads used to compare schedulers
    #[clap(short, long, default_value_t = 4)]
    threads: usize,

    /// Directory for schedules and results
    #[clap(short, long, default_value = "output")]
    output: String,
}

#[derive(Clone)]
struct ProgressCallbacks {
    step: u32,
}

impl SimulationCallbacks for ProgressCallbacks {
    fn on_simulation_start(&mut self, _sim: &mut CloudSimulation) {
        self.step = 0;
    }

    fn on_step(&mut self, sim: &mut CloudSimulation) -> bool {
        self.step += 1;
        if self.step % 24 == 0 {
            let state = sim.real_state();
            log_info!(
                sim.context(),
                "step {}: {} running vms, {} pending vms, {} active hosts",
                self.step,
                state.running_vms().len(),
                state.pending_vms().len(),
                state.active_hosts().len()
            );
        }
        true
    }
}

fn main() -> Result<(), SimulationError> {
    init_logger();

    let args = Args::parse();
    let simulation_start = Instant::now();
    let config = SimulationConfig::from_file(&args.config)?;
    std::fs::create_dir_all(&args.output)?;

    if args.schedulers.is_empty() {
        let (sim, results) = run_single(&config)?;
        sim.schedule().save_csv(&format!("{}/schedule.csv", args.output))?;
        results.save_csv(&format!("{}/results.csv", args.output))?;
        for (metric, value) in results.to_indexmap() {
            println!("{:<18} {}", metric, value);
        }
    } else {
        let mut experiment = Experiment::new(
            config,
            args.schedulers,
            Box::new(ProgressCallbacks { step: 0 }),
            Some(args.output.clone()),
        )?;
        let results = experiment.run(args.threads)?;
        println!(
            "{:<40} {:>12} {:>12} {:>12} {:>10}",
            "scheduler", "it_energy", "total_energy", "total_cost", "migrations"
        );
        for (scheduler, r) in results {
            println!(
                "{:<40} {:>12.3} {:>12.3} {:>12.3} {:>10}",
                scheduler, r.it_energy, r.total_energy, r.total_cost, r.migrations
            );
        }
    }

    println!("Simulation process time {:.2?}", simulation_start.elapsed());
    Ok(())
}
