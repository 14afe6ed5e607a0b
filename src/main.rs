// Usage:
//   mac_slot_sim                      default sweep: 16 hosts, four frame size bands
//   mac_slot_sim --by-hosts           5..25 hosts, one frame size band
//   mac_slot_sim sweeps/custom.yaml   sweep loaded from YAML
//   mac_slot_sim ... --seed 42 -v

use std::env;
use std::path::PathBuf;
use std::process;

use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

use mac_slot_sim::theoretical::calculate_aloha_reference;
use mac_slot_sim::{Protocol, SimError, SimResult, Simulation, SweepConfig};

#[derive(Debug, Default)]
struct Args {
    sweep_file: Option<PathBuf>,
    by_hosts: bool,
    seed: Option<u64>,
    verbose: bool,
    summary: bool,
}

fn parse_args() -> SimResult<Args> {
    let mut args = Args::default();
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--by-hosts" => args.by_hosts = true,
            "--summary" => args.summary = true,
            "-v" | "--verbose" => args.verbose = true,
            "--seed" => {
                let value = iter
                    .next()
                    .ok_or_else(|| SimError::InvalidArgument("--seed needs a value".into()))?;
                let seed = value
                    .parse::<u64>()
                    .map_err(|_| SimError::InvalidArgument(format!("bad seed: {}", value)))?;
                args.seed = Some(seed);
            }
            other if other.starts_with('-') => {
                return Err(SimError::InvalidArgument(format!("unknown flag: {}", other)));
            }
            path => args.sweep_file = Some(PathBuf::from(path)),
        }
    }
    Ok(args)
}

fn run(args: Args) -> SimResult<()> {
    let mut sweep = match &args.sweep_file {
        Some(path) => SweepConfig::load(path)?,
        None if args.by_hosts => SweepConfig::by_host_count(),
        None => SweepConfig::default(),
    };
    if args.seed.is_some() {
        sweep.seed = args.seed;
    }

    let mut current: Option<Protocol> = None;
    for config in sweep.runs() {
        if current != Some(config.protocol) {
            if current.is_some() {
                println!();
            }
            println!("Protocol: {}", config.protocol);
            current = Some(config.protocol);
        }

        let (hosts, min, max) = (config.host_count, config.min_frame_size, config.max_frame_size);
        let protocol = config.protocol;
        let mut sim = Simulation::new(config)?;
        let total = sim.run_simulation();
        println!(
            "Hosts: {}, Frame size range: [{}, {}], Total time slots: {}",
            hosts, min, max, total
        );

        if protocol == Protocol::SlottedAloha {
            calculate_aloha_reference(hosts, sweep.medium.transmission_probability);
        }
        if args.summary {
            sim.stats().print_summary(protocol);
        }
    }
    Ok(())
}

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("usage: mac_slot_sim [sweep.yaml] [--by-hosts] [--seed N] [--summary] [-v]");
            process::exit(2);
        }
    };

    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("logger init failed: {}", e);
    }

    println!("... MAC slot simulator is started ...");

    if let Err(e) = run(args) {
        error!("{}", e);
        process::exit(1);
    }
    info!("all runs complete");
}
