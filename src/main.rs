use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use log::info;

use firing_solution::ballistics::{AltitudeConvention, Solution, Trajectory};
use firing_solution::cache::DEFAULT_CACHE_CAPACITY;
use firing_solution::equipment::EquipmentRegistry;
use firing_solution::solution::{DEFAULT_SOLUTION_LIMIT, FiringQuery, SolutionFinder, TrajectoryOutcome};
use firing_solution::table::{DEFAULT_TABLE_ROOT, RangeTableStore, StoreConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Artillery firing solutions from range tables", long_about = None)]
struct Args {
    /// Directory holding one subdirectory of range tables per weapon
    #[arg(long, default_value = DEFAULT_TABLE_ROOT)]
    tables: PathBuf,

    /// JSON equipment definitions (defaults to the built-in weapon list)
    #[arg(long)]
    equipment: Option<PathBuf>,

    #[arg(long, default_value = "M109A6")]
    weapon: String,

    /// Target distance in meters
    #[arg(long, required_unless_present = "list")]
    distance: Option<f64>,

    /// Altitude difference in meters, already signed
    #[arg(long, conflicts_with_all = ["my_alt", "target_alt"], allow_negative_numbers = true)]
    altitude_delta: Option<f64>,

    #[arg(long, requires = "target_alt", allow_negative_numbers = true)]
    my_alt: Option<f64>,

    #[arg(long, requires = "my_alt", allow_negative_numbers = true)]
    target_alt: Option<f64>,

    #[arg(long, value_enum, default_value_t = Convention::FiringPointAbove)]
    convention: Convention,

    /// Only solve this trajectory (low or high)
    #[arg(long)]
    trajectory: Option<Trajectory>,

    /// Charges to try, in order; overrides discovery and configuration
    #[arg(long = "charge")]
    charges: Vec<u32>,

    #[arg(long, default_value_t = DEFAULT_SOLUTION_LIMIT)]
    limit: usize,

    /// List the tables available for the weapon and exit
    #[arg(long)]
    list: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Convention {
    /// my_alt - target_alt
    FiringPointAbove,
    /// target_alt - my_alt
    TargetAbove,
}

impl From<Convention> for AltitudeConvention {
    fn from(value: Convention) -> Self {
        match value {
            Convention::FiringPointAbove => AltitudeConvention::FiringPointAboveTarget,
            Convention::TargetAbove => AltitudeConvention::TargetAboveFiringPoint,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let registry = match &args.equipment {
        Some(path) => EquipmentRegistry::from_json_file(path)
            .with_context(|| format!("loading equipment from {}", path.display()))?,
        None => EquipmentRegistry::builtin(),
    };
    let config = StoreConfig {
        root: args.tables.clone(),
        cache_capacity: DEFAULT_CACHE_CAPACITY,
    };
    let store = Arc::new(RangeTableStore::new(config, registry));
    info!("range tables under {}", args.tables.display());

    if args.list {
        return list_tables(&store, &args.weapon);
    }

    let Some(distance) = args.distance else {
        bail!("--distance is required");
    };
    let altitude_delta = match (args.altitude_delta, args.my_alt, args.target_alt) {
        (Some(delta), _, _) => delta,
        (None, Some(my_alt), Some(target_alt)) => {
            AltitudeConvention::from(args.convention).delta(my_alt, target_alt)
        }
        _ => 0.0,
    };

    let finder = SolutionFinder::new(store);
    let outcomes: Vec<(Trajectory, TrajectoryOutcome)> = match args.trajectory {
        Some(trajectory) if !args.charges.is_empty() => {
            let query = FiringQuery::new(args.weapon.as_str(), trajectory, distance, altitude_delta);
            let solutions = finder.find_solutions(&query, args.limit, Some(&args.charges));
            vec![(trajectory, TrajectoryOutcome::Solutions(solutions))]
        }
        Some(trajectory) => {
            let outcome = finder.solve_trajectory(&args.weapon, trajectory, distance, altitude_delta, args.limit);
            vec![(trajectory, outcome)]
        }
        None if !args.charges.is_empty() => Trajectory::ALL
            .into_iter()
            .map(|trajectory| {
                let query = FiringQuery::new(args.weapon.as_str(), trajectory, distance, altitude_delta);
                let solutions = finder.find_solutions(&query, args.limit, Some(&args.charges));
                (trajectory, TrajectoryOutcome::Solutions(solutions))
            })
            .collect(),
        None => {
            let all = finder.solve(&args.weapon, distance, altitude_delta, args.limit);
            vec![(Trajectory::Low, all.low), (Trajectory::High, all.high)]
        }
    };

    if args.json {
        let trajectories: BTreeMap<String, &TrajectoryOutcome> = outcomes
            .iter()
            .map(|(trajectory, outcome)| (trajectory.to_string(), outcome))
            .collect();
        let report = serde_json::json!({
            "weapon": args.weapon,
            "distance": distance,
            "altitude_delta": altitude_delta,
            "trajectories": trajectories,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} | distance {distance} m | altitude delta {altitude_delta:+.1} m", args.weapon);
    for (trajectory, outcome) in &outcomes {
        let title = trajectory.as_str().to_uppercase();
        println!("{}", format_outcome(&title, outcome));
    }
    Ok(())
}

fn list_tables(store: &RangeTableStore, weapon: &str) -> Result<()> {
    let keys = store.list_tables(weapon)?;
    if keys.is_empty() {
        bail!(
            "no range tables for {weapon} under {}",
            store.loader().weapon_dir(store.registry().prefix_for(weapon)).display()
        );
    }
    println!("Available range tables:");
    for key in keys {
        let span = match store.load_rows(&key.weapon, key.trajectory, key.charge) {
            Ok(table) => match table.span() {
                Some((min, max)) => format!("{min} m .. {max} m"),
                None => "no usable rows".to_string(),
            },
            Err(e) => e.to_string(),
        };
        println!("- {key} ({span})");
    }
    Ok(())
}

fn format_outcome(title: &str, outcome: &TrajectoryOutcome) -> String {
    match outcome {
        TrajectoryOutcome::Unsupported => format!("{title}: trajectory not fired by this weapon"),
        TrajectoryOutcome::NoData => format!("{title}: no range tables"),
        TrajectoryOutcome::Solutions(solutions) => format_solution_list(title, solutions),
    }
}

fn format_solution_list(title: &str, solutions: &[Solution]) -> String {
    if solutions.is_empty() {
        return format!("{title}: out of range");
    }
    let mut lines = vec![format!("{title}:"), format!("{:>2} | {:>10} | {:>5}", "CH", "MILL", "ETA")];
    for solution in solutions {
        lines.push(format!(
            "{:>2} | {:>10.2} | {:>5.1}",
            solution.charge, solution.mill, solution.eta
        ));
    }
    lines.join("\n")
}
