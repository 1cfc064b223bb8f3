use std::process::exit;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::{error, info};

use rebal_fw::config::{
    Direction, ElasticBounds, ImbalanceSmoothing, RebalancerObjective, RebalancerRouting, Reseed,
};
use rebal_fw::cost::Objective;
use rebal_fw::flow::EdgeFlows;
use rebal_fw::observer::LogObserver;
use rebal_fw::step::StepPolicy;
use rebal_fw::test::random_samples;
use rebal_fw::test::samples::Scenario;
use rebal_fw::{solve, Solution, SolverConfig, SolverError, SolverResult};

#[derive(Parser, Debug)]
#[command(
    version,
    author,
    about = "Frank-Wolfe traffic assignment with a co-evolving rebalancer commodity"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
enum Commands {
    #[command(about = "Solve one of the built-in sample networks")]
    Sample(SampleArgs),

    #[command(about = "Solve a seeded random network")]
    Random(RandomArgs),
}

#[derive(Args, Clone, Debug)]
struct SampleArgs {
    #[arg(short, long, value_enum, default_value_t = Scenario::Triangle)]
    scenario: Scenario,

    #[clap(flatten)]
    solver_args: SolverArgs,
}

#[derive(Args, Clone, Debug)]
struct RandomArgs {
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, help = "Number of nodes on the ring.", default_value_t = 20)]
    nodes: usize,

    #[arg(long, help = "Number of random OD pairs to draw.", default_value_t = 40)]
    pairs: usize,

    #[clap(flatten)]
    solver_args: SolverArgs,
}

#[derive(Args, Clone, Debug)]
struct SolverArgs {
    #[arg(
        long,
        help = "Step size policy: line_search, brent, derivative_root, fixed or fixed_accelerated.",
        default_value = "line_search"
    )]
    step: String,

    #[arg(long, value_enum, default_value_t = Direction::Plain)]
    direction: Direction,

    #[arg(long, value_enum, default_value_t = Objective::UserEquilibrium)]
    objective: Objective,

    #[arg(
        long,
        help = "Weight of the system optimum in the combined objective.",
        default_value_t = 0.5
    )]
    system_share: f64,

    #[arg(long, help = "Stop an inner run once the duality gap is at most this.", default_value_t = 1e-6)]
    gap_tolerance: f64,

    #[arg(long, default_value_t = 50)]
    max_inner_iterations: usize,

    #[arg(
        long,
        help = "Stop once consecutive imbalance estimates are closer than this.",
        default_value_t = 1e-6
    )]
    outer_tolerance: f64,

    #[arg(long, default_value_t = 20)]
    max_outer_iterations: usize,

    #[arg(long, help = "Wall-clock limit in seconds, applied to both loops.")]
    time_limit_secs: Option<f64>,

    #[arg(long, value_enum, default_value_t = ImbalanceSmoothing::Off)]
    smoothing: ImbalanceSmoothing,

    #[arg(long, value_enum, default_value_t = Reseed::Fresh)]
    reseed: Reseed,

    #[arg(long, value_enum, default_value_t = RebalancerRouting::Committed)]
    rebalancer_routing: RebalancerRouting,

    #[arg(long, value_enum, default_value_t = RebalancerObjective::Include)]
    rebalancer_objective: RebalancerObjective,

    #[arg(long, default_value_t = 80.0)]
    inverse_demand_shift: f64,

    #[arg(long, help = "Lower end of the elastic demand tolerance band.", requires = "elastic_upper")]
    elastic_lower: Option<f64>,

    #[arg(long, help = "Upper end of the elastic demand tolerance band.", requires = "elastic_lower")]
    elastic_upper: Option<f64>,

    #[arg(long, help = "Only log every n-th iteration.", default_value_t = 10)]
    log_iteration_count: usize,
}

impl SolverArgs {
    fn to_config(&self) -> SolverResult<SolverConfig> {
        let step: StepPolicy = self.step.parse()?;
        let time_limit = self
            .time_limit_secs
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|_| {
                    SolverError::InvalidConfig(format!("invalid time limit {}", secs))
                })
            })
            .transpose()?;
        let elastic_bounds = match (self.elastic_lower, self.elastic_upper) {
            (Some(lower), Some(upper)) => Some(ElasticBounds { lower, upper }),
            (None, None) => None,
            _ => {
                return Err(SolverError::InvalidConfig(
                    "both ends of the elastic band are required".to_string(),
                ))
            }
        };

        let mut config = SolverConfig {
            step,
            direction: self.direction,
            gap_tolerance: self.gap_tolerance,
            max_inner_iterations: self.max_inner_iterations,
            inner_time_limit: time_limit,
            outer_tolerance: self.outer_tolerance,
            max_outer_iterations: self.max_outer_iterations,
            outer_time_limit: time_limit,
            smoothing: self.smoothing,
            reseed: self.reseed,
            rebalancer_routing: self.rebalancer_routing,
            rebalancer_objective: self.rebalancer_objective,
            elastic_bounds,
            ..Default::default()
        };
        config.cost.objective = self.objective;
        config.cost.system_share = self.system_share;
        config.cost.inverse_demand_shift = self.inverse_demand_shift;
        config.validate()?;
        Ok(config)
    }
}

fn report(solution: &Solution) {
    let network = &solution.network;
    info!(
        "Finished after {} outer iterations: {:?}",
        solution.records.len(),
        solution.termination
    );
    if let Some(record) = solution.records.last() {
        info!("{:#?}", record.stats);
    }
    info!(
        "Final flows:\n{}",
        EdgeFlows::of_network(network).describe(network)
    );
    for (node_idx, node) in network.nodes() {
        info!(
            "Node {}: imbalance {:.4}",
            node.id,
            solution.imbalance.get(node_idx)
        );
    }
}

fn main_sample(args: &SampleArgs) {
    let config = args.solver_args.to_config().unwrap_or_else(|err| {
        error!("{}", err);
        exit(1);
    });
    let problem = args.scenario.problem().unwrap_or_else(|err| {
        error!("Could not build scenario {:?}: {}", args.scenario, err);
        exit(1);
    });
    let mut observer = LogObserver {
        log_iteration_count: args.solver_args.log_iteration_count,
    };
    match solve(&problem, &config, &mut observer) {
        Ok(solution) => report(&solution),
        Err(err) => {
            error!("Solver failed: {}", err);
            exit(1);
        }
    }
}

fn main_random(args: &RandomArgs) {
    let config = args.solver_args.to_config().unwrap_or_else(|err| {
        error!("{}", err);
        exit(1);
    });
    let mut observer = LogObserver {
        log_iteration_count: args.solver_args.log_iteration_count,
    };
    match random_samples::run(args.seed, args.nodes, args.pairs, &config, &mut observer) {
        Ok(solution) => report(&solution),
        Err(err) => {
            error!("Solver failed: {}", err);
            exit(1);
        }
    }
}

fn main() {
    env_logger::builder().parse_env("LOG").init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sample(args) => main_sample(&args),
        Commands::Random(args) => main_random(&args),
    }
}
