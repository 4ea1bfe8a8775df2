use anyhow::{anyhow, Context, Result};
use corebench::{
    bench::{Benchmark, BenchConfig, ScoringPolicy, Separation},
    core::CoreConfig,
    load_file::{Dialect, Warrior},
    parser::{self, Environment, Parser},
};
use log::debug;
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use lazy_static::lazy_static;
use structopt::StructOpt;

lazy_static! {
    static ref IO_SENTINEL: PathBuf = PathBuf::from("-");
}

#[derive(Debug, StructOpt)]
#[structopt(rename_all = "kebab")]
/// Compile Redcode warriors and benchmark them against each other
struct Options {
    /// The corebench subcommand to perform
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
struct Limits {
    /// The size of the core. Defaults to 8,000.
    #[structopt(long, short = "s")]
    core_size: Option<u32>,

    /// The maximum number of cycles per round. Defaults to 80,000.
    #[structopt(long, short = "c")]
    max_cycles: Option<u32>,

    /// The maximum number of processes per warrior. Defaults to 8,000.
    #[structopt(long, short = "p")]
    max_processes: Option<u32>,

    /// The maximum size of a warrior. Defaults to 100.
    #[structopt(long, short = "l")]
    max_warrior_length: Option<u32>,

    /// The minimum separation distance. Defaults to 100.
    #[structopt(long, short = "d")]
    min_distance: Option<u32>,

    /// The size of the P-space. Defaults to a sixteenth of the core size.
    #[structopt(long, short = "S")]
    p_space: Option<u32>,

    /// The instruction set: 88, 94nop or 94. Defaults to 94nop.
    #[structopt(long, short = "D")]
    dialect: Option<Dialect>,
}

impl Limits {
    fn core_config(&self) -> CoreConfig {
        let mut config = self
            .core_size
            .map_or_else(CoreConfig::default, CoreConfig::with_core_size);
        if let Some(max_cycles) = self.max_cycles {
            config.max_cycles = max_cycles;
        }
        if let Some(max_processes) = self.max_processes {
            config.max_processes = max_processes;
        }
        if let Some(max_warrior_length) = self.max_warrior_length {
            config.max_warrior_length = max_warrior_length;
        }
        if let Some(min_distance) = self.min_distance {
            config.min_distance = min_distance;
        }
        if let Some(p_space) = self.p_space {
            config.p_space_size = p_space;
        }
        if let Some(dialect) = self.dialect {
            config.dialect = dialect;
        }
        config
    }
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Battle warriors over many rounds and print their scores
    Bench {
        /// The number of rounds to battle. Defaults to 100.
        #[structopt(long, short = "r")]
        rounds: Option<u32>,

        /// Seed for warrior placement. Defaults to 0.
        #[structopt(long)]
        seed: Option<u64>,

        /// Load warriors exactly this far apart instead of at random
        #[structopt(long)]
        fixed: Option<u32>,

        /// Score with the (n² - 1) / survivors formula instead of 3/1/0
        #[structopt(long)]
        survivors: bool,

        /// Run rounds in parallel
        #[structopt(long)]
        parallel: bool,

        #[structopt(flatten)]
        limits: Limits,

        /// Input files; use "-" to read from stdin
        #[structopt(long, short, parse(from_os_str))]
        warrior: Vec<PathBuf>,
    },

    /// Print the compiled load file of a warrior
    Dump {
        #[structopt(flatten)]
        limits: Limits,

        /// Input file; use "-" to read from stdin
        #[structopt(long, short, parse(from_os_str))]
        warrior: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let options = Options::from_args();

    match options.command {
        Command::Bench {
            rounds,
            seed,
            fixed,
            survivors,
            parallel,
            limits,
            warrior,
        } => {
            let core = limits.core_config();
            let environment = Environment {
                warriors: warrior.len() as u32,
                rounds: rounds.unwrap_or(100),
                ..Environment::for_core(&core)
            };
            let warriors = warrior
                .iter()
                .map(|path| parse_warrior(path.as_path(), &environment))
                .collect::<Result<Vec<Warrior>>>()?;

            let config = BenchConfig {
                core,
                rounds: environment.rounds,
                seed: seed.unwrap_or(0),
                separation: fixed.map_or(Separation::Random, Separation::Fixed),
                parallel,
            };
            debug!("{:?}", config);

            let score = Benchmark::new(config)?.run(&warriors)?;
            let policy = if survivors {
                ScoringPolicy::Survivors
            } else {
                ScoringPolicy::default()
            };

            for (id, tally) in score.tallies.iter().enumerate() {
                println!(
                    "{}: {} {} {} {}",
                    warriors[id].name_or(&format!("{}", id)),
                    tally.wins,
                    tally.losses,
                    tally.ties,
                    score.score(id, policy),
                );
            }
        }
        Command::Dump { limits, warrior } => {
            let environment = Environment::for_core(&limits.core_config());
            let warrior = parse_warrior(warrior.as_path(), &environment)?;
            println!("{}", warrior);
        }
    };

    Ok(())
}

fn parse_warrior(path: &Path, environment: &Environment) -> Result<Warrior> {
    let mut input = String::new();

    if path == *IO_SENTINEL {
        io::stdin().read_to_string(&mut input)?;
    } else {
        input = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
    }

    match Parser::new(environment.clone()).parse(input.as_str()) {
        parser::Result::Ok(warrior, warnings) => {
            print_warnings(path, &warnings);
            Ok(warrior)
        }
        parser::Result::Err(err, warnings) => {
            print_warnings(path, &warnings);
            Err(anyhow!("{}: parse failed: {}", path.display(), err))
        }
    }
}

fn print_warnings(path: &Path, warnings: &[parser::Warning]) {
    for warning in warnings.iter() {
        eprintln!("Warning: {}: {}", path.display(), warning);
    }
}
