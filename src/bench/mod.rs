//! Running many rounds between the same warriors and adding up the results.
//!
//! Every placement for a session is drawn up front from the seed, so a
//! benchmark gives the same [`Score`] whether its rounds run one after the
//! other or spread over a thread pool.

use std::fmt;

use log::{debug, info};
use rayon::prelude::*;

use crate::core::{Core, CoreConfig, Error, Outcome, Placement, RoundResult, WarriorID};
use crate::load_file::Warrior;

pub mod position;

pub use position::{Placer, Separation};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchConfig {
    pub core: CoreConfig,
    pub rounds: u32,
    pub seed: u64,
    pub separation: Separation,
    /// Spread rounds over the rayon thread pool. Ignored when the dialect has
    /// P-space, since rounds then depend on each other.
    pub parallel: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            rounds: 100,
            seed: 0,
            separation: Separation::default(),
            parallel: false,
        }
    }
}

/// How a [`Tally`] turns into a single number.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScoringPolicy {
    /// Fixed points per round won, tied and lost
    Points { win: u32, tie: u32, loss: u32 },
    /// `(n² - 1) / k` for every round survived alongside `k - 1` others, for
    /// `n` warriors
    Survivors,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::Points {
            win: 3,
            tie: 1,
            loss: 0,
        }
    }
}

impl ScoringPolicy {
    /// Score one warrior's tally from a battle of `warriors` warriors.
    #[must_use]
    pub fn score(self, tally: &Tally, warriors: usize) -> u64 {
        match self {
            Self::Points { win, tie, loss } => {
                u64::from(tally.wins) * u64::from(win)
                    + u64::from(tally.ties) * u64::from(tie)
                    + u64::from(tally.losses) * u64::from(loss)
            }
            Self::Survivors => {
                let n = warriors as u64;
                tally
                    .survived
                    .iter()
                    .enumerate()
                    .skip(1)
                    .map(|(k, &rounds)| u64::from(rounds) * ((n * n - 1) / k as u64))
                    .sum()
            }
        }
    }
}

/// One warrior's results over a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    /// `survived[k]`: rounds this warrior finished without losing, sharing
    /// the result with `k` warriors in total
    pub survived: Vec<u32>,
}

impl Tally {
    fn record(&mut self, outcome: Outcome, survivors: usize) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss(_) => {
                self.losses += 1;
                return;
            }
            Outcome::Tie => self.ties += 1,
        }
        if self.survived.len() <= survivors {
            self.survived.resize(survivors + 1, 0);
        }
        self.survived[survivors] += 1;
    }

    fn merge(&mut self, other: &Self) {
        self.wins += other.wins;
        self.losses += other.losses;
        self.ties += other.ties;
        if self.survived.len() < other.survived.len() {
            self.survived.resize(other.survived.len(), 0);
        }
        for (total, rounds) in self.survived.iter_mut().zip(&other.survived) {
            *total += rounds;
        }
    }

    #[must_use]
    pub fn rounds(&self) -> u32 {
        self.wins + self.losses + self.ties
    }
}

/// Results for every warrior of a session, indexed by [`WarriorID`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Score {
    pub tallies: Vec<Tally>,
    pub rounds: u32,
}

impl Score {
    #[must_use]
    pub fn new(warriors: usize) -> Self {
        Self {
            tallies: vec![Tally::default(); warriors],
            rounds: 0,
        }
    }

    pub fn record(&mut self, result: &RoundResult) {
        let survivors = result.survivors();
        for (tally, &outcome) in self.tallies.iter_mut().zip(&result.outcomes) {
            tally.record(outcome, survivors);
        }
        self.rounds += 1;
    }

    /// Combine the results of two sessions between the same warriors.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        if self.tallies.len() < other.tallies.len() {
            self.tallies.resize(other.tallies.len(), Tally::default());
        }
        for (tally, theirs) in self.tallies.iter_mut().zip(&other.tallies) {
            tally.merge(theirs);
        }
        self.rounds += other.rounds;
        self
    }

    #[must_use]
    pub fn score(&self, id: WarriorID, policy: ScoringPolicy) -> u64 {
        policy.score(&self.tallies[id], self.tallies.len())
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, tally) in self.tallies.iter().enumerate() {
            writeln!(
                f,
                "{}: {} {} {} {}",
                id,
                tally.wins,
                tally.losses,
                tally.ties,
                self.score(id, ScoringPolicy::default())
            )?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Benchmark {
    config: BenchConfig,
}

impl Benchmark {
    /// Check the configuration. No round is run yet.
    pub fn new(config: BenchConfig) -> Result<Self, Error> {
        config.core.validate()?;
        if config.rounds == 0 {
            return Err(Error::NonPositiveLimit("rounds"));
        }
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Draw the placement of every round of a session for `warriors`.
    pub fn placements(&self, warriors: &[Warrior]) -> Result<Vec<Placement>, Error> {
        if warriors.len() < 2 {
            return Err(Error::TooFewWarriors {
                min: 2,
                got: warriors.len(),
            });
        }
        let mut placer = Placer::new(self.config.seed, self.config.separation, &self.config.core);
        placer.check(&warriors.iter().map(Warrior::len).collect::<Vec<_>>())?;

        Ok((0..self.config.rounds as usize)
            .map(|round| {
                let mut placement = Placement::default();
                placer.place(warriors.len(), round, &mut placement);
                placement
            })
            .collect())
    }

    /// Run every round of a session and add up the results.
    pub fn run(&self, warriors: &[Warrior]) -> Result<Score, Error> {
        let placements = self.placements(warriors)?;
        let count = warriors.len();
        let parallel = self.config.parallel && !self.config.core.dialect.has_p_space();

        info!(
            "Benchmarking {} warriors over {} rounds (seed {}, {})",
            count,
            self.config.rounds,
            self.config.seed,
            if parallel { "parallel" } else { "sequential" },
        );

        let score = if parallel {
            placements
                .par_iter()
                .enumerate()
                .map_init(
                    || Core::new(self.config.core.clone()),
                    |core, (round, placement)| -> Result<Score, Error> {
                        let core = core.as_mut().map_err(|err| err.clone())?;
                        let result = core.run_round(warriors, placement)?;
                        log_round(round, result);
                        let mut score = Score::new(count);
                        score.record(result);
                        Ok(score)
                    },
                )
                .try_reduce(|| Score::new(count), |a, b| Ok(a.merge(b)))?
        } else {
            let mut core = Core::new(self.config.core.clone())?;
            let mut score = Score::new(count);
            for (round, placement) in placements.iter().enumerate() {
                let result = core.run_round(warriors, placement)?;
                log_round(round, result);
                score.record(result);
            }
            score
        };

        for (id, tally) in score.tallies.iter().enumerate() {
            info!(
                "{}: {} wins, {} losses, {} ties",
                warriors[id].name_or("unnamed"),
                tally.wins,
                tally.losses,
                tally.ties
            );
        }
        Ok(score)
    }
}

fn log_round(round: usize, result: &RoundResult) {
    debug!(
        "Round {:>4} ended after {} cycles: {}",
        round,
        result.cycles,
        result
            .outcomes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    );
}

/// Run a benchmark session with `config`.
pub fn benchmark(warriors: &[Warrior], config: &BenchConfig) -> Result<Score, Error> {
    Benchmark::new(config.clone())?.run(warriors)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::load_file::Dialect;
    use crate::parser::{self, Environment, Parser};

    const IMP: &str = "mov 0, 1";
    const DWARF: &str = "
        add #4, 3
        mov 2, @2
        jmp -2
        dat #0, #0
    ";

    fn compile(sources: &[&str]) -> Vec<Warrior> {
        sources
            .iter()
            .map(|source| parser::parse(source).expect("Failed to parse warrior"))
            .collect()
    }

    fn config(rounds: u32) -> BenchConfig {
        BenchConfig {
            core: CoreConfig {
                max_cycles: 2000,
                ..CoreConfig::default()
            },
            rounds,
            seed: 42,
            ..BenchConfig::default()
        }
    }

    #[test]
    fn same_seed_same_score() {
        let warriors = compile(&[IMP, DWARF]);
        let first = benchmark(&warriors, &config(40)).unwrap();
        let second = benchmark(&warriors, &config(40)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.rounds, 40);
        assert_eq!(first.tallies[0].rounds(), 40);
    }

    #[test]
    fn parallel_matches_sequential() {
        let warriors = compile(&[IMP, DWARF, "spl 0\nmov -1, 2"]);
        let sequential = benchmark(&warriors, &config(30)).unwrap();
        let parallel = benchmark(
            &warriors,
            &BenchConfig {
                parallel: true,
                ..config(30)
            },
        )
        .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn dat_loses_every_round() {
        let warriors = compile(&[IMP, "dat #0, #0"]);
        let score = benchmark(&warriors, &config(50)).unwrap();
        assert_eq!(score.tallies[1].losses, 50);
        assert_eq!(score.tallies[0].wins, 50);
        assert_eq!(score.score(0, ScoringPolicy::default()), 150);
    }

    #[test]
    fn identical_imps_always_tie() {
        let warriors = compile(&[IMP, IMP]);
        let score = benchmark(&warriors, &config(20)).unwrap();
        assert_eq!(score.tallies[0].ties, 20);
        assert_eq!(score.tallies[1].ties, 20);
        assert_eq!(score.tallies[0].survived, vec![0, 0, 20]);
    }

    #[test]
    fn p_space_sessions_run() {
        let core = CoreConfig {
            dialect: Dialect::Icws94,
            max_cycles: 500,
            ..CoreConfig::default()
        };
        let parser = Parser::new(Environment::for_core(&core));
        // dies while cell 0 still holds -1, then turns into an imp
        let warriors = vec![
            parser
                .parse("ldp.ab #0, #0\nsne.ab #-1, $-1\ndat #0, #0\nmov 0, 1")
                .unwrap(),
            parser.parse(IMP).unwrap(),
        ];

        let score = benchmark(
            &warriors,
            &BenchConfig {
                core,
                rounds: 4,
                parallel: true,
                ..BenchConfig::default()
            },
        )
        .unwrap();
        assert_eq!(score.tallies[0].losses, 1);
        assert_eq!(score.tallies[0].ties, 3);
    }

    #[test]
    fn configuration_errors() {
        let warriors = compile(&[IMP, IMP]);
        let cases = vec![
            (
                BenchConfig {
                    rounds: 0,
                    ..BenchConfig::default()
                },
                Error::NonPositiveLimit("rounds"),
            ),
            (
                BenchConfig {
                    core: CoreConfig {
                        max_processes: 0,
                        ..CoreConfig::default()
                    },
                    ..BenchConfig::default()
                },
                Error::NonPositiveLimit("max_processes"),
            ),
            (
                BenchConfig {
                    core: CoreConfig {
                        core_size: 150,
                        ..CoreConfig::default()
                    },
                    ..BenchConfig::default()
                },
                Error::MinDistanceTooLarge {
                    warriors: 2,
                    min_distance: 100,
                    core_size: 150,
                },
            ),
        ];
        for (config, expected) in cases {
            assert_eq!(benchmark(&warriors, &config), Err(expected));
        }
    }

    #[test]
    fn needs_two_warriors() {
        let warriors = compile(&[IMP]);
        assert_eq!(
            benchmark(&warriors, &BenchConfig::default()),
            Err(Error::TooFewWarriors { min: 2, got: 1 })
        );
    }

    #[test]
    fn survivors_policy() {
        let tally = Tally {
            wins: 2,
            losses: 1,
            ties: 1,
            survived: vec![0, 2, 1],
        };
        // n = 3: a win is worth 8, a two way tie 4
        assert_eq!(ScoringPolicy::Survivors.score(&tally, 3), 20);
        assert_eq!(ScoringPolicy::default().score(&tally, 3), 7);
    }

    #[test]
    fn merge_is_order_independent() {
        let mut a = Score::new(2);
        a.tallies[0].record(Outcome::Win, 1);
        a.tallies[1].record(Outcome::Tie, 2);
        let mut b = Score::new(2);
        b.tallies[1].record(Outcome::Tie, 2);

        assert_eq!(a.clone().merge(b.clone()), b.merge(a));
    }
}
