//! Scoring a candidate warrior against fixed references, for search loops
//! that call it many times.
//!
//! An [`Optimizer`] owns one [`Core`] and one [`Placement`] and reuses them
//! for every round of every call. It does no logging. For each reference it
//! plays exactly the rounds a [`Benchmark`](crate::bench::Benchmark) with the
//! same seed plays for `[candidate, reference]`, so the two agree.

use crate::bench::{Placer, ScoringPolicy, Separation, Tally};
use crate::core::{Core, CoreConfig, Error, Outcome, Placement};
use crate::load_file::Warrior;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptConfig {
    pub core: CoreConfig,
    pub rounds: u32,
    pub seed: u64,
    pub separation: Separation,
    pub policy: ScoringPolicy,
}

impl Default for OptConfig {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            rounds: 100,
            seed: 0,
            separation: Separation::default(),
            policy: ScoringPolicy::default(),
        }
    }
}

/// The candidate's results against one reference.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl Record {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss(_) => self.losses += 1,
            Outcome::Tie => self.ties += 1,
        }
    }

    /// In a two warrior battle a win is always survived alone and a tie
    /// always shared.
    #[must_use]
    pub fn score(&self, policy: ScoringPolicy) -> u64 {
        let tally = Tally {
            wins: self.wins,
            losses: self.losses,
            ties: self.ties,
            survived: vec![0, self.wins, self.ties],
        };
        policy.score(&tally, 2)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scores {
    /// One record per reference, in order
    pub records: Vec<Record>,
    policy: ScoringPolicy,
}

impl Scores {
    /// The score against each reference.
    pub fn vector(&self) -> impl Iterator<Item = u64> + '_ {
        self.records
            .iter()
            .map(move |record| record.score(self.policy))
    }

    /// The sum of the scores against every reference.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.vector().sum()
    }
}

pub struct Optimizer {
    config: OptConfig,
    core: Core,
    placement: Placement,
}

impl Optimizer {
    pub fn new(config: OptConfig) -> Result<Self, Error> {
        if config.rounds == 0 {
            return Err(Error::NonPositiveLimit("rounds"));
        }
        let mut core = Core::new(config.core.clone())?;
        core.set_tracing(false);
        Ok(Self {
            config,
            core,
            placement: Placement::default(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &OptConfig {
        &self.config
    }

    /// Battle `candidate` against every reference in turn.
    pub fn score_against(
        &mut self,
        candidate: &Warrior,
        references: &[Warrior],
    ) -> Result<Scores, Error> {
        if references.is_empty() {
            return Err(Error::TooFewWarriors { min: 2, got: 1 });
        }

        let mut records = Vec::with_capacity(references.len());
        for reference in references {
            let pair = [candidate, reference];
            let mut placer = Placer::new(
                self.config.seed,
                self.config.separation,
                &self.config.core,
            );
            placer.check(&[candidate.len(), reference.len()])?;
            self.core.reset_p_space();

            let mut record = Record::default();
            for round in 0..self.config.rounds as usize {
                placer.place(pair.len(), round, &mut self.placement);
                let result = self.core.run_borrowed(&pair, &self.placement)?;
                record.record(result.outcomes[0]);
            }
            records.push(record);
        }

        Ok(Scores {
            records,
            policy: self.config.policy,
        })
    }
}
