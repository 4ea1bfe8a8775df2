//! A [`Core`](Core) is a block of "memory" in which Redcode programs reside.
//! This is where all simulation of a Core Wars battle takes place.
//!
//! A `Core` is an arena owned by its caller: memory, task queues and P-space
//! are allocated once and reused by every round run on it.

use std::borrow::Borrow;
use std::fmt::{self, Debug, Display};
use std::ops::{Index, Range};

use log::trace;
use thiserror::Error as ThisError;

use crate::load_file::{refold, Dialect, Field, Instruction, Offset, Warrior};

mod address;
mod modifier;
mod opcode;
pub mod process;
mod pspace;

pub use process::Death;

/// An error occurred during loading or core creation
#[derive(ThisError, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The specified core size cannot hold any instructions
    #[error("cannot create a core with size {0}")]
    InvalidCoreSize(u32),

    /// A cycle, process, length or round limit was zero
    #[error("{0} must be greater than zero")]
    NonPositiveLimit(&'static str),

    #[error("at least {min} warriors are required, got {got}")]
    TooFewWarriors { min: usize, got: usize },

    /// The warrior was longer than allowed
    #[error("warrior {id} has {length} instructions; at most {max} are allowed")]
    WarriorTooLong { id: WarriorID, length: u32, max: u32 },

    #[error("warrior {0} has no instructions")]
    EmptyWarrior(WarriorID),

    #[error("warrior {id} was compiled for {warrior}, which a {core} core cannot run")]
    DialectMismatch {
        id: WarriorID,
        warrior: Dialect,
        core: Dialect,
    },

    /// The min distance between warriors is too large
    #[error("cannot place {warriors} warriors {min_distance} apart in a core of size {core_size}")]
    MinDistanceTooLarge {
        warriors: usize,
        min_distance: u32,
        core_size: u32,
    },

    #[error("min distance {min_distance} is shorter than warrior {id} ({length} instructions)")]
    MinDistanceTooSmall {
        id: WarriorID,
        min_distance: u32,
        length: u32,
    },

    #[error("{positions} positions given for {warriors} warriors")]
    PlacementMismatch { positions: usize, warriors: usize },

    #[error("warriors {first} and {second} overlap")]
    Overlap { first: WarriorID, second: WarriorID },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    pub core_size: u32,
    pub max_cycles: u32,
    pub max_processes: u32,
    pub max_warrior_length: u32,
    pub min_distance: u32,
    /// Cells of P-space per warrior. Only used by dialects that have P-space.
    pub p_space_size: u32,
    pub dialect: Dialect,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::with_core_size(8_000)
    }
}

impl CoreConfig {
    /// The default limits for a core of `core_size` cells, with a P-space of
    /// a sixteenth of the core.
    #[must_use]
    pub fn with_core_size(core_size: u32) -> Self {
        Self {
            core_size,
            max_cycles: 80_000,
            max_processes: 8_000,
            max_warrior_length: 100,
            min_distance: 100,
            p_space_size: (core_size / 16).max(1),
            dialect: Dialect::default(),
        }
    }

    /// Check the limits are usable, before any round is run.
    pub fn validate(&self) -> Result<(), Error> {
        if self.core_size == 0 {
            return Err(Error::InvalidCoreSize(self.core_size));
        }
        let limits = [
            ("max_cycles", self.max_cycles),
            ("max_processes", self.max_processes),
            ("max_warrior_length", self.max_warrior_length),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(Error::NonPositiveLimit(*name));
        }
        Ok(())
    }
}

/// Where each warrior is loaded for a round, and which warrior moves first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placement {
    pub positions: Vec<u32>,
    pub first: WarriorID,
}

impl Placement {
    #[must_use]
    pub fn new(positions: Vec<u32>) -> Self {
        Self {
            positions,
            first: 0,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Outcome {
    Win,
    Loss(Death),
    Tie,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "Win"),
            Outcome::Loss(e) => write!(f, "Loss, {}", e),
            Outcome::Tie => write!(f, "Tie"),
        }
    }
}

/// What happened to every warrior in one round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundResult {
    pub outcomes: Vec<Outcome>,
    /// The number of cycles executed before the round ended
    pub cycles: u32,
}

impl RoundResult {
    /// The number of warriors that did not lose.
    #[must_use]
    pub fn survivors(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| !matches!(outcome, Outcome::Loss(_)))
            .count()
    }

    #[must_use]
    pub fn winner(&self) -> Option<WarriorID> {
        self.outcomes
            .iter()
            .position(|outcome| *outcome == Outcome::Win)
    }
}

pub type WarriorID = usize;

/// The full memory core at a given point in time
pub struct Core {
    config: CoreConfig,
    instructions: Vec<Instruction>,
    queues: process::Queues,
    p_space: pspace::PSpace,
    result: RoundResult,
    deaths: Vec<Option<(Death, u32)>>,
    num_warriors: usize,
    cycles: u32,
    tracing: bool,
}

impl Core {
    /// Create a new Core with the given configuration.
    pub fn new(config: CoreConfig) -> Result<Self, Error> {
        config.validate()?;
        let p_space_size = if config.dialect.has_p_space() {
            config.p_space_size
        } else {
            0
        };
        Ok(Self {
            instructions: vec![Instruction::default(); config.core_size as usize],
            queues: process::Queues::new(config.max_processes),
            p_space: pspace::PSpace::new(p_space_size),
            result: RoundResult::default(),
            deaths: Vec::new(),
            num_warriors: 0,
            cycles: 0,
            tracing: true,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Cycles executed so far in the current round
    #[must_use]
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Turn per-instruction trace logging on or off.
    pub fn set_tracing(&mut self, tracing: bool) {
        self.tracing = tracing;
    }

    /// Forget all P-space contents. The next round starts a new session.
    pub fn reset_p_space(&mut self) {
        self.p_space.reset(0, self.len());
    }

    /// The P-space cells of a warrior in the current session.
    #[must_use]
    pub fn p_space(&self, id: WarriorID) -> &[u32] {
        self.p_space.cells(id)
    }

    /// The number of live processes a warrior has
    #[must_use]
    pub fn process_count(&self, id: WarriorID) -> usize {
        self.queues.thread_count(id)
    }

    /// Get the number of instructions in the core (available to programs
    /// via the `CORESIZE` label)
    #[must_use]
    pub fn len(&self) -> u32 {
        self.instructions.len() as u32
    }

    /// Whether the core is empty or not (almost always `false`)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Get an instruction from a given index in the core
    #[must_use]
    pub fn get(&self, index: u32) -> &Instruction {
        &self.instructions[(index % self.len()) as usize]
    }

    /// Get an instruction from a given offset in the core
    fn get_offset(&self, offset: Offset) -> &Instruction {
        &self.instructions[offset.index()]
    }

    /// Get a mutable from a given offset in the core
    fn get_offset_mut(&mut self, offset: Offset) -> &mut Instruction {
        &mut self.instructions[offset.index()]
    }

    fn offset(&self, value: u32) -> Offset {
        Offset::new(i64::from(value), self.len())
    }

    /// Run one round with `warriors` loaded at `placement`, until a single
    /// warrior is left or the cycle budget runs out.
    pub fn run_round(
        &mut self,
        warriors: &[Warrior],
        placement: &Placement,
    ) -> Result<&RoundResult, Error> {
        self.run(warriors, placement)
    }

    /// [`run_round`](Self::run_round) for warriors that are not stored together.
    pub fn run_borrowed(
        &mut self,
        warriors: &[&Warrior],
        placement: &Placement,
    ) -> Result<&RoundResult, Error> {
        self.run(warriors, placement)
    }

    fn run<W: Borrow<Warrior>>(
        &mut self,
        warriors: &[W],
        placement: &Placement,
    ) -> Result<&RoundResult, Error> {
        self.load(warriors, placement)?;

        if self.tracing {
            trace!("init:\n{:?}", self);
        }

        let count = self.num_warriors;
        while self.cycles < self.config.max_cycles {
            for turn in 0..count {
                let id = (placement.first + turn) % count;
                if !self.queues.is_alive(id) {
                    continue;
                }
                if let Some(death) = self.step(id) {
                    if !self.queues.is_alive(id) {
                        self.deaths[id] = Some((death, self.cycles));
                    }
                }
            }
            self.cycles += 1;

            let alive = (0..count).filter(|&id| self.queues.is_alive(id)).count();
            if alive == 0 || (count > 1 && alive == 1) {
                break;
            }
        }

        self.settle();
        Ok(&self.result)
    }

    /// Clear the core and load `warriors` at their positions.
    fn load<W: Borrow<Warrior>>(
        &mut self,
        warriors: &[W],
        placement: &Placement,
    ) -> Result<(), Error> {
        if warriors.is_empty() {
            return Err(Error::TooFewWarriors { min: 1, got: 0 });
        }
        if warriors.len() != placement.positions.len() {
            return Err(Error::PlacementMismatch {
                positions: placement.positions.len(),
                warriors: warriors.len(),
            });
        }

        let core_size = self.len();
        for (id, warrior) in warriors.iter().map(Borrow::<Warrior>::borrow).enumerate() {
            if warrior.is_empty() {
                return Err(Error::EmptyWarrior(id));
            }
            if warrior.len() > self.config.max_warrior_length || warrior.len() > core_size {
                return Err(Error::WarriorTooLong {
                    id,
                    length: warrior.len(),
                    max: self.config.max_warrior_length.min(core_size),
                });
            }
            if !self.config.dialect.accepts(warrior.dialect) {
                return Err(Error::DialectMismatch {
                    id,
                    warrior: warrior.dialect,
                    core: self.config.dialect,
                });
            }
        }
        check_overlap(warriors, &placement.positions, core_size)?;

        self.num_warriors = warriors.len();
        self.cycles = 0;
        self.instructions.fill(Instruction::default());
        self.queues.reset(self.num_warriors);
        self.deaths.clear();
        self.deaths.resize(self.num_warriors, None);
        if !self.p_space.is_ready_for(self.num_warriors) {
            self.p_space.reset(self.num_warriors, core_size);
        }

        for (id, (warrior, &position)) in warriors
            .iter()
            .map(Borrow::<Warrior>::borrow)
            .zip(&placement.positions)
            .enumerate()
        {
            let base = self.offset(position);
            for (i, instruction) in warrior.program.instructions.iter().enumerate() {
                let instruction = self.normalize(*instruction, warrior.core_size);
                *self.get_offset_mut(base + i as u32) = instruction;
            }
            self.queues.push(id, base + warrior.program.start());
        }
        Ok(())
    }

    /// Fold an instruction compiled for a core of `compiled` cells into this core.
    fn normalize(&self, mut instruction: Instruction, compiled: u32) -> Instruction {
        let core_size = self.len();
        let fold = |field: Field| {
            Field::new(field.mode, refold(field.value, compiled, core_size))
        };
        instruction.a_field = fold(instruction.a_field);
        instruction.b_field = fold(instruction.b_field);
        instruction
    }

    /// Execute the next process of warrior `id`. Returns how it died, if it did.
    fn step(&mut self, id: WarriorID) -> Option<Death> {
        let program_counter = self.queues.pop(id)?;

        if self.tracing {
            trace!(
                "Cycle{:>6} w:{:>2} t:{:>4} {:#06x} {}",
                self.cycles,
                id,
                self.queues.thread_count(id),
                program_counter.value(),
                self.get_offset(program_counter),
            );
        }

        match opcode::execute(self, id, program_counter) {
            Ok(opcode::Flow::Jump(next)) => {
                self.queues.push(id, next);
                None
            }
            Ok(opcode::Flow::Split { next, spawn }) => {
                self.queues.push(id, next);
                if !self.queues.push(id, spawn) && self.tracing {
                    trace!("warrior {} is at the process limit", id);
                }
                None
            }
            Err(death) => Some(death),
        }
    }

    /// Decide every warrior's outcome once the round loop has stopped.
    fn settle(&mut self) {
        let count = self.num_warriors;
        let alive = (0..count).filter(|&id| self.queues.is_alive(id)).count();
        let last_cycle = self.cycles.saturating_sub(1);

        self.result.cycles = self.cycles;
        self.result.outcomes.clear();
        for id in 0..count {
            let outcome = match self.deaths[id] {
                None if count == 1 || alive == 1 => Outcome::Win,
                None => Outcome::Tie,
                Some((_, cycle)) if alive == 0 && count > 1 && cycle == last_cycle => Outcome::Tie,
                Some((death, _)) => Outcome::Loss(death),
            };
            self.result.outcomes.push(outcome);
        }

        let outcomes = &self.result.outcomes;
        let lost = |id: WarriorID| matches!(outcomes[id], Outcome::Loss(_));
        self.p_space.record_results(0, lost);
        self.p_space
            .record_results(self.result.survivors() as u32, |id| !lost(id));
    }
}

/// Fail if any two warriors would share a cell of the core.
fn check_overlap<W: Borrow<Warrior>>(
    warriors: &[W],
    positions: &[u32],
    core_size: u32,
) -> Result<(), Error> {
    let length = |id: WarriorID| u64::from(Borrow::<Warrior>::borrow(&warriors[id]).len());
    for first in 0..warriors.len() {
        for second in first + 1..warriors.len() {
            let forward = (u64::from(positions[second]) + u64::from(core_size)
                - u64::from(positions[first] % core_size))
                % u64::from(core_size);
            let backward = (u64::from(core_size) - forward) % u64::from(core_size);
            if forward < length(first) || backward < length(second) {
                return Err(Error::Overlap { first, second });
            }
        }
    }
    Ok(())
}

impl Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Core: {:?}", self.config)?;
        write!(f, "{:?}", Instructions(&self.instructions))
    }
}

struct Instructions<'a>(&'a [Instruction]);

impl<'a> Debug for Instructions<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut run = 0;
        let mut last = None;
        for (idx, instruction) in self.0.iter().enumerate() {
            if let Some(last) = last {
                if last == instruction {
                    run += 1;
                    continue;
                } else if run > 0 {
                    if run >= 5 {
                        writeln!(f, "Repeats {} more times", run)?;
                    } else {
                        for i in 0..run {
                            writeln!(f, "{:#06x} {}", idx - run + i, last)?;
                        }
                    }
                    run = 0;
                }
            }
            writeln!(f, "{:#06x} {}", idx, instruction)?;
            last = Some(instruction);
        }
        if run > 0 {
            writeln!(f, "Repeats {} more times", run)?;
        }
        Ok(())
    }
}

impl Index<Range<usize>> for Core {
    type Output = [Instruction];

    fn index(&self, index: Range<usize>) -> &Self::Output {
        &self.instructions[index]
    }
}
