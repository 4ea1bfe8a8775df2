//! The compiled ("load file") form of a Redcode warrior: fully resolved
//! instructions with no labels or expressions left, ready to be placed in a
//! [`Core`](crate::core::Core).

use std::fmt;

use itertools::Itertools;

mod dialect;
mod offset;
mod types;

pub use dialect::Dialect;
pub use offset::{fold, refold, Offset};
pub use types::{
    AddressMode, Field, Instruction, Modifier, Opcode, PseudoOpcode, UnknownMnemonic,
};

/// The instructions of a warrior and the index execution starts at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    /// Entry point relative to the first instruction. `None` means 0.
    pub origin: Option<u32>,
}

impl Program {
    #[must_use]
    pub fn start(&self) -> u32 {
        self.origin.unwrap_or(0)
    }
}

impl Program {
    /// The load file as `dialect` spells it: '88 source has no modifiers.
    #[must_use]
    pub fn display(&self, dialect: Dialect) -> LoadFile<'_> {
        LoadFile {
            program: self,
            modifiers: dialect.allows_modifiers(),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display(Dialect::default()))
    }
}

/// Displays a [`Program`] as a load file.
pub struct LoadFile<'a> {
    program: &'a Program,
    modifiers: bool,
}

impl fmt::Display for LoadFile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let instructions = self.program.instructions.iter().map(|instruction| {
            if self.modifiers {
                instruction.to_string()
            } else {
                format!(
                    "{:<8}{}, {}",
                    instruction.opcode, instruction.a_field, instruction.b_field
                )
            }
        });
        write!(
            f,
            "{:<8}{}\n{}",
            PseudoOpcode::Org,
            self.program.start(),
            instructions.format("\n")
        )
    }
}

/// Informational comments collected while parsing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    pub name: Option<String>,
    pub author: Option<String>,
    pub strategy: Option<String>,
    /// The text after `;redcode`, e.g. `-94`
    pub redcode: Option<String>,
}

/// A compiled warrior.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Warrior {
    pub program: Program,
    pub metadata: Metadata,
    pub dialect: Dialect,
    /// The core size the fields were folded against. 0 if unknown.
    pub core_size: u32,
}

impl Warrior {
    /// The number of instructions in the warrior
    #[must_use]
    pub fn len(&self) -> u32 {
        self.program.instructions.len() as u32
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.program.instructions.is_empty()
    }

    /// The name from the `;name` comment, or a fallback.
    #[must_use]
    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.metadata.name.as_deref().unwrap_or(fallback)
    }
}

impl fmt::Display for Warrior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(redcode) = &self.metadata.redcode {
            if redcode.is_empty() || redcode.starts_with('-') {
                writeln!(f, ";redcode{}", redcode)?;
            } else {
                writeln!(f, ";redcode {}", redcode)?;
            }
        }
        if let Some(name) = &self.metadata.name {
            writeln!(f, ";name {}", name)?;
        }
        if let Some(author) = &self.metadata.author {
            writeln!(f, ";author {}", author)?;
        }
        if let Some(strategy) = &self.metadata.strategy {
            for line in strategy.lines() {
                writeln!(f, ";strategy {}", line)?;
            }
        }
        write!(f, "{}", self.program.display(self.dialect))
    }
}
