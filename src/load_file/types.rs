use std::fmt;
use std::str::FromStr;

use thiserror::Error as ThisError;

/// A mnemonic could not be mapped to an [`Opcode`], [`Modifier`] or [`AddressMode`].
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} `{text}`")]
pub struct UnknownMnemonic {
    kind: &'static str,
    text: String,
}

impl UnknownMnemonic {
    pub(crate) fn new(kind: &'static str, text: &str) -> Self {
        Self {
            kind,
            text: text.to_owned(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Opcode {
    Dat,
    Mov,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Jmp,
    Jmz,
    Jmn,
    Djn,
    /// Also accepted in source as `SEQ`
    Cmp,
    Sne,
    Slt,
    Spl,
    Nop,
    Ldp,
    Stp,
}

impl Opcode {
    pub const ALL: [Self; 18] = [
        Self::Dat,
        Self::Mov,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::Jmp,
        Self::Jmz,
        Self::Jmn,
        Self::Djn,
        Self::Cmp,
        Self::Sne,
        Self::Slt,
        Self::Spl,
        Self::Nop,
        Self::Ldp,
        Self::Stp,
    ];

    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Dat => "DAT",
            Self::Mov => "MOV",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::Jmp => "JMP",
            Self::Jmz => "JMZ",
            Self::Jmn => "JMN",
            Self::Djn => "DJN",
            Self::Cmp => "CMP",
            Self::Sne => "SNE",
            Self::Slt => "SLT",
            Self::Spl => "SPL",
            Self::Nop => "NOP",
            Self::Ldp => "LDP",
            Self::Stp => "STP",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic())
    }
}

impl FromStr for Opcode {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        if upper == "SEQ" {
            return Ok(Self::Cmp);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|opcode| opcode.mnemonic() == upper)
            .ok_or_else(|| UnknownMnemonic::new("opcode", s))
    }
}

/// Selects which fields of the source and destination an opcode operates on.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Modifier {
    A,
    B,
    AB,
    BA,
    F,
    X,
    I,
}

impl Modifier {
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::AB => "AB",
            Self::BA => "BA",
            Self::F => "F",
            Self::X => "X",
            Self::I => "I",
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic())
    }
}

impl FromStr for Modifier {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "AB" => Ok(Self::AB),
            "BA" => Ok(Self::BA),
            "F" => Ok(Self::F),
            "X" => Ok(Self::X),
            "I" => Ok(Self::I),
            _ => Err(UnknownMnemonic::new("modifier", s)),
        }
    }
}

/// How an operand's field is turned into an effective address.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AddressMode {
    /// `#`
    Immediate,
    /// `$`
    Direct,
    /// `*`
    IndirectA,
    /// `@`
    IndirectB,
    /// `{`
    PreDecIndirectA,
    /// `<`
    PreDecIndirectB,
    /// `}`
    PostIncIndirectA,
    /// `>`
    PostIncIndirectB,
}

impl AddressMode {
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Self::Immediate => '#',
            Self::Direct => '$',
            Self::IndirectA => '*',
            Self::IndirectB => '@',
            Self::PreDecIndirectA => '{',
            Self::PreDecIndirectB => '<',
            Self::PostIncIndirectA => '}',
            Self::PostIncIndirectB => '>',
        }
    }

    #[must_use]
    pub fn from_symbol(symbol: char) -> Option<Self> {
        Some(match symbol {
            '#' => Self::Immediate,
            '$' => Self::Direct,
            '*' => Self::IndirectA,
            '@' => Self::IndirectB,
            '{' => Self::PreDecIndirectA,
            '<' => Self::PreDecIndirectB,
            '}' => Self::PostIncIndirectA,
            '>' => Self::PostIncIndirectB,
            _ => return None,
        })
    }
}

impl Default for AddressMode {
    fn default() -> Self {
        Self::Direct
    }
}

impl fmt::Display for AddressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One operand of an instruction. `value` is always within `0..core_size`
/// once a warrior has been compiled.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Field {
    pub mode: AddressMode,
    pub value: u32,
}

impl Field {
    #[must_use]
    pub fn new(mode: AddressMode, value: u32) -> Self {
        Self { mode, value }
    }

    #[must_use]
    pub fn direct(value: u32) -> Self {
        Self::new(AddressMode::Direct, value)
    }

    #[must_use]
    pub fn immediate(value: u32) -> Self {
        Self::new(AddressMode::Immediate, value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.mode, self.value)
    }
}

/// A single fully resolved Redcode instruction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
    pub opcode: Opcode,
    pub modifier: Modifier,
    pub a_field: Field,
    pub b_field: Field,
}

impl Instruction {
    #[must_use]
    pub fn new(opcode: Opcode, modifier: Modifier, a_field: Field, b_field: Field) -> Self {
        Self {
            opcode,
            modifier,
            a_field,
            b_field,
        }
    }
}

impl Default for Instruction {
    /// `DAT.F $0, $0`, the contents of an empty core cell.
    fn default() -> Self {
        Self::new(Opcode::Dat, Modifier::F, Field::default(), Field::default())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<8}{}, {}",
            format!("{}.{}", self.opcode, self.modifier),
            self.a_field,
            self.b_field,
        )
    }
}

/// Assembler directives that never make it into a compiled warrior.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PseudoOpcode {
    Org,
    End,
    Equ,
    Pin,
}

impl fmt::Display for PseudoOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Org => "ORG",
            Self::End => "END",
            Self::Equ => "EQU",
            Self::Pin => "PIN",
        })
    }
}
