//! The instruction set variants a warrior can be compiled for, and the data
//! tables that go with them: which opcodes, modifiers and addressing modes
//! are legal, and which modifier an instruction gets when none is written.

use std::fmt;
use std::str::FromStr;

use super::types::{AddressMode, Modifier, Opcode, UnknownMnemonic};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Dialect {
    /// ICWS'88: no modifiers in source, four addressing modes.
    Icws88,
    /// ICWS'94 draft plus `NOP`, without P-space.
    Icws94Nop,
    /// ICWS'94 draft with `LDP`/`STP` and P-space.
    Icws94,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::Icws94Nop
    }
}

impl Dialect {
    /// The value of the predefined `VERSION` constant.
    #[must_use]
    pub fn version(self) -> i64 {
        match self {
            Self::Icws88 => 88,
            Self::Icws94Nop | Self::Icws94 => 94,
        }
    }

    #[must_use]
    pub fn has_p_space(self) -> bool {
        matches!(self, Self::Icws94)
    }

    /// Whether a warrior compiled for `other` may run under this dialect.
    #[must_use]
    pub fn accepts(self, other: Self) -> bool {
        match self {
            Self::Icws94 => true,
            Self::Icws94Nop => other != Self::Icws94,
            Self::Icws88 => other == Self::Icws88,
        }
    }

    #[must_use]
    pub fn allows_modifiers(self) -> bool {
        !matches!(self, Self::Icws88)
    }

    #[must_use]
    pub fn allows_opcode(self, opcode: Opcode) -> bool {
        use Opcode::*;
        match self {
            Self::Icws88 => matches!(
                opcode,
                Dat | Mov | Add | Sub | Jmp | Jmz | Jmn | Djn | Cmp | Slt | Spl
            ),
            Self::Icws94Nop => !matches!(opcode, Ldp | Stp),
            Self::Icws94 => true,
        }
    }

    #[must_use]
    pub fn allows_mode(self, mode: AddressMode) -> bool {
        use AddressMode::*;
        match self {
            Self::Icws88 => matches!(mode, Immediate | Direct | IndirectB | PreDecIndirectB),
            Self::Icws94Nop | Self::Icws94 => true,
        }
    }

    /// Check the per-opcode operand restrictions. Returns a description of the
    /// violated rule.
    pub fn check_operands(
        self,
        opcode: Opcode,
        a_mode: AddressMode,
        b_mode: AddressMode,
    ) -> Result<(), &'static str> {
        use AddressMode::*;
        use Opcode::*;

        for mode in [a_mode, b_mode] {
            if !self.allows_mode(mode) {
                return Err("addressing mode not available in this dialect");
            }
        }
        if self != Self::Icws88 {
            return Ok(());
        }
        match opcode {
            Dat => {
                let data_mode = |mode: AddressMode| matches!(mode, Immediate | PreDecIndirectB);
                if !data_mode(a_mode) || !data_mode(b_mode) {
                    return Err("DAT operands must be immediate or predecrement");
                }
            }
            Mov | Add | Sub | Cmp | Slt => {
                if b_mode == Immediate {
                    return Err("B operand may not be immediate");
                }
            }
            Jmp | Jmz | Jmn | Djn | Spl => {
                if a_mode == Immediate {
                    return Err("A operand may not be immediate");
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// The modifier an instruction receives when the source omits one. The
    /// table is the '94 draft's, which is also the '88 to '94 translation.
    #[must_use]
    pub fn default_modifier(self, opcode: Opcode, a_mode: AddressMode, b_mode: AddressMode) -> Modifier {
        use Opcode::*;
        let a_immediate = a_mode == AddressMode::Immediate;
        let b_immediate = b_mode == AddressMode::Immediate;
        match opcode {
            Dat | Nop => Modifier::F,
            Mov | Cmp | Sne => {
                if a_immediate {
                    Modifier::AB
                } else if b_immediate {
                    Modifier::B
                } else {
                    Modifier::I
                }
            }
            Add | Sub | Mul | Div | Mod => {
                if a_immediate {
                    Modifier::AB
                } else if b_immediate {
                    Modifier::B
                } else {
                    Modifier::F
                }
            }
            Slt | Ldp | Stp => {
                if a_immediate {
                    Modifier::AB
                } else {
                    Modifier::B
                }
            }
            Jmp | Jmz | Jmn | Djn | Spl => Modifier::B,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Icws88 => "88",
            Self::Icws94Nop => "94nop",
            Self::Icws94 => "94",
        })
    }
}

impl FromStr for Dialect {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "88" | "icws88" => Ok(Self::Icws88),
            "94nop" | "icws94nop" => Ok(Self::Icws94Nop),
            "94" | "icws94" => Ok(Self::Icws94),
            _ => Err(UnknownMnemonic::new("dialect", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use AddressMode::*;

    #[test_case(Opcode::Dat, Direct, Direct, Modifier::F ; "dat")]
    #[test_case(Opcode::Mov, Immediate, Direct, Modifier::AB ; "mov immediate a")]
    #[test_case(Opcode::Mov, Direct, Immediate, Modifier::B ; "mov immediate b")]
    #[test_case(Opcode::Mov, IndirectB, Direct, Modifier::I ; "mov no immediate")]
    #[test_case(Opcode::Add, Direct, Direct, Modifier::F ; "add no immediate")]
    #[test_case(Opcode::Sub, Immediate, Immediate, Modifier::AB ; "sub both immediate")]
    #[test_case(Opcode::Slt, Direct, Immediate, Modifier::B ; "slt immediate b")]
    #[test_case(Opcode::Slt, Immediate, Direct, Modifier::AB ; "slt immediate a")]
    #[test_case(Opcode::Jmp, Immediate, Direct, Modifier::B ; "jmp")]
    #[test_case(Opcode::Nop, Direct, Direct, Modifier::F ; "nop")]
    fn default_modifiers(opcode: Opcode, a: AddressMode, b: AddressMode, expected: Modifier) {
        assert_eq!(Dialect::Icws94Nop.default_modifier(opcode, a, b), expected);
    }

    #[test]
    fn icws88_restrictions() {
        let d = Dialect::Icws88;
        assert!(d.check_operands(Opcode::Mov, Direct, Direct).is_ok());
        assert!(d.check_operands(Opcode::Mov, Direct, Immediate).is_err());
        assert!(d.check_operands(Opcode::Dat, Immediate, PreDecIndirectB).is_ok());
        assert!(d.check_operands(Opcode::Dat, Direct, Immediate).is_err());
        assert!(d.check_operands(Opcode::Jmp, Immediate, Direct).is_err());
        assert!(d.check_operands(Opcode::Mov, PostIncIndirectB, Direct).is_err());
        assert!(!d.allows_opcode(Opcode::Nop));
        assert!(!d.allows_modifiers());
    }

    #[test]
    fn icws94_is_unrestricted() {
        assert!(Dialect::Icws94Nop
            .check_operands(Opcode::Jmp, Immediate, Immediate)
            .is_ok());
        assert!(!Dialect::Icws94Nop.allows_opcode(Opcode::Ldp));
        assert!(Dialect::Icws94.allows_opcode(Opcode::Stp));
    }

    #[test]
    fn dialect_compatibility() {
        assert!(Dialect::Icws94.accepts(Dialect::Icws88));
        assert!(Dialect::Icws94Nop.accepts(Dialect::Icws88));
        assert!(!Dialect::Icws94Nop.accepts(Dialect::Icws94));
        assert!(!Dialect::Icws88.accepts(Dialect::Icws94Nop));
        assert_eq!("94nop".parse::<Dialect>().unwrap(), Dialect::Icws94Nop);
        assert!("95".parse::<Dialect>().is_err());
    }
}
