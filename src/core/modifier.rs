//! Which fields an instruction reads from its A operand and writes to its B
//! operand, for each modifier.

use crate::load_file::{Instruction, Modifier};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Side {
    A,
    B,
}

/// (source side, destination side) pairs touched under `modifier`.
/// `.I` behaves as `.F` for everything except whole-instruction moves and comparisons.
pub fn pairs(modifier: Modifier) -> &'static [(Side, Side)] {
    match modifier {
        Modifier::A => &[(Side::A, Side::A)],
        Modifier::B => &[(Side::B, Side::B)],
        Modifier::AB => &[(Side::A, Side::B)],
        Modifier::BA => &[(Side::B, Side::A)],
        Modifier::F | Modifier::I => &[(Side::A, Side::A), (Side::B, Side::B)],
        Modifier::X => &[(Side::A, Side::B), (Side::B, Side::A)],
    }
}

/// `LDP` and `STP` only move a single value; `.F`, `.X` and `.I` act as `.B`.
pub fn single_pair(modifier: Modifier) -> (Side, Side) {
    match modifier {
        Modifier::A => (Side::A, Side::A),
        Modifier::AB => (Side::A, Side::B),
        Modifier::BA => (Side::B, Side::A),
        Modifier::B | Modifier::F | Modifier::X | Modifier::I => (Side::B, Side::B),
    }
}

pub fn read(instruction: &Instruction, side: Side) -> u32 {
    match side {
        Side::A => instruction.a_field.value,
        Side::B => instruction.b_field.value,
    }
}

pub fn write(instruction: &mut Instruction, side: Side, value: u32) {
    match side {
        Side::A => instruction.a_field.value = value,
        Side::B => instruction.b_field.value = value,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::load_file::{Field, Opcode};

    #[test]
    fn read_and_write_sides() {
        let mut instruction =
            Instruction::new(Opcode::Dat, Modifier::F, Field::immediate(1), Field::direct(2));
        assert_eq!(read(&instruction, Side::A), 1);
        assert_eq!(read(&instruction, Side::B), 2);

        write(&mut instruction, Side::B, 9);
        assert_eq!(instruction.b_field, Field::direct(9));
    }

    #[test]
    fn crossed_pairs() {
        assert_eq!(pairs(Modifier::X), &[(Side::A, Side::B), (Side::B, Side::A)]);
        assert_eq!(pairs(Modifier::I), pairs(Modifier::F));
        assert_eq!(single_pair(Modifier::X), (Side::B, Side::B));
    }
}
