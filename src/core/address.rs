//! Operand evaluation: turning an addressing mode and a field value into an
//! effective address, applying any pre-decrement or post-increment to the
//! pointer cell along the way.

use crate::core::Core;
use crate::load_file::{AddressMode, Field, Instruction, Offset};

/// An evaluated operand: where it points and a copy of the instruction that
/// was there once evaluation (including any increments) finished.
#[derive(Debug)]
pub struct Operand {
    pub target: Offset,
    pub instruction: Instruction,
}

fn decrement(value: u32, core_size: u32) -> u32 {
    if value == 0 {
        core_size - 1
    } else {
        value - 1
    }
}

fn increment(value: u32, core_size: u32) -> u32 {
    if value + 1 >= core_size {
        0
    } else {
        value + 1
    }
}

pub fn evaluate(core: &mut Core, program_counter: Offset, field: Field) -> Operand {
    use AddressMode::*;

    let core_size = core.len();
    let target = match field.mode {
        Immediate => program_counter,
        Direct => program_counter + field.value,
        mode => {
            let pointer = program_counter + field.value;
            let cell = core.get_offset_mut(pointer);
            let slot = match mode {
                IndirectA | PreDecIndirectA | PostIncIndirectA => &mut cell.a_field.value,
                _ => &mut cell.b_field.value,
            };
            if matches!(mode, PreDecIndirectA | PreDecIndirectB) {
                *slot = decrement(*slot, core_size);
            }
            let offset = *slot;
            if matches!(mode, PostIncIndirectA | PostIncIndirectB) {
                *slot = increment(*slot, core_size);
            }
            pointer + offset
        }
    };

    Operand {
        target,
        instruction: *core.get_offset(target),
    }
}
