//! Execution of a single instruction.

use crate::core::modifier::{self, Side};
use crate::core::process::Death;
use crate::core::{address, Core, WarriorID};
use crate::load_file::{Modifier, Offset, Opcode};

/// Where a process goes after executing an instruction.
#[derive(Debug, Eq, PartialEq)]
pub enum Flow {
    Jump(Offset),
    Split { next: Offset, spawn: Offset },
}

fn arithmetic(opcode: Opcode, lhs: u32, rhs: u32, core_size: u32) -> Option<u32> {
    let (lhs, rhs, m) = (u64::from(lhs), u64::from(rhs), u64::from(core_size));
    let value = match opcode {
        Opcode::Add => (lhs + rhs) % m,
        Opcode::Sub => (lhs + m - rhs) % m,
        Opcode::Mul => (lhs * rhs) % m,
        Opcode::Div => lhs.checked_div(rhs)?,
        Opcode::Mod => lhs.checked_rem(rhs)?,
        _ => unreachable!("{} is not an arithmetic opcode", opcode),
    };
    Some(value as u32)
}

/// Execute the instruction at `program_counter` on behalf of warrior `id`.
pub fn execute(core: &mut Core, id: WarriorID, program_counter: Offset) -> Result<Flow, Death> {
    let instruction = *core.get_offset(program_counter);
    let a = address::evaluate(core, program_counter, instruction.a_field);
    let b = address::evaluate(core, program_counter, instruction.b_field);

    let core_size = core.len();
    let next = program_counter + 1_u32;
    let skip = program_counter + 2_u32;
    let pairs = modifier::pairs(instruction.modifier);

    let flow = match instruction.opcode {
        Opcode::Dat => return Err(Death::ExecuteDat(program_counter)),

        Opcode::Mov => {
            let destination = core.get_offset_mut(b.target);
            if instruction.modifier == Modifier::I {
                *destination = a.instruction;
            } else {
                for &(source, target) in pairs {
                    modifier::write(destination, target, modifier::read(&a.instruction, source));
                }
            }
            Flow::Jump(next)
        }

        opcode @ (Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod) => {
            let mut divided_by_zero = false;
            for &(source, target) in pairs {
                let result = arithmetic(
                    opcode,
                    modifier::read(&b.instruction, target),
                    modifier::read(&a.instruction, source),
                    core_size,
                );
                match result {
                    Some(value) => modifier::write(core.get_offset_mut(b.target), target, value),
                    None => divided_by_zero = true,
                }
            }
            if divided_by_zero {
                return Err(Death::DivideByZero(program_counter));
            }
            Flow::Jump(next)
        }

        Opcode::Jmp => Flow::Jump(a.target),

        Opcode::Jmz | Opcode::Jmn => {
            let zero = pairs
                .iter()
                .all(|&(_, target)| modifier::read(&b.instruction, target) == 0);
            if zero == (instruction.opcode == Opcode::Jmz) {
                Flow::Jump(a.target)
            } else {
                Flow::Jump(next)
            }
        }

        Opcode::Djn => {
            let mut snapshot = b.instruction;
            let mut non_zero = false;
            for &(_, target) in pairs {
                let destination = core.get_offset_mut(b.target);
                let current = modifier::read(destination, target);
                modifier::write(destination, target, decrement(current, core_size));

                let decremented = decrement(modifier::read(&snapshot, target), core_size);
                modifier::write(&mut snapshot, target, decremented);
                non_zero |= decremented != 0;
            }
            if non_zero {
                Flow::Jump(a.target)
            } else {
                Flow::Jump(next)
            }
        }

        Opcode::Cmp | Opcode::Sne => {
            let equal = if instruction.modifier == Modifier::I {
                a.instruction == b.instruction
            } else {
                pairs.iter().all(|&(source, target)| {
                    modifier::read(&a.instruction, source) == modifier::read(&b.instruction, target)
                })
            };
            if equal == (instruction.opcode == Opcode::Cmp) {
                Flow::Jump(skip)
            } else {
                Flow::Jump(next)
            }
        }

        Opcode::Slt => {
            let less = pairs.iter().all(|&(source, target)| {
                modifier::read(&a.instruction, source) < modifier::read(&b.instruction, target)
            });
            Flow::Jump(if less { skip } else { next })
        }

        Opcode::Spl => Flow::Split {
            next,
            spawn: a.target,
        },

        Opcode::Nop => Flow::Jump(next),

        Opcode::Ldp => {
            let (source, target): (Side, Side) = modifier::single_pair(instruction.modifier);
            let value = core
                .p_space
                .load(id, modifier::read(&a.instruction, source));
            let value = value % core_size;
            modifier::write(core.get_offset_mut(b.target), target, value);
            Flow::Jump(next)
        }

        Opcode::Stp => {
            let (source, target) = modifier::single_pair(instruction.modifier);
            core.p_space.store(
                id,
                modifier::read(&b.instruction, target),
                modifier::read(&a.instruction, source),
            );
            Flow::Jump(next)
        }
    };

    Ok(flow)
}

fn decrement(value: u32, core_size: u32) -> u32 {
    if value == 0 {
        core_size - 1
    } else {
        value - 1
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::core::tests::build_core;
    use crate::load_file::{Field, Instruction};

    fn run_one(program: &str) -> (Core, Result<Flow, Death>) {
        let mut core = build_core(program);
        let pc = Offset::new(0, core.len());
        let result = execute(&mut core, 0, pc);
        (core, result)
    }

    fn at(core: &Core, value: u32) -> Offset {
        Offset::new(i64::from(value), core.len())
    }

    #[test]
    fn dat_kills() {
        let (core, result) = run_one("dat #0, #0");
        assert_eq!(result, Err(Death::ExecuteDat(at(&core, 0))));
    }

    #[test_case("mov.a #3, 1", 3, 0 ; "a")]
    #[test_case("mov.b #3, 1", 0, 1 ; "b")]
    #[test_case("mov.ab #3, 1", 0, 3 ; "ab")]
    #[test_case("mov.ba #3, 1", 1, 0 ; "ba")]
    #[test_case("mov.f #3, 1", 3, 1 ; "f")]
    #[test_case("mov.x #3, 1", 1, 3 ; "x")]
    fn mov_modifiers(program: &str, a: u32, b: u32) {
        let (core, result) = run_one(program);
        assert_eq!(result, Ok(Flow::Jump(at(&core, 1))));
        assert_eq!((core.get(1).a_field.value, core.get(1).b_field.value), (a, b));
    }

    #[test]
    fn mov_i_copies_whole_instruction() {
        let (core, _) = run_one("mov.i 0, 1");
        assert_eq!(
            core.get(1),
            &Instruction::new(Opcode::Mov, Modifier::I, Field::direct(0), Field::direct(1))
        );
    }

    #[test_case("add.ab #3, 1\ndat #4, #5", 4, 8 ; "add ab")]
    #[test_case("add.f 1, 1\ndat #4, #5", 8, 10 ; "add f")]
    #[test_case("add.x 1, 1\ndat #4, #5", 9, 9 ; "add x")]
    #[test_case("sub.ba #3, 1\ndat #4, #5", 7996 + 5, 5 ; "sub wraps")]
    #[test_case("mul.b #3, 1\ndat #4, #3000", 4, 1000 ; "mul wraps")]
    #[test_case("div.a #2, 1\ndat #9, #5", 4, 5 ; "div")]
    #[test_case("mod.b #0, 1\ndat #9, #5", 9, 5 ; "mod by the b field of an immediate")]
    fn arithmetic_modifiers(program: &str, a: u32, b: u32) {
        let (core, result) = run_one(program);
        assert_eq!(result, Ok(Flow::Jump(at(&core, 1))));
        assert_eq!((core.get(1).a_field.value, core.get(1).b_field.value), (a % 8000, b));
    }

    #[test]
    fn division_by_zero_kills() {
        let (core, result) = run_one("div.ab #0, 1\ndat #9, #5");
        assert_eq!(result, Err(Death::DivideByZero(at(&core, 0))));
        assert_eq!(core.get(1).b_field.value, 5);
    }

    #[test]
    fn division_by_zero_still_writes_other_half() {
        // .F divides a by 2 and b by 0
        let (core, result) = run_one("div.f 1, 2\ndat #2, #0\ndat #8, #8");
        assert_eq!(result, Err(Death::DivideByZero(at(&core, 0))));
        assert_eq!(core.get(2).a_field.value, 4);
        assert_eq!(core.get(2).b_field.value, 8);
    }

    #[test_case("jmz 2, 1\ndat #1, #0", true ; "jmz b zero")]
    #[test_case("jmz.a 2, 1\ndat #1, #0", false ; "jmz a nonzero")]
    #[test_case("jmz.f 2, 1\ndat #0, #0", true ; "jmz f both zero")]
    #[test_case("jmn 2, 1\ndat #0, #1", true ; "jmn b nonzero")]
    #[test_case("jmn.f 2, 1\ndat #0, #0", false ; "jmn f both zero")]
    #[test_case("jmn.f 2, 1\ndat #1, #0", true ; "jmn f one nonzero")]
    fn conditional_jumps(program: &str, jumps: bool) {
        let (core, result) = run_one(program);
        let expected = if jumps { 2 } else { 1 };
        assert_eq!(result, Ok(Flow::Jump(at(&core, expected))));
    }

    #[test]
    fn djn_decrements_and_jumps() {
        let (core, result) = run_one("djn 2, 1\ndat #0, #2");
        assert_eq!(result, Ok(Flow::Jump(at(&core, 2))));
        assert_eq!(core.get(1).b_field.value, 1);

        let (core, result) = run_one("djn 2, 1\ndat #0, #1");
        assert_eq!(result, Ok(Flow::Jump(at(&core, 1))));
        assert_eq!(core.get(1).b_field.value, 0);

        // .F keeps jumping while either field is non-zero
        let (core, result) = run_one("djn.f 2, 1\ndat #1, #5");
        assert_eq!(result, Ok(Flow::Jump(at(&core, 2))));
        assert_eq!(core.get(1).a_field.value, 0);
        assert_eq!(core.get(1).b_field.value, 4);
    }

    #[test_case("cmp.i 1, 2\ndat #1, #2\ndat #1, #2", true ; "cmp i equal")]
    #[test_case("cmp.i 1, 2\ndat #1, #2\ndat $1, #2", false ; "cmp i mode differs")]
    #[test_case("cmp.f 1, 2\ndat #1, #2\ndat $1, #2", true ; "cmp f ignores modes")]
    #[test_case("cmp.x 1, 2\ndat #1, #2\ndat #2, #1", true ; "cmp x crossed")]
    #[test_case("seq.ab #5, 1\ndat #0, #5", true ; "seq ab")]
    #[test_case("sne.ab #5, 1\ndat #0, #5", false ; "sne ab")]
    #[test_case("sne.a 1, 2\ndat #1, #2\ndat #3, #2", true ; "sne a")]
    #[test_case("slt.ab #4, 1\ndat #0, #5", true ; "slt less")]
    #[test_case("slt.ab #5, 1\ndat #0, #5", false ; "slt equal")]
    #[test_case("slt.f 1, 2\ndat #1, #1\ndat #2, #2", true ; "slt f both")]
    fn skips(program: &str, skipped: bool) {
        let (core, result) = run_one(program);
        let expected = if skipped { 2 } else { 1 };
        assert_eq!(result, Ok(Flow::Jump(at(&core, expected))));
    }

    #[test]
    fn spl_splits() {
        let (core, result) = run_one("spl 3");
        assert_eq!(
            result,
            Ok(Flow::Split {
                next: at(&core, 1),
                spawn: at(&core, 3)
            })
        );
    }

    #[test]
    fn jmp_follows_indirection() {
        let (core, result) = run_one("jmp @1\ndat #0, #5");
        assert_eq!(result, Ok(Flow::Jump(at(&core, 6))));
    }
}
