/// Task queues for the warriors in a core. Every warrior owns a FIFO of
/// program counters; the warrior is alive as long as its queue is non-empty.
use std::collections::VecDeque;

use thiserror::Error as ThisError;

use crate::core::WarriorID;

use crate::load_file::Offset;

/// Why a process was removed from its queue.
#[derive(ThisError, Copy, Clone, Debug, Eq, PartialEq)]
pub enum Death {
    /// The process attempted to execute a DAT instruction
    #[error("reached a DAT at offset {0}")]
    ExecuteDat(Offset),

    /// The process attempted a division by zero
    #[error("division by 0 at offset {0}")]
    DivideByZero(Offset),
}

#[derive(Debug)]
pub struct Queues {
    queues: Vec<VecDeque<Offset>>,
    max_processes: usize,
}

impl Queues {
    /// Create queues that hold at most `max_processes` tasks per warrior
    pub fn new(max_processes: u32) -> Self {
        Self {
            queues: Vec::new(),
            max_processes: max_processes as usize,
        }
    }

    /// Empty every queue and make room for `warriors` of them. Existing
    /// buffers are kept to avoid reallocating between rounds.
    pub fn reset(&mut self, warriors: usize) {
        self.queues.truncate(warriors);
        for queue in &mut self.queues {
            queue.clear();
        }
        self.queues.resize_with(warriors, VecDeque::new);
    }

    /// Get the next program counter for a warrior, removing it from the queue.
    pub fn pop(&mut self, id: WarriorID) -> Option<Offset> {
        self.queues[id].pop_front()
    }

    /// Get the next program counter for a warrior without modifying the queue.
    pub fn peek(&self, id: WarriorID) -> Option<Offset> {
        self.queues[id].front().copied()
    }

    /// Add a task to the back of a warrior's queue. Returns `false` and drops
    /// the task if the warrior already has `max_processes` tasks.
    pub fn push(&mut self, id: WarriorID, offset: Offset) -> bool {
        let queue = &mut self.queues[id];
        if queue.len() >= self.max_processes {
            return false;
        }
        queue.push_back(offset);
        true
    }

    pub fn thread_count(&self, id: WarriorID) -> usize {
        self.queues[id].len()
    }

    pub fn is_alive(&self, id: WarriorID) -> bool {
        !self.queues[id].is_empty()
    }
}
