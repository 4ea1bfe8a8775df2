//! Private persistent storage for each warrior, kept across the rounds of a
//! session and reachable only through `LDP` and `STP`.

use crate::core::WarriorID;

#[derive(Debug, Default)]
pub struct PSpace {
    size: u32,
    cells: Vec<Vec<u32>>,
}

impl PSpace {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            cells: Vec::new(),
        }
    }

    /// Start a new session for `warriors`. Cell 0 holds -1 (`core_size - 1`)
    /// until the first round result is recorded.
    pub fn reset(&mut self, warriors: usize, core_size: u32) {
        self.cells = vec![vec![0; self.size as usize]; warriors];
        self.record_results(core_size.saturating_sub(1), |_| true);
    }

    /// Whether a session for this many warriors is in progress.
    pub fn is_ready_for(&self, warriors: usize) -> bool {
        self.cells.len() == warriors
    }

    pub fn load(&self, id: WarriorID, index: u32) -> u32 {
        if self.size == 0 {
            return 0;
        }
        self.cells[id][(index % self.size) as usize]
    }

    pub fn store(&mut self, id: WarriorID, index: u32, value: u32) {
        if self.size == 0 {
            return;
        }
        self.cells[id][(index % self.size) as usize] = value;
    }

    /// Write `value` into cell 0 of every warrior selected by `filter`.
    pub fn record_results(&mut self, value: u32, filter: impl Fn(WarriorID) -> bool) {
        if self.size == 0 {
            return;
        }
        for (id, cells) in self.cells.iter_mut().enumerate() {
            if filter(id) {
                cells[0] = value;
            }
        }
    }

    pub fn cells(&self, id: WarriorID) -> &[u32] {
        self.cells.get(id).map(Vec::as_slice).unwrap_or_default()
    }
}
