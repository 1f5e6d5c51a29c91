use std::collections::VecDeque;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOG_CAPACITY: usize = 10;

/// Most recent game events, oldest first. Full logs drop their oldest entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLog {
    items: VecDeque<String>,
    capacity: usize,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl ActionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn enqueue(&mut self, item: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        let item = item.into();
        log::info!("{item}");
        self.items.push_back(item);
    }

    pub fn dequeue(&mut self) -> Option<String> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.items.iter().cloned().collect()
    }
}
