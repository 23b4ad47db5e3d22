use std::collections::VecDeque;

pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Ordered, append-only log shown next to a simulation.
///
/// Rendered oldest first. Once `capacity` lines are held the oldest line is
/// dropped on every append.
#[derive(Debug, Clone)]
pub struct LogStream {
    lines: VecDeque<String>,
    capacity: usize,
    appended: u64,
}

impl LogStream {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
            appended: 0,
        }
    }

    pub fn append(&mut self, line: impl Into<String>) {
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
        self.appended += 1;
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.appended = 0;
    }

    /// Lines appended since the last clear, including dropped ones
    pub fn appended(&self) -> u64 {
        self.appended
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

impl Default for LogStream {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
