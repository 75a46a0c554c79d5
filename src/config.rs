/// Live-object count that triggers the first collection.
pub const DEFAULT_GC_THRESHOLD: usize = 1024 * 1024;
pub const DEFAULT_GC_GROWTH: usize = 2;
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 128;

/// Tuning knobs for one interpreter session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// A collection runs before an allocation once this many objects are live.
    pub gc_threshold: usize,
    /// After a collection the threshold becomes
    /// `max(gc_threshold, remaining * gc_growth)`.
    pub gc_growth: usize,
    /// Nested calls allowed before evaluation fails with an error value.
    pub max_call_depth: usize,
    /// Levels an expression may nest before the parser rejects it. Each
    /// operand, operator application and call counts as one level.
    pub max_nesting_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gc_threshold: DEFAULT_GC_THRESHOLD,
            gc_growth: DEFAULT_GC_GROWTH,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl Config {
    pub fn with_gc_threshold(mut self, gc_threshold: usize) -> Self {
        self.gc_threshold = gc_threshold;
        self
    }

    pub fn with_gc_growth(mut self, gc_growth: usize) -> Self {
        self.gc_growth = gc_growth;
        self
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn with_max_nesting_depth(mut self, max_nesting_depth: usize) -> Self {
        self.max_nesting_depth = max_nesting_depth;
        self
    }
}
