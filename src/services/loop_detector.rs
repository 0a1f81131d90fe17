//! Per-run pathological-behavior detector: repeats, similarity, tool caps,
//! and a global cap on total tool calls within one run.
//!
//! Holds **per-run** state only — never shared across tasks or persisted.

use std::collections::{HashMap, HashSet, VecDeque};

const HISTORY_CAPACITY: usize = 20;
const EXACT_DUPLICATE_WINDOW: usize = 3;
const SIMILARITY_WINDOW: usize = 5;
const SIMILARITY_THRESHOLD: f64 = 0.8;
const GLOBAL_CAP: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Warn,
    Block,
    Abort,
}

impl Verdict {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Block => "block",
            Self::Abort => "abort",
        }
    }
}

fn tool_cap(tool: &str) -> Option<u32> {
    match tool {
        "file_write" => Some(3),
        "file_edit" => Some(5),
        "shell_run" => Some(10),
        _ => None,
    }
}

fn tokenize(input: &str) -> HashSet<&str> {
    input.split_whitespace().collect()
}

fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

struct Entry {
    tool: String,
    input: String,
}

/// One run's tool-call history, used to classify each new action before it
/// is persisted or executed.
pub struct LoopDetector {
    history: VecDeque<Entry>,
    per_tool_counts: HashMap<String, u32>,
    total_calls: u32,
}

impl LoopDetector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            per_tool_counts: HashMap::new(),
            total_calls: 0,
        }
    }

    /// Classify `(tool, input)` against the run's history so far, then record
    /// it. Call this once per tool action, before persisting the observation.
    pub fn check_and_record(&mut self, tool: &str, input: &str) -> Verdict {
        self.total_calls += 1;
        if self.total_calls > GLOBAL_CAP {
            return Verdict::Abort;
        }

        let exact_duplicates = self
            .history
            .iter()
            .rev()
            .take(EXACT_DUPLICATE_WINDOW)
            .filter(|e| e.tool == tool && e.input == input)
            .count();
        // The 3rd occurrence of an identical (tool, input) pair blocks — i.e.
        // the action is allowed twice before the block engages.
        let verdict = if exact_duplicates >= 2 {
            Verdict::Block
        } else {
            let count = self.per_tool_counts.get(tool).copied().unwrap_or(0) + 1;
            if let Some(cap) = tool_cap(tool) {
                if count > cap {
                    return self.record_and_return(tool, input, Verdict::Block);
                }
            }
            let similar = self.history.iter().rev().take(SIMILARITY_WINDOW).any(|e| {
                e.tool == tool && e.input != input && jaccard_similarity(&e.input, input) > SIMILARITY_THRESHOLD
            });
            if similar {
                Verdict::Warn
            } else {
                Verdict::Ok
            }
        };
        self.record_and_return(tool, input, verdict)
    }

    fn record_and_return(&mut self, tool: &str, input: &str, verdict: Verdict) -> Verdict {
        *self.per_tool_counts.entry(tool.to_string()).or_insert(0) += 1;
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(Entry {
            tool: tool.to_string(),
            input: input.to_string(),
        });
        verdict
    }
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_duplicate_blocks_on_third_occurrence_not_earlier() {
        let mut d = LoopDetector::new();
        assert_eq!(d.check_and_record("shell_run", "ls"), Verdict::Ok);
        assert_eq!(d.check_and_record("shell_run", "ls"), Verdict::Ok);
        assert_eq!(d.check_and_record("shell_run", "ls"), Verdict::Block);
    }

    #[test]
    fn similar_input_warns() {
        let mut d = LoopDetector::new();
        d.check_and_record(
            "file_edit",
            "one two three four five six seven eight nine ten",
        );
        let verdict = d.check_and_record(
            "file_edit",
            "one two three four five six seven eight nine eleven",
        );
        assert_eq!(verdict, Verdict::Warn);
    }

    #[test]
    fn tool_specific_cap_blocks_past_limit() {
        let mut d = LoopDetector::new();
        for i in 0..3 {
            assert_ne!(
                d.check_and_record("file_write", &format!("file-{i}.rs content {i}")),
                Verdict::Block
            );
        }
        assert_eq!(
            d.check_and_record("file_write", "file-99.rs totally different"),
            Verdict::Block
        );
    }

    #[test]
    fn global_cap_aborts_the_run() {
        let mut d = LoopDetector::new();
        let mut last = Verdict::Ok;
        for i in 0..60 {
            last = d.check_and_record("shell_run_variant", &format!("distinct command {i}"));
        }
        assert_eq!(last, Verdict::Abort);
    }

    #[test]
    fn distinct_actions_stay_ok() {
        let mut d = LoopDetector::new();
        assert_eq!(d.check_and_record("shell_run", "ls -la"), Verdict::Ok);
        assert_eq!(d.check_and_record("shell_run", "pwd"), Verdict::Ok);
    }
}
