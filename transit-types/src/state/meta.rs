//! Meta patterns: an ordered list of pattern indices a track can be cued through.

use serde::{Deserialize, Serialize};

pub const META_STEP_MAX: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaStep {
    pub pattern: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaPattern {
    pub steps: Vec<MetaStep>,
    pub occupied: bool,
    pub looping: bool,
}

impl Default for MetaPattern {
    fn default() -> Self {
        Self {
            steps: vec![MetaStep { pattern: 0 }],
            occupied: true,
            looping: true,
        }
    }
}

impl MetaPattern {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Append a step. Returns false when the pattern is full.
    pub fn push(&mut self, step: MetaStep) -> bool {
        if self.steps.len() >= META_STEP_MAX {
            return false;
        }
        self.steps.push(step);
        self.occupied = true;
        true
    }

    /// Pattern index for the meta step following `index`, honouring `looping`.
    /// `None` starts the walk at the first step.
    pub fn next_pattern(&self, index: Option<usize>) -> Option<(usize, u8)> {
        let next = index.map_or(0, |i| i + 1);
        if next < self.steps.len() {
            Some((next, self.steps[next].pattern))
        } else if self.looping {
            self.steps.first().map(|s| (0, s.pattern))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> MetaPattern {
        MetaPattern {
            steps: Vec::new(),
            occupied: false,
            looping: true,
        }
    }

    #[test]
    fn push_fails_when_full() {
        let mut m = empty();
        for i in 0..META_STEP_MAX {
            assert!(m.push(MetaStep { pattern: i as u8 }));
        }
        assert!(!m.push(MetaStep { pattern: 0 }));
        assert_eq!(m.len(), META_STEP_MAX);
    }

    #[test]
    fn next_pattern_loops() {
        let mut m = empty();
        m.push(MetaStep { pattern: 2 });
        m.push(MetaStep { pattern: 3 });
        assert_eq!(m.next_pattern(None), Some((0, 2)));
        assert_eq!(m.next_pattern(Some(0)), Some((1, 3)));
        assert_eq!(m.next_pattern(Some(1)), Some((0, 2)));
        m.looping = false;
        assert_eq!(m.next_pattern(Some(1)), None);
        assert_eq!(empty().next_pattern(None), None);
    }
}
