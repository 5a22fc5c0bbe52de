//! Candidate tracking across the patterns of one macro definition.
//!
//! Every pattern starts as a live candidate with its own [`MacroProcessor`].
//! Each fed value goes to all live candidates and the ones that reject drop
//! out; resolution picks the first complete candidate in definition order, so
//! earlier patterns win ties.

use crate::ast::{CaptureKind, MacroDef, MacroValue};

use super::MacroProcessor;

pub(crate) struct MacroMatcher {
    candidates: Vec<(usize, MacroProcessor)>,
}

impl MacroMatcher {
    pub(crate) fn new(def: &MacroDef) -> Self {
        let candidates = def
            .patterns
            .iter()
            .enumerate()
            .map(|(idx, pattern)| (idx, MacroProcessor::new(pattern.matches.clone())))
            .collect();
        MacroMatcher { candidates }
    }

    /// Whether any live candidate could accept a value of this kind next.
    pub(crate) fn accepts_kind(&self, kind: CaptureKind) -> bool {
        self.candidates
            .iter()
            .any(|(_, processor)| processor.accepts_kind(kind))
    }

    /// Feed one value to every live candidate.
    pub(crate) fn feed(&mut self, value: &MacroValue) {
        self.candidates
            .retain_mut(|(_, processor)| processor.feed(value));
    }

    /// Resolve the match: the first complete candidate in definition order,
    /// with its trailing loops committed for expansion.
    pub(crate) fn into_matched(self) -> Option<(usize, MacroProcessor)> {
        self.candidates
            .into_iter()
            .find(|(_, processor)| processor.is_match())
            .map(|(idx, mut processor)| {
                processor.finalize();
                (idx, processor)
            })
    }
}
