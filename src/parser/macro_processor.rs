//! The per-pattern matching automaton.
//!
//! One `MacroProcessor` tracks how far a single macro pattern has matched the
//! values fed to it so far. Repetition groups get their own nested processor;
//! a feed into a group is tentative, and on rejection the group's scalar state
//! rolls back so the value can be retried against whatever follows the group.

use std::collections::HashMap;

use crate::ast::{CaptureKind, MacroMatch, MacroValue, RepetitionOperand};
use crate::scanner::Token;

/// Scalar state saved before a tentative feed into a sub-processor.
#[derive(Clone, Copy)]
struct ProcessorState {
    pos: usize,
    failed: bool,
    loops: usize,
    delimiter_expected: bool,
}

pub(crate) struct MacroProcessor {
    pattern: Vec<MacroMatch>,
    /// Index of the pattern element the next value is matched against.
    pos: usize,
    failed: bool,
    /// Completed traversals of the whole pattern.
    loops: usize,
    /// Whether the pattern may wrap around and match again.
    repeating: bool,
    /// Token demanded between loops, if the repetition declared one.
    delimiter: Option<Token>,
    delimiter_expected: bool,
    values: HashMap<String, Vec<MacroValue>>,
    /// Sub-processors for repetition elements, keyed by pattern index,
    /// in pattern order.
    subs: Vec<(usize, MacroProcessor)>,
}

impl MacroProcessor {
    pub(crate) fn new(pattern: Vec<MacroMatch>) -> Self {
        MacroProcessor::build(pattern, false, None)
    }

    fn repeating(pattern: Vec<MacroMatch>, delimiter: Option<Token>) -> Self {
        MacroProcessor::build(pattern, true, delimiter)
    }

    fn build(pattern: Vec<MacroMatch>, repeating: bool, delimiter: Option<Token>) -> Self {
        let subs = pattern
            .iter()
            .enumerate()
            .filter_map(|(idx, element)| match element {
                MacroMatch::Repetition(rep) => Some((
                    idx,
                    MacroProcessor::repeating(rep.pattern.clone(), rep.delimiter.clone()),
                )),
                _ => None,
            })
            .collect();

        MacroProcessor {
            pattern,
            pos: 0,
            failed: false,
            loops: 0,
            repeating,
            delimiter,
            delimiter_expected: false,
            values: HashMap::new(),
            subs,
        }
    }

    // ------------------------------------------------------------------
    // feeding
    // ------------------------------------------------------------------

    /// Offer the next value. A rejection is permanent: the processor fails
    /// and ignores everything after.
    pub(crate) fn feed(&mut self, value: &MacroValue) -> bool {
        if self.failed {
            return false;
        }
        let accepted = self.feed_value(value);
        if !accepted {
            self.failed = true;
        }
        accepted
    }

    fn feed_value(&mut self, value: &MacroValue) -> bool {
        // A single value may wrap the position back to the start at most
        // once; a second wrap means nothing in the pattern consumes it.
        let mut wrapped = false;
        loop {
            if self.pos >= self.pattern.len() {
                if !self.repeating {
                    return false;
                }
                if self.delimiter_expected {
                    return self.consume_delimiter(value);
                }
                if wrapped {
                    return false;
                }
                wrapped = true;
                self.pos = 0;
            }

            let idx = self.pos;
            let operand = match &self.pattern[idx] {
                MacroMatch::Repetition(rep) => Some(rep.operand),
                _ => None,
            };

            if let Some(operand) = operand {
                let saved = self.sub(idx).save();
                let sub = self.sub_mut(idx);
                if sub.feed(value) {
                    if operand == RepetitionOperand::ZeroOrOne && sub.at_boundary() {
                        // An optional group matches at most once.
                        self.advance();
                    }
                    return true;
                }
                self.sub_mut(idx).restore(saved);
                let sub = self.sub(idx);
                let can_skip = if sub.is_fresh() {
                    operand != RepetitionOperand::OneOrMore
                } else {
                    sub.is_match()
                };
                if !can_skip {
                    return false;
                }
                // The group is satisfied; retry the value past it.
                self.advance();
                continue;
            }

            let accepted = match &self.pattern[idx] {
                MacroMatch::Literal(literal) => {
                    matches!(value, MacroValue::Token(token) if token.same_literal(literal))
                }
                MacroMatch::Capture { name, kind, .. } => {
                    if value.kind() == *kind {
                        self.values
                            .entry(name.clone())
                            .or_default()
                            .push(value.clone());
                        true
                    } else {
                        false
                    }
                }
                MacroMatch::Repetition(_) => unreachable!("handled above"),
            };
            if accepted {
                self.advance();
            }
            return accepted;
        }
    }

    fn consume_delimiter(&mut self, value: &MacroValue) -> bool {
        let (Some(delimiter), MacroValue::Token(token)) = (&self.delimiter, value) else {
            return false;
        };
        if token.same_literal(delimiter) {
            self.delimiter_expected = false;
            true
        } else {
            false
        }
    }

    /// Step past the current element. Completing the pattern counts a loop
    /// and, for a delimited repetition, arms the delimiter demand.
    fn advance(&mut self) {
        self.pos += 1;
        if self.pos >= self.pattern.len() {
            self.loops += 1;
            if self.repeating && self.delimiter.is_some() {
                self.delimiter_expected = true;
            }
        }
    }

    // ------------------------------------------------------------------
    // queries
    // ------------------------------------------------------------------

    /// Whether the values fed so far form a complete match: everything from
    /// the current position to the end of the pattern must be a repetition
    /// group that is either satisfied or allowed to match empty.
    pub(crate) fn is_match(&self) -> bool {
        if self.failed {
            return false;
        }
        if self.pos >= self.pattern.len() {
            // At a loop boundary; a pending trailing delimiter is fine.
            return true;
        }
        for idx in self.pos..self.pattern.len() {
            let MacroMatch::Repetition(rep) = &self.pattern[idx] else {
                return false;
            };
            let sub = self.sub(idx);
            if idx == self.pos && !sub.is_match() && !sub.is_fresh() {
                return false;
            }
            if rep.operand == RepetitionOperand::OneOrMore && sub.loops == 0 {
                return false;
            }
        }
        true
    }

    /// Whether a value of the given kind could be accepted next. Drives which
    /// parse the call driver attempts before falling back to a raw token.
    pub(crate) fn accepts_kind(&self, kind: CaptureKind) -> bool {
        if self.failed {
            return false;
        }
        let mut idx = self.pos;
        if idx >= self.pattern.len() {
            if !self.repeating {
                return false;
            }
            if self.delimiter_expected {
                return kind == CaptureKind::Token;
            }
            idx = 0;
        }
        self.accepts_kind_from(idx, kind)
    }

    fn accepts_kind_from(&self, idx: usize, kind: CaptureKind) -> bool {
        if idx >= self.pattern.len() {
            return false;
        }
        match &self.pattern[idx] {
            MacroMatch::Literal(_) => kind == CaptureKind::Token,
            MacroMatch::Capture { kind: expected, .. } => kind == *expected,
            MacroMatch::Repetition(rep) => {
                let sub = self.sub(idx);
                if sub.accepts_kind(kind) {
                    return true;
                }
                let can_skip = if sub.is_fresh() {
                    rep.operand != RepetitionOperand::OneOrMore
                } else {
                    sub.is_match()
                };
                if !can_skip {
                    return false;
                }
                self.accepts_kind_from(idx + 1, kind)
            }
        }
    }

    /// Commit trailing loops before expansion. A processor standing on a
    /// satisfied trailing group has finished a loop that `feed` never counted
    /// because no further value pushed the position past the group.
    pub(crate) fn finalize(&mut self) {
        for (_, sub) in &mut self.subs {
            sub.finalize();
        }
        while self.pos < self.pattern.len() {
            let skippable = match &self.pattern[self.pos] {
                MacroMatch::Repetition(_) => {
                    let sub = self.sub(self.pos);
                    !sub.is_fresh() && sub.is_match()
                }
                _ => false,
            };
            if !skippable {
                break;
            }
            self.advance();
        }
    }

    /// Completed loop count; expansion repeats template runs this many times.
    pub(crate) fn loops(&self) -> usize {
        self.loops
    }

    /// Values bound to a capture, in feed order.
    pub(crate) fn values_of(&self, name: &str) -> Option<&[MacroValue]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// The pattern repetition group paired with the n-th template repetition
    /// group. An index past the last group clamps to the last one, letting a
    /// template repeat a group's output; `None` only when the pattern has no
    /// groups at all.
    pub(crate) fn template_group(&self, n: usize) -> Option<&MacroProcessor> {
        if self.subs.is_empty() {
            return None;
        }
        let idx = n.min(self.subs.len() - 1);
        Some(&self.subs[idx].1)
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    fn at_boundary(&self) -> bool {
        self.pos >= self.pattern.len()
    }

    fn is_fresh(&self) -> bool {
        self.pos == 0 && self.loops == 0
    }

    fn save(&self) -> ProcessorState {
        ProcessorState {
            pos: self.pos,
            failed: self.failed,
            loops: self.loops,
            delimiter_expected: self.delimiter_expected,
        }
    }

    fn restore(&mut self, state: ProcessorState) {
        self.pos = state.pos;
        self.failed = state.failed;
        self.loops = state.loops;
        self.delimiter_expected = state.delimiter_expected;
    }

    fn sub(&self, idx: usize) -> &MacroProcessor {
        self.subs
            .iter()
            .find(|(i, _)| *i == idx)
            .map(|(_, sub)| sub)
            .unwrap_or_else(|| unreachable!("repetition element without sub-processor"))
    }

    fn sub_mut(&mut self, idx: usize) -> &mut MacroProcessor {
        self.subs
            .iter_mut()
            .find(|(i, _)| *i == idx)
            .map(|(_, sub)| sub)
            .unwrap_or_else(|| unreachable!("repetition element without sub-processor"))
    }
}
