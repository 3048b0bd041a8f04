//! Reduction rules and capture slots
//!
//! A [`Rule`] fires on a single trigger token kind and captures neighboring
//! tokens into typed slots. Matching grows a window outward from the
//! trigger, first rightward then leftward, handing each neighbor to the
//! first slot that will take it; growth stops at the first token no slot
//! accepts. If the captured window satisfies the rule, the whole window
//! collapses into one replacement token.

use crate::engine::ParseCx;
use crate::error::ParseResult;
use gridscript_core::{Param, ParamKind};

/// Which side of the trigger a slot captures from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Either,
}

/// One capture slot of a rule
#[derive(Debug, Clone)]
pub struct Slot {
    pub side: Side,
    pub kind: ParamKind,
    pub required: bool,
    /// Multi slots keep capturing repeats instead of filling once
    pub multi: bool,
}

pub fn required_right(kind: ParamKind) -> Slot {
    Slot {
        side: Side::Right,
        kind,
        required: true,
        multi: false,
    }
}

pub fn required_left(kind: ParamKind) -> Slot {
    Slot {
        side: Side::Left,
        kind,
        required: true,
        multi: false,
    }
}

pub fn required_either(kind: ParamKind) -> Slot {
    Slot {
        side: Side::Either,
        kind,
        required: true,
        multi: false,
    }
}

pub fn optional_right(kind: ParamKind) -> Slot {
    Slot {
        side: Side::Right,
        kind,
        required: false,
        multi: false,
    }
}

pub fn optional_left(kind: ParamKind) -> Slot {
    Slot {
        side: Side::Left,
        kind,
        required: false,
        multi: false,
    }
}

pub fn optional_either(kind: ParamKind) -> Slot {
    Slot {
        side: Side::Either,
        kind,
        required: false,
        multi: false,
    }
}

pub fn multi_right(kind: ParamKind) -> Slot {
    Slot {
        side: Side::Right,
        kind,
        required: true,
        multi: true,
    }
}

/// Tokens captured into a rule's slots, indexed by slot position
#[derive(Debug, Clone)]
pub struct Captures {
    slots: Vec<Vec<Param>>,
}

impl Captures {
    fn new(len: usize) -> Self {
        Captures {
            slots: vec![Vec::new(); len],
        }
    }

    pub fn has(&self, slot: usize) -> bool {
        !self.slots[slot].is_empty()
    }

    pub fn single(&self, slot: usize) -> Option<&Param> {
        self.slots[slot].first()
    }

    pub fn take(&mut self, slot: usize) -> Option<Param> {
        if self.slots[slot].is_empty() {
            None
        } else {
            Some(self.slots[slot].remove(0))
        }
    }

    pub fn count(&self, slot: usize) -> usize {
        self.slots[slot].len()
    }

    pub fn take_all(&mut self, slot: usize) -> Vec<Param> {
        std::mem::take(&mut self.slots[slot])
    }

    /// Inject a capture from a guard, used when a guard finds the token
    /// somewhere other than the window (e.g. inside a word's subtokens).
    pub fn set(&mut self, slot: usize, token: Param) {
        self.slots[slot] = vec![token];
    }
}

type Guard = Box<dyn Fn(&Param, &mut Captures) -> bool>;
type Convert = Box<dyn Fn(Param, Captures, &ParseCx<'_>) -> ParseResult<Param>>;

/// A single reduction rule
pub struct Rule {
    pub name: &'static str,
    pub trigger: ParamKind,
    slots: Vec<Slot>,
    guard: Option<Guard>,
    convert: Convert,
}

/// A successful match: the window to replace and its replacement
pub struct Reduction {
    pub start: usize,
    pub end: usize,
    pub replacement: Param,
}

impl Rule {
    pub fn new(
        name: &'static str,
        trigger: ParamKind,
        slots: Vec<Slot>,
        convert: impl Fn(Param, Captures, &ParseCx<'_>) -> ParseResult<Param> + 'static,
    ) -> Self {
        Rule {
            name,
            trigger,
            slots,
            guard: None,
            convert: Box::new(convert),
        }
    }

    /// Replace the default all-required-slots-filled check with a custom
    /// predicate. The guard fully supersedes the default.
    pub fn with_guard(mut self, guard: impl Fn(&Param, &mut Captures) -> bool + 'static) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }

    /// Try to match at trigger position `at`. Returns the reduction to
    /// apply, or `None` when the window does not satisfy the rule.
    pub fn try_match(
        &self,
        tokens: &[Param],
        at: usize,
        cx: &ParseCx<'_>,
    ) -> ParseResult<Option<Reduction>> {
        let mut captures = Captures::new(self.slots.len());

        let mut end = at + 1;
        while end < tokens.len() && self.capture(&mut captures, &tokens[end], Side::Right) {
            end += 1;
        }
        let mut start = at;
        while start > 0 && self.capture(&mut captures, &tokens[start - 1], Side::Left) {
            start -= 1;
        }

        let accepted = match &self.guard {
            Some(guard) => guard(&tokens[at], &mut captures),
            None => self.satisfied(&captures),
        };
        if !accepted {
            return Ok(None);
        }

        let replacement = (self.convert)(tokens[at].clone(), captures, cx)?;
        Ok(Some(Reduction {
            start,
            end,
            replacement,
        }))
    }

    fn capture(&self, captures: &mut Captures, token: &Param, from: Side) -> bool {
        let kind = token.kind();
        for (i, slot) in self.slots.iter().enumerate() {
            let side_ok = slot.side == Side::Either || slot.side == from;
            if side_ok && slot.kind == kind && (slot.multi || !captures.has(i)) {
                if from == Side::Left {
                    captures.slots[i].insert(0, token.clone());
                } else {
                    captures.slots[i].push(token.clone());
                }
                return true;
            }
        }
        false
    }

    fn satisfied(&self, captures: &Captures) -> bool {
        self.slots
            .iter()
            .enumerate()
            .all(|(i, slot)| !slot.required || captures.has(i))
    }
}
