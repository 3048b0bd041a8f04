//! Fixed-point reduction driver
//!
//! Reduction runs a worklist of processors over the token sequence. Each
//! processor is keyed by the trigger kinds it fires on and ordered by its
//! rank (its index in the table). The active worklist holds every
//! processor whose trigger kind currently appears; after any successful
//! fold the worklist is rebuilt and processing restarts from rank zero, so
//! tighter-binding rules always get first refusal at the new shape.
//! Ambiguous folds record alternate token sequences; the caller retries
//! those branches until one reduces to a single command.

use crate::error::{ParseError, ParseResult};
use crate::rules::standard_rules;
use crate::slot::Rule;
use gridscript_core::{CommandDef, FunctionTable, Param, ParamKind, Primitive, Variable};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, trace};

/// Shared read-only state for rule conversions
pub struct ParseCx<'a> {
    pub functions: &'a FunctionTable,
}

/// One entry of the processor table
pub enum Processor {
    Rule(Rule),
    /// Candidate rules behind one trigger; the first that matches commits,
    /// later ones that also match fork alternate branches
    Branch(Vec<Rule>),
    Parenthesis,
    List,
    Ignore,
    Primitive,
}

impl Processor {
    fn can_process(&self, kind: ParamKind) -> bool {
        match self {
            Processor::Rule(rule) => rule.trigger == kind,
            Processor::Branch(rules) => rules.iter().any(|r| r.trigger == kind),
            Processor::Parenthesis => kind == ParamKind::OpenParen,
            Processor::List => kind == ParamKind::OpenBracket,
            Processor::Ignore => kind == ParamKind::Ignored,
            Processor::Primitive => {
                matches!(kind, ParamKind::Bool | ParamKind::Num | ParamKind::Str)
            }
        }
    }
}

/// What one full scan of a processor achieved
enum Outcome {
    /// At least one fold happened
    Processed,
    /// A trigger exists but its window is not yet reducible; retry after
    /// other processors make progress
    Revisit,
    /// No trigger position matched at all
    NoMatch,
}

/// Result of one application attempt at a position
enum Applied {
    /// Folded; scanning continues at the contained index
    Folded(usize),
    Failed {
        wants_revisit: bool,
    },
}

/// The full processor table, in rank order
pub struct RuleSet {
    processors: Vec<Processor>,
}

impl RuleSet {
    pub fn standard() -> Self {
        RuleSet {
            processors: standard_rules(),
        }
    }

    /// Ranks of processors triggered by any kind in the live sequence.
    fn active(&self, tokens: &[Param]) -> Vec<usize> {
        let kinds: HashSet<ParamKind> = tokens.iter().map(Param::kind).collect();
        self.processors
            .iter()
            .enumerate()
            .filter(|(_, p)| kinds.iter().any(|k| p.can_process(*k)))
            .map(|(rank, _)| rank)
            .collect()
    }

    /// Reduce one token sequence to a fixed point, recording alternate
    /// branch sequences spawned by ambiguous folds.
    pub fn process(
        &self,
        tokens: &mut Vec<Param>,
        branches: &mut Vec<Vec<Param>>,
        cx: &ParseCx<'_>,
    ) -> ParseResult<()> {
        let mut worklist = self.active(tokens);
        let mut idx = 0;
        while idx < worklist.len() {
            let rank = worklist[idx];
            match self.sweep(rank, tokens, branches, cx)? {
                Outcome::Processed => {
                    trace!(rank, tokens = %describe(tokens), "folded");
                    worklist = self.active(tokens);
                    idx = 0;
                }
                Outcome::Revisit => idx += 1,
                Outcome::NoMatch => {
                    worklist.remove(idx);
                }
            }
        }
        Ok(())
    }

    /// Scan every trigger position of one processor across the sequence.
    fn sweep(
        &self,
        rank: usize,
        tokens: &mut Vec<Param>,
        branches: &mut Vec<Vec<Param>>,
        cx: &ParseCx<'_>,
    ) -> ParseResult<Outcome> {
        let mut processed = false;
        let mut revisit = false;
        let mut i = 0;
        while i < tokens.len() {
            if !self.processors[rank].can_process(tokens[i].kind()) {
                i += 1;
                continue;
            }
            match self.apply(rank, tokens, i, branches, cx)? {
                Applied::Folded(next) => {
                    processed = true;
                    i = next;
                }
                Applied::Failed { wants_revisit } => {
                    revisit |= wants_revisit;
                    i += 1;
                }
            }
        }
        Ok(if processed {
            Outcome::Processed
        } else if revisit {
            Outcome::Revisit
        } else {
            Outcome::NoMatch
        })
    }

    fn apply(
        &self,
        rank: usize,
        tokens: &mut Vec<Param>,
        i: usize,
        branches: &mut Vec<Vec<Param>>,
        cx: &ParseCx<'_>,
    ) -> ParseResult<Applied> {
        match &self.processors[rank] {
            Processor::Rule(rule) => match rule.try_match(tokens, i, cx)? {
                Some(reduction) => {
                    debug!(rule = rule.name, "reduce");
                    let start = reduction.start;
                    splice(tokens, reduction.start, reduction.end, reduction.replacement);
                    Ok(Applied::Folded(start + 1))
                }
                None => Ok(Applied::Failed {
                    wants_revisit: true,
                }),
            },
            Processor::Branch(rules) => {
                let original = tokens.clone();
                let mut folded = None;
                for rule in rules {
                    if rule.trigger != original[i].kind() {
                        continue;
                    }
                    if folded.is_none() {
                        if let Some(reduction) = rule.try_match(tokens, i, cx)? {
                            debug!(rule = rule.name, "reduce");
                            let start = reduction.start;
                            splice(tokens, reduction.start, reduction.end, reduction.replacement);
                            folded = Some(start + 1);
                        }
                    } else if let Some(reduction) = rule.try_match(&original, i, cx)? {
                        debug!(rule = rule.name, "reduce (alternate branch)");
                        let mut alternate = original.clone();
                        splice(
                            &mut alternate,
                            reduction.start,
                            reduction.end,
                            reduction.replacement,
                        );
                        branches.insert(0, alternate);
                    }
                }
                match folded {
                    Some(next) => Ok(Applied::Folded(next)),
                    None => Ok(Applied::Failed {
                        wants_revisit: true,
                    }),
                }
            }
            Processor::Parenthesis => self.fold_parenthesis(tokens, i, branches, cx),
            Processor::List => self.fold_list(tokens, i, cx),
            Processor::Ignore => {
                tokens.remove(i);
                Ok(Applied::Folded(i))
            }
            Processor::Primitive => Ok(promote_primitive(tokens, i)),
        }
    }

    /// Reduce the innermost balanced parenthesis group in place. Groups
    /// with a nested opener are skipped until the inner group has folded.
    fn fold_parenthesis(
        &self,
        tokens: &mut Vec<Param>,
        i: usize,
        branches: &mut Vec<Vec<Param>>,
        cx: &ParseCx<'_>,
    ) -> ParseResult<Applied> {
        let mut j = i + 1;
        while j < tokens.len() {
            match tokens[j].kind() {
                ParamKind::OpenParen => {
                    return Ok(Applied::Failed {
                        wants_revisit: true,
                    })
                }
                ParamKind::CloseParen => {
                    let mut inner: Vec<Param> = tokens[i + 1..j].to_vec();
                    let mut inner_branches = Vec::new();
                    self.process(&mut inner, &mut inner_branches, cx)?;
                    tokens.drain(i..=j);
                    for alternate in inner_branches {
                        let mut copy = tokens.clone();
                        copy.splice(i..i, alternate);
                        branches.push(copy);
                    }
                    tokens.splice(i..i, inner);
                    return Ok(Applied::Folded(i + 1));
                }
                _ => j += 1,
            }
        }
        Err(ParseError::UnclosedParenthesis)
    }

    /// Reduce the innermost bracket group to a list token. Each
    /// comma-separated entry must reduce to a single value token.
    fn fold_list(
        &self,
        tokens: &mut Vec<Param>,
        i: usize,
        cx: &ParseCx<'_>,
    ) -> ParseResult<Applied> {
        let mut entries = Vec::new();
        let mut start = i;
        let mut j = i + 1;
        while j < tokens.len() {
            match tokens[j].kind() {
                ParamKind::OpenBracket => {
                    return Ok(Applied::Failed {
                        wants_revisit: true,
                    })
                }
                ParamKind::Separator => {
                    entries.push(self.list_entry(&tokens[start + 1..j], cx)?);
                    start = j;
                    j += 1;
                }
                ParamKind::CloseBracket => {
                    if j > i + 1 {
                        entries.push(self.list_entry(&tokens[start + 1..j], cx)?);
                    }
                    splice(tokens, i, j + 1, Param::ListTok(Variable::ListOf(entries)));
                    return Ok(Applied::Folded(i + 1));
                }
                _ => j += 1,
            }
        }
        Err(ParseError::UnclosedBracket)
    }

    /// Reduce one list entry to a variable, taking the primary reduction
    /// or the first alternate branch that lands on a single value.
    fn list_entry(&self, entry: &[Param], cx: &ParseCx<'_>) -> ParseResult<Variable> {
        if entry.is_empty() {
            return Err(ParseError::InvalidListValue);
        }
        let mut primary = entry.to_vec();
        let mut alternates = Vec::new();
        self.process(&mut primary, &mut alternates, cx)?;
        std::iter::once(primary)
            .chain(alternates)
            .find_map(|candidate| match candidate.as_slice() {
                [single] => value_of(single),
                _ => None,
            })
            .ok_or(ParseError::InvalidListValue)
    }
}

/// A reduced token usable as a value in list/entry position.
fn value_of(token: &Param) -> Option<Variable> {
    match token {
        Param::VariableTok(v) | Param::ListTok(v) => Some(v.clone()),
        Param::ListIndexTok { list, index } => Some(Variable::ListIndex {
            list: Box::new(list.clone()),
            index: Box::new(index.clone()),
        }),
        _ => None,
    }
}

/// Promote a literal token to a variable token in place.
fn promote_primitive(tokens: &mut Vec<Param>, i: usize) -> Applied {
    let variable = match &tokens[i] {
        Param::Bool(b) => Variable::Static(Primitive::Boolean(*b)),
        Param::Num(n) => Variable::Static(Primitive::Number(*n)),
        Param::Str { text, explicit } => match parse_literal(text) {
            Some(primitive) => Variable::Static(primitive),
            None if *explicit => Variable::Static(Primitive::String(text.clone())),
            None => Variable::Ambiguous(text.clone()),
        },
        _ => {
            return Applied::Failed {
                wants_revisit: false,
            }
        }
    };
    tokens[i] = Param::VariableTok(variable);
    Applied::Folded(i + 1)
}

/// Literal forms recognized inside word text: numbers, booleans, and
/// colon-separated vectors.
fn parse_literal(text: &str) -> Option<Primitive> {
    if let Ok(n) = text.parse::<f64>() {
        return Some(Primitive::Number(n));
    }
    match text {
        "true" => return Some(Primitive::Boolean(true)),
        "false" => return Some(Primitive::Boolean(false)),
        _ => {}
    }
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() == 3 {
        let mut components = [0.0; 3];
        for (slot, part) in components.iter_mut().zip(&parts) {
            *slot = part.parse::<f64>().ok()?;
        }
        return Some(Primitive::Vector(components));
    }
    None
}

fn splice(tokens: &mut Vec<Param>, start: usize, end: usize, replacement: Param) {
    tokens.splice(start..end, std::iter::once(replacement));
}

fn describe(tokens: &[Param]) -> String {
    tokens
        .iter()
        .map(|t| t.kind().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parser facade: a prebuilt rule table plus the entry point turning a
/// token sequence into a command tree.
pub struct Parser {
    rules: RuleSet,
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            rules: RuleSet::standard(),
        }
    }

    /// Reduce a token sequence to a single command. Ambiguous reductions
    /// are retried branch by branch until one lands on a command; if none
    /// does, the residual tokens of the last branch are reported.
    pub fn parse(&self, tokens: Vec<Param>, functions: &FunctionTable) -> ParseResult<CommandDef> {
        if tokens.is_empty() {
            return Err(ParseError::EmptyCommand);
        }
        let cx = ParseCx { functions };
        let mut pending = VecDeque::from([tokens]);
        let mut residual = String::new();
        while let Some(mut branch) = pending.pop_front() {
            let mut spawned = Vec::new();
            self.rules.process(&mut branch, &mut spawned, &cx)?;
            for alternate in spawned.into_iter().rev() {
                pending.push_front(alternate);
            }
            if let [Param::CommandRef(_)] = branch.as_slice() {
                if let Some(Param::CommandRef(def)) = branch.pop() {
                    return Ok(def);
                }
            }
            residual = describe(&branch);
        }
        Err(ParseError::UnrecognizedCommand(residual))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
