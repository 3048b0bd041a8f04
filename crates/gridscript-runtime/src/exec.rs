//! Resumable command execution
//!
//! A command definition is immutable; all progress lives in a per-activation
//! [`Frame`] shaped like the definition. An [`Exec`] pairs a shared
//! definition with its frame and is stepped once per scheduler tick,
//! returning [`Step::Continue`] until the command completes. Nothing here
//! blocks; waiting is expressed as Continue plus a revisit next tick.

use gridscript_core::{
    CallMode, CommandDef, ControlKind, DeviceAction, DeviceBus, EvalCx, FunctionTable, Primitive,
    ResolvedSelector, RuntimeError, RuntimeResult, Selector, TimeUnit, VarStore, Variable,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::host::Host;

/// Program-wide transition requested by a control command. Never an error;
/// it unwinds to the scheduler through [`Step::Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Stop,
    Restart,
    Pause,
}

/// Outcome of stepping a command once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Not finished; step again next tick
    Continue,
    Done,
    Signal(ControlSignal),
}

/// A thread to be installed after the current tick
pub struct Spawn {
    pub name: String,
    pub def: Arc<CommandDef>,
    /// Snapshot of the spawning thread's locals
    pub locals: VarStore,
    pub concurrent: bool,
}

/// Side effects a step cannot apply itself: thread spawns and root
/// replacement are deferred to the scheduler.
#[derive(Default)]
pub struct Effects {
    pub spawns: Vec<Spawn>,
    /// Replace the thread's root with a function body (goto)
    pub jump: Option<(String, Arc<CommandDef>)>,
    /// Replace the thread's root with a fresh activation of itself
    pub repeat: bool,
}

/// Mutable execution context for one thread step
pub struct RunCx<'a> {
    pub globals: &'a mut VarStore,
    pub locals: &'a mut VarStore,
    pub devices: &'a dyn DeviceBus,
    pub host: &'a mut dyn Host,
    pub functions: &'a FunctionTable,
    pub max_transfers: usize,
    pub effects: &'a mut Effects,
}

impl<'a> RunCx<'a> {
    pub fn eval(&self, variable: &Variable) -> RuntimeResult<Primitive> {
        variable.eval(&EvalCx::new(self.globals, self.locals, self.devices))
    }

    pub fn resolve(&self, selector: &Selector) -> RuntimeResult<ResolvedSelector> {
        selector.resolve(&EvalCx::new(self.globals, self.locals, self.devices))
    }
}

/// Per-activation state, shaped like the definition it runs
enum Frame {
    Sequence {
        queue: VecDeque<Exec>,
        loops_left: i64,
        primed: bool,
    },
    Conditional {
        met: Box<Exec>,
        unmet: Box<Exec>,
        evaluated: bool,
        value: bool,
        executing: bool,
    },
    Wait {
        ticks_left: Option<i64>,
    },
    Pause {
        toggled: bool,
    },
    Function {
        active: Option<Box<Exec>>,
    },
    /// Commands that complete in a single step carry no state
    Leaf,
}

impl Frame {
    fn for_def(def: &CommandDef) -> Frame {
        match def {
            CommandDef::Sequence { .. } => Frame::Sequence {
                queue: VecDeque::new(),
                loops_left: 0,
                primed: false,
            },
            CommandDef::Conditional {
                when_met,
                when_unmet,
                ..
            } => Frame::Conditional {
                met: Box::new(Exec::new(Arc::new((**when_met).clone()))),
                unmet: Box::new(Exec::new(Arc::new((**when_unmet).clone()))),
                evaluated: false,
                value: false,
                executing: false,
            },
            CommandDef::Wait { .. } => Frame::Wait { ticks_left: None },
            CommandDef::Control(ControlKind::Pause) => Frame::Pause { toggled: false },
            CommandDef::Function { .. } => Frame::Function { active: None },
            _ => Frame::Leaf,
        }
    }
}

/// One activation of a command: shared definition plus private frame
pub struct Exec {
    def: Arc<CommandDef>,
    frame: Frame,
}

impl Exec {
    pub fn new(def: Arc<CommandDef>) -> Self {
        let frame = Frame::for_def(&def);
        Exec { def, frame }
    }

    pub fn def(&self) -> &CommandDef {
        &self.def
    }

    /// Rebuild the frame in place, rearming the activation for reuse.
    pub fn reset(&mut self) {
        self.frame = Frame::for_def(&self.def);
    }

    pub fn step(&mut self, cx: &mut RunCx<'_>) -> RuntimeResult<Step> {
        let def = self.def.clone();
        match (&*def, &mut self.frame) {
            (
                CommandDef::Sequence { steps, count },
                Frame::Sequence {
                    queue,
                    loops_left,
                    primed,
                },
            ) => {
                if queue.is_empty() {
                    if !*primed {
                        *loops_left = cx.eval(count)?.cast_number()?.round() as i64;
                        *primed = true;
                    }
                    if *loops_left <= 0 {
                        return Ok(Step::Done);
                    }
                    *loops_left -= 1;
                    queue.extend(steps.iter().map(|s| Exec::new(Arc::new(s.clone()))));
                }
                // drain until a child yields
                while let Some(front) = queue.front_mut() {
                    match front.step(cx)? {
                        Step::Done => {
                            queue.pop_front();
                        }
                        other => return Ok(other),
                    }
                }
                if *loops_left == 0 {
                    Ok(Step::Done)
                } else {
                    Ok(Step::Continue)
                }
            }
            (
                CommandDef::Conditional {
                    condition,
                    always_evaluate,
                    ..
                },
                Frame::Conditional {
                    met,
                    unmet,
                    evaluated,
                    value,
                    executing,
                },
            ) => {
                if (!*executing && *always_evaluate) || !*evaluated {
                    *value = cx.eval(condition)?.cast_boolean()?;
                    *evaluated = true;
                    trace!(met = *value, "evaluated condition");
                }
                let branch = if *value { &mut **met } else { &mut **unmet };
                match branch.step(cx)? {
                    Step::Continue => {
                        *executing = true;
                        Ok(Step::Continue)
                    }
                    Step::Signal(signal) => Ok(Step::Signal(signal)),
                    Step::Done => {
                        *executing = false;
                        met.reset();
                        unmet.reset();
                        if *always_evaluate && *value {
                            // while-semantics: finish only once the
                            // condition stops holding
                            Ok(Step::Continue)
                        } else {
                            Ok(Step::Done)
                        }
                    }
                }
            }
            (CommandDef::Wait { duration, unit }, Frame::Wait { ticks_left }) => {
                let mut remaining = match *ticks_left {
                    Some(t) => t,
                    None => {
                        let n = cx.eval(duration)?.cast_number()?;
                        match unit {
                            TimeUnit::Seconds => (n * 60.0) as i64,
                            TimeUnit::Ticks => n as i64,
                        }
                    }
                };
                remaining -= 1;
                *ticks_left = Some(remaining);
                trace!(remaining, "waiting");
                if remaining <= 0 {
                    Ok(Step::Done)
                } else {
                    Ok(Step::Continue)
                }
            }
            (CommandDef::Control(ControlKind::Pause), Frame::Pause { toggled }) => {
                *toggled = !*toggled;
                if *toggled {
                    Ok(Step::Signal(ControlSignal::Pause))
                } else {
                    Ok(Step::Done)
                }
            }
            (CommandDef::Control(ControlKind::Stop), _) => Ok(Step::Signal(ControlSignal::Stop)),
            (CommandDef::Control(ControlKind::Restart), _) => {
                Ok(Step::Signal(ControlSignal::Restart))
            }
            (CommandDef::Control(ControlKind::Repeat), _) => {
                cx.effects.repeat = true;
                Ok(Step::Continue)
            }
            (CommandDef::Function { name, mode, args }, Frame::Function { active }) => {
                if active.is_none() {
                    let function = cx
                        .functions
                        .get(name)
                        .ok_or_else(|| RuntimeError::UnknownFunction(name.clone()))?;
                    for (parameter, argument) in args {
                        let value = cx.eval(argument)?;
                        cx.locals
                            .insert(parameter.clone(), Variable::constant(value));
                    }
                    match mode {
                        CallMode::Jump => {
                            cx.effects.jump = Some((name.clone(), function.body.clone()));
                            return Ok(Step::Continue);
                        }
                        CallMode::Call => {
                            *active = Some(Box::new(Exec::new(function.body.clone())));
                        }
                    }
                }
                match active.as_mut() {
                    Some(body) => body.step(cx),
                    None => Ok(Step::Continue),
                }
            }
            (CommandDef::Queue { command, concurrent }, Frame::Leaf) => {
                let name = match command.as_ref() {
                    CommandDef::Function { name, .. } => name.clone(),
                    _ if *concurrent => "async".to_string(),
                    _ => "queued".to_string(),
                };
                debug!(thread = %name, concurrent, "spawning thread");
                cx.effects.spawns.push(Spawn {
                    name,
                    def: Arc::new((**command).clone()),
                    locals: cx.locals.clone(),
                    concurrent: *concurrent,
                });
                Ok(Step::Done)
            }
            (
                CommandDef::Assign {
                    name,
                    value,
                    global,
                    by_reference,
                },
                Frame::Leaf,
            ) => {
                let bound = if *by_reference {
                    value.clone()
                } else {
                    Variable::constant(cx.eval(value)?)
                };
                if *global {
                    cx.globals.insert(name.clone(), bound);
                } else {
                    cx.locals.insert(name.clone(), bound);
                }
                Ok(Step::Done)
            }
            (CommandDef::AssignListIndex { list, index, value }, Frame::Leaf) => {
                let indexes = cx.eval(index)?.cast_list()?;
                let new_value = cx.eval(value)?;
                write_list_index(cx, list, &indexes, new_value)?;
                Ok(Step::Done)
            }
            (
                CommandDef::Transfer {
                    from,
                    to,
                    filter,
                    amount,
                },
                Frame::Leaf,
            ) => {
                let sources = cx.resolve(from)?;
                let destinations = cx.resolve(to)?;
                let filter_text = cx.eval(filter)?.cast_string()?;
                let mut remaining = match amount {
                    Some(amount) => Some(cx.eval(amount)?.cast_number()?),
                    None => None,
                };
                let mut operations = 0;
                'transfer: for source in &sources.entities {
                    for destination in &destinations.entities {
                        if source == destination {
                            continue;
                        }
                        let moved =
                            cx.devices
                                .transfer(source, destination, &filter_text, remaining)?;
                        operations += 1;
                        if let Some(left) = remaining.as_mut() {
                            *left -= moved;
                            if *left <= 0.0 {
                                break 'transfer;
                            }
                        }
                        if operations >= cx.max_transfers {
                            break 'transfer;
                        }
                    }
                }
                Ok(Step::Done)
            }
            (CommandDef::Device { selector, action }, Frame::Leaf) => {
                let resolved = cx.resolve(selector)?;
                for entity in &resolved.entities {
                    let device_type = match &resolved.device_type {
                        Some(device_type) => device_type.clone(),
                        None => cx.devices.device_type_of(entity)?,
                    };
                    let handler = cx.devices.handler(&device_type)?;
                    match action {
                        DeviceAction::Reverse { property } => {
                            let id = property.resolve(handler, None);
                            handler.reverse(entity, &id)?;
                        }
                        DeviceAction::Move {
                            property,
                            direction,
                        } => {
                            let id = property.resolve(handler, None);
                            handler.move_value(entity, &id, *direction)?;
                        }
                        DeviceAction::Increment {
                            property,
                            direction,
                            amount,
                        } => {
                            let value = cx.eval(amount)?;
                            let id = property.resolve(handler, Some(value.kind()));
                            match direction {
                                Some(direction) => {
                                    handler.increment_directional(entity, &id, *direction, value)?
                                }
                                None => handler.increment(entity, &id, value)?,
                            }
                        }
                        DeviceAction::Set {
                            property,
                            direction,
                            value,
                        } => {
                            let value = cx.eval(value)?;
                            let id = property.resolve(handler, Some(value.kind()));
                            match direction {
                                Some(direction) => {
                                    handler.set_directional(entity, &id, *direction, value)?
                                }
                                None => handler.set(entity, &id, value)?,
                            }
                        }
                    }
                }
                Ok(Step::Done)
            }
            (CommandDef::Print(value), Frame::Leaf) => {
                let text = cx.eval(value)?.cast_string()?;
                cx.host.print(&text);
                Ok(Step::Done)
            }
            (CommandDef::Send { message, tag }, Frame::Leaf) => {
                let message = cx.eval(message)?.cast_string()?;
                let tag = cx.eval(tag)?.cast_string()?;
                cx.host.send(&tag, &message);
                Ok(Step::Done)
            }
            (CommandDef::Listen { tag }, Frame::Leaf) => {
                let tag = cx.eval(tag)?.cast_string()?;
                cx.host.listen(&tag);
                Ok(Step::Done)
            }
            (CommandDef::Null, Frame::Leaf) => Ok(Step::Done),
            _ => unreachable!("frame shape follows the definition"),
        }
    }
}

/// Write `value` at `indexes` of the list `target` evaluates to, then
/// rebind the result. An empty index list replaces the whole list.
fn write_list_index(
    cx: &mut RunCx<'_>,
    target: &Variable,
    indexes: &[Primitive],
    value: Primitive,
) -> RuntimeResult<()> {
    let updated = if indexes.is_empty() {
        value.cast_list()?
    } else {
        let mut items = cx.eval(target)?.cast_list()?;
        for index in indexes {
            let i = index.cast_number()? as i64;
            let len = items.len();
            if i < 0 || i as usize >= len {
                return Err(RuntimeError::IndexOutOfBounds { index: i, len });
            }
            items[i as usize] = value.clone();
        }
        items
    };
    rebind_list(cx, target, Primitive::List(updated))
}

/// Rebind an updated list through its target chain. Nested indexes rewrite
/// the containing lists outward until a named binding is reached; a target
/// that bottoms out in a temporary value has nothing to rebind.
fn rebind_list(cx: &mut RunCx<'_>, target: &Variable, value: Primitive) -> RuntimeResult<()> {
    match target {
        Variable::Named(name) | Variable::Ambiguous(name) => {
            let bound = Variable::constant(value);
            if !cx.locals.contains_key(name) && cx.globals.contains_key(name) {
                cx.globals.insert(name.clone(), bound);
            } else {
                cx.locals.insert(name.clone(), bound);
            }
            Ok(())
        }
        Variable::ListIndex { list, index } => {
            let indexes = cx.eval(index)?.cast_list()?;
            write_list_index(cx, list, &indexes, value)
        }
        _ => Ok(()),
    }
}
