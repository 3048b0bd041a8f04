//! Cooperative scheduler
//!
//! A [`Program`] owns a serial thread queue (drained one thread at a time)
//! and a concurrent thread set (each stepped once per tick). No thread ever
//! blocks: every step returns immediately and waiting threads are revisited
//! next tick. Control signals unwind out of a thread step and become
//! program-wide state transitions here, never errors.

use gridscript_core::{CommandDef, DeviceBus, FunctionTable, RuntimeResult, VarStore};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use crate::config::{CompletionPolicy, ProgramConfig};
use crate::exec::{ControlSignal, Effects, Exec, RunCx, Spawn, Step};
use crate::host::Host;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    Running,
    Paused,
    Stopped,
    Complete,
}

/// One logical execution cursor: a root definition, the activation walking
/// it, and the thread-local variable bindings.
struct Thread {
    name: String,
    root: Arc<CommandDef>,
    exec: Exec,
    locals: VarStore,
}

impl Thread {
    fn new(name: impl Into<String>, root: Arc<CommandDef>) -> Self {
        Thread {
            name: name.into(),
            exec: Exec::new(root.clone()),
            root,
            locals: VarStore::new(),
        }
    }

    fn from_spawn(spawn: Spawn) -> Self {
        Thread {
            name: spawn.name,
            exec: Exec::new(spawn.def.clone()),
            root: spawn.def,
            locals: spawn.locals,
        }
    }
}

/// A running program: scheduler state plus program-wide services
pub struct Program {
    state: ProgramState,
    root: Option<Arc<CommandDef>>,
    serial: VecDeque<Thread>,
    concurrent: Vec<Thread>,
    globals: VarStore,
    functions: FunctionTable,
    config: ProgramConfig,
}

impl Program {
    pub fn new(functions: FunctionTable, config: ProgramConfig) -> Self {
        Program {
            state: ProgramState::Stopped,
            root: None,
            serial: VecDeque::new(),
            concurrent: Vec::new(),
            globals: VarStore::new(),
            functions,
            config,
        }
    }

    /// Install a root thread over `def` and start running.
    pub fn start(&mut self, def: CommandDef) {
        let root = Arc::new(def);
        self.root = Some(root.clone());
        self.serial.clear();
        self.concurrent.clear();
        self.serial.push_back(Thread::new("main", root));
        self.state = ProgramState::Running;
        debug!("program started");
    }

    /// Re-enter a paused program; every thread resumes exactly where it
    /// yielded.
    pub fn resume(&mut self) {
        if self.state == ProgramState::Paused {
            self.state = ProgramState::Running;
        }
    }

    pub fn state(&self) -> ProgramState {
        self.state
    }

    pub fn globals(&self) -> &VarStore {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut VarStore {
        &mut self.globals
    }

    /// Advance the program by one tick: the front serial thread and every
    /// concurrent thread are stepped once.
    pub fn tick(&mut self, devices: &dyn DeviceBus, host: &mut dyn Host) -> RuntimeResult<()> {
        if self.state != ProgramState::Running {
            return Ok(());
        }
        let mut spawned = Vec::new();
        let mut signal = None;

        if let Some(mut thread) = self.serial.pop_front() {
            match self.step_thread(&mut thread, devices, host, &mut spawned)? {
                Step::Continue => self.serial.push_front(thread),
                Step::Done => debug!(thread = %thread.name, "thread finished"),
                Step::Signal(caught) => {
                    self.serial.push_front(thread);
                    signal = Some(caught);
                }
            }
        }

        if signal.is_none() {
            let mut i = 0;
            while i < self.concurrent.len() {
                let mut thread = self.concurrent.remove(i);
                match self.step_thread(&mut thread, devices, host, &mut spawned)? {
                    Step::Continue => {
                        self.concurrent.insert(i, thread);
                        i += 1;
                    }
                    Step::Done => debug!(thread = %thread.name, "thread finished"),
                    Step::Signal(caught) => {
                        self.concurrent.insert(i, thread);
                        signal = Some(caught);
                        break;
                    }
                }
            }
        }

        // spawns land after the tick so stepping never observes them
        for spawn in spawned {
            let concurrent = spawn.concurrent;
            let thread = Thread::from_spawn(spawn);
            if concurrent {
                self.concurrent.push(thread);
            } else {
                self.serial.push_back(thread);
            }
        }

        if let Some(signal) = signal {
            self.transition(signal);
            return Ok(());
        }

        if self.serial.is_empty() {
            match self.config.on_complete {
                CompletionPolicy::Halt => {
                    if self.concurrent.is_empty() {
                        self.state = ProgramState::Complete;
                        debug!("program complete");
                    }
                }
                CompletionPolicy::Restart => {
                    if let Some(root) = &self.root {
                        self.serial.push_back(Thread::new("main", root.clone()));
                        debug!("program restarted on completion");
                    }
                }
            }
        }
        Ok(())
    }

    fn step_thread(
        &mut self,
        thread: &mut Thread,
        devices: &dyn DeviceBus,
        host: &mut dyn Host,
        spawned: &mut Vec<Spawn>,
    ) -> RuntimeResult<Step> {
        let mut effects = Effects::default();
        let step = {
            let mut cx = RunCx {
                globals: &mut self.globals,
                locals: &mut thread.locals,
                devices,
                host,
                functions: &self.functions,
                max_transfers: self.config.max_transfers,
                effects: &mut effects,
            };
            thread.exec.step(&mut cx)?
        };
        spawned.append(&mut effects.spawns);
        if let Some((name, body)) = effects.jump {
            debug!(thread = %thread.name, target = %name, "jump");
            thread.name = name;
            thread.exec = Exec::new(body.clone());
            thread.root = body;
        } else if effects.repeat {
            debug!(thread = %thread.name, "repeat");
            thread.exec = Exec::new(thread.root.clone());
        }
        Ok(step)
    }

    fn transition(&mut self, signal: ControlSignal) {
        match signal {
            ControlSignal::Stop => {
                self.serial.clear();
                self.concurrent.clear();
                self.state = ProgramState::Stopped;
                debug!("program stopped");
            }
            ControlSignal::Restart => {
                self.serial.clear();
                self.concurrent.clear();
                if let Some(root) = &self.root {
                    self.serial.push_back(Thread::new("main", root.clone()));
                }
                self.state = ProgramState::Running;
                debug!("program restarted");
            }
            ControlSignal::Pause => {
                self.state = ProgramState::Paused;
                debug!("program paused");
            }
        }
    }
}
