//! Environments: scoped name→value frames forming the lexical chain.
//!
//! All frames live in a central arena indexed by [`EnvId`] instead of being
//! linked by raw pointers; the global environment is always index 0. A call
//! frame's outer link is fixed at creation (the callee's captured environment,
//! or the caller's frame when there is none) and never re-pointed, so the
//! effective lookup chain for a call is `frame → captured chain → … → global`
//! without any temporal mutation of shared links.
//!
//! Frames are freed when a call returns, unless a function value or object
//! created during the call captured them — then they are transferred to the
//! collector-managed set and reclaimed by mark-sweep once unreachable.

use crate::intern::StringId;
use crate::value::{FunctionValue, Value};

/// Unique identifier for environments in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub(crate) struct EnvId(u32);

/// The global environment, the root of every lookup chain.
pub(crate) const GLOBAL_ENV: EnvId = EnvId(0);

impl EnvId {
    fn new(index: usize) -> Self {
        Self(index.try_into().expect("EnvId overflow"))
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named variable slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Variable {
    pub name: StringId,
    pub value: Value,
}

/// One frame: ordered variables, named function bindings, and the fixed
/// outer link.
#[derive(Debug)]
struct Env {
    vars: Vec<Variable>,
    funcs: Vec<(StringId, FunctionValue)>,
    outer: Option<EnvId>,
    /// True once a closure or object literal captured this frame; the frame
    /// then outlives its call and is owned by the garbage collector.
    captured: bool,
    /// True for frames in the collector-managed set (reclaimable by sweep).
    managed: bool,
    marked: bool,
}

/// Arena storage for all environments.
#[derive(Debug)]
pub(crate) struct Environments {
    slots: Vec<Option<Env>>,
    free: Vec<EnvId>,
}

impl Environments {
    /// Creates the arena with the global environment at index 0.
    pub fn new() -> Self {
        let mut envs = Self {
            slots: Vec::new(),
            free: Vec::new(),
        };
        let global = envs.alloc(None);
        debug_assert_eq!(global, GLOBAL_ENV);
        envs
    }

    /// Allocates a frame with the given outer link.
    pub fn alloc(&mut self, outer: Option<EnvId>) -> EnvId {
        let env = Env {
            vars: Vec::new(),
            funcs: Vec::new(),
            outer,
            captured: false,
            managed: false,
            marked: false,
        };
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(env);
            id
        } else {
            let id = EnvId::new(self.slots.len());
            self.slots.push(Some(env));
            id
        }
    }

    fn env(&self, id: EnvId) -> &Env {
        self.slots
            .get(id.index())
            .expect("Environments: slot missing")
            .as_ref()
            .expect("Environments: environment already freed")
    }

    fn env_mut(&mut self, id: EnvId) -> &mut Env {
        self.slots
            .get_mut(id.index())
            .expect("Environments: slot missing")
            .as_mut()
            .expect("Environments: environment already freed")
    }

    /// Records that a closure or object literal captured this frame.
    pub fn mark_captured(&mut self, id: EnvId) {
        self.env_mut(id).captured = true;
    }

    /// Releases a call frame at call exit.
    ///
    /// Captured frames (and frames the return value reaches, which is a
    /// subset) are transferred to the collector-managed set; everything else
    /// is freed immediately.
    pub fn release_frame(&mut self, id: EnvId) {
        debug_assert_ne!(id, GLOBAL_ENV, "cannot release the global environment");
        if self.env(id).captured {
            self.env_mut(id).managed = true;
        } else {
            self.slots[id.index()] = None;
            self.free.push(id);
        }
    }

    /// Creates a variable in the frame and returns its slot index.
    ///
    /// The caller is responsible for promoting string literals first.
    pub fn create_variable(&mut self, id: EnvId, name: StringId, value: Value) -> usize {
        let env = self.env_mut(id);
        env.vars.push(Variable { name, value });
        env.vars.len() - 1
    }

    /// Finds a variable in this single frame (no chain walk), exact-match.
    pub fn find_in_frame(&self, id: EnvId, name: StringId) -> Option<usize> {
        self.env(id).vars.iter().position(|var| var.name == name)
    }

    /// Walks the chain from `id` outward and returns the first frame holding
    /// an exact-match variable, with its slot index.
    pub fn find_variable(&self, id: EnvId, name: StringId) -> Option<(EnvId, usize)> {
        let mut current = Some(id);
        while let Some(env_id) = current {
            if let Some(index) = self.find_in_frame(env_id, name) {
                return Some((env_id, index));
            }
            current = self.env(env_id).outer;
        }
        None
    }

    /// Walks the chain and returns the first function bound under `name`.
    pub fn find_function(&self, id: EnvId, name: StringId) -> Option<FunctionValue> {
        let mut current = Some(id);
        while let Some(env_id) = current {
            let env = self.env(env_id);
            if let Some((_, func)) = env.funcs.iter().find(|(bound, _)| *bound == name) {
                return Some(*func);
            }
            current = env.outer;
        }
        None
    }

    /// Binds (or rebinds) a named function in the frame's function list.
    pub fn create_function(&mut self, id: EnvId, name: StringId, func: FunctionValue) {
        let env = self.env_mut(id);
        if let Some(entry) = env.funcs.iter_mut().find(|(bound, _)| *bound == name) {
            entry.1 = func;
        } else {
            env.funcs.push((name, func));
        }
    }

    /// Reads a variable slot.
    pub fn var_value(&self, id: EnvId, index: usize) -> Value {
        self.env(id).vars[index].value
    }

    /// Writes a variable slot. The caller promotes string literals first.
    pub fn set_var_value(&mut self, id: EnvId, index: usize, value: Value) {
        self.env_mut(id).vars[index].value = value;
    }

    // --- garbage collection support -------------------------------------

    /// Root set: the global environment and every live frame that has not
    /// been handed to the managed set (i.e. frames currently on the call
    /// stack).
    pub fn root_ids(&self) -> Vec<EnvId> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Some(env) if !env.managed => Some(EnvId::new(index)),
                _ => None,
            })
            .collect()
    }

    /// Marks the frame, returning true if newly marked.
    pub fn mark(&mut self, id: EnvId) -> bool {
        let env = self.env_mut(id);
        let newly = !env.marked;
        env.marked = true;
        newly
    }

    /// Pushes the frame's contents onto the mark worklists.
    pub fn trace(&self, id: EnvId, values: &mut Vec<Value>, envs: &mut Vec<EnvId>) {
        let env = self.env(id);
        values.extend(env.vars.iter().map(|var| var.value));
        values.extend(env.funcs.iter().map(|(_, func)| Value::Function(*func)));
        if let Some(outer) = env.outer {
            envs.push(outer);
        }
    }

    /// Frees unmarked managed frames and clears surviving marks.
    pub fn sweep(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            match slot {
                Some(env) if env.marked => env.marked = false,
                Some(env) if env.managed => {
                    *slot = None;
                    self.free.push(EnvId::new(index));
                }
                _ => {}
            }
        }
    }

    /// Number of live frames; used by tests to observe collection.
    #[cfg(test)]
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
