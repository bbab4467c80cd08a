//! Interpreter-native functions.
//!
//! Builtins are registered into the global environment's function list when a
//! run starts, so scripts call them like any other named function. Unlike
//! user functions they take the already-evaluated argument values directly;
//! no call frame, `this`, or `arguments` binding is created.

mod print;
mod set_prototype;

use strum::{Display, IntoStaticStr};

use crate::environment::{Environments, GLOBAL_ENV};
use crate::error::EvalResult;
use crate::heap::Heap;
use crate::intern::{well_known, Interns};
use crate::io::PrintWriter;
use crate::value::{FunctionValue, Value};

/// Enumerates every interpreter-native function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub(crate) enum Builtin {
    /// `print(…)` - writes the display form of each argument, space
    /// separated, with a trailing newline.
    Print,
    /// `setPrototype(obj, proto)` - links `proto` as the prototype of `obj`
    /// and returns `obj`. The prototype-setting primitive of this runtime
    /// (there is no `__proto__` field).
    SetPrototype,
}

impl Builtin {
    /// Invokes the native trampoline with the evaluated argument values.
    pub fn call(
        self,
        args: &[Value],
        heap: &mut Heap,
        interns: &Interns,
        print: &mut impl PrintWriter,
        line: u32,
    ) -> EvalResult<Value> {
        match self {
            Self::Print => print::call(args, heap, interns, print),
            Self::SetPrototype => set_prototype::call(args, heap, line),
        }
    }
}

/// Binds every builtin in the global environment's function list.
pub(crate) fn register(envs: &mut Environments) {
    envs.create_function(GLOBAL_ENV, well_known::PRINT, FunctionValue::Builtin(Builtin::Print));
    envs.create_function(
        GLOBAL_ENV,
        well_known::SET_PROTOTYPE,
        FunctionValue::Builtin(Builtin::SetPrototype),
    );
}
