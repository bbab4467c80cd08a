//! Public interface for running Jessie code.

use ahash::AHashSet;

use crate::environment::GLOBAL_ENV;
use crate::error::{ParseError, RunError, RuntimeError, RuntimeErrorKind};
use crate::evaluate::Machine;
use crate::execute::StatementResult;
use crate::expressions::Node;
use crate::heap::{Heap, HeapData, HeapId};
use crate::intern::Interns;
use crate::io::PrintWriter;
use crate::parser::parse;
use crate::value::Value;

/// A parsed script, ready to run.
///
/// Parsing happens once in [`Interpreter::new`]; each [`Interpreter::run`]
/// executes against a fresh heap and environment tree, so one parsed script
/// can be run repeatedly.
///
/// # Example
/// ```
/// use jessie::{Interpreter, ScriptValue, StdPrint};
///
/// let interp = Interpreter::new("var x = 40; x + 2;").unwrap();
/// let result = interp.run(&mut StdPrint).unwrap();
/// assert_eq!(result, ScriptValue::Int(42));
/// ```
#[derive(Debug, Clone)]
pub struct Interpreter {
    nodes: Vec<Node>,
    interns: Interns,
}

impl Interpreter {
    /// Parses `code`.
    ///
    /// # Errors
    /// Returns [`ParseError`] when the code does not lex or parse.
    pub fn new(code: &str) -> Result<Self, ParseError> {
        let parsed = parse(code)?;
        Ok(Self {
            nodes: parsed.nodes,
            interns: parsed.interns,
        })
    }

    /// Executes the script, writing `print` output through `print`.
    ///
    /// Returns the value of the last top-level expression statement (NULL
    /// when there is none), detached from the interpreter's heap.
    ///
    /// # Errors
    /// Returns [`RuntimeError`] when evaluation reports an error; execution
    /// stops at the first one.
    pub fn run(&self, print: &mut impl PrintWriter) -> Result<ScriptValue, RuntimeError> {
        let mut machine = Machine::new(&self.interns, print);
        let mut last = Value::Null;
        for node in &self.nodes {
            match node {
                Node::Expr(expr) => {
                    machine.eval_expression(GLOBAL_ENV, expr).map_err(RuntimeError)?;
                    last = machine.stack.pop();
                }
                other => match machine.execute_statement(GLOBAL_ENV, other).map_err(RuntimeError)? {
                    StatementResult::Normal => {}
                    StatementResult::Return { line, .. } => {
                        return Err(RuntimeError(RunError::new(
                            RuntimeErrorKind::ContinueReturnBreakCanNotBeInThisScope,
                            "return",
                            line,
                        )))
                    }
                    StatementResult::Break(line) => {
                        return Err(RuntimeError(RunError::new(
                            RuntimeErrorKind::ContinueReturnBreakCanNotBeInThisScope,
                            "break",
                            line,
                        )))
                    }
                    StatementResult::Continue(line) => {
                        return Err(RuntimeError(RunError::new(
                            RuntimeErrorKind::ContinueReturnBreakCanNotBeInThisScope,
                            "continue",
                            line,
                        )))
                    }
                },
            }
        }
        let mut seen = AHashSet::new();
        Ok(to_script_value(last, &machine.heap, &self.interns, &mut seen))
    }
}

/// A value detached from the interpreter's heap, returned to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Null,
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<ScriptValue>),
    /// Own fields in insertion order; the prototype chain is not flattened.
    Object(Vec<(String, ScriptValue)>),
    Function,
}

fn to_script_value(value: Value, heap: &Heap, interns: &Interns, seen: &mut AHashSet<HeapId>) -> ScriptValue {
    match value {
        Value::Null => ScriptValue::Null,
        Value::Undefined => ScriptValue::Undefined,
        Value::Bool(b) => ScriptValue::Bool(b),
        Value::Int(v) => ScriptValue::Int(v),
        Value::Float(v) => ScriptValue::Float(v),
        Value::StrLiteral(id) => ScriptValue::String(interns.get_str(id).to_owned()),
        Value::Str(id) => match heap.get(id) {
            HeapData::Str(s) => ScriptValue::String(s.clone()),
            _ => ScriptValue::Null,
        },
        Value::Array(id) => {
            if !seen.insert(id) {
                return ScriptValue::Null; // cycle
            }
            let HeapData::Array(array) = heap.get(id) else {
                return ScriptValue::Null;
            };
            let elements = array
                .elements
                .iter()
                .map(|element| to_script_value(*element, heap, interns, seen))
                .collect();
            seen.remove(&id);
            ScriptValue::Array(elements)
        }
        Value::Object(id) => {
            if !seen.insert(id) {
                return ScriptValue::Null; // cycle
            }
            let HeapData::Object(object) = heap.get(id) else {
                return ScriptValue::Null;
            };
            let fields = object
                .fields
                .iter()
                .map(|(name, field)| (name.clone(), to_script_value(*field, heap, interns, seen)))
                .collect();
            seen.remove(&id);
            ScriptValue::Object(fields)
        }
        Value::Function(_) => ScriptValue::Function,
    }
}
