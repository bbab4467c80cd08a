//! The runtime value model.
//!
//! A value is a small `Copy` tagged union: immediates (null, undefined, bool,
//! int, float) are stored inline, string literals borrow the interned AST
//! text by id, and strings, arrays, and objects live in the heap arena and
//! are referenced by [`HeapId`]. Function values pair a shared definition
//! with the environment captured when the value was created.

use std::fmt::Write;

use ahash::AHashSet;

use crate::builtins::Builtin;
use crate::environment::EnvId;
use crate::heap::{Heap, HeapData, HeapId};
use crate::intern::{FunctionId, Interns, StringId};

/// Primary tagged value type.
///
/// `StrLiteral` is only ever produced by string-literal expressions; storing
/// one into any storage location (variable slot, object field, array element)
/// must first go through [`Value::promoted_on_store`], which copies the bytes
/// into a garbage-collected heap string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Value {
    Null,
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// A string literal borrowing the interned AST text. Never owned by the
    /// garbage collector.
    StrLiteral(StringId),
    /// An owned heap string.
    Str(HeapId),
    Array(HeapId),
    Object(HeapId),
    Function(FunctionValue),
}

/// A function value: a reference to a shared definition, not a copy of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FunctionValue {
    /// A user-defined function together with the environment that was current
    /// when the value was created.
    User {
        func: FunctionId,
        captured_env: EnvId,
    },
    /// An interpreter-native function.
    Builtin(Builtin),
}

impl Value {
    /// The type name used in error messages and `print` output.
    #[must_use]
    pub fn type_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::StrLiteral(_) | Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
        }
    }

    /// Promotes a string literal to an owned heap string; all other values
    /// pass through unchanged.
    ///
    /// This is the single promotion step every store site uses, so a stored
    /// string never aliases the AST text.
    #[must_use]
    pub fn promoted_on_store(self, heap: &mut Heap, interns: &Interns) -> Self {
        match self {
            Self::StrLiteral(id) => Self::Str(heap.allocate(HeapData::Str(interns.get_str(id).to_owned()))),
            other => other,
        }
    }

    /// The string content, if this is either string form.
    #[must_use]
    pub fn as_str<'h>(self, heap: &'h Heap, interns: &'h Interns) -> Option<&'h str> {
        match self {
            Self::StrLiteral(id) => Some(interns.get_str(id)),
            Self::Str(id) => match heap.get(id) {
                HeapData::Str(s) => Some(s.as_str()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Writes the display form used by `print`.
    ///
    /// Containers already being printed (cycles) render as `...`.
    pub fn write_display(
        self,
        f: &mut impl Write,
        heap: &Heap,
        interns: &Interns,
        seen: &mut AHashSet<HeapId>,
    ) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Undefined => f.write_str("undefined"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::StrLiteral(id) => f.write_str(interns.get_str(id)),
            Self::Str(id) => match heap.get(id) {
                HeapData::Str(s) => f.write_str(s),
                _ => Ok(()),
            },
            Self::Array(id) => {
                if !seen.insert(id) {
                    return f.write_str("...");
                }
                let HeapData::Array(array) = heap.get(id) else {
                    return Ok(());
                };
                f.write_char('[')?;
                let mut iter = array.elements.iter();
                if let Some(first) = iter.next() {
                    first.write_display(f, heap, interns, seen)?;
                    for element in iter {
                        f.write_str(", ")?;
                        element.write_display(f, heap, interns, seen)?;
                    }
                }
                seen.remove(&id);
                f.write_char(']')
            }
            Self::Object(id) => {
                if !seen.insert(id) {
                    return f.write_str("...");
                }
                let HeapData::Object(object) = heap.get(id) else {
                    return Ok(());
                };
                f.write_char('{')?;
                let mut iter = object.fields.iter();
                if let Some((name, value)) = iter.next() {
                    write!(f, "{name}: ")?;
                    value.write_display(f, heap, interns, seen)?;
                    for (name, value) in iter {
                        write!(f, ", {name}: ")?;
                        value.write_display(f, heap, interns, seen)?;
                    }
                }
                seen.remove(&id);
                f.write_char('}')
            }
            Self::Function(_) => f.write_str("<function>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::InternerBuilder;

    #[test]
    fn string_literals_promote_to_owned_heap_strings() {
        let mut heap = Heap::default();
        let mut builder = InternerBuilder::new();
        let id = builder.intern("abc");
        let interns = Interns::new(builder, Vec::new());

        let promoted = Value::StrLiteral(id).promoted_on_store(&mut heap, &interns);
        let Value::Str(heap_id) = promoted else {
            panic!("expected an owned heap string, got {promoted:?}");
        };
        assert!(matches!(heap.get(heap_id), HeapData::Str(s) if s == "abc"));
    }

    #[test]
    fn non_literals_pass_through_promotion_unchanged() {
        let mut heap = Heap::default();
        let interns = Interns::new(InternerBuilder::new(), Vec::new());
        assert_eq!(Value::Int(3).promoted_on_store(&mut heap, &interns), Value::Int(3));
        assert_eq!(heap.live_count(), 0);
    }
}
