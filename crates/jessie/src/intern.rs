//! String interning for identifiers and string literals.
//!
//! The interner stores unique strings in a vector and returns indices
//! (`StringId`) for cheap storage and comparison. It is populated during
//! lexing/parsing, then frozen into the read-only [`Interns`] storage that the
//! interpreter owns together with the function table.
//!
//! A string-literal *value* at runtime is just its `StringId` — a borrow into
//! this table — until it is stored somewhere, at which point it is promoted to
//! an owned heap string.

use ahash::AHashMap;

use crate::expressions::FunctionDef;

/// Index into the string interner's storage.
///
/// Uses `u32` to save space (4 bytes vs 8 bytes for `usize`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub(crate) struct StringId(u32);

/// Pre-interned names the evaluator compares against or creates bindings for.
///
/// These StringIds are assigned in `InternerBuilder::new()` and give O(1)
/// comparison for well-known names without heap allocation.
pub(crate) mod well_known {
    use super::StringId;

    /// `length` - the array length pseudo-field.
    pub const LENGTH: StringId = StringId(0);
    /// `push` - array append method.
    pub const PUSH: StringId = StringId(1);
    /// `pop` - array remove-last method.
    pub const POP: StringId = StringId(2);
    /// `this` - the receiver binding created in every call frame.
    pub const THIS: StringId = StringId(3);
    /// `arguments` - the all-arguments array binding in every call frame.
    pub const ARGUMENTS: StringId = StringId(4);
    /// `Object` - recognized constructor name in `new` expressions.
    pub const OBJECT: StringId = StringId(5);
    /// `Array` - recognized constructor name in `new` expressions.
    pub const ARRAY: StringId = StringId(6);
    /// `print` - builtin output function.
    pub const PRINT: StringId = StringId(7);
    /// `setPrototype` - builtin prototype-linking primitive.
    pub const SET_PROTOTYPE: StringId = StringId(8);
}

impl StringId {
    /// Returns the raw index value.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Unique identifier for function definitions in the function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub(crate) struct FunctionId(u32);

impl FunctionId {
    pub fn new(index: usize) -> Self {
        Self(index.try_into().expect("FunctionId overflow"))
    }

    /// Returns the raw index value.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A string interner that deduplicates on insertion.
///
/// Interning the same string twice returns the same `StringId`. Not
/// thread-safe; used single-threaded during parsing, then frozen.
#[derive(Debug)]
pub(crate) struct InternerBuilder {
    /// Maps strings to their indices for deduplication during interning.
    string_map: AHashMap<String, StringId>,
    /// Storage for interned strings, indexed by `StringId`.
    strings: Vec<String>,
}

impl InternerBuilder {
    /// Creates a new interner with the well-known names pre-interned.
    pub fn new() -> Self {
        let mut interner = Self {
            string_map: AHashMap::new(),
            strings: Vec::new(),
        };

        // Order must match the well_known::* constants above. The intern()
        // call is separated from the assert because debug_assert_eq! is
        // removed entirely in release builds.
        let id = interner.intern("length");
        debug_assert_eq!(id, well_known::LENGTH);
        let id = interner.intern("push");
        debug_assert_eq!(id, well_known::PUSH);
        let id = interner.intern("pop");
        debug_assert_eq!(id, well_known::POP);
        let id = interner.intern("this");
        debug_assert_eq!(id, well_known::THIS);
        let id = interner.intern("arguments");
        debug_assert_eq!(id, well_known::ARGUMENTS);
        let id = interner.intern("Object");
        debug_assert_eq!(id, well_known::OBJECT);
        let id = interner.intern("Array");
        debug_assert_eq!(id, well_known::ARRAY);
        let id = interner.intern("print");
        debug_assert_eq!(id, well_known::PRINT);
        let id = interner.intern("setPrototype");
        debug_assert_eq!(id, well_known::SET_PROTOTYPE);

        interner
    }

    /// Interns a string, returning its `StringId`.
    ///
    /// If the string was already interned, returns the existing `StringId`.
    pub fn intern(&mut self, s: &str) -> StringId {
        *self.string_map.entry(s.to_owned()).or_insert_with(|| {
            let id = StringId(self.strings.len().try_into().expect("StringId overflow"));
            self.strings.push(s.to_owned());
            id
        })
    }

}

/// Read-only storage for interned strings and the function table.
///
/// Owned by the [`crate::Interpreter`]; the evaluator looks up identifier
/// names, string-literal bytes, and function definitions here.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct Interns {
    strings: Vec<String>,
    functions: Vec<FunctionDef>,
}

impl Interns {
    pub fn new(interner: InternerBuilder, functions: Vec<FunctionDef>) -> Self {
        Self {
            strings: interner.strings,
            functions,
        }
    }

    /// Looks up a string by its `StringId`.
    ///
    /// # Panics
    /// Panics if the `StringId` is invalid.
    #[inline]
    pub fn get_str(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    /// Looks up a function definition by its `FunctionId`.
    ///
    /// # Panics
    /// Panics if the `FunctionId` is invalid.
    #[inline]
    pub fn get_function(&self, id: FunctionId) -> &FunctionDef {
        self.functions.get(id.index()).expect("function not found")
    }
}
