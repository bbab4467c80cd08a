//! The AST produced by the parser and walked by the evaluator.
//!
//! Every expression carries its source line so runtime errors can point back
//! at the script. Function bodies are not stored inline: the parser collects
//! each `function` definition into the function table and the AST references
//! it by [`FunctionId`].

use crate::intern::{FunctionId, StringId};

/// Arithmetic operators, shared by binary expressions and compound assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub(crate) enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub(crate) enum RelationalOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// Short-circuiting logical operators. The result is always a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub(crate) enum LogicalOp {
    And,
    Or,
}

/// Increment/decrement forms. Prefix pushes the new value, postfix the old.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub(crate) enum IncDecOp {
    PostIncrement,
    PostDecrement,
    PreIncrement,
    PreDecrement,
}

impl IncDecOp {
    /// +1 for the increment forms, -1 for the decrement forms.
    pub fn delta(self) -> i64 {
        match self {
            Self::PostIncrement | Self::PreIncrement => 1,
            Self::PostDecrement | Self::PreDecrement => -1,
        }
    }

    pub fn is_prefix(self) -> bool {
        matches!(self, Self::PreIncrement | Self::PreDecrement)
    }
}

/// An expression with its source line.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct ExprNode {
    pub line: u32,
    pub expr: Expr,
}

impl ExprNode {
    pub fn new(line: u32, expr: Expr) -> Self {
        Self { line, expr }
    }
}

/// Target of a function call expression.
///
/// A bare identifier callee is kept as a name and resolved at call time
/// (variables first, then the function lists along the environment chain).
/// Any other callee expression is evaluated and must produce a function value.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) enum CallTarget {
    Name(StringId),
    Expr(Box<ExprNode>),
}

/// The key part of an index expression: `base.field` vs `base[expr]`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) enum IndexKey {
    /// `base.field` - the name is fixed at parse time.
    Field(StringId),
    /// `base[expr]` - evaluated at runtime; must be an int for arrays and a
    /// string for objects.
    Expr(Box<ExprNode>),
}

/// A key in an object literal.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) enum ObjectKey {
    /// A bare identifier key: `{ name: … }`.
    Identifier(StringId),
    /// A computed key; must evaluate to a string.
    Expr(ExprNode),
}

/// One `key: value` entry of an object literal.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct ObjectEntry {
    pub line: u32,
    pub key: ObjectKey,
    pub value: ExprNode,
}

/// An expression in the AST. One variant per expression kind the evaluator
/// dispatches on.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) enum Expr {
    Bool(bool),
    Int(i64),
    Float(f64),
    Null,
    Undefined,
    /// A string literal; the id borrows the interned bytes, no heap value is
    /// allocated until the string is stored somewhere.
    Str(StringId),
    Identifier(StringId),
    /// Plain assignment. The target is validated as a left value at runtime.
    Assign {
        target: Box<ExprNode>,
        value: Box<ExprNode>,
    },
    /// Compound assignment (`+=`, `-=`, `*=`, `/=`, `%=`).
    OpAssign {
        op: ArithmeticOp,
        target: Box<ExprNode>,
        value: Box<ExprNode>,
    },
    Arithmetic {
        op: ArithmeticOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    Relational {
        op: RelationalOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    Logical {
        op: LogicalOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    /// Unary minus.
    Negate(Box<ExprNode>),
    /// Logical not; coerces the operand to a boolean.
    Not(Box<ExprNode>),
    IncDec {
        op: IncDecOp,
        target: Box<ExprNode>,
    },
    /// `var name = init` - declares in the *current* environment, unlike
    /// assignment to an unknown name which declares in the global one.
    DeclareVar {
        name: StringId,
        init: Box<ExprNode>,
    },
    Index {
        base: Box<ExprNode>,
        key: IndexKey,
    },
    ArrayLiteral(Vec<ExprNode>),
    ObjectLiteral(Vec<ObjectEntry>),
    Call {
        target: CallTarget,
        args: Vec<ExprNode>,
    },
    MethodCall {
        object: Box<ExprNode>,
        method: StringId,
        args: Vec<ExprNode>,
    },
    /// `new Object()` / `new Array(…)`; other names are runtime errors.
    New {
        constructor: StringId,
        args: Vec<ExprNode>,
    },
    /// An anonymous function expression; pushes a function value capturing
    /// the current environment.
    Function(FunctionId),
    /// A named function expression; additionally binds the name in the
    /// current environment's function list.
    NamedFunction(FunctionId),
}

/// A statement node.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) enum Node {
    /// Expression statement; the value is evaluated and discarded (the last
    /// top-level one becomes the program result).
    Expr(ExprNode),
    If {
        test: ExprNode,
        body: Vec<Node>,
        or_else: Vec<Node>,
    },
    While {
        test: ExprNode,
        body: Vec<Node>,
    },
    For {
        init: Option<ExprNode>,
        test: Option<ExprNode>,
        post: Option<ExprNode>,
        body: Vec<Node>,
    },
    Return {
        line: u32,
        value: Option<ExprNode>,
    },
    Break(u32),
    Continue(u32),
    /// A `{ … }` block. The subset has function scope, not block scope, so
    /// this executes in the enclosing environment.
    Block(Vec<Node>),
    /// `function name(…) { … }` in statement position.
    FunctionDecl {
        line: u32,
        func: FunctionId,
    },
}

/// A function definition stored in the function table.
///
/// The definition is shared: a function *value* pairs a `FunctionId` with the
/// environment captured at the point the value was created.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct FunctionDef {
    /// The declared name, if any (anonymous function expressions have none).
    pub name: Option<StringId>,
    /// Parameter names in declaration order.
    pub params: Vec<StringId>,
    /// The body statements.
    pub body: Vec<Node>,
}
