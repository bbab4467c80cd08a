//! The expression evaluator.
//!
//! A recursive walker over [`ExprNode`]s. Results flow through the operand
//! stack: every successful evaluation leaves exactly one value on top, and
//! each consumer pops what it needs. Values that must survive a possible
//! collection (receivers, in-construction literals, callees) are parked on
//! the operand stack rather than held in Rust locals, since the stack is part
//! of the collector's root set.
//!
//! Garbage collection runs at exactly one safepoint: immediately after a
//! completed plain assignment, when the allocator has signalled pressure.

use ahash::AHashSet;

use crate::builtins;
use crate::environment::{EnvId, Environments, GLOBAL_ENV};
use crate::error::{EvalResult, RunError, RuntimeErrorKind};
use crate::execute::StatementResult;
use crate::expressions::{
    ArithmeticOp, CallTarget, Expr, ExprNode, IncDecOp, IndexKey, LogicalOp, Node, ObjectEntry, ObjectKey,
    RelationalOp,
};
use crate::gc;
use crate::heap::{Heap, HeapData, HeapId, JsArray, JsObject};
use crate::intern::{well_known, FunctionId, Interns, StringId};
use crate::io::PrintWriter;
use crate::operators;
use crate::stack::OperandStack;
use crate::value::{FunctionValue, Value};

/// A resolved assignable location.
///
/// Handles are short-lived: they must not be retained across sub-expression
/// evaluation, since a collection or container mutation can invalidate them.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Slot {
    /// A variable slot: environment and index into its variable list.
    Variable(EnvId, usize),
    /// An array element.
    Element(HeapId, usize),
    /// An object's own field.
    Field(HeapId, usize),
}

/// The complete mutable interpreter state for one run.
pub(crate) struct Machine<'i, W: PrintWriter> {
    pub interns: &'i Interns,
    pub heap: Heap,
    pub envs: Environments,
    pub stack: OperandStack,
    pub print: &'i mut W,
}

impl<'i, W: PrintWriter> Machine<'i, W> {
    /// Creates a fresh machine: empty heap, the global environment, and the
    /// builtins registered in its function list.
    pub fn new(interns: &'i Interns, print: &'i mut W) -> Self {
        let mut envs = Environments::new();
        builtins::register(&mut envs);
        Self {
            interns,
            heap: Heap::default(),
            envs,
            stack: OperandStack::default(),
            print,
        }
    }

    /// Evaluates one expression. On success exactly one value has been
    /// pushed; on error the stack state is unspecified and the caller
    /// unwinds.
    pub fn eval_expression(&mut self, env: EnvId, e: &ExprNode) -> EvalResult<()> {
        match &e.expr {
            Expr::Bool(value) => {
                self.stack.push(Value::Bool(*value));
                Ok(())
            }
            Expr::Int(value) => {
                self.stack.push(Value::Int(*value));
                Ok(())
            }
            Expr::Float(value) => {
                self.stack.push(Value::Float(*value));
                Ok(())
            }
            Expr::Null => {
                self.stack.push(Value::Null);
                Ok(())
            }
            Expr::Undefined => {
                self.stack.push(Value::Undefined);
                Ok(())
            }
            Expr::Str(id) => {
                self.stack.push(Value::StrLiteral(*id));
                Ok(())
            }
            Expr::Identifier(name) => self.eval_identifier(env, *name, e.line),
            Expr::Assign { target, value } => self.eval_assign(env, target, value),
            Expr::OpAssign { op, target, value } => self.eval_op_assign(env, *op, target, value),
            Expr::Arithmetic { op, left, right } => self.eval_arithmetic(env, *op, left, right),
            Expr::Relational { op, left, right } => self.eval_relational(env, *op, left, right),
            Expr::Logical { op, left, right } => self.eval_logical(env, *op, left, right),
            Expr::Negate(operand) => {
                self.eval_expression(env, operand)?;
                let value = self.stack.pop();
                self.stack.push(operators::negate(value));
                Ok(())
            }
            Expr::Not(operand) => {
                self.eval_expression(env, operand)?;
                let value = self.stack.pop();
                let truth = operators::is_truthy(value, &self.heap, self.interns);
                self.stack.push(Value::Bool(!truth));
                Ok(())
            }
            Expr::IncDec { op, target } => self.eval_inc_dec(env, *op, target, e.line),
            Expr::DeclareVar { name, init } => self.eval_declare_var(env, *name, init),
            Expr::Index { base, key } => self.eval_index(env, base, key, e.line),
            Expr::ArrayLiteral(elements) => self.eval_array_literal(env, elements),
            Expr::ObjectLiteral(entries) => self.eval_object_literal(env, entries),
            Expr::Call { target, args } => self.eval_call(env, target, args, e.line),
            Expr::MethodCall { object, method, args } => self.eval_method_call(env, object, *method, args, e.line),
            Expr::New { constructor, args } => self.eval_new(env, *constructor, args, e.line),
            Expr::Function(id) => {
                let value = self.make_function_value(env, *id);
                self.stack.push(value);
                Ok(())
            }
            Expr::NamedFunction(id) => {
                let value = self.declare_function(env, *id);
                self.stack.push(value);
                Ok(())
            }
        }
    }

    /// Creates a function value capturing the current environment.
    fn make_function_value(&mut self, env: EnvId, func: FunctionId) -> Value {
        self.envs.mark_captured(env);
        Value::Function(FunctionValue::User { func, captured_env: env })
    }

    /// Binds a named function in the current environment and returns its
    /// value. Shared by function declarations and named function expressions.
    pub(crate) fn declare_function(&mut self, env: EnvId, func: FunctionId) -> Value {
        let name = self
            .interns
            .get_function(func)
            .name
            .expect("declared function without a name");
        let value = self.make_function_value(env, func);
        let Value::Function(function) = value else {
            unreachable!("make_function_value always returns a function");
        };
        self.envs.create_function(env, name, function);
        value
    }

    // --- identifiers and left values -------------------------------------

    fn eval_identifier(&mut self, env: EnvId, name: StringId, line: u32) -> EvalResult<()> {
        if let Some((env_id, index)) = self.envs.find_variable(env, name) {
            let value = self.envs.var_value(env_id, index);
            self.stack.push(value);
            return Ok(());
        }
        if let Some(func) = self.envs.find_function(env, name) {
            self.stack.push(Value::Function(func));
            return Ok(());
        }
        Err(RunError::new(
            RuntimeErrorKind::VariableNotFound,
            self.interns.get_str(name),
            line,
        ))
    }

    /// Resolves an expression to an assignable location.
    ///
    /// Identifiers that are not declared anywhere are created in the global
    /// environment (auto-declare on write). Object field writes resolve
    /// against own fields only, creating the field if missing, so assignment
    /// always produces an own property on the most-derived object.
    pub(crate) fn get_left_value(&mut self, env: EnvId, e: &ExprNode) -> EvalResult<Slot> {
        match &e.expr {
            Expr::Identifier(name) => {
                if let Some((env_id, index)) = self.envs.find_variable(env, *name) {
                    return Ok(Slot::Variable(env_id, index));
                }
                let index = self.envs.create_variable(GLOBAL_ENV, *name, Value::Null);
                Ok(Slot::Variable(GLOBAL_ENV, index))
            }
            Expr::Index { base, key } => self.left_value_index(env, base, key, e.line),
            _ => Err(RunError::new(RuntimeErrorKind::CanNotUseThisAsLeftValue, "", e.line)),
        }
    }

    fn left_value_index(&mut self, env: EnvId, base: &ExprNode, key: &IndexKey, line: u32) -> EvalResult<Slot> {
        self.eval_expression(env, base)?;
        // The base stays on the stack while the key evaluates, keeping it
        // rooted if the key expression reaches a safepoint.
        match key {
            IndexKey::Expr(key_expr) => {
                self.eval_expression(env, key_expr)?;
                let key_value = self.stack.pop();
                let base_value = self.stack.pop();
                match base_value {
                    Value::Array(id) => {
                        let Value::Int(index) = key_value else {
                            return Err(RunError::new(
                                RuntimeErrorKind::IndexHasWrongType,
                                "array index must be an int",
                                line,
                            ));
                        };
                        let HeapData::Array(array) = self.heap.get(id) else {
                            unreachable!("array value pointing at non-array heap data");
                        };
                        if index < 0 || index as usize >= array.elements.len() {
                            return Err(RunError::new(RuntimeErrorKind::IndexOutRange, "", line));
                        }
                        Ok(Slot::Element(id, index as usize))
                    }
                    Value::Object(id) => {
                        let Some(name) = key_value.as_str(&self.heap, self.interns) else {
                            return Err(RunError::new(
                                RuntimeErrorKind::IndexHasWrongType,
                                "only strings can be used as object keys",
                                line,
                            ));
                        };
                        let name = name.to_owned();
                        Ok(self.own_field_slot(id, &name))
                    }
                    _ => Err(RunError::new(RuntimeErrorKind::CannotIndexThisType, "", line)),
                }
            }
            IndexKey::Field(name_id) => {
                let base_value = self.stack.pop();
                match base_value {
                    // Named fields on arrays (`length` included) are not
                    // assignable.
                    Value::Array(_) => Err(RunError::new(RuntimeErrorKind::IndexHasWrongType, "", line)),
                    Value::Object(id) => {
                        let name = self.interns.get_str(*name_id).to_owned();
                        Ok(self.own_field_slot(id, &name))
                    }
                    _ => Err(RunError::new(RuntimeErrorKind::CannotIndexThisType, "", line)),
                }
            }
        }
    }

    /// Slot of an own field, created with a NULL value when missing.
    fn own_field_slot(&mut self, id: HeapId, name: &str) -> Slot {
        let HeapData::Object(object) = self.heap.get_mut(id) else {
            unreachable!("object value pointing at non-object heap data");
        };
        if let Some(index) = object.field_index(name) {
            return Slot::Field(id, index);
        }
        object.fields.push((name.to_owned(), Value::Null));
        Slot::Field(id, object.fields.len() - 1)
    }

    fn slot_value(&self, slot: Slot) -> Value {
        match slot {
            Slot::Variable(env, index) => self.envs.var_value(env, index),
            Slot::Element(id, index) => {
                let HeapData::Array(array) = self.heap.get(id) else {
                    unreachable!("element slot pointing at non-array heap data");
                };
                array.elements[index]
            }
            Slot::Field(id, index) => {
                let HeapData::Object(object) = self.heap.get(id) else {
                    unreachable!("field slot pointing at non-object heap data");
                };
                object.fields[index].1
            }
        }
    }

    /// Writes a slot. The caller promotes string literals first.
    fn store_slot(&mut self, slot: Slot, value: Value) {
        match slot {
            Slot::Variable(env, index) => self.envs.set_var_value(env, index, value),
            Slot::Element(id, index) => {
                let HeapData::Array(array) = self.heap.get_mut(id) else {
                    unreachable!("element slot pointing at non-array heap data");
                };
                array.elements[index] = value;
            }
            Slot::Field(id, index) => {
                let HeapData::Object(object) = self.heap.get_mut(id) else {
                    unreachable!("field slot pointing at non-object heap data");
                };
                object.fields[index].1 = value;
            }
        }
    }

    // --- assignment ------------------------------------------------------

    fn eval_assign(&mut self, env: EnvId, target: &ExprNode, value: &ExprNode) -> EvalResult<()> {
        self.eval_expression(env, value)?;
        // The value stays on the stack while the target resolves; target
        // sub-expressions can reach the safepoint below.
        let slot = self.get_left_value(env, target)?;
        let value = self.stack.pop();
        let value = value.promoted_on_store(&mut self.heap, self.interns);
        self.store_slot(slot, value);
        let result = self.slot_value(slot);
        self.stack.push(result);
        // The sole collection safepoint: the stored value is rooted through
        // its slot, the pushed result through the stack.
        if self.heap.gc_due() {
            gc::collect(&mut self.heap, &mut self.envs, &self.stack);
        }
        Ok(())
    }

    fn eval_op_assign(&mut self, env: EnvId, op: ArithmeticOp, target: &ExprNode, value: &ExprNode) -> EvalResult<()> {
        self.eval_expression(env, value)?;
        let slot = self.get_left_value(env, target)?;
        let rhs = self.stack.pop();
        let current = self.slot_value(slot);
        let result = operators::arithmetic(op, current, rhs, &mut self.heap, self.interns);
        self.store_slot(slot, result);
        self.stack.push(result);
        Ok(())
    }

    fn eval_inc_dec(&mut self, env: EnvId, op: IncDecOp, target: &ExprNode, line: u32) -> EvalResult<()> {
        let slot = self.get_left_value(env, target).map_err(|_| {
            RunError::new(
                RuntimeErrorKind::VariableNotFound,
                "variable not defined or cannot be used as a left value",
                line,
            )
        })?;
        let old = self.slot_value(slot);
        let new = operators::increment_or_decrement(old, op.delta());
        self.store_slot(slot, new);
        self.stack.push(if op.is_prefix() { new } else { old });
        Ok(())
    }

    /// `var name = init`: reuses the existing slot when the name is already
    /// declared in this frame, otherwise declares it here (not in the global
    /// environment, unlike assignment to an unknown name).
    fn eval_declare_var(&mut self, env: EnvId, name: StringId, init: &ExprNode) -> EvalResult<()> {
        let existing = self.envs.find_in_frame(env, name);
        self.eval_expression(env, init)?;
        let value = self.stack.pop();
        let value = value.promoted_on_store(&mut self.heap, self.interns);
        match existing {
            Some(index) => self.envs.set_var_value(env, index, value),
            None => {
                self.envs.create_variable(env, name, value);
            }
        }
        self.stack.push(value);
        Ok(())
    }

    // --- operators -------------------------------------------------------

    /// Arithmetic evaluates the right operand first, then the left; the two
    /// pops then recover left (on top) and right.
    fn eval_arithmetic(&mut self, env: EnvId, op: ArithmeticOp, left: &ExprNode, right: &ExprNode) -> EvalResult<()> {
        self.eval_expression(env, right)?;
        self.eval_expression(env, left)?;
        let left_value = self.stack.pop();
        let right_value = self.stack.pop();
        let result = operators::arithmetic(op, left_value, right_value, &mut self.heap, self.interns);
        self.stack.push(result);
        Ok(())
    }

    /// Relational operators evaluate left first, then right.
    fn eval_relational(&mut self, env: EnvId, op: RelationalOp, left: &ExprNode, right: &ExprNode) -> EvalResult<()> {
        self.eval_expression(env, left)?;
        self.eval_expression(env, right)?;
        let right_value = self.stack.pop();
        let left_value = self.stack.pop();
        let result = match op {
            RelationalOp::Eq => operators::equal(left_value, right_value, &self.heap, self.interns),
            RelationalOp::Ne => !operators::equal(left_value, right_value, &self.heap, self.interns),
            RelationalOp::Ge => operators::greater_or_equal(left_value, right_value, &self.heap, self.interns),
            RelationalOp::Le => operators::greater_or_equal(right_value, left_value, &self.heap, self.interns),
            RelationalOp::Gt => operators::greater(left_value, right_value, &self.heap, self.interns),
            RelationalOp::Lt => operators::greater(right_value, left_value, &self.heap, self.interns),
        };
        self.stack.push(Value::Bool(result));
        Ok(())
    }

    /// Short-circuiting `&&` / `||`. The result is always a boolean, never
    /// the operand value.
    fn eval_logical(&mut self, env: EnvId, op: LogicalOp, left: &ExprNode, right: &ExprNode) -> EvalResult<()> {
        self.eval_expression(env, left)?;
        let left_value = self.stack.pop();
        let left_truth = operators::is_truthy(left_value, &self.heap, self.interns);
        match op {
            LogicalOp::And if !left_truth => {
                self.stack.push(Value::Bool(false));
                return Ok(());
            }
            LogicalOp::Or if left_truth => {
                self.stack.push(Value::Bool(true));
                return Ok(());
            }
            _ => {}
        }
        self.eval_expression(env, right)?;
        let right_value = self.stack.pop();
        let right_truth = operators::is_truthy(right_value, &self.heap, self.interns);
        let result = match op {
            LogicalOp::And => left_truth && right_truth,
            LogicalOp::Or => left_truth || right_truth,
        };
        self.stack.push(Value::Bool(result));
        Ok(())
    }

    // --- indexing and literals -------------------------------------------

    fn eval_index(&mut self, env: EnvId, base: &ExprNode, key: &IndexKey, line: u32) -> EvalResult<()> {
        self.eval_expression(env, base)?;
        match key {
            IndexKey::Expr(key_expr) => {
                self.eval_expression(env, key_expr)?;
                let key_value = self.stack.pop();
                let base_value = self.stack.pop();
                match base_value {
                    Value::Array(id) => {
                        let Value::Int(index) = key_value else {
                            return Err(RunError::new(
                                RuntimeErrorKind::IndexHasWrongType,
                                "array index must be an int",
                                line,
                            ));
                        };
                        let HeapData::Array(array) = self.heap.get(id) else {
                            unreachable!("array value pointing at non-array heap data");
                        };
                        if index < 0 || index as usize >= array.elements.len() {
                            return Err(RunError::new(RuntimeErrorKind::IndexOutRange, "", line));
                        }
                        let element = array.elements[index as usize];
                        self.stack.push(element);
                        Ok(())
                    }
                    Value::Object(id) => {
                        let Some(name) = key_value.as_str(&self.heap, self.interns) else {
                            return Err(RunError::new(
                                RuntimeErrorKind::IndexHasWrongType,
                                "only strings can be used as object keys",
                                line,
                            ));
                        };
                        match self.search_field_with_prototype(id, name) {
                            Some(value) => {
                                self.stack.push(value);
                                Ok(())
                            }
                            None => Err(RunError::new(RuntimeErrorKind::FieldNotDefined, name, line)),
                        }
                    }
                    _ => Err(RunError::new(
                        RuntimeErrorKind::CannotIndexThisType,
                        "not an array and not an object",
                        line,
                    )),
                }
            }
            IndexKey::Field(name_id) => {
                let base_value = self.stack.pop();
                match base_value {
                    Value::Array(id) => {
                        if *name_id == well_known::LENGTH {
                            let HeapData::Array(array) = self.heap.get(id) else {
                                unreachable!("array value pointing at non-array heap data");
                            };
                            let length = array.elements.len() as i64;
                            self.stack.push(Value::Int(length));
                            Ok(())
                        } else {
                            Err(RunError::new(
                                RuntimeErrorKind::FieldNotDefined,
                                self.interns.get_str(*name_id),
                                line,
                            ))
                        }
                    }
                    Value::Object(id) => {
                        let name = self.interns.get_str(*name_id);
                        match self.search_field_with_prototype(id, name) {
                            Some(value) => {
                                self.stack.push(value);
                                Ok(())
                            }
                            None => Err(RunError::new(RuntimeErrorKind::FieldNotDefined, name, line)),
                        }
                    }
                    _ => Err(RunError::new(
                        RuntimeErrorKind::CannotIndexThisType,
                        "not an array and not an object",
                        line,
                    )),
                }
            }
        }
    }

    /// Reads a field through the prototype chain: own fields first, then the
    /// prototype link, repeatedly. Used for reads and method lookup, never
    /// for writes.
    fn search_field_with_prototype(&self, id: HeapId, name: &str) -> Option<Value> {
        let mut visited = AHashSet::new();
        let mut current = Some(id);
        while let Some(object_id) = current {
            if !visited.insert(object_id) {
                return None; // prototype cycle
            }
            let HeapData::Object(object) = self.heap.get(object_id) else {
                return None;
            };
            if let Some(index) = object.field_index(name) {
                return Some(object.fields[index].1);
            }
            current = object.prototype;
        }
        None
    }

    /// `[e1, …, en]`: the array is allocated up front with a `2n + 1`
    /// capacity margin and stays on the stack (rooted) while its elements
    /// evaluate left to right.
    fn eval_array_literal(&mut self, env: EnvId, elements: &[ExprNode]) -> EvalResult<()> {
        let id = self
            .heap
            .allocate(HeapData::Array(JsArray::with_capacity(elements.len() * 2 + 1)));
        self.stack.push(Value::Array(id));
        for element in elements {
            self.eval_expression(env, element)?;
            let value = self.stack.pop();
            let value = value.promoted_on_store(&mut self.heap, self.interns);
            let HeapData::Array(array) = self.heap.get_mut(id) else {
                unreachable!("array value pointing at non-array heap data");
            };
            array.elements.push(value);
        }
        Ok(())
    }

    /// `{k: v, …}`: allocates an empty object capturing the current
    /// environment, then inserts each entry in order. Computed keys must
    /// evaluate to strings.
    fn eval_object_literal(&mut self, env: EnvId, entries: &[ObjectEntry]) -> EvalResult<()> {
        self.envs.mark_captured(env);
        let id = self.heap.allocate(HeapData::Object(JsObject {
            fields: Vec::new(),
            prototype: None,
            captured_env: Some(env),
        }));
        self.stack.push(Value::Object(id));
        for entry in entries {
            let name = match &entry.key {
                ObjectKey::Identifier(name_id) => self.interns.get_str(*name_id).to_owned(),
                ObjectKey::Expr(key_expr) => {
                    self.eval_expression(env, key_expr)?;
                    let key_value = self.stack.pop();
                    match key_value.as_str(&self.heap, self.interns) {
                        Some(name) => name.to_owned(),
                        None => {
                            return Err(RunError::new(
                                RuntimeErrorKind::IndexHasWrongType,
                                "only strings can be used as object keys",
                                entry.line,
                            ))
                        }
                    }
                }
            };
            self.eval_expression(env, &entry.value)?;
            let value = self.stack.pop();
            let value = value.promoted_on_store(&mut self.heap, self.interns);
            let HeapData::Object(object) = self.heap.get_mut(id) else {
                unreachable!("object value pointing at non-object heap data");
            };
            match object.field_index(&name) {
                Some(index) => object.fields[index].1 = value,
                None => object.fields.push((name, value)),
            }
        }
        Ok(())
    }

    fn eval_new(&mut self, env: EnvId, constructor: StringId, args: &[ExprNode], line: u32) -> EvalResult<()> {
        if constructor == well_known::OBJECT {
            let id = self.heap.allocate(HeapData::Object(JsObject::default()));
            self.stack.push(Value::Object(id));
            Ok(())
        } else if constructor == well_known::ARRAY {
            self.eval_array_literal(env, args)
        } else {
            Err(RunError::new(
                RuntimeErrorKind::UnknownNewType,
                self.interns.get_str(constructor),
                line,
            ))
        }
    }

    // --- calls -----------------------------------------------------------

    fn eval_call(&mut self, env: EnvId, target: &CallTarget, args: &[ExprNode], line: u32) -> EvalResult<()> {
        match target {
            CallTarget::Name(name) => {
                // Variables shadow function bindings, matching identifier
                // evaluation order.
                let callee = if let Some((env_id, index)) = self.envs.find_variable(env, *name) {
                    let value = self.envs.var_value(env_id, index);
                    let Value::Function(func) = value else {
                        return Err(RunError::new(
                            RuntimeErrorKind::NotAFunction,
                            self.interns.get_str(*name),
                            line,
                        ));
                    };
                    func
                } else if let Some(func) = self.envs.find_function(env, *name) {
                    func
                } else {
                    return Err(RunError::new(
                        RuntimeErrorKind::FunctionNotFound,
                        self.interns.get_str(*name),
                        line,
                    ));
                };
                self.stack.push(Value::Function(callee));
                self.invoke(env, callee, None, args, 1, line)
            }
            CallTarget::Expr(callee_expr) => {
                self.eval_expression(env, callee_expr)?;
                let Value::Function(callee) = self.stack.top() else {
                    let value = self.stack.pop();
                    return Err(RunError::new(RuntimeErrorKind::NotAFunction, value.type_str(), line));
                };
                self.invoke(env, callee, None, args, 1, line)
            }
        }
    }

    fn eval_method_call(
        &mut self,
        env: EnvId,
        object: &ExprNode,
        method: StringId,
        args: &[ExprNode],
        line: u32,
    ) -> EvalResult<()> {
        self.eval_expression(env, object)?;
        // The receiver stays on the stack as a root until the call frame
        // takes over.
        let receiver = self.stack.top();
        match receiver {
            Value::Array(id) => self.eval_array_method(env, id, method, args, line),
            Value::Object(id) => {
                let name = self.interns.get_str(method);
                let Some(value) = self.search_field_with_prototype(id, name) else {
                    return Err(RunError::new(RuntimeErrorKind::FieldNotDefined, name, line));
                };
                let Value::Function(callee) = value else {
                    return Err(RunError::new(RuntimeErrorKind::NotAFunction, name, line));
                };
                self.stack.push(value);
                self.invoke(env, callee, Some(id), args, 2, line)
            }
            other => Err(RunError::new(RuntimeErrorKind::IsNotAnObject, other.type_str(), line)),
        }
    }

    /// Calls `callee`. The caller has parked `root_count` values on the stack
    /// (receiver and/or callee) that keep the relevant heap data alive while
    /// arguments evaluate; they are consumed here.
    ///
    /// For user functions: a fresh frame is allocated whose outer link is the
    /// object's captured environment for a method call, the function's
    /// otherwise (falling back to the caller's frame), giving the lookup
    /// chain `frame → captured chain → … → global`. Parameters bind
    /// left-to-right with NULL filling any shortfall, `arguments` holds every
    /// passed value, and `this` is the receiver (method call) or a fresh
    /// empty object (plain call).
    fn invoke(
        &mut self,
        env: EnvId,
        callee: FunctionValue,
        this_obj: Option<HeapId>,
        args: &[ExprNode],
        root_count: usize,
        line: u32,
    ) -> EvalResult<()> {
        match callee {
            FunctionValue::Builtin(builtin) => {
                for arg in args {
                    self.eval_expression(env, arg)?;
                }
                let mut values = vec![Value::Null; args.len()];
                for slot in values.iter_mut().rev() {
                    *slot = self.stack.pop();
                }
                for _ in 0..root_count {
                    self.stack.pop();
                }
                let result = builtin.call(&values, &mut self.heap, self.interns, &mut *self.print, line)?;
                self.stack.push(result);
                Ok(())
            }
            FunctionValue::User { func, captured_env } => {
                let interns = self.interns;
                let def = interns.get_function(func);

                let outer = match this_obj {
                    Some(id) => match self.heap.get(id) {
                        HeapData::Object(object) => object.captured_env.unwrap_or(env),
                        _ => env,
                    },
                    None => captured_env,
                };
                // The frame is a collection root from here on, so it also
                // keeps the captured chain alive while arguments evaluate.
                let frame = self.envs.alloc(Some(outer));

                let arguments_id = self.heap.allocate(HeapData::Array(JsArray::with_capacity(args.len())));
                self.stack.push(Value::Array(arguments_id));

                for arg in args {
                    self.eval_expression(env, arg)?;
                }
                let mut values = vec![Value::Null; args.len()];
                for slot in values.iter_mut().rev() {
                    *slot = self.stack.pop();
                }
                self.stack.pop(); // the arguments-array root
                for _ in 0..root_count {
                    self.stack.pop();
                }

                let promoted: Vec<Value> = values
                    .into_iter()
                    .map(|value| value.promoted_on_store(&mut self.heap, interns))
                    .collect();
                let HeapData::Array(arguments) = self.heap.get_mut(arguments_id) else {
                    unreachable!("arguments value pointing at non-array heap data");
                };
                arguments.elements.extend(promoted.iter().copied());

                for (index, param) in def.params.iter().enumerate() {
                    let value = promoted.get(index).copied().unwrap_or(Value::Null);
                    self.envs.create_variable(frame, *param, value);
                }
                self.envs
                    .create_variable(frame, well_known::ARGUMENTS, Value::Array(arguments_id));
                let this_id = match this_obj {
                    Some(id) => id,
                    None => self.heap.allocate(HeapData::Object(JsObject::default())),
                };
                self.envs.create_variable(frame, well_known::THIS, Value::Object(this_id));

                let outcome = self.run_function_body(frame, &def.body);
                self.envs.release_frame(frame);
                let value = outcome?;
                self.stack.push(value);
                Ok(())
            }
        }
    }

    /// Executes a function body in its frame. `RETURN` yields the carried
    /// value, falling off the end yields NULL, and a leaking `continue` or
    /// `break` is a runtime error.
    fn run_function_body(&mut self, frame: EnvId, body: &[Node]) -> EvalResult<Value> {
        match self.execute_block(frame, body)? {
            StatementResult::Return { value, .. } => Ok(value),
            StatementResult::Normal => Ok(Value::Null),
            StatementResult::Continue(stmt_line) => Err(RunError::new(
                RuntimeErrorKind::ContinueReturnBreakCanNotBeInThisScope,
                "continue",
                stmt_line,
            )),
            StatementResult::Break(stmt_line) => Err(RunError::new(
                RuntimeErrorKind::ContinueReturnBreakCanNotBeInThisScope,
                "break",
                stmt_line,
            )),
        }
    }

    /// Array method dispatch: `push` and `pop` are built in, anything else is
    /// an error. The receiver value is on top of the stack and is consumed.
    fn eval_array_method(
        &mut self,
        env: EnvId,
        id: HeapId,
        method: StringId,
        args: &[ExprNode],
        line: u32,
    ) -> EvalResult<()> {
        if method == well_known::PUSH {
            for arg in args {
                self.eval_expression(env, arg)?;
            }
            let mut values = vec![Value::Null; args.len()];
            for slot in values.iter_mut().rev() {
                *slot = self.stack.pop();
            }
            self.stack.pop(); // the receiver root
            let promoted: Vec<Value> = values
                .into_iter()
                .map(|value| value.promoted_on_store(&mut self.heap, self.interns))
                .collect();
            let HeapData::Array(array) = self.heap.get_mut(id) else {
                unreachable!("array value pointing at non-array heap data");
            };
            array.elements.reserve(promoted.len());
            array.elements.extend(promoted);
            let length = array.elements.len() as i64;
            self.stack.push(Value::Int(length));
            Ok(())
        } else if method == well_known::POP {
            // pop takes no arguments; any given are ignored unevaluated.
            self.stack.pop(); // the receiver root
            let HeapData::Array(array) = self.heap.get_mut(id) else {
                unreachable!("array value pointing at non-array heap data");
            };
            let value = array.elements.pop().unwrap_or(Value::Null);
            self.stack.push(value);
            Ok(())
        } else {
            Err(RunError::new(
                RuntimeErrorKind::MethodNotFound,
                self.interns.get_str(method),
                line,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::NoPrint;
    use crate::parser::parse;

    /// Every successful expression evaluation leaves exactly one value.
    #[test]
    fn evaluation_leaves_exactly_one_value_on_the_stack() {
        let sources = [
            "42;",
            "1 + 2 * 3;",
            "[1, [2], \"three\"];",
            "({ a: 1, b: { c: 2 } });",
            "1 && 0 || 2;",
            "!true;",
            "new Array(1, 2);",
            "function () { return 1; };",
        ];
        for source in sources {
            let parsed = parse(source).unwrap();
            let mut print = NoPrint;
            let mut machine = Machine::new(&parsed.interns, &mut print);
            let Node::Expr(expr) = &parsed.nodes[0] else {
                panic!("expected an expression statement in {source:?}");
            };
            machine.eval_expression(GLOBAL_ENV, expr).unwrap();
            assert_eq!(machine.stack.len(), 1, "stack imbalance for {source:?}");
        }
    }

    /// Failed evaluation reports the error instead of pushing a value.
    #[test]
    fn errors_carry_kind_and_line() {
        let parsed = parse("\n\nmissingName;").unwrap();
        let mut print = NoPrint;
        let mut machine = Machine::new(&parsed.interns, &mut print);
        let Node::Expr(expr) = &parsed.nodes[0] else {
            panic!("expected an expression statement");
        };
        let err = machine.eval_expression(GLOBAL_ENV, expr).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::VariableNotFound);
        assert_eq!(err.line, 3);
        assert_eq!(err.message, "missingName");
    }
}
