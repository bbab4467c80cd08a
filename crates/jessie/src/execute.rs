//! The statement executor.
//!
//! Statements run against the same machine as expressions and report their
//! outcome as a [`StatementResult`]; `CONTINUE`, `BREAK`, and `RETURN`
//! propagate upward through blocks until a loop (or the call machinery)
//! consumes them.

use crate::environment::EnvId;
use crate::error::EvalResult;
use crate::evaluate::Machine;
use crate::expressions::Node;
use crate::io::PrintWriter;
use crate::operators;
use crate::value::Value;

/// The tagged outcome of executing a statement.
#[derive(Debug, Clone, Copy)]
pub(crate) enum StatementResult {
    Normal,
    /// `continue`, with the line it was written on (for the error reported
    /// when it leaks out of a function body or top-level code).
    Continue(u32),
    /// `break`, with its source line.
    Break(u32),
    /// `return`, with its source line and carried value (NULL when the
    /// statement had no expression).
    Return { line: u32, value: Value },
}

impl<W: PrintWriter> Machine<'_, W> {
    /// Executes statements in order until one produces a non-normal result.
    pub fn execute_block(&mut self, env: EnvId, nodes: &[Node]) -> EvalResult<StatementResult> {
        for node in nodes {
            match self.execute_statement(env, node)? {
                StatementResult::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(StatementResult::Normal)
    }

    pub fn execute_statement(&mut self, env: EnvId, node: &Node) -> EvalResult<StatementResult> {
        match node {
            Node::Expr(expr) => {
                self.eval_expression(env, expr)?;
                self.stack.pop();
                Ok(StatementResult::Normal)
            }
            Node::If { test, body, or_else } => {
                self.eval_expression(env, test)?;
                let value = self.stack.pop();
                if operators::is_truthy(value, &self.heap, self.interns) {
                    self.execute_block(env, body)
                } else {
                    self.execute_block(env, or_else)
                }
            }
            Node::While { test, body } => {
                loop {
                    self.eval_expression(env, test)?;
                    let value = self.stack.pop();
                    if !operators::is_truthy(value, &self.heap, self.interns) {
                        break;
                    }
                    match self.execute_block(env, body)? {
                        StatementResult::Normal | StatementResult::Continue(_) => {}
                        StatementResult::Break(_) => break,
                        ret @ StatementResult::Return { .. } => return Ok(ret),
                    }
                }
                Ok(StatementResult::Normal)
            }
            Node::For { init, test, post, body } => {
                if let Some(init) = init {
                    self.eval_expression(env, init)?;
                    self.stack.pop();
                }
                loop {
                    if let Some(test) = test {
                        self.eval_expression(env, test)?;
                        let value = self.stack.pop();
                        if !operators::is_truthy(value, &self.heap, self.interns) {
                            break;
                        }
                    }
                    match self.execute_block(env, body)? {
                        StatementResult::Normal | StatementResult::Continue(_) => {}
                        StatementResult::Break(_) => break,
                        ret @ StatementResult::Return { .. } => return Ok(ret),
                    }
                    if let Some(post) = post {
                        self.eval_expression(env, post)?;
                        self.stack.pop();
                    }
                }
                Ok(StatementResult::Normal)
            }
            Node::Return { line, value } => {
                let result = match value {
                    Some(expr) => {
                        self.eval_expression(env, expr)?;
                        self.stack.pop()
                    }
                    None => Value::Null,
                };
                Ok(StatementResult::Return {
                    line: *line,
                    value: result,
                })
            }
            Node::Break(line) => Ok(StatementResult::Break(*line)),
            Node::Continue(line) => Ok(StatementResult::Continue(*line)),
            Node::Block(nodes) => self.execute_block(env, nodes),
            Node::FunctionDecl { func, .. } => {
                self.declare_function(env, *func);
                Ok(StatementResult::Normal)
            }
        }
    }
}
