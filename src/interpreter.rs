use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info, warn};
use thiserror::Error;

use crate::ast::{BinaryOp, Block, Decl, Expr, FuncDef, Program, Stmt, UnaryOp};
use crate::environment::Environment;
use crate::value::Value;

/// Fatal evaluation errors. None of them is recovered inside the evaluator;
/// each one unwinds to whoever called [`World::call_func`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Redeclaration: '{name}' is already declared in this scope")]
    Redeclaration { name: String },

    #[error("Undeclared: '{name}'")]
    UndeclaredName { name: String },

    #[error("Unknown function: '{name}'")]
    UnknownFunction { name: String },

    #[error("Arity mismatch in '{name}': expected {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

/// Outcome of executing one statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flow {
    /// Keep going with the next statement.
    Continue,

    /// A `return` ran; unwind to the enclosing call.
    Return(Value),
}

/// A function implemented by the embedding program.
pub type HostFn = Rc<dyn Fn(&[Value]) -> Value>;

#[derive(Clone)]
struct HostFunction {
    arity: usize,
    func: HostFn,
}

/// Interpreter state for one program run: the function table, the host
/// functions and the scope stack.
///
/// The function table borrows definitions from the [`Program`], which must
/// therefore outlive the world. Both the table and the globals are loaded
/// at most once per world.
pub struct World<'a> {
    env: Environment,
    funcs: HashMap<&'a str, &'a FuncDef>,
    hosts: HashMap<String, HostFunction>,
    funcs_loaded: bool,
    globals_loaded: bool,
}

impl<'a> Default for World<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> World<'a> {
    pub fn new() -> Self {
        info!("Initializing World");

        Self {
            env: Environment::new(),
            funcs: HashMap::new(),
            hosts: HashMap::new(),
            funcs_loaded: false,
            globals_loaded: false,
        }
    }

    /// Read-only view of the scope stack.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Make `name` callable from the program. A user-defined function with
    /// the same name takes precedence.
    pub fn register_host<F>(&mut self, name: &str, arity: usize, func: F)
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        debug!("Registering host function '{}' ({} args)", name, arity);

        self.hosts.insert(
            name.to_string(),
            HostFunction {
                arity,
                func: Rc::new(func),
            },
        );
    }

    /// Fill the function table from every function definition in `program`.
    /// The table is read-only afterwards; later calls are ignored.
    pub fn collect_functions(&mut self, program: &'a Program) {
        if self.funcs_loaded {
            debug!("Function table already populated");
            return;
        }
        self.funcs_loaded = true;

        for func in program.functions() {
            if self.funcs.insert(func.name.as_str(), func).is_some() {
                warn!("Function '{}' defined more than once; last one wins", func.name);
            }
        }

        info!("Collected {} functions", self.funcs.len());
    }

    /// Evaluate every top-level declaration into the global scope, in order.
    ///
    /// Globals are ordinary bindings in the outermost scope, so they are
    /// only visible to [`call_func`](Self::call_func) once this has run.
    /// Later calls are ignored.
    pub fn init_globals(&mut self, program: &'a Program) -> IResult<()> {
        if self.globals_loaded {
            debug!("Globals already initialized");
            return Ok(());
        }
        self.globals_loaded = true;

        for decl in program.globals() {
            self.execute_decl(decl)?;
        }

        Ok(())
    }

    /// Load `program` and call `entry` with no arguments.
    pub fn run(&mut self, program: &'a Program, entry: &str) -> IResult<Value> {
        self.collect_functions(program);
        self.init_globals(program)?;

        let value = self.call_func(entry, &[])?;
        info!("Entry '{}' returned {}", entry, value);

        Ok(value)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Call protocol
    // ─────────────────────────────────────────────────────────────────────

    /// Call a user-defined or host function with already evaluated arguments.
    ///
    /// A body that finishes without `return` yields number 0.
    pub fn call_func(&mut self, name: &str, args: &[Value]) -> IResult<Value> {
        let Some(func) = self.funcs.get(name).copied() else {
            return self.call_host(name, args);
        };

        debug!("Calling user-defined function '{}'", name);

        check_arity(name, func.params.len(), args.len())?;

        let result = self.scoped(|world| {
            for (param, arg) in func.params.iter().zip(args) {
                debug!("Binding parameter '{}' to {}", param.name, arg);

                if !world.env.declare(&param.name, *arg) {
                    return Err(RuntimeError::Redeclaration {
                        name: param.name.clone(),
                    });
                }
            }

            world.execute_block(&func.body)
        });

        let value = match result? {
            Flow::Return(value) => value,
            Flow::Continue => Value::default(),
        };

        debug!("Function '{}' returned {}", name, value);
        Ok(value)
    }

    fn call_host(&self, name: &str, args: &[Value]) -> IResult<Value> {
        let host = self
            .hosts
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownFunction {
                name: name.to_string(),
            })?;

        check_arity(name, host.arity, args.len())?;

        debug!("Calling host function '{}'", name);
        Ok((host.func)(args))
    }

    /// Run `f` inside a freshly pushed scope, popping it on every exit path.
    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> IResult<T>) -> IResult<T> {
        self.env.push();
        let result = f(self);
        self.env.pop();
        result
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Flow> {
        match stmt {
            Stmt::Decl(decl) => {
                self.execute_decl(decl)?;
                Ok(Flow::Continue)
            }

            Stmt::Expr(expr) => {
                let _ = self.evaluate(expr)?;
                Ok(Flow::Continue)
            }

            Stmt::Return(expr) => {
                let value = match expr {
                    Some(e) => self.evaluate(e)?,
                    None => Value::default(),
                };
                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(cond)?.as_bool() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Continue)
                }
            }

            Stmt::While { cond, body } => {
                while self.evaluate(cond)?.as_bool() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Continue)
            }

            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(init) = init {
                    self.evaluate(init)?;
                }

                loop {
                    if let Some(cond) = cond {
                        if !self.evaluate(cond)?.as_bool() {
                            break;
                        }
                    }

                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }

                    if let Some(step) = step {
                        self.evaluate(step)?;
                    }
                }
                Ok(Flow::Continue)
            }

            Stmt::Block(block) => self.execute_block(block),
        }
    }

    /// Executes `block` in its own scope, stopping at the first `return`.
    pub fn execute_block(&mut self, block: &Block) -> IResult<Flow> {
        debug!("Entering block with {} statements", block.stmts.len());

        self.scoped(|world| {
            for stmt in &block.stmts {
                if let Flow::Return(value) = world.execute(stmt)? {
                    return Ok(Flow::Return(value));
                }
            }
            Ok(Flow::Continue)
        })
    }

    fn execute_decl(&mut self, decl: &Decl) -> IResult<()> {
        let value = match &decl.init {
            Some(expr) => self.evaluate(expr)?,
            None => Value::default(),
        };

        if !self.env.declare(&decl.name, value) {
            return Err(RuntimeError::Redeclaration {
                name: decl.name.clone(),
            });
        }

        debug!("Declared '{}' = {}", decl.name, value);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        let value = match expr {
            Expr::Number(n) => Value::Number(*n),

            Expr::Bool(b) => Value::Bool(*b),

            Expr::Var(name) => self
                .env
                .lookup(name)
                .ok_or_else(|| RuntimeError::UndeclaredName { name: name.clone() })?,

            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;

                if !self.env.assign(name, value) {
                    return Err(RuntimeError::UndeclaredName { name: name.clone() });
                }
                value
            }

            Expr::Unary { op, operand } => {
                let operand = self.evaluate(operand)?;
                apply_unary(*op, operand)
            }

            Expr::Binary { op, left, right } => self.evaluate_binary(*op, left, right)?,

            Expr::Call { name, args } => {
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.evaluate(arg)?);
                }
                self.call_func(name, &arg_values)?
            }
        };

        Ok(value)
    }

    fn evaluate_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> IResult<Value> {
        let lhs = self.evaluate(left)?;

        match op {
            BinaryOp::And => {
                if !lhs.as_bool() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.evaluate(right)?.as_bool()))
            }

            BinaryOp::Or => {
                if lhs.as_bool() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.evaluate(right)?.as_bool()))
            }

            _ => {
                let rhs = self.evaluate(right)?;
                Ok(apply_binary(op, lhs, rhs))
            }
        }
    }
}

fn check_arity(name: &str, expected: usize, found: usize) -> IResult<()> {
    if expected != found {
        return Err(RuntimeError::ArityMismatch {
            name: name.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

fn apply_unary(op: UnaryOp, operand: Value) -> Value {
    match op {
        UnaryOp::Not => Value::Bool(!operand.as_bool()),
        UnaryOp::Neg => Value::Number(-operand.as_number()),
    }
}

/// Eager operator application. Division and remainder by zero give IEEE
/// infinities / NaN, never an error.
pub fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Value {
    let (a, b) = (lhs.as_number(), rhs.as_number());

    match op {
        BinaryOp::Add => Value::Number(a + b),
        BinaryOp::Sub => Value::Number(a - b),
        BinaryOp::Mul => Value::Number(a * b),
        BinaryOp::Div => Value::Number(a / b),
        BinaryOp::Rem => Value::Number(a % b),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::Le => Value::Bool(a <= b),
        BinaryOp::Ge => Value::Bool(a >= b),
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::Ne => Value::Bool(a != b),
        BinaryOp::And => Value::Bool(lhs.as_bool() && rhs.as_bool()),
        BinaryOp::Or => Value::Bool(lhs.as_bool() || rhs.as_bool()),
    }
}
