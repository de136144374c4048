use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};
use thiserror::Error;

use crate::class::{LoxClass, LoxInstance};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId};
use crate::function::LoxFunction;
use crate::stack::ensure_sufficient_stack;
use crate::stdlib;
use crate::stmt::{split_library_path, FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::{format_number, Value};

/// Maximum number of simultaneously active calls before the interpreter
/// gives up with a runtime error.
pub const MAX_ENV_DEPTH: usize = 2048;

/// Unwinding signals of the evaluator.  Only `Runtime` ever escapes
/// [`Interpreter::interpret`]; the other two are caught by the nearest
/// function call or loop.
#[derive(Error, Debug)]
pub enum InterpretError {
    #[error(transparent)]
    Runtime(#[from] LoxError),

    #[error("Return signal with value: {0}")]
    Return(Value),

    #[error("Break signal")]
    Break,
}

/// Convenient alias for interpreter results.
pub type IResult<T> = std::result::Result<T, InterpretError>;

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,

    /// Scope distances written by the resolver, keyed by node identity.
    locals: HashMap<ExprId, usize>,

    output: Box<dyn Write>,

    /// Number of function calls currently on the stack.
    depth: usize,

    /// Non-fatal diagnostics raised while running (missing libraries).
    notices: Vec<LoxError>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter printing to stdout, with the native library
    /// preloaded into the global frame.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    /// Same as [`Interpreter::new`] but `print` writes into `output`.
    pub fn with_output<W: Write + 'static>(output: W) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));
        stdlib::preload(&globals);

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output: Box::new(output),
            depth: 0,
            notices: Vec::new(),
        }
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Record that the node `id` refers to a binding `depth` frames up.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("Resolved {:?} at distance {}", id, depth);
        self.locals.insert(id, depth);
    }

    /// Distance recorded for `id`, if it was resolved to a local.
    pub fn resolved_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Drain diagnostics produced during execution.
    pub fn take_notices(&mut self) -> Vec<LoxError> {
        mem::take(&mut self.notices)
    }

    /// Interprets a list of statements (a "program").  Stops at the first
    /// runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        info!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}
                Err(InterpretError::Runtime(err)) => {
                    self.depth = 0;
                    self.environment = Rc::clone(&self.globals);
                    let _ = self.output.flush();
                    return Err(err);
                }
                // Rejected by the resolver; nothing to unwind to here.
                Err(InterpretError::Return(_)) | Err(InterpretError::Break) => {
                    debug!("Ignoring control signal at top level");
                }
            }
        }

        self.output.flush()?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<()> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> IResult<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }

            Stmt::Print { keyword, values } => {
                let mut rendered: Vec<String> = Vec::with_capacity(values.len());
                for value in values {
                    rendered.push(self.evaluate(value)?.to_string());
                }

                let line: String = rendered.join(" ");
                debug!("Printing: {}", line);

                writeln!(self.output, "{}", line).map_err(|e| {
                    LoxError::runtime(keyword.line, format!("Could not write output: {}", e))
                })?;
                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(())
            }

            Stmt::Block(statements) => {
                let frame = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, frame)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                debug!("Entering while loop");
                while is_truthy(&self.evaluate(condition)?) {
                    match self.execute(body) {
                        Ok(()) => {}
                        Err(InterpretError::Break) => {
                            debug!("Break out of while loop");
                            break;
                        }
                        Err(other) => return Err(other),
                    }
                }
                Ok(())
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);
                let function = self.make_function(decl, false);
                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, function);
                Ok(())
            }

            Stmt::Break { .. } => Err(InterpretError::Break),

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Err(InterpretError::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.define_class(name, superclass.as_ref(), methods),

            Stmt::UseLib { path, .. } => {
                self.use_library(path);
                Ok(())
            }
        }
    }

    /// Run `statements` with `frame` as the current environment, restoring
    /// the previous one afterwards whatever the outcome.
    pub fn execute_block(&mut self, statements: &[Stmt], frame: Environment) -> IResult<()> {
        let previous: EnvRef = mem::replace(&mut self.environment, Rc::new(RefCell::new(frame)));

        let result: IResult<()> = statements.iter().try_for_each(|stmt| self.execute(stmt));

        self.environment = previous;
        result
    }

    fn make_function(&self, decl: &Rc<FunctionDecl>, is_initializer: bool) -> Value {
        Value::Function(Rc::new(LoxFunction::new(
            Rc::clone(decl),
            Rc::clone(&self.environment),
            is_initializer,
        )))
    }

    fn define_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> IResult<()> {
        debug!("Defining class '{}'", name.lexeme);

        let parent: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let line: usize = expr.line().unwrap_or(name.line);
                    return Err(LoxError::runtime(line, "Superclass must be a class.").into());
                }
            },
            None => None,
        };

        let mut table: HashMap<String, Rc<LoxFunction>> = HashMap::new();
        for method in methods {
            let function = LoxFunction::new(
                Rc::clone(method),
                Rc::clone(&self.environment),
                method.name.lexeme == "init",
            );
            table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = LoxClass::new(name.lexeme.clone(), parent, table);
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Class(Rc::new(class)));

        info!("Class '{}' defined", name.lexeme);
        Ok(())
    }

    fn use_library(&mut self, path: &Token) {
        let (segments, leaf) = split_library_path(&path.lexeme);
        let namespace: String = segments.join("::");

        match stdlib::lookup(&namespace, leaf) {
            Some(native) => {
                info!("Imported '{}' from '{}'", leaf, namespace);
                self.globals
                    .borrow_mut()
                    .define(leaf, Value::Native(native));
            }
            None => {
                debug!("Library '{}' not found", path.lexeme);
                self.notices.push(LoxError::MissingLibrary {
                    path: path.lexeme.clone(),
                    line: path.line,
                });
            }
        }
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),

            Expr::ArrayLiteral { values, .. } => Ok(Value::Array(Rc::new(
                values.iter().map(Value::from).collect(),
            ))),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val: Value = self.evaluate(left)?;

                let short_circuit: bool = if operator.token_type == TokenType::OR {
                    is_truthy(&left_val)
                } else {
                    !is_truthy(&left_val)
                };

                if short_circuit {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Variable { id, name } => Ok(self.look_up_variable(name, *id)?),

            Expr::This { id, keyword } => Ok(self.look_up_variable(keyword, *id)?),

            Expr::GlobalVariable { name } => Ok(self.globals.borrow().get_own(name)?),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                debug!("Assigned {} to '{}'", value, name.lexeme);
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call_value(callee_val, paren, args)
            }

            Expr::AnonymousFunction(decl) => Ok(self.make_function(decl, false)),

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Ok(LoxInstance::get(&instance, name)?),
                _ => Err(LoxError::runtime(name.line, "Only instances have properties.").into()),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name.line, "Only instances have fields.").into());
                };

                let value: Value = self.evaluate(value)?;
                instance.set(&name.lexeme, value.clone());
                Ok(value)
            }

            Expr::Subscript { id, name, index } => self.evaluate_subscript(*id, name, index),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn evaluate_unary(&mut self, op: &Token, right: &Expr) -> IResult<Value> {
        let right_val: Value = self.evaluate(right)?;

        match op.token_type {
            TokenType::MINUS => match right_val {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(op.line, "Operand must be a number.").into()),
            },
            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_val))),
            _ => Err(LoxError::runtime(
                op.line,
                format!("Invalid unary operator '{}'.", op.lexeme),
            )
            .into()),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> IResult<Value> {
        let left_val: Value = self.evaluate(left)?;
        let right_val: Value = self.evaluate(right)?;

        debug!(
            "Binary '{}' on {} and {}",
            op.lexeme, left_val, right_val
        );

        let numbers = |l: &Value, r: &Value| -> Result<(f64, f64)> {
            match (l, r) {
                (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
                _ => Err(LoxError::runtime(op.line, "Operands must be numbers.")),
            }
        };

        let result: Value = match op.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
                (Value::String(a), Value::String(b)) => Value::String(a + &b),
                (Value::String(a), Value::Number(b)) => Value::String(a + &format_number(b)),
                _ => {
                    return Err(LoxError::runtime(
                        op.line,
                        "Operands must be two numbers or two strings.",
                    )
                    .into())
                }
            },

            TokenType::MINUS => {
                let (a, b) = numbers(&left_val, &right_val)?;
                Value::Number(a - b)
            }

            TokenType::STAR => {
                let (a, b) = numbers(&left_val, &right_val)?;
                Value::Number(a * b)
            }

            TokenType::SLASH => {
                let (a, b) = numbers(&left_val, &right_val)?;
                Value::Number(a / b)
            }

            TokenType::GREATER => {
                let (a, b) = numbers(&left_val, &right_val)?;
                Value::Bool(a > b)
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = numbers(&left_val, &right_val)?;
                Value::Bool(a >= b)
            }

            TokenType::LESS => {
                let (a, b) = numbers(&left_val, &right_val)?;
                Value::Bool(a < b)
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = numbers(&left_val, &right_val)?;
                Value::Bool(a <= b)
            }

            TokenType::EQUAL_EQUAL => Value::Bool(is_equal(&left_val, &right_val)),

            TokenType::BANG_EQUAL => Value::Bool(!is_equal(&left_val, &right_val)),

            _ => {
                return Err(LoxError::runtime(
                    op.line,
                    format!("Invalid binary operator '{}'.", op.lexeme),
                )
                .into())
            }
        };

        Ok(result)
    }

    fn evaluate_subscript(&mut self, id: ExprId, name: &Token, index: &Expr) -> IResult<Value> {
        let target: Value = self.look_up_variable(name, id)?;
        let index_val: Value = self.evaluate(index)?;

        let Value::Array(items) = target else {
            return Err(
                LoxError::runtime(name.line, format!("'{}' is not an array.", name.lexeme)).into(),
            );
        };

        let Value::Number(raw) = index_val else {
            return Err(LoxError::runtime(name.line, "Index must be a number.").into());
        };

        // NaN fails both comparisons and is reported as out of bounds.
        let position: f64 = raw.trunc();
        if !(position >= 0.0 && position < items.len() as f64) {
            return Err(LoxError::runtime(
                name.line,
                format!(
                    "Index {} out of bounds for array of length {}.",
                    format_number(position),
                    items.len()
                ),
            )
            .into());
        }

        Ok(items[position as usize].clone())
    }

    /// Invoke any callable value with already evaluated arguments.
    pub fn call_value(
        &mut self,
        callee: Value,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> IResult<Value> {
        match callee {
            Value::Native(native) => {
                if !native.arity.accepts(arguments.len()) {
                    return Err(arity_error(paren, native.arity, arguments.len()));
                }

                debug!("Calling native function '{}'", native.name);
                let result: Value = (native.func)(self, &arguments)
                    .map_err(|msg| LoxError::runtime(paren.line, msg))?;
                info!("Native function '{}' returned: {}", native.name, result);
                Ok(result)
            }

            Value::Function(function) => {
                if function.arity() != arguments.len() {
                    return Err(arity_error(paren, function.arity(), arguments.len()));
                }

                self.enter_call(paren)?;
                let result = ensure_sufficient_stack(|| {
                    function.call(self, arguments)
                });
                self.depth -= 1;
                result
            }

            Value::Class(class) => {
                if class.arity() != arguments.len() {
                    return Err(arity_error(paren, class.arity(), arguments.len()));
                }

                self.instantiate(&class, paren, arguments)
            }

            _ => Err(LoxError::runtime(paren.line, "Can only call functions and classes.").into()),
        }
    }

    /// Build an instance: run the initializer, then copy every method of the
    /// class chain, root first, into the instance's fields as bound functions.
    fn instantiate(
        &mut self,
        class: &Rc<LoxClass>,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> IResult<Value> {
        debug!("Instantiating class '{}'", class.name());

        let instance: Rc<LoxInstance> = Rc::new(LoxInstance::new(Rc::clone(class)));

        if let Some(initializer) = class.initializer() {
            let bound: LoxFunction = initializer.bind(&instance);

            self.enter_call(paren)?;
            let result = ensure_sufficient_stack(|| {
                bound.call(self, arguments)
            });
            self.depth -= 1;
            result?;
        }

        for ancestor in class.lineage() {
            for (name, method) in ancestor.methods() {
                instance.set(name, Value::Function(Rc::new(method.bind(&instance))));
            }
        }

        Ok(Value::Instance(instance))
    }

    fn enter_call(&mut self, paren: &Token) -> IResult<()> {
        if self.depth >= MAX_ENV_DEPTH {
            return Err(LoxError::runtime(
                paren.line,
                "Too many nested environments; possible infinite recursion.",
            )
            .into());
        }

        self.depth += 1;
        Ok(())
    }
}

fn arity_error(paren: &Token, expected: impl std::fmt::Display, got: usize) -> InterpretError {
    LoxError::runtime(
        paren.line,
        format!("Expected {} arguments but got {}.", expected, got),
    )
    .into()
}

/// `nil` and `false` are falsy, everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// Both nil ⇒ equal, exactly one nil ⇒ unequal, else structural equality.
pub fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Nil, Value::Nil) => true,
        (Value::Nil, _) | (_, Value::Nil) => false,
        _ => left == right,
    }
}
