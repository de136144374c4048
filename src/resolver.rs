//! Static resolver pass for the **Rox** interpreter.
//!
//! One walk over the statement tree, before anything runs.  For every local
//! name occurrence it records how many frames separate the use from its
//! declaration; names it cannot find in a local scope are left to the global
//! frame.  Along the way it rejects programs that are well formed but
//! meaningless (redeclaration in one scope, reading a local inside its own
//! initializer, misplaced `return`, `break` or `this`, a class inheriting
//! from itself) and warns about locals nobody reads.
//!
//! Scopes are opened by blocks, by function parameter lists and by class
//! bodies (the implicit `this` frame), exactly the constructs that create a
//! runtime frame.  Errors are collected; the pass never stops early.

use crate::error::{Diagnostics, LoxError};
use crate::expr::{Expr, ExprId};
use crate::interpreter::Interpreter;
use crate::stmt::{FunctionDecl, Stmt};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use log::{debug, info};
use std::collections::HashMap;
use std::rc::Rc;

/// What kind of function body we are in.  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
}

/// Names starting with this prefix are exempt from the unused warning.
const DISCARD_PREFIX: char = '_';

#[derive(Debug, Clone)]
struct Binding {
    token: Token,
    defined: bool,
    used: bool,
}

/// Scope stack plus the context flags the static rules depend on.  Distances
/// are written straight into the interpreter's side table.
pub struct Resolver<'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashMap<String, Binding>>,
    current_function: FunctionType,
    current_class: ClassType,
    loop_depth: usize,
    errors: Vec<LoxError>,
}

impl<'interp> Resolver<'interp> {
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        info!("Resolver instantiated");
        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            loop_depth: 0,
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements, pushing every error and warning into
    /// `diagnostics`.
    pub fn resolve(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        info!("Resolve pass finished with {} diagnostic(s)", self.errors.len());
        diagnostics.extend(self.errors.drain(..));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        ensure_sufficient_stack(|| {
            match stmt {
                Stmt::Class {
                    name,
                    superclass,
                    methods,
                } => self.resolve_class(name, superclass.as_ref(), methods),

                Stmt::Block(statements) => {
                    self.begin_scope();
                    for s in statements {
                        self.resolve_stmt(s);
                    }
                    self.end_scope();
                }

                Stmt::Var { name, initializer } => {
                    // declare → resolve initializer → define
                    self.declare(name);
                    if let Some(expr) = initializer {
                        self.resolve_expr(expr);
                    }
                    self.define(name);
                }

                Stmt::Function(decl) => {
                    // the name is visible inside its own body
                    self.declare(&decl.name);
                    self.define(&decl.name);
                    self.resolve_function(decl, FunctionType::Function);
                }

                Stmt::Expression(expr) => self.resolve_expr(expr),

                Stmt::Print { values, .. } => {
                    for value in values {
                        self.resolve_expr(value);
                    }
                }

                Stmt::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    self.resolve_expr(condition);
                    self.resolve_stmt(then_branch);
                    if let Some(eb) = else_branch.as_deref() {
                        self.resolve_stmt(eb);
                    }
                }

                Stmt::While { condition, body } => {
                    self.resolve_expr(condition);
                    self.loop_depth += 1;
                    self.resolve_stmt(body);
                    self.loop_depth -= 1;
                }

                Stmt::Break { keyword } => {
                    if self.loop_depth == 0 {
                        self.error(keyword, "Can't use 'break' outside of a loop.");
                    }
                }

                Stmt::Return { keyword, value } => {
                    if self.current_function == FunctionType::None {
                        self.error(keyword, "Can't return from top-level code.");
                    }
                    if let Some(expr) = value {
                        self.resolve_expr(expr);
                    }
                }

                // Imports bind globals at run time.
                Stmt::UseLib { .. } => {}
            }
        })
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable { name: parent, .. } = superclass {
                if parent.lexeme == name.lexeme {
                    self.error(parent, "A class can't inherit from itself.");
                }
            }
            self.resolve_expr(superclass);
        }

        self.begin_scope();
        if let Some(scope) = self.scopes.last_mut() {
            let this = Token::synthetic(TokenType::THIS, "this", name);
            scope.insert(
                "this".to_string(),
                Binding {
                    token: this,
                    defined: true,
                    used: true,
                },
            );
        }

        for method in methods {
            let kind = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind);
        }

        self.end_scope();
        self.current_class = enclosing_class;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        ensure_sufficient_stack(|| {
            match expr {
                Expr::Literal(_) | Expr::ArrayLiteral { .. } | Expr::GlobalVariable { .. } => {}

                Expr::Grouping(inner) => self.resolve_expr(inner),

                Expr::Unary { right, .. } => self.resolve_expr(right),

                Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                    self.resolve_expr(left);
                    self.resolve_expr(right);
                }

                Expr::Ternary {
                    condition,
                    then_branch,
                    else_branch,
                    ..
                } => {
                    self.resolve_expr(condition);
                    self.resolve_expr(then_branch);
                    self.resolve_expr(else_branch);
                }

                Expr::Variable { id, name } => {
                    self.check_initializer_read(name);
                    self.resolve_local(*id, name);
                }

                Expr::Subscript { id, name, index } => {
                    self.check_initializer_read(name);
                    self.resolve_local(*id, name);
                    self.resolve_expr(index);
                }

                Expr::Assign { id, name, value } => {
                    // value before target
                    self.resolve_expr(value);
                    self.resolve_local(*id, name);
                }

                Expr::Call {
                    callee, arguments, ..
                } => {
                    self.resolve_expr(callee);
                    for arg in arguments {
                        self.resolve_expr(arg);
                    }
                }

                Expr::AnonymousFunction(decl) => self.resolve_function(decl, FunctionType::Function),

                Expr::Get { object, .. } => self.resolve_expr(object),

                Expr::Set { object, value, .. } => {
                    self.resolve_expr(value);
                    self.resolve_expr(object);
                }

                Expr::This { id, keyword } => {
                    if self.current_class == ClassType::None {
                        self.error(keyword, "Can't use 'this' outside of a class.");
                        return;
                    }
                    self.resolve_local(*id, keyword);
                }
            }
        })
    }

    fn check_initializer_read(&mut self, name: &Token) {
        let declared_only: bool = self
            .scopes
            .last()
            .and_then(|scope| scope.get(&name.lexeme))
            .is_some_and(|binding| !binding.defined);

        if declared_only {
            self.error(name, "Can't read local variable in its own initializer.");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Parameters and body share one scope, matching the single call frame.
    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionType) {
        let enclosing = self.current_function;
        let enclosing_loops = self.loop_depth;
        self.current_function = kind;
        self.loop_depth = 0;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
        self.loop_depth = enclosing_loops;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost scope, warning about every binding never read.
    fn end_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };

        let mut unused: Vec<Binding> = scope
            .into_values()
            .filter(|b| !b.used && !b.token.lexeme.starts_with(DISCARD_PREFIX))
            .collect();
        unused.sort_by_key(|b| (b.token.line, b.token.offset));

        for binding in unused {
            debug!("Unused local '{}'", binding.token.lexeme);
            self.errors.push(LoxError::UnusedVariable {
                name: binding.token.lexeme,
                line: binding.token.line,
            });
        }
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }

        scope.insert(
            name.lexeme.clone(),
            Binding {
                token: name.clone(),
                defined: false,
                used: false,
            },
        );
    }

    fn define(&mut self, name: &Token) {
        if let Some(binding) = self
            .scopes
            .last_mut()
            .and_then(|scope| scope.get_mut(&name.lexeme))
        {
            binding.defined = true;
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.errors.push(LoxError::resolve(token, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at depth `d`, or leave it global if
    /// no scope binds it.  Either way the binding counts as used.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        // check innermost → outermost
        for (depth, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(binding) = scope.get_mut(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                binding.used = true;
                self.interpreter.resolve(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
