use std::rc::Rc;

use crate::stmt::FunctionDecl;
use crate::token::Token;

/// Stable identity of an expression node, assigned once at parse time.
///
/// The resolver keys its binding distances by this id, so two structurally
/// identical references at different source positions resolve independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub usize);

/// Allocator for [`ExprId`]s.  One allocator must outlive every parse whose
/// nodes share a resolution table (a whole REPL session, for instance).
#[derive(Debug, Default)]
pub struct NodeIds {
    next: usize,
}

impl NodeIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> ExprId {
        let id = ExprId(self.next);
        self.next += 1;
        id
    }
}

/// A **literal constant** that appears directly in the source code.
///
/// These are the terminal leaves of the expression tree; the parser copies
/// the value out of the token so the AST owns all of its data.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal, stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*.
///
/// Nodes own their children exclusively; function literals are the only
/// shared payload (`Rc<FunctionDecl>`), because a runtime function value keeps
/// its declaration alive after the tree it came from is gone.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// `[1, 2, "x"]`.  Elements are literal values only.
    ArrayLiteral {
        /// The opening `[`, kept for line reporting.
        bracket: Token,
        values: Vec<LiteralValue>,
    },

    /// Prefix unary operator expression: `!isReady`, `-42`.
    Unary { operator: Token, right: Box<Expr> },

    /// Infix binary operator expression: `a + b`, `x <= y`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    /// Lexical variable reference.
    Variable { id: ExprId, name: Token },

    /// `global name`: always read from the outermost environment.
    GlobalVariable { name: Token },

    /// `name = value`.
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// `condition ? then_branch : else_branch`.
    Ternary {
        condition: Box<Expr>,
        question: Token,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Function‑ or method‑call expression.
    Call {
        callee: Box<Expr>,
        /// The closing `)`, retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `fun (params) { body }` in expression position.
    AnonymousFunction(Rc<FunctionDecl>),

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: Token },

    /// `name[index]`.
    Subscript {
        id: ExprId,
        name: Token,
        index: Box<Expr>,
    },
}

impl Expr {
    /// Best line number to report for this expression, if it holds a token.
    pub fn line(&self) -> Option<usize> {
        match self {
            Expr::Literal(_) => None,

            Expr::ArrayLiteral { bracket, .. } => Some(bracket.line),

            Expr::Unary { operator, .. }
            | Expr::Binary { operator, .. }
            | Expr::Logical { operator, .. } => Some(operator.line),

            Expr::Grouping(inner) => inner.line(),

            Expr::Variable { name, .. }
            | Expr::GlobalVariable { name }
            | Expr::Assign { name, .. }
            | Expr::Get { name, .. }
            | Expr::Set { name, .. }
            | Expr::Subscript { name, .. } => Some(name.line),

            Expr::Ternary { question, .. } => Some(question.line),

            Expr::Call { paren, .. } => Some(paren.line),

            Expr::AnonymousFunction(decl) => Some(decl.name.line),

            Expr::This { keyword, .. } => Some(keyword.line),
        }
    }
}
