use std::rc::Rc;

use crate::expr::Expr;
use crate::token::Token;

/// Name, parameter list and body shared by function declarations, methods
/// and anonymous function literals.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    /// Executed directly in the call's parameter environment.
    pub body: Vec<Stmt>,
}

/// **Abstract‑Syntax‑Tree node** for *statements*.  A program is a sequence
/// of these nodes returned by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print a, b;`
    Print { keyword: Token, values: Vec<Expr> },

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop; `for` loops are desugared into one of these.
    While { condition: Expr, body: Box<Stmt> },

    Function(Rc<FunctionDecl>),

    Break { keyword: Token },

    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Class {
        name: Token,

        /// Always an `Expr::Variable` when present.
        superclass: Option<Expr>,

        methods: Vec<Rc<FunctionDecl>>,
    },

    /// `use std::math::max;`
    UseLib { keyword: Token, path: Token },
}

/// Split a library path token into its namespace segments and leaf name:
/// `std::math::max` → (`["std", "math"]`, `"max"`).  Braces around segments
/// are ignored.
pub fn split_library_path(path: &str) -> (Vec<&str>, &str) {
    let mut segments: Vec<&str> = path
        .split("::")
        .map(|s| s.trim_matches(|c| c == '{' || c == '}'))
        .collect();

    let leaf: &str = segments.pop().unwrap_or("");

    (segments, leaf)
}
