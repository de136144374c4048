use crate::stack::ensure_sufficient_stack;
use crate::expr::{Expr, LiteralValue};
use crate::stmt::{FunctionDecl, Stmt};

/// Converts the syntax tree to a parenthesised prefix form, used by the
/// `parse` subcommand and by tests.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        ensure_sufficient_stack(|| {
            match expr {
                // ── literals ────────────────────────────────────────────────
                Expr::Literal(lit) => Self::literal(lit),

                Expr::ArrayLiteral { values, .. } => {
                    let items: Vec<String> = values.iter().map(Self::literal).collect();
                    format!("[{}]", items.join(", "))
                }

                // ── grouping ────────────────────────────────────────────────
                Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

                // ── operators ───────────────────────────────────────────────
                Expr::Unary { operator, right } => {
                    format!("({} {})", operator.lexeme, Self::print(right))
                }

                Expr::Binary {
                    left,
                    operator,
                    right,
                }
                | Expr::Logical {
                    left,
                    operator,
                    right,
                } => format!(
                    "({} {} {})",
                    operator.lexeme,
                    Self::print(left),
                    Self::print(right)
                ),

                Expr::Ternary {
                    condition,
                    then_branch,
                    else_branch,
                    ..
                } => format!(
                    "(?: {} {} {})",
                    Self::print(condition),
                    Self::print(then_branch),
                    Self::print(else_branch)
                ),

                // ── names ───────────────────────────────────────────────────
                Expr::Variable { name, .. } => name.lexeme.clone(),

                Expr::GlobalVariable { name } => format!("(global {})", name.lexeme),

                Expr::This { .. } => "this".into(),

                Expr::Assign { name, value, .. } => {
                    format!("(= {} {})", name.lexeme, Self::print(value))
                }

                Expr::Subscript { name, index, .. } => {
                    format!("(index {} {})", name.lexeme, Self::print(index))
                }

                // ── calls and properties ────────────────────────────────────
                Expr::Call {
                    callee, arguments, ..
                } => {
                    let mut s = format!("(call {}", Self::print(callee));
                    for arg in arguments {
                        s.push(' ');
                        s.push_str(&Self::print(arg));
                    }
                    s.push(')');
                    s
                }

                Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

                Expr::Set {
                    object,
                    name,
                    value,
                } => format!(
                    "(.= {} {} {})",
                    Self::print(object),
                    name.lexeme,
                    Self::print(value)
                ),

                Expr::AnonymousFunction(decl) => Self::function("lambda", decl),
            }
        })
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        ensure_sufficient_stack(|| {
            match stmt {
                Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

                Stmt::Print { values, .. } => {
                    let items: Vec<String> = values.iter().map(Self::print).collect();
                    format!("(print {})", items.join(" "))
                }

                Stmt::Var { name, initializer } => match initializer {
                    Some(init) => format!("(var {} {})", name.lexeme, Self::print(init)),
                    None => format!("(var {})", name.lexeme),
                },

                Stmt::Block(statements) => Self::block(statements),

                Stmt::If {
                    condition,
                    then_branch,
                    else_branch,
                } => match else_branch {
                    Some(else_branch) => format!(
                        "(if {} {} {})",
                        Self::print(condition),
                        Self::print_stmt(then_branch),
                        Self::print_stmt(else_branch)
                    ),
                    None => format!(
                        "(if {} {})",
                        Self::print(condition),
                        Self::print_stmt(then_branch)
                    ),
                },

                Stmt::While { condition, body } => format!(
                    "(while {} {})",
                    Self::print(condition),
                    Self::print_stmt(body)
                ),

                Stmt::Function(decl) => Self::function("fun", decl),

                Stmt::Break { .. } => "(break)".into(),

                Stmt::Return { value, .. } => match value {
                    Some(value) => format!("(return {})", Self::print(value)),
                    None => "(return)".into(),
                },

                Stmt::Class {
                    name,
                    superclass,
                    methods,
                } => {
                    let mut s = format!("(class {}", name.lexeme);
                    if let Some(superclass) = superclass {
                        s.push_str(&format!(" < {}", Self::print(superclass)));
                    }
                    for method in methods {
                        s.push(' ');
                        s.push_str(&Self::function("method", method));
                    }
                    s.push(')');
                    s
                }

                Stmt::UseLib { path, .. } => format!("(use {})", path.lexeme),
            }
        })
    }

    fn literal(lit: &LiteralValue) -> String {
        match lit {
            LiteralValue::True => "true".into(),

            LiteralValue::False => "false".into(),

            LiteralValue::Nil => "nil".into(),

            LiteralValue::Str(s) => s.clone(),

            LiteralValue::Number(n) => {
                if n.fract() == 0.0 {
                    // integral values keep one fractional digit
                    format!("{:.1}", n)
                } else {
                    n.to_string()
                }
            }
        }
    }

    fn block(statements: &[Stmt]) -> String {
        let mut s = String::from("(block");
        for stmt in statements {
            s.push(' ');
            s.push_str(&Self::print_stmt(stmt));
        }
        s.push(')');
        s
    }

    fn function(tag: &str, decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
        format!(
            "({} {}({}) {})",
            tag,
            decl.name.lexeme,
            params.join(" "),
            Self::block(&decl.body)
        )
    }
}
