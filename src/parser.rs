/*!
Time & Space Complexity — whole‑file overview
============================================

Definitions
-----------
* **n** = number of tokens (including the sole EOF).
* **m** = number of AST nodes (`m ≤ n`, because each token contributes at most one node).

### Time

| Phase / function              | Cost | Rationale                                                             |
|-------------------------------|-----:|-----------------------------------------------------------------------|
| `Parser::parse` main loop     | Θ(n) | Each token is consumed once via `advance()`.                          |
| Individual productions        | O(1) per token | Recursive descent is stream‑oriented; no extra scans.       |
| Error recovery `synchronize()`| O(k) | Discards tokens ≤ next statement boundary ( `k ≤ n`).                 |

**Overall:** **Θ(n)**.

### Space

| Structure                | Asymptotic | Notes                                                         |
|--------------------------|-----------:|---------------------------------------------------------------|
| Borrowed token slice     | O(n)       | Tokens are cloned into the AST only where a node keeps one.   |
| AST (`Vec`, `Box`)       | O(m) ≈ O(n)| One `Box` per interior node.                                  |
| Parser scratch fields    | O(1)       | A few indices, the id allocator and the error list.           |

Call‑stack depth grows with syntactic nesting (≪ n in practice).

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`, `statement`   | `debug`| High‑level descent into grammar branches. |
| Error paths (`consume`, etc.)| `debug`| Context before returning structured error.|

--------------------------------------------------------------------------------
Grammar (EBNF)
--------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | useDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" method* "}" ;
method         → IDENT ( "(" parameters? ")" )? block ;
funDecl        → "fun" IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
useDecl        → "use" IMPORT_PATH ";" ;
statement      → exprStmt | printStmt | forStmt | ifStmt | whileStmt
               | breakStmt | returnStmt | block ;
exprStmt       → expression ";" ;
printStmt      → "print" expression ( "," expression )* ";" ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
whileStmt      → "while" "(" expression ")" statement ;
ifStmt         → "if" "(" expression ")" statement ( "else" statement )? ;
breakStmt      → "break" ";" ;
returnStmt     → "return" expression? ";" ;
block          → "{" declaration* "}" ;
parameters     → IDENT ( "," IDENT )* ;
expression     → "fun" "(" parameters? ")" block | ternary ;
ternary        → assignment ( "?" equality ":" equality )? ;
assignment     → ( call "." )? IDENT "=" assignment | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
arguments      → expression ( "," expression )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | "[" ( literal ( "," literal )* )? "]"
               | "global" IDENT
               | IDENT ( "++" | "--" | "[" expression "]" )?
               | "(" expression ")" ;
```

`for` loops are desugared here into `{ init; while (cond) { body; incr; } }`
and `i++` into `i = i + 1`, so later passes never see either form.
*/

use std::rc::Rc;

use crate::error::{Diagnostics, LoxError, Result};
use crate::expr::{Expr, LiteralValue, NodeIds};
use crate::stmt::{FunctionDecl, Stmt};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};

use log::{debug, info};

const MAX_ARITY: usize = 255;

/// Fallback returned by [`Parser::peek`] if the token slice is not
/// terminated by `EOF`.
static END: Token = Token {
    token_type: TokenType::EOF,
    lexeme: String::new(),
    line: 0,
    offset: 0,
};

/// Top‑level parser over an immutable slice of tokens.
pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    ids: &'a mut NodeIds,
    errors: Vec<LoxError>,
}

impl<'a> Parser<'a> {
    /// Construct a new parser.  Node ids are drawn from `ids`, which must be
    /// shared by every parse feeding the same interpreter.
    pub fn new(tokens: &'a [Token], ids: &'a mut NodeIds) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            ids,
            errors: Vec::new(),
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.  Every syntax error is pushed into
    /// `diagnostics`; malformed statements are dropped from the result.
    pub fn parse(&mut self, diagnostics: &mut Diagnostics) -> Vec<Stmt> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        info!(
            "Parsed {} statement(s), {} error(s)",
            statements.len(),
            self.errors.len()
        );

        diagnostics.extend(self.errors.drain(..));

        statements
    }

    // ──────────────────────── declaration rules ───────────────────

    /// Parse one declaration, recovering in panic mode on error.
    fn declaration(&mut self) -> Option<Stmt> {
        ensure_sufficient_stack(|| {
            debug!("Entering declaration");

            let result: Result<Stmt> = if self.matches(TokenType::CLASS) {
                self.class_declaration()
            } else if self.check(TokenType::FUN) && self.check_next(TokenType::IDENTIFIER) {
                self.advance();
                self.function("function").map(Stmt::Function)
            } else if self.matches(TokenType::VAR) {
                self.var_declaration()
            } else if self.matches(TokenType::USE) {
                self.use_declaration()
            } else {
                self.statement()
            };

            match result {
                Ok(stmt) => Some(stmt),
                Err(e) => {
                    debug!("Parse error, synchronizing: {}", e);
                    self.errors.push(e);
                    self.synchronize();
                    None
                }
            }
        })
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect class name.")?.clone();

        let superclass: Option<Expr> = if self.matches(TokenType::LESS) {
            let super_name: Token = self
                .consume(TokenType::IDENTIFIER, "Expect superclass name.")?
                .clone();

            Some(Expr::Variable {
                id: self.ids.fresh(),
                name: super_name,
            })
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    /// `IDENT "(" parameters? ")" block`.  Methods may omit the parameter
    /// list entirely (`area { ... }`).
    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, &format!("Expect {} name.", kind))?
            .clone();

        let params: Vec<Token> = if kind == "method" && self.check(TokenType::LEFT_BRACE) {
            Vec::new()
        } else {
            self.consume(
                TokenType::LEFT_PAREN,
                &format!("Expect '(' after {} name.", kind),
            )?;
            self.parameters()?
        };

        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expect '{{' before {} body.", kind),
        )?;
        let body: Vec<Stmt> = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    /// Parameter names up to and including the closing `)`.
    fn parameters(&mut self) -> Result<Vec<Token>> {
        let mut params: Vec<Token> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARITY {
                    return Err(LoxError::parse_at(
                        self.peek(),
                        "Can't have more than 255 parameters.",
                    ));
                }

                params.push(
                    self.consume(TokenType::IDENTIFIER, "Expect parameter name.")?
                        .clone(),
                );

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;

        Ok(params)
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expect variable name.")?
            .clone();

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    fn use_declaration(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let path: Token = self
            .consume(TokenType::IMPORT_PATH(String::new()), "Expect library path after 'use'.")?
            .clone();

        self.consume(TokenType::SEMICOLON, "Expect ';' after library path.")?;

        Ok(Stmt::UseLib { keyword, path })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        ensure_sufficient_stack(|| {
            debug!("Entering statement at line {}", self.peek().line);

            if self.matches(TokenType::FOR) {
                self.for_statement()
            } else if self.matches(TokenType::IF) {
                self.if_statement()
            } else if self.matches(TokenType::WHILE) {
                self.while_statement()
            } else if self.matches(TokenType::BREAK) {
                self.break_statement()
            } else if self.matches(TokenType::RETURN) {
                self.return_statement()
            } else if self.matches(TokenType::LEFT_BRACE) {
                Ok(Stmt::Block(self.block()?))
            } else if self.matches(TokenType::PRINT) {
                self.print_statement()
            } else {
                self.expression_statement()
            }
        })
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'for'.")?;

        let initializer: Option<Stmt> = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition: Expr = if !self.check(TokenType::SEMICOLON) {
            self.expression()?
        } else {
            Expr::Literal(LiteralValue::True)
        };
        self.consume(TokenType::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment: Option<Expr> = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let mut body: Stmt = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        debug!("Desugared 'for' loop at line {}", keyword.line);

        Ok(body)
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let mut values: Vec<Expr> = vec![self.expression()?];

        while self.matches(TokenType::COMMA) {
            values.push(self.expression()?);
        }

        self.consume(TokenType::SEMICOLON, "Expect ';' after value.")?;

        Ok(Stmt::Print { keyword, values })
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after if condition.")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;
        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn break_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        self.consume(TokenType::SEMICOLON, "Expect ';' after 'break'.")?;
        Ok(Stmt::Break { keyword })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after block.")?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| {
            if self.matches(TokenType::FUN) {
                return self.anonymous_function();
            }

            self.ternary()
        })
    }

    fn anonymous_function(&mut self) -> Result<Expr> {
        let name: Token = Token::synthetic(TokenType::IDENTIFIER, "anonymous", self.previous());

        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'fun'.")?;
        let params: Vec<Token> = self.parameters()?;
        self.consume(TokenType::LEFT_BRACE, "Expect '{' before function body.")?;
        let body: Vec<Stmt> = self.block()?;

        Ok(Expr::AnonymousFunction(Rc::new(FunctionDecl {
            name,
            params,
            body,
        })))
    }

    /// The condition is an assignment‑level expression; both branches are
    /// parsed at equality precedence.
    fn ternary(&mut self) -> Result<Expr> {
        let expr: Expr = self.assignment()?;

        if self.matches(TokenType::QUESTION) {
            let question: Token = self.previous().clone();
            let then_branch: Expr = self.equality()?;

            self.consume(TokenType::COLON, "Expect ':' in ternary expression.")?;

            let else_branch: Expr = self.equality()?;

            return Ok(Expr::Ternary {
                condition: Box::new(expr),
                question,
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }

        Ok(expr)
    }

    fn assignment(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| {
            let expr: Expr = self.logical_or()?;

            if self.matches(TokenType::EQUAL) {
                let equals: Token = self.previous().clone();
                let value: Expr = self.assignment()?;

                match expr {
                    Expr::Variable { name, .. } => {
                        return Ok(Expr::Assign {
                            id: self.ids.fresh(),
                            name,
                            value: Box::new(value),
                        });
                    }

                    Expr::Get { object, name } => {
                        return Ok(Expr::Set {
                            object,
                            name,
                            value: Box::new(value),
                        });
                    }

                    // Reported without unwinding: the parser is not confused.
                    other => {
                        self.errors
                            .push(LoxError::parse_at(&equals, "Invalid assignment target."));
                        return Ok(other);
                    }
                }
            }

            Ok(expr)
        })
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.matches(TokenType::BANG_EQUAL) || self.matches(TokenType::EQUAL_EQUAL) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.term()?;

        while self.matches(TokenType::GREATER)
            || self.matches(TokenType::GREATER_EQUAL)
            || self.matches(TokenType::LESS)
            || self.matches(TokenType::LESS_EQUAL)
        {
            let operator: Token = self.previous().clone();
            let right: Expr = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.matches(TokenType::MINUS) || self.matches(TokenType::PLUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.matches(TokenType::STAR) || self.matches(TokenType::SLASH) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| {
            if self.matches(TokenType::BANG) || self.matches(TokenType::MINUS) {
                let operator: Token = self.previous().clone();
                let right: Expr = self.unary()?;
                return Ok(Expr::Unary {
                    operator,
                    right: Box::new(right),
                });
            }

            self.call()
        })
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token = self
                    .consume(TokenType::IDENTIFIER, "Expect property name after '.'.")?
                    .clone();

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();
        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    return Err(LoxError::parse_at(
                        self.peek(),
                        "Can't have more than 255 arguments.",
                    ));
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self
            .consume(TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::LEFT_BRACKET) {
            return self.array_literal();
        }

        if self.check(TokenType::NUMBER(0.0))
            || self.check(TokenType::STRING(String::new()))
            || self.check(TokenType::TRUE)
            || self.check(TokenType::FALSE)
            || self.check(TokenType::NIL)
        {
            return Ok(Expr::Literal(self.literal_value()?));
        }

        if self.matches(TokenType::THIS) {
            return Ok(Expr::This {
                id: self.ids.fresh(),
                keyword: self.previous().clone(),
            });
        }

        if self.matches(TokenType::GLOBAL) {
            let name: Token = self
                .consume(TokenType::IDENTIFIER, "Expect variable name after 'global'.")?
                .clone();

            return Ok(Expr::GlobalVariable { name });
        }

        if self.matches(TokenType::IDENTIFIER) {
            let name: Token = self.previous().clone();

            if self.at_increment() {
                return Ok(self.increment(name));
            }

            if self.matches(TokenType::LEFT_BRACKET) {
                let index: Expr = self.expression()?;
                self.consume(TokenType::RIGHT_BRACKET, "Expect ']' after index.")?;

                return Ok(Expr::Subscript {
                    id: self.ids.fresh(),
                    name,
                    index: Box::new(index),
                });
            }

            return Ok(Expr::Variable {
                id: self.ids.fresh(),
                name,
            });
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(LoxError::parse_at(self.peek(), "Expect expression."))
    }

    /// Consume one literal token and convert it into a [`LiteralValue`].
    fn literal_value(&mut self) -> Result<LiteralValue> {
        let token: &Token = self.advance();

        let value: LiteralValue = match &token.token_type {
            TokenType::NUMBER(n) => LiteralValue::Number(*n),
            TokenType::STRING(s) => LiteralValue::Str(s.clone()),
            TokenType::TRUE => LiteralValue::True,
            TokenType::FALSE => LiteralValue::False,
            TokenType::NIL => LiteralValue::Nil,
            _ => return Err(LoxError::parse_at(token, "Expect literal value.")),
        };

        Ok(value)
    }

    /// `[` already consumed.  A leading `-` is accepted on numbers.
    fn array_literal(&mut self) -> Result<Expr> {
        let bracket: Token = self.previous().clone();
        let mut values: Vec<LiteralValue> = Vec::new();

        if !self.check(TokenType::RIGHT_BRACKET) {
            loop {
                let negate: bool = self.check(TokenType::MINUS)
                    && self.check_next(TokenType::NUMBER(0.0));
                if negate {
                    self.advance();
                }

                let value: LiteralValue = match self.literal_value()? {
                    LiteralValue::Number(n) if negate => LiteralValue::Number(-n),
                    other => other,
                };
                values.push(value);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_BRACKET, "Expect ']' after array literal.")?;

        Ok(Expr::ArrayLiteral { bracket, values })
    }

    /// `++` / `--` written without a space right after an identifier.
    fn at_increment(&self) -> bool {
        let first: &Token = self.peek();
        let Some(second) = self.tokens.get(self.current + 1) else {
            return false;
        };

        matches!(first.token_type, TokenType::PLUS | TokenType::MINUS)
            && first.token_type == second.token_type
            && second.offset == first.offset + 1
    }

    /// Rewrite `name++` to `name = name + 1` (and `--` to `- 1`).
    fn increment(&mut self, name: Token) -> Expr {
        let operator: Token = self.advance().clone();
        self.advance();

        debug!("Desugaring '{}{}{}'", name.lexeme, operator.lexeme, operator.lexeme);

        let read: Expr = Expr::Variable {
            id: self.ids.fresh(),
            name: name.clone(),
        };

        Expr::Assign {
            id: self.ids.fresh(),
            name,
            value: Box::new(Expr::Binary {
                left: Box::new(read),
                operator,
                right: Box::new(Expr::Literal(LiteralValue::Number(1.0))),
            }),
        }
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&'a Token> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        debug!(
            "consume failed at '{}' (line {}): {}",
            self.peek().lexeme,
            self.peek().line,
            message
        );

        Err(LoxError::parse_at(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn check_next(&self, ttype: TokenType) -> bool {
        self.tokens
            .get(self.current + 1)
            .is_some_and(|t| t.token_type == ttype)
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token {
        self.tokens.get(self.current).unwrap_or(&END)
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token {
        self.tokens
            .get(self.current.saturating_sub(1))
            .unwrap_or(&END)
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN
                | TokenType::BREAK
                | TokenType::USE => return,
                _ => {}
            }

            self.advance();
        }
    }
}
