use std::io::Write;

use log::info;

use crate::error::Diagnostics;
use crate::expr::NodeIds;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan_tokens;
use crate::stmt::Stmt;

/// One interpreter run: a file, or a whole REPL conversation.
///
/// The interpreter and the id allocator live as long as the session, so
/// functions defined by one `run` stay callable from the next.
pub struct Session {
    interpreter: Interpreter,
    ids: NodeIds,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            interpreter: Interpreter::new(),
            ids: NodeIds::new(),
        }
    }

    /// A session whose `print` output goes to `output`.
    pub fn with_output<W: Write + 'static>(output: W) -> Self {
        Session {
            interpreter: Interpreter::with_output(output),
            ids: NodeIds::new(),
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Scan and parse `source`, stopping after parsing if anything failed.
    pub fn parse(&mut self, source: &[u8], diagnostics: &mut Diagnostics) -> Option<Vec<Stmt>> {
        let (tokens, scan_errors) = scan_tokens(source);
        diagnostics.extend(scan_errors);

        let statements: Vec<Stmt> = Parser::new(&tokens, &mut self.ids).parse(diagnostics);

        if diagnostics.has_errors() {
            info!("Stopping before resolution: static errors");
            return None;
        }

        Some(statements)
    }

    /// Scan, parse, resolve and execute `source`.  Every diagnostic met on
    /// the way, including the runtime error if execution got that far, is
    /// returned; warnings never prevent execution.
    pub fn run(&mut self, source: &[u8]) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        let Some(statements) = self.parse(source, &mut diagnostics) else {
            return diagnostics;
        };

        Resolver::new(&mut self.interpreter).resolve(&statements, &mut diagnostics);

        if diagnostics.has_errors() {
            info!("Stopping before execution: resolution errors");
            return diagnostics;
        }

        let outcome = self.interpreter.interpret(&statements);
        diagnostics.extend(self.interpreter.take_notices());

        if let Err(err) = outcome {
            diagnostics.report(err);
        }

        diagnostics
    }
}
