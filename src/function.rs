use std::fmt;
use std::rc::Rc;

use log::{debug, info};

use crate::class::LoxInstance;
use crate::environment::{EnvRef, Environment};
use crate::interpreter::{IResult, InterpretError, Interpreter};
use crate::stmt::FunctionDecl;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// A user-defined function or method together with the environment it
/// closed over.
#[derive(Clone)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
    is_initializer: bool,
}

impl fmt::Debug for LoxFunction {
    // The closure may reach back to this very function; never print it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.declaration.name.lexeme)
            .field("arity", &self.arity())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this function whose closure is a fresh child frame with
    /// `this` bound to `instance`.
    pub fn bind(&self, instance: &Rc<LoxInstance>) -> LoxFunction {
        debug!("Binding method '{}' to instance", self.name());

        let env: EnvRef = Environment::child_of(&self.closure);
        env.borrow_mut()
            .define("this", Value::Instance(Rc::clone(instance)));

        LoxFunction::new(Rc::clone(&self.declaration), env, self.is_initializer)
    }

    /// Run the body in a new frame holding the parameters. Arity has
    /// already been checked by the caller.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> IResult<Value> {
        debug!(
            "Calling '{}' with {} argument(s)",
            self.name(),
            arguments.len()
        );

        let mut frame: Environment = Environment::with_enclosing(Rc::clone(&self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            frame.define(&param.lexeme, argument);
        }

        match interpreter.execute_block(&self.declaration.body, frame) {
            Ok(()) => {
                if self.is_initializer {
                    self.bound_this()
                } else {
                    Ok(Value::Nil)
                }
            }

            Err(InterpretError::Return(value)) => {
                info!("Function '{}' returned: {}", self.name(), value);
                Ok(value)
            }

            Err(other) => Err(other),
        }
    }

    fn bound_this(&self) -> IResult<Value> {
        let this: Token = Token::synthetic(TokenType::THIS, "this", &self.declaration.name);

        Environment::get_at(&self.closure, 0, &this).map_err(InterpretError::Runtime)
    }
}
