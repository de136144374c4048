use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, Result};
use crate::function::LoxFunction;
use crate::token::Token;
use crate::value::Value;

/// A class value: its name, an optional superclass and its own method table.
pub struct LoxClass {
    name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort();

        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field("superclass", &self.superclass.as_ref().map(|s| s.name()))
            .field("methods", &methods)
            .finish()
    }
}

impl LoxClass {
    pub fn new(
        name: impl Into<String>,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        LoxClass {
            name: name.into(),
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Own methods first, then the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    pub fn initializer(&self) -> Option<Rc<LoxFunction>> {
        self.find_method("init")
    }

    /// Parameter count of the (possibly inherited) initializer, 0 without one.
    pub fn arity(&self) -> usize {
        self.initializer().map_or(0, |init| init.arity())
    }

    /// This class and its ancestors, root first.
    pub fn lineage(self: &Rc<Self>) -> Vec<Rc<LoxClass>> {
        let mut chain: Vec<Rc<LoxClass>> = vec![Rc::clone(self)];
        let mut current: Rc<LoxClass> = Rc::clone(self);

        while let Some(parent) = current.superclass.clone() {
            chain.push(Rc::clone(&parent));
            current = parent;
        }

        chain.reverse();
        chain
    }

    /// Own methods sorted by name, so rebinding order is deterministic.
    pub fn methods(&self) -> Vec<(&str, &Rc<LoxFunction>)> {
        let mut methods: Vec<(&str, &Rc<LoxFunction>)> = self
            .methods
            .iter()
            .map(|(name, method)| (name.as_str(), method))
            .collect();
        methods.sort_by(|a, b| a.0.cmp(b.0));
        methods
    }
}

/// An instance: a class link plus a mutable field map.
///
/// Construction copies every method of the class chain into the field map as
/// a bound function, so after `init` the fields alone answer lookups. Before
/// that rebinding, lookups fall back to the class chain.
pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl fmt::Debug for LoxInstance {
    // Fields usually hold methods bound to this instance.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<String> = self.fields.borrow().keys().cloned().collect();
        fields.sort();

        f.debug_struct("LoxInstance")
            .field("class", &self.class.name())
            .field("fields", &fields)
            .finish()
    }
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        LoxInstance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass> {
        &self.class
    }

    /// Property read: own fields, then a method bound on the fly.
    pub fn get(instance: &Rc<LoxInstance>, name: &Token) -> Result<Value> {
        if let Some(value) = instance.fields.borrow().get(&name.lexeme) {
            debug!("Field '{}' found on instance", name.lexeme);
            return Ok(value.clone());
        }

        match instance.class.find_method(&name.lexeme) {
            Some(method) => Ok(Value::Function(Rc::new(method.bind(instance)))),
            None => Err(LoxError::runtime(
                name.line,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}
