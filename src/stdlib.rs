//! Host functions exposed to scripts.
//!
//! Libraries are grouped by namespace (`std::math`, `std::str`, `std::io`)
//! in a compile-time `phf` registry.  Every member, plus `clock`, is also
//! preloaded into the global frame; `use std::math::max;` re-binds a single
//! name from the registry.

use std::io::{self, BufRead};
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};
use phf::phf_map;

use crate::environment::EnvRef;
use crate::interpreter::Interpreter;
use crate::value::{Arity, NativeFunction, Value};

pub const CLOCK: NativeFunction = NativeFunction {
    name: "clock",
    arity: Arity::Fixed(0),
    func: clock,
};

const MATH: &[NativeFunction] = &[
    NativeFunction {
        name: "max",
        arity: Arity::Variadic,
        func: math_max,
    },
    NativeFunction {
        name: "min",
        arity: Arity::Variadic,
        func: math_min,
    },
];

const STR: &[NativeFunction] = &[
    NativeFunction {
        name: "len",
        arity: Arity::Fixed(1),
        func: str_len,
    },
    NativeFunction {
        name: "substr",
        arity: Arity::Fixed(3),
        func: str_substr,
    },
    NativeFunction {
        name: "concat",
        arity: Arity::Fixed(2),
        func: str_concat,
    },
    NativeFunction {
        name: "split",
        arity: Arity::Fixed(2),
        func: str_split,
    },
    NativeFunction {
        name: "replace",
        arity: Arity::Fixed(3),
        func: str_replace,
    },
];

const IO: &[NativeFunction] = &[NativeFunction {
    name: "cin",
    arity: Arity::Fixed(0),
    func: io_cin,
}];

static LIBRARIES: phf::Map<&'static str, &'static [NativeFunction]> = phf_map! {
    "std::math" => MATH,
    "std::str"  => STR,
    "std::io"   => IO,
};

/// Find `name` inside the library registered under `namespace`.
pub fn lookup(namespace: &str, name: &str) -> Option<NativeFunction> {
    LIBRARIES
        .get(namespace)
        .and_then(|members| members.iter().find(|native| native.name == name))
        .copied()
}

/// Define `clock` and every library member in `globals`.
pub fn preload(globals: &EnvRef) {
    let mut env = globals.borrow_mut();

    env.define(CLOCK.name, Value::Native(CLOCK));

    for (namespace, members) in LIBRARIES.entries() {
        debug!("Preloading {} member(s) of '{}'", members.len(), namespace);
        for native in members.iter() {
            env.define(native.name, Value::Native(*native));
        }
    }
}

fn clock(_: &mut Interpreter, _: &[Value]) -> Result<Value, String> {
    let timestamp: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
        .as_secs_f64();
    info!("Native function 'clock' returned: {}", timestamp);
    Ok(Value::Number(timestamp))
}

fn number(args: &[Value], index: usize, func: &str) -> Result<f64, String> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(format!(
            "Argument {} of '{}' must be a number, got {}.",
            index + 1,
            func,
            other.type_name()
        )),
        None => Err(format!("Missing argument {} of '{}'.", index + 1, func)),
    }
}

fn string<'a>(args: &'a [Value], index: usize, func: &str) -> Result<&'a str, String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(format!(
            "Argument {} of '{}' must be a string, got {}.",
            index + 1,
            func,
            other.type_name()
        )),
        None => Err(format!("Missing argument {} of '{}'.", index + 1, func)),
    }
}

/// Fold one or more numeric arguments with `pick`.
fn extremum(args: &[Value], func: &str, pick: fn(f64, f64) -> f64) -> Result<Value, String> {
    let mut best: f64 = number(args, 0, func)?;
    for index in 1..args.len() {
        best = pick(best, number(args, index, func)?);
    }
    Ok(Value::Number(best))
}

fn math_max(_: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    extremum(args, "max", f64::max)
}

fn math_min(_: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    extremum(args, "min", f64::min)
}

/// Character count of a string, element count of an array.
fn str_len(_: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    match args.first() {
        Some(Value::Array(items)) => Ok(Value::Number(items.len() as f64)),
        Some(Value::String(s)) => Ok(Value::Number(s.chars().count() as f64)),
        Some(other) => Err(format!(
            "Argument 1 of 'len' must be a string or an array, got {}.",
            other.type_name()
        )),
        None => Err("Missing argument 1 of 'len'.".to_string()),
    }
}

/// `substr(s, start, end)`: characters in `[start, end)`.
fn str_substr(_: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    let text: &str = string(args, 0, "substr")?;
    let start: f64 = number(args, 1, "substr")?.trunc();
    let end: f64 = number(args, 2, "substr")?.trunc();
    let len: usize = text.chars().count();

    if start < 0.0 || end < start || end > len as f64 {
        return Err(format!(
            "Substring range {}..{} out of bounds for string of length {}.",
            start, end, len
        ));
    }

    let taken: String = text
        .chars()
        .skip(start as usize)
        .take((end - start) as usize)
        .collect();
    Ok(Value::String(taken))
}

fn str_concat(_: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    let mut joined: String = string(args, 0, "concat")?.to_string();
    joined.push_str(string(args, 1, "concat")?);
    Ok(Value::String(joined))
}

/// Split on a literal separator; an empty separator yields single characters.
fn str_split(_: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    let text: &str = string(args, 0, "split")?;
    let separator: &str = string(args, 1, "split")?;

    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(separator)
            .map(|part| Value::String(part.to_string()))
            .collect()
    };

    Ok(Value::Array(Rc::new(parts)))
}

fn str_replace(_: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    let text: &str = string(args, 0, "replace")?;
    let from: &str = string(args, 1, "replace")?;
    let to: &str = string(args, 2, "replace")?;

    if from.is_empty() {
        return Ok(Value::String(text.to_string()));
    }
    Ok(Value::String(text.replace(from, to)))
}

/// First word of the next non-blank stdin line, `nil` at end of input.
fn io_cin(_: &mut Interpreter, _: &[Value]) -> Result<Value, String> {
    let stdin = io::stdin();
    let mut line: String = String::new();

    loop {
        line.clear();
        let read: usize = stdin
            .lock()
            .read_line(&mut line)
            .map_err(|e| format!("Could not read input: {}", e))?;

        if read == 0 {
            return Ok(Value::Nil);
        }

        if let Some(word) = line.split_whitespace().next() {
            return Ok(Value::String(word.to_string()));
        }
    }
}
