//! The embedded scripting sublanguage used by pre/post conditions, the
//! `Script`/`ScriptCondition` leaves and the `Precondition` decorator.
//!
//! A script is one or more `;`-separated expressions over blackboard entries
//! and registered enums. Precedence, low to high: assignment, ternary,
//! `||`, `&&`, `..` (string concat), `|`/`^`, `&`, chained comparisons,
//! additive, multiplicative, unary.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use thiserror::Error;

use crate::{
    any::{Any, AnyValue, CastError},
    blackboard::{Blackboard, BlackboardError},
};

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::Ast;

/// Registered scripting enums: identifier to integer value.
pub type EnumsTable = HashMap<String, i64>;
pub type EnumsTablePtr = Arc<Mutex<EnumsTable>>;

pub fn new_enums_table() -> EnumsTablePtr {
    // `true` and `false` are ordinary enums as far as the grammar cares
    let mut table = EnumsTable::new();
    table.insert("true".to_string(), 1);
    table.insert("false".to_string(), 0);
    Arc::new(Mutex::new(table))
}

/// What a script evaluates against.
pub struct Environment {
    pub blackboard: Blackboard,
    pub enums: EnumsTablePtr,
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script parse error: {0}")]
    Parse(String),
    #[error("variable [{0}] not found")]
    VariableNotFound(String),
    #[error("variable [{0}] was never initialised")]
    Uninitialized(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("type error: {0}")]
    TypeError(String),
    #[error(transparent)]
    Blackboard(#[from] BlackboardError),
    #[error(transparent)]
    Cast(#[from] CastError),
}

/// Boolean coercion: a string is true iff non-empty, a number is true iff
/// non-zero.
pub fn truthy(value: &Any) -> Result<bool, ScriptError> {
    match value.value() {
        AnyValue::Bool(v) => Ok(*v),
        AnyValue::Int(v) => Ok(*v != 0),
        AnyValue::Uint(v) => Ok(*v != 0),
        AnyValue::Float(v) => Ok(*v != 0.0),
        AnyValue::Str(v) => Ok(!v.is_empty()),
        AnyValue::Empty | AnyValue::Custom(_) => Err(ScriptError::TypeError(
            "value cannot be used as a condition".to_string(),
        )),
    }
}

/// A compiled script. Cheap to clone; the program is shared.
#[derive(Debug, Clone)]
pub struct Script {
    source: String,
    program: Arc<Vec<Ast>>,
}

impl Script {
    pub fn parse(source: impl AsRef<str>) -> Result<Script, ScriptError> {
        let source = source.as_ref().to_string();
        let program = parser::parse_program(&source)?;
        Ok(Script {
            source,
            program: Arc::new(program),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate every statement; the value of the last one is returned.
    pub fn run(&self, env: &mut Environment) -> Result<Any, ScriptError> {
        let mut result = Any::empty();
        for statement in self.program.iter() {
            result = statement.eval(env)?;
        }
        Ok(result)
    }

    /// Evaluate and coerce the result to a boolean.
    pub fn run_condition(&self, env: &mut Environment) -> Result<bool, ScriptError> {
        truthy(&self.run(env)?)
    }
}
