use crate::any::{Any, AnyValue};

use super::{truthy, Environment, ScriptError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Complement,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Concat,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AssignCreate,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

/// Parsed expression tree. Evaluation yields an [`Any`]; the only side
/// effect is `Assignment`, which writes the blackboard entry named by its
/// left-hand side.
#[derive(Debug, Clone)]
pub enum Ast {
    Literal(Any),
    Name(String),
    Unary {
        op: UnaryOp,
        expr: Box<Ast>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    Logic {
        op: LogicOp,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    /// Chained comparison: all adjacent pairs must hold, left to right.
    Comparison {
        first: Box<Ast>,
        rest: Vec<(CompareOp, Ast)>,
    },
    Ternary {
        condition: Box<Ast>,
        then_branch: Box<Ast>,
        else_branch: Box<Ast>,
    },
    Assignment {
        name: String,
        op: AssignOp,
        rhs: Box<Ast>,
    },
}

impl Ast {
    pub fn eval(&self, env: &mut Environment) -> Result<Any, ScriptError> {
        match self {
            Ast::Literal(value) => Ok(value.clone()),
            Ast::Name(name) => eval_name(name, env),
            Ast::Unary { op, expr } => {
                let value = expr.eval(env)?;
                eval_unary(*op, &value)
            }
            Ast::Binary { op, lhs, rhs } => {
                let lhs = lhs.eval(env)?;
                let rhs = rhs.eval(env)?;
                eval_binary(*op, &lhs, &rhs)
            }
            Ast::Logic { op, lhs, rhs } => {
                let lhs = truthy(&lhs.eval(env)?)?;
                let result = match op {
                    LogicOp::And => lhs && truthy(&rhs.eval(env)?)?,
                    LogicOp::Or => lhs || truthy(&rhs.eval(env)?)?,
                };
                Ok(Any::new(result))
            }
            Ast::Comparison { first, rest } => {
                let mut lhs = first.eval(env)?;
                for (op, operand) in rest.iter() {
                    let rhs = operand.eval(env)?;
                    if !compare(*op, &lhs, &rhs)? {
                        return Ok(Any::new(false));
                    }
                    lhs = rhs;
                }
                Ok(Any::new(true))
            }
            Ast::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if truthy(&condition.eval(env)?)? {
                    then_branch.eval(env)
                } else {
                    else_branch.eval(env)
                }
            }
            Ast::Assignment { name, op, rhs } => eval_assignment(name, *op, rhs, env),
        }
    }
}

fn eval_name(name: &str, env: &mut Environment) -> Result<Any, ScriptError> {
    // The enum registry shadows the blackboard
    if let Some(value) = env.enums.lock().unwrap().get(name) {
        return Ok(Any::new(*value));
    }

    match env.blackboard.entry(name) {
        Some(entry) => {
            let locked = entry.lock().unwrap();
            if locked.value.is_empty() {
                Err(ScriptError::Uninitialized(name.to_string()))
            } else {
                Ok(locked.value.clone())
            }
        }
        None => Err(ScriptError::VariableNotFound(name.to_string())),
    }
}

fn eval_unary(op: UnaryOp, value: &Any) -> Result<Any, ScriptError> {
    match op {
        UnaryOp::Negate => match value.value() {
            AnyValue::Int(v) => v
                .checked_neg()
                .map(Any::new)
                .ok_or(ScriptError::Overflow),
            AnyValue::Float(v) => Ok(Any::new(-v)),
            AnyValue::Uint(_) | AnyValue::Bool(_) => {
                let wide = value.to_i64()?;
                wide.checked_neg().map(Any::new).ok_or(ScriptError::Overflow)
            }
            _ => Err(ScriptError::TypeError(
                "unary minus needs a numeric operand".to_string(),
            )),
        },
        UnaryOp::Complement => Ok(Any::new(!value.to_i64()?)),
        UnaryOp::Not => Ok(Any::new(!truthy(value)?)),
    }
}

fn eval_binary(op: BinaryOp, lhs: &Any, rhs: &Any) -> Result<Any, ScriptError> {
    match op {
        BinaryOp::Concat => {
            let mut text = lhs.to_display_string()?;
            text.push_str(&rhs.to_display_string()?);
            Ok(Any::new(text))
        }
        BinaryOp::Add => {
            if let (AnyValue::Str(a), AnyValue::Str(b)) = (lhs.value(), rhs.value()) {
                return Ok(Any::new(format!("{a}{b}")));
            }
            numeric_arith(op, lhs, rhs)
        }
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => numeric_arith(op, lhs, rhs),
        BinaryOp::BitAnd => Ok(Any::new(lhs.to_i64()? & rhs.to_i64()?)),
        BinaryOp::BitOr => Ok(Any::new(lhs.to_i64()? | rhs.to_i64()?)),
        BinaryOp::BitXor => Ok(Any::new(lhs.to_i64()? ^ rhs.to_i64()?)),
    }
}

fn numeric_arith(op: BinaryOp, lhs: &Any, rhs: &Any) -> Result<Any, ScriptError> {
    let float_side = matches!(lhs.value(), AnyValue::Float(_))
        || matches!(rhs.value(), AnyValue::Float(_));

    if float_side {
        let a = lhs.to_f64()?;
        let b = rhs.to_f64()?;
        let result = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => {
                if b == 0.0 {
                    return Err(ScriptError::DivisionByZero);
                }
                a / b
            }
            _ => unreachable!(),
        };
        return Ok(Any::new(result));
    }

    let a = lhs.to_i64()?;
    let b = rhs.to_i64()?;
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(ScriptError::DivisionByZero);
            }
            a.checked_div(b)
        }
        _ => unreachable!(),
    };
    result.map(Any::new).ok_or(ScriptError::Overflow)
}

/// Two floats compare equal within `f32` machine epsilon; integers compare
/// exactly. Strings compare with strings lexicographically; a string
/// compared against a number is coerced numerically when it parses, and a
/// non-numeric string is simply unequal (ordering it is an error).
pub(crate) fn compare(op: CompareOp, lhs: &Any, rhs: &Any) -> Result<bool, ScriptError> {
    use AnyValue::*;

    let numeric =
        |v: &AnyValue| matches!(v, Int(_) | Uint(_) | Float(_) | Bool(_));

    match (lhs.value(), rhs.value()) {
        (Str(a), Str(b)) => Ok(match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Gt => a > b,
            CompareOp::Le => a <= b,
            CompareOp::Ge => a >= b,
        }),
        (a, b) if numeric(a) && numeric(b) => {
            if matches!(a, Float(_)) || matches!(b, Float(_)) {
                Ok(float_compare(op, lhs.to_f64()?, rhs.to_f64()?))
            } else {
                let x = wide_int(a);
                let y = wide_int(b);
                Ok(match op {
                    CompareOp::Eq => x == y,
                    CompareOp::Ne => x != y,
                    CompareOp::Lt => x < y,
                    CompareOp::Gt => x > y,
                    CompareOp::Le => x <= y,
                    CompareOp::Ge => x >= y,
                })
            }
        }
        (Str(_), b) if numeric(b) => match lhs.try_cast::<f64>() {
            Ok(x) => Ok(float_compare(op, x, rhs.to_f64()?)),
            Err(_) => unparsable_mixed(op),
        },
        (a, Str(_)) if numeric(a) => match rhs.try_cast::<f64>() {
            Ok(y) => Ok(float_compare(op, lhs.to_f64()?, y)),
            Err(_) => unparsable_mixed(op),
        },
        _ => Err(ScriptError::TypeError(
            "operands cannot be compared".to_string(),
        )),
    }
}

fn float_compare(op: CompareOp, x: f64, y: f64) -> bool {
    let eq = (x - y).abs() <= f32::EPSILON as f64;
    match op {
        CompareOp::Eq => eq,
        CompareOp::Ne => !eq,
        CompareOp::Lt => x < y,
        CompareOp::Gt => x > y,
        CompareOp::Le => x < y || eq,
        CompareOp::Ge => x > y || eq,
    }
}

/// A string that does not parse as a number is unequal to every number.
fn unparsable_mixed(op: CompareOp) -> Result<bool, ScriptError> {
    match op {
        CompareOp::Eq => Ok(false),
        CompareOp::Ne => Ok(true),
        _ => Err(ScriptError::TypeError(
            "cannot order a non-numeric string against a number".to_string(),
        )),
    }
}

fn wide_int(value: &AnyValue) -> i128 {
    match value {
        AnyValue::Int(v) => *v as i128,
        AnyValue::Uint(v) => *v as i128,
        AnyValue::Bool(v) => *v as i128,
        _ => 0,
    }
}

fn eval_assignment(
    name: &str,
    op: AssignOp,
    rhs: &Ast,
    env: &mut Environment,
) -> Result<Any, ScriptError> {
    let value = rhs.eval(env)?;

    match op {
        AssignOp::AssignCreate => {
            env.blackboard.set_any(name, value.clone())?;
            Ok(value)
        }
        AssignOp::Assign => {
            if env.blackboard.entry(name).is_none() {
                return Err(ScriptError::VariableNotFound(name.to_string()));
            }
            env.blackboard.set_any(name, value.clone())?;
            Ok(value)
        }
        AssignOp::AddAssign | AssignOp::SubAssign | AssignOp::MulAssign | AssignOp::DivAssign => {
            let entry = env
                .blackboard
                .entry(name)
                .ok_or_else(|| ScriptError::VariableNotFound(name.to_string()))?;
            let current = {
                let locked = entry.lock().unwrap();
                if locked.value.is_empty() {
                    return Err(ScriptError::Uninitialized(name.to_string()));
                }
                locked.value.clone()
            };

            let new_value = if matches!(current.value(), AnyValue::Str(_))
                && op == AssignOp::AddAssign
            {
                // `+=` on a string entry appends
                eval_binary(BinaryOp::Add, &current, &value)?
            } else {
                let arith_op = match op {
                    AssignOp::AddAssign => BinaryOp::Add,
                    AssignOp::SubAssign => BinaryOp::Sub,
                    AssignOp::MulAssign => BinaryOp::Mul,
                    AssignOp::DivAssign => BinaryOp::Div,
                    _ => unreachable!(),
                };
                numeric_arith(arith_op, &current, &value)?
            };

            env.blackboard.set_any(name, new_value.clone())?;
            Ok(new_value)
        }
    }
}
