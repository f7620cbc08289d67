//! Tree-walking evaluator for slot expressions
//!
//! The restricted evaluator is deterministic and side-effect free: it only
//! reads bindings, calls the curated function set and refuses method calls
//! and underscore attributes. The permissive evaluator adds method calls,
//! a few more functions and multi-line blocks of assignments.
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use super::ast::*;
use super::functions::{self, as_int, compare, equals};
use super::parser::{parse_block, parse_expression};
use super::value::{Datum, Proxy};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::sync::Arc;

/// Name bound to the result of a multi-line block
pub const TARGET_VARIABLE: &str = "target";

/// Name bound to the source object in permissive evaluation
pub const SOURCE_VARIABLE: &str = "src";

/// Variable bindings visible to an expression
pub trait Environment {
    /// Value bound to `name`, `None` when unbound
    fn lookup(&self, name: &str) -> Result<Option<Datum>>;

    /// Read an attribute of an object proxy
    fn resolve_attribute(&self, proxy: &Proxy, attr: &str) -> Result<Datum> {
        Ok(match proxy {
            Proxy::Resolved { object, .. } => object
                .get(attr)
                .map(Datum::from_json)
                .unwrap_or(Datum::Null),
            Proxy::Stub { .. } => Datum::Null,
        })
    }
}

/// Environment backed by a plain map
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    bindings: IndexMap<String, Datum>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every top-level key of a JSON object
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut env = Self::new();
        if let Some(map) = value.as_object() {
            for (k, v) in map {
                env.bind(k.clone(), Datum::from_json(v));
            }
        }
        env
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Datum) -> &mut Self {
        self.bindings.insert(name.into(), value);
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: Datum) -> Self {
        self.bind(name, value);
        self
    }
}

impl Environment for MapEnvironment {
    fn lookup(&self, name: &str) -> Result<Option<Datum>> {
        Ok(self.bindings.get(name).cloned())
    }
}

/// Local variables layered over a parent environment
struct Scope<'a> {
    parent: &'a dyn Environment,
    locals: IndexMap<String, Datum>,
}

impl Environment for Scope<'_> {
    fn lookup(&self, name: &str) -> Result<Option<Datum>> {
        match self.locals.get(name) {
            Some(value) => Ok(Some(value.clone())),
            None => self.parent.lookup(name),
        }
    }

    fn resolve_attribute(&self, proxy: &Proxy, attr: &str) -> Result<Datum> {
        self.parent.resolve_attribute(proxy, attr)
    }
}

/// Evaluation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    Restricted,
    Permissive,
}

/// Expression evaluator
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    mode: EvalMode,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::restricted()
    }
}

impl Evaluator {
    pub fn restricted() -> Self {
        Self {
            mode: EvalMode::Restricted,
        }
    }

    pub fn permissive() -> Self {
        Self {
            mode: EvalMode::Permissive,
        }
    }

    pub fn mode(&self) -> EvalMode {
        self.mode
    }

    /// Evaluate an expression; an unset braced variable yields null
    pub fn evaluate(&self, source: &str, env: &dyn Environment) -> Result<Datum> {
        let expr = parse_expression(source)?;
        swallow_unset(self.eval_expr(source, &expr, env))
    }

    /// Evaluate a parsed expression without swallowing unset values
    pub fn eval_expr(&self, source: &str, expr: &Expr, env: &dyn Environment) -> Result<Datum> {
        Walker {
            source,
            mode: self.mode,
            env,
        }
        .eval(expr)
    }

    /// Run a block of statements and return the value bound to `target`
    ///
    /// Only the permissive evaluator executes blocks.
    pub fn execute_block(&self, source: &str, env: &dyn Environment) -> Result<Datum> {
        if self.mode != EvalMode::Permissive {
            return Err(Error::expression(
                source,
                "multi-line blocks require unrestricted evaluation",
            ));
        }
        let statements = parse_block(source)?;
        let mut scope = Scope {
            parent: env,
            locals: IndexMap::new(),
        };
        scope
            .locals
            .insert(TARGET_VARIABLE.to_string(), Datum::Null);

        for statement in &statements {
            match statement {
                Stmt::Assign { target, value } => {
                    let result = swallow_unset(self.eval_expr(source, value, &scope))?;
                    scope.locals.insert(target.clone(), result);
                }
                Stmt::Expr(expr) => {
                    swallow_unset(self.eval_expr(source, expr, &scope))?;
                }
            }
        }
        Ok(scope
            .locals
            .swap_remove(TARGET_VARIABLE)
            .unwrap_or(Datum::Null))
    }
}

fn swallow_unset(result: Result<Datum>) -> Result<Datum> {
    match result {
        Err(Error::UnsetValue { .. }) => Ok(Datum::Null),
        other => other,
    }
}

struct Walker<'a> {
    source: &'a str,
    mode: EvalMode,
    env: &'a dyn Environment,
}

impl Walker<'_> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::expression(self.source, message)
    }

    fn eval(&self, expr: &Expr) -> Result<Datum> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Null => Datum::Null,
                Literal::Bool(b) => Datum::Bool(*b),
                Literal::Int(i) => Datum::Int(*i),
                Literal::Float(f) => Datum::Float(*f),
                Literal::Str(s) => Datum::Str(s.clone()),
            }),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>>>()
                .map(Datum::List),
            Expr::Dict(entries) => {
                let mut map = IndexMap::new();
                for (key, value) in entries {
                    let key = match self.eval(key)? {
                        Datum::Str(s) => s,
                        Datum::Int(i) => i.to_string(),
                        other => return Err(self.error(format!("unhashable dict key {}", other))),
                    };
                    map.insert(key, self.eval(value)?);
                }
                Ok(Datum::Map(map))
            }
            Expr::Name(name) => Ok(self.env.lookup(name)?.unwrap_or(Datum::Null)),
            Expr::Braced(name) => match self.env.lookup(name)? {
                None | Some(Datum::Null) => Err(Error::UnsetValue { name: name.clone() }),
                Some(value) => Ok(value),
            },
            Expr::Attribute { object, attr } => {
                if attr.starts_with('_') {
                    return Err(self.error(format!("access to attribute '{}' is not allowed", attr)));
                }
                let top = matches!(**object, Expr::Name(_) | Expr::Braced(_));
                let value = self.eval(object)?;
                self.attribute(value, attr, top)
            }
            Expr::Subscript { object, index } => {
                let value = self.eval(object)?;
                let index = self.eval(index)?;
                self.subscript(value, index)
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                self.unary(*op, value)
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.binary(*op, left, right)
            }
            Expr::Compare { left, rest } => {
                let mut current = self.eval(left)?;
                for (op, right) in rest {
                    let right = self.eval(right)?;
                    if !self.compare(*op, &current, &right)? {
                        return Ok(Datum::Bool(false));
                    }
                    current = right;
                }
                Ok(Datum::Bool(true))
            }
            Expr::BoolOp { op, values } => {
                let mut last = Datum::Null;
                for value in values {
                    last = self.eval(value)?;
                    let stop = match op {
                        BoolOp::And => !last.truthy(),
                        BoolOp::Or => last.truthy(),
                    };
                    if stop {
                        break;
                    }
                }
                Ok(last)
            }
            Expr::Conditional { body, test, orelse } => {
                if self.eval(test)?.truthy() {
                    self.eval(body)
                } else {
                    self.eval(orelse)
                }
            }
            Expr::Call { func, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>>>()?;
                functions::call_function(func, args, self.mode == EvalMode::Permissive)
                    .map_err(|message| self.error(message))
            }
            Expr::MethodCall {
                object,
                method,
                args,
            } => {
                if self.mode != EvalMode::Permissive {
                    return Err(self.error(format!("method call '.{}()' is not allowed", method)));
                }
                if method.starts_with('_') {
                    return Err(self.error(format!("access to method '{}' is not allowed", method)));
                }
                let receiver = self.eval(object)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>>>()?;
                functions::call_method(receiver, method, args).map_err(|message| self.error(message))
            }
        }
    }

    /// Attribute access with list and compact-dict distribution
    fn attribute(&self, value: Datum, attr: &str, top: bool) -> Result<Datum> {
        match value {
            Datum::Null => Ok(Datum::Null),
            Datum::List(items) => items
                .into_iter()
                .map(|item| self.attribute(item, attr, false))
                .collect::<Result<Vec<_>>>()
                .map(Datum::List),
            Datum::Map(map) => {
                let distributes = top
                    && !map.is_empty()
                    && !map.contains_key(attr)
                    && map
                        .values()
                        .all(|v| matches!(v, Datum::Map(_) | Datum::Object(_)));
                if distributes {
                    map.into_values()
                        .map(|item| self.attribute(item, attr, false))
                        .collect::<Result<Vec<_>>>()
                        .map(Datum::List)
                } else {
                    Ok(map.get(attr).cloned().unwrap_or(Datum::Null))
                }
            }
            Datum::Object(proxy) => self.env.resolve_attribute(&proxy, attr),
            other => Err(self.error(format!(
                "'{}' object has no attribute '{}'",
                other.type_name(),
                attr
            ))),
        }
    }

    fn subscript(&self, value: Datum, index: Datum) -> Result<Datum> {
        match (value, index) {
            (Datum::Null, _) => Ok(Datum::Null),
            (Datum::List(items), Datum::Int(i)) => {
                let len = items.len() as i64;
                let idx = if i < 0 { len + i } else { i };
                if idx < 0 || idx >= len {
                    return Err(self.error("list index out of range"));
                }
                Ok(items[idx as usize].clone())
            }
            (Datum::Str(s), Datum::Int(i)) => {
                let chars: Vec<char> = s.chars().collect();
                let len = chars.len() as i64;
                let idx = if i < 0 { len + i } else { i };
                if idx < 0 || idx >= len {
                    return Err(self.error("string index out of range"));
                }
                Ok(Datum::Str(chars[idx as usize].to_string()))
            }
            (Datum::Map(map), key) => {
                let key = key.to_display_string();
                map.get(&key)
                    .cloned()
                    .ok_or_else(|| self.error(format!("key '{}' not found", key)))
            }
            (Datum::Object(proxy), Datum::Str(key)) => {
                if key.starts_with('_') {
                    return Err(self.error(format!("access to attribute '{}' is not allowed", key)));
                }
                self.env.resolve_attribute(&proxy, &key)
            }
            (value, index) => Err(self.error(format!(
                "'{}' object is not subscriptable by '{}'",
                value.type_name(),
                index.type_name()
            ))),
        }
    }

    /// Repetition count for `str * n` and `list * n`, bounded by [`MAX_REPEAT_LEN`]
    fn repeat_count(&self, len: usize, n: i64) -> Result<usize> {
        let n = usize::try_from(n.max(0)).map_err(|_| self.error("repeat count too large"))?;
        match len.checked_mul(n) {
            Some(total) if total <= MAX_REPEAT_LEN => Ok(n),
            _ => Err(self.error(format!("repeated value would exceed {} elements", MAX_REPEAT_LEN))),
        }
    }

    fn unary(&self, op: UnaryOp, value: Datum) -> Result<Datum> {
        match (op, value) {
            (UnaryOp::Not, value) => Ok(Datum::Bool(!value.truthy())),
            (UnaryOp::Neg, Datum::Int(i)) => Ok(checked(i.checked_neg(), -(i as f64))),
            (UnaryOp::Neg, Datum::Float(f)) => Ok(Datum::Float(-f)),
            (UnaryOp::Neg, Datum::Bool(b)) => Ok(Datum::Int(-(b as i64))),
            (UnaryOp::Pos, v @ (Datum::Int(_) | Datum::Float(_))) => Ok(v),
            (UnaryOp::Pos, Datum::Bool(b)) => Ok(Datum::Int(b as i64)),
            (op, value) => Err(self.error(format!(
                "bad operand type for unary {:?}: '{}'",
                op,
                value.type_name()
            ))),
        }
    }

    fn binary(&self, op: BinaryOp, left: Datum, right: Datum) -> Result<Datum> {
        let type_error = || {
            self.error(format!(
                "unsupported operand type(s) for {}: '{}' and '{}'",
                op,
                left.type_name(),
                right.type_name()
            ))
        };

        match (op, &left, &right) {
            (BinaryOp::Add, Datum::Str(a), Datum::Str(b)) => return Ok(Datum::Str(format!("{}{}", a, b))),
            (BinaryOp::Add, Datum::List(a), Datum::List(b)) => {
                return Ok(Datum::List(a.iter().chain(b.iter()).cloned().collect()))
            }
            (BinaryOp::Mul, Datum::Str(s), n) | (BinaryOp::Mul, n, Datum::Str(s)) => {
                if let Some(n) = as_int(n) {
                    let n = self.repeat_count(s.len(), n)?;
                    return Ok(Datum::Str(s.repeat(n)));
                }
                return Err(type_error());
            }
            (BinaryOp::Mul, Datum::List(items), n) | (BinaryOp::Mul, n, Datum::List(items)) => {
                if let Some(n) = as_int(n) {
                    let n = self.repeat_count(items.len(), n)?;
                    let mut out = Vec::with_capacity(items.len() * n);
                    for _ in 0..n {
                        out.extend(items.iter().cloned());
                    }
                    return Ok(Datum::List(out));
                }
                return Err(type_error());
            }
            _ => {}
        }

        if let (Some(a), Some(b)) = (as_int(&left), as_int(&right)) {
            return match op {
                BinaryOp::Add => Ok(checked(a.checked_add(b), a as f64 + b as f64)),
                BinaryOp::Sub => Ok(checked(a.checked_sub(b), a as f64 - b as f64)),
                BinaryOp::Mul => Ok(checked(a.checked_mul(b), a as f64 * b as f64)),
                BinaryOp::Div => {
                    if b == 0 {
                        return Err(self.error("division by zero"));
                    }
                    Ok(Datum::Float(a as f64 / b as f64))
                }
                BinaryOp::FloorDiv => {
                    if b == 0 {
                        return Err(self.error("integer division or modulo by zero"));
                    }
                    let Some(q) = a.checked_div(b) else {
                        return Ok(Datum::Float((a as f64 / b as f64).floor()));
                    };
                    let floor = if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q };
                    Ok(Datum::Int(floor))
                }
                BinaryOp::Mod => {
                    if b == 0 {
                        return Err(self.error("integer division or modulo by zero"));
                    }
                    // only i64::MIN % -1 overflows, and its remainder is 0
                    let r = a.checked_rem(b).unwrap_or(0);
                    Ok(Datum::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
                }
                BinaryOp::Pow => {
                    if b >= 0 {
                        let exp = u32::try_from(b).map_err(|_| self.error("exponent too large"))?;
                        Ok(checked(a.checked_pow(exp), (a as f64).powf(b as f64)))
                    } else {
                        Ok(Datum::Float((a as f64).powf(b as f64)))
                    }
                }
            };
        }

        let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
            return Err(type_error());
        };
        match op {
            BinaryOp::Add => Ok(Datum::Float(a + b)),
            BinaryOp::Sub => Ok(Datum::Float(a - b)),
            BinaryOp::Mul => Ok(Datum::Float(a * b)),
            BinaryOp::Div => {
                if b == 0.0 {
                    return Err(self.error("float division by zero"));
                }
                Ok(Datum::Float(a / b))
            }
            BinaryOp::FloorDiv => {
                if b == 0.0 {
                    return Err(self.error("float floor division by zero"));
                }
                Ok(Datum::Float((a / b).floor()))
            }
            BinaryOp::Mod => {
                if b == 0.0 {
                    return Err(self.error("float modulo"));
                }
                Ok(Datum::Float(a - b * (a / b).floor()))
            }
            BinaryOp::Pow => Ok(Datum::Float(a.powf(b))),
        }
    }

    fn compare(&self, op: CompareOp, left: &Datum, right: &Datum) -> Result<bool> {
        let ordered = |wanted: &[Ordering]| -> Result<bool> {
            let ord = compare(left, right).map_err(|message| self.error(message))?;
            Ok(wanted.contains(&ord))
        };
        match op {
            CompareOp::Eq => Ok(equals(left, right)),
            CompareOp::NotEq => Ok(!equals(left, right)),
            CompareOp::Lt => ordered(&[Ordering::Less]),
            CompareOp::LtE => ordered(&[Ordering::Less, Ordering::Equal]),
            CompareOp::Gt => ordered(&[Ordering::Greater]),
            CompareOp::GtE => ordered(&[Ordering::Greater, Ordering::Equal]),
            CompareOp::In => self.contains(right, left),
            CompareOp::NotIn => self.contains(right, left).map(|found| !found),
            CompareOp::Is => Ok(identical(left, right)),
            CompareOp::IsNot => Ok(!identical(left, right)),
        }
    }

    fn contains(&self, container: &Datum, item: &Datum) -> Result<bool> {
        match (container, item) {
            (Datum::List(items), item) => Ok(items.iter().any(|i| equals(i, item))),
            (Datum::Str(haystack), Datum::Str(needle)) => Ok(haystack.contains(needle.as_str())),
            (Datum::Map(map), key) => Ok(map.contains_key(&key.to_display_string())),
            (Datum::Null, _) => Ok(false),
            (other, _) => Err(self.error(format!(
                "argument of type '{}' is not iterable",
                other.type_name()
            ))),
        }
    }
}

/// Upper bound on the length produced by sequence repetition
const MAX_REPEAT_LEN: usize = 1 << 24;

fn checked(value: Option<i64>, fallback: f64) -> Datum {
    value.map(Datum::Int).unwrap_or(Datum::Float(fallback))
}

fn identical(a: &Datum, b: &Datum) -> bool {
    match (a, b) {
        (Datum::Null, Datum::Null) => true,
        (Datum::Bool(x), Datum::Bool(y)) => x == y,
        (Datum::Object(Proxy::Resolved { object: x, .. }), Datum::Object(Proxy::Resolved { object: y, .. })) => {
            Arc::ptr_eq(x, y)
        }
        (Datum::Null, _) | (_, Datum::Null) => false,
        _ => equals(a, b) && a.type_name() == b.type_name(),
    }
}
