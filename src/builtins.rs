//! Canonical object representations: the members every kind of value exposes.
//!
//! Member tables are plain name lists. A looked-up method is a
//! `FunctionKind::Builtin` carrying only its name; calling it dispatches on
//! the receiver, so the same `toString` behaves per kind.

use std::rc::Rc;

use crate::deferred::Deferred;
use crate::errors::Fault;
use crate::property;
use crate::value::{format_number, join_array, Function, PropertyKey, Value};

type Members = &'static [(&'static str, usize)];

const OBJECT_MEMBERS: Members = &[
    ("hasOwnProperty", 1),
    ("isPrototypeOf", 1),
    ("toLocaleString", 0),
    ("toString", 0),
    ("valueOf", 0),
];

const NUMBER_MEMBERS: Members = &[("toFixed", 1), ("toString", 1), ("valueOf", 0)];

const STRING_MEMBERS: Members = &[
    ("at", 1),
    ("charAt", 1),
    ("concat", 1),
    ("endsWith", 1),
    ("includes", 1),
    ("indexOf", 1),
    ("repeat", 1),
    ("slice", 2),
    ("split", 1),
    ("startsWith", 1),
    ("toLowerCase", 0),
    ("toString", 0),
    ("toUpperCase", 0),
    ("trim", 0),
    ("valueOf", 0),
];

const BOOLEAN_MEMBERS: Members = &[("toString", 0), ("valueOf", 0)];

const SYMBOL_MEMBERS: Members = &[("toString", 0), ("valueOf", 0)];

const ARRAY_MEMBERS: Members = &[
    ("at", 1),
    ("concat", 1),
    ("entries", 0),
    ("filter", 1),
    ("includes", 1),
    ("indexOf", 1),
    ("join", 1),
    ("keys", 0),
    ("map", 1),
    ("pop", 0),
    ("push", 1),
    ("reverse", 0),
    ("slice", 2),
    ("toString", 0),
    ("values", 0),
];

const SET_MEMBERS: Members = &[
    ("add", 1),
    ("clear", 0),
    ("delete", 1),
    ("entries", 0),
    ("has", 1),
    ("keys", 0),
    ("values", 0),
];

const MAP_MEMBERS: Members = &[
    ("clear", 0),
    ("delete", 1),
    ("entries", 0),
    ("get", 1),
    ("has", 1),
    ("keys", 0),
    ("set", 2),
    ("values", 0),
];

const FUNCTION_MEMBERS: Members = &[("apply", 2), ("bind", 1), ("call", 1), ("toString", 0)];

const PROMISE_MEMBERS: Members = &[("catch", 1), ("finally", 1), ("then", 2)];

/// Method table of the value's own kind, not counting the object prototype
fn kind_members(value: &Value) -> Members {
    match value {
        Value::Undefined | Value::Null | Value::Object(_) => &[],
        Value::Bool(_) => BOOLEAN_MEMBERS,
        Value::Number(_) => NUMBER_MEMBERS,
        Value::String(_) => STRING_MEMBERS,
        Value::Symbol(_) => SYMBOL_MEMBERS,
        Value::Array(_) => ARRAY_MEMBERS,
        Value::Set(_) => SET_MEMBERS,
        Value::Map(_) => MAP_MEMBERS,
        Value::Function(_) => FUNCTION_MEMBERS,
        Value::Deferred(_) => PROMISE_MEMBERS,
    }
}

fn intrinsic_names(value: &Value) -> &'static [&'static str] {
    match value {
        Value::String(_) | Value::Array(_) => &["length"],
        Value::Set(_) | Value::Map(_) => &["size"],
        Value::Symbol(_) => &["description"],
        Value::Function(_) => &["name", "length"],
        _ => &[],
    }
}

/// Data members computed from the value itself
fn intrinsic(value: &Value, key: &PropertyKey) -> Option<Value> {
    match (value, key) {
        (Value::String(s), PropertyKey::Index(i)) => s.chars().nth(*i).map(|c| Value::from(c.to_string())),
        (Value::Array(items), PropertyKey::Index(i)) => items.borrow().get(*i).cloned(),
        (_, PropertyKey::Name(name)) => match (value, &**name) {
            (Value::String(s), "length") => Some(Value::from(s.chars().count())),
            (Value::Array(items), "length") => Some(Value::from(items.borrow().len())),
            (Value::Set(items), "size") => Some(Value::from(items.borrow().len())),
            (Value::Map(pairs), "size") => Some(Value::from(pairs.borrow().len())),
            (Value::Symbol(symbol), "description") => {
                Some(symbol.description().map_or(Value::Undefined, Value::from))
            }
            (Value::Function(f), "name") => Some(Value::from(f.name())),
            (Value::Function(f), "length") => Some(Value::from(f.arity())),
            _ => None,
        },
        _ => None,
    }
}

/// Find a canonical member of `value`. Own properties of objects are the
/// caller's business; this covers everything the kind itself provides.
pub(crate) fn lookup(value: &Value, key: &PropertyKey) -> Option<Value> {
    if value.is_absent() {
        return None;
    }
    if let Some(member) = intrinsic(value, key) {
        return Some(member);
    }
    let name = key.name()?;
    kind_members(value)
        .iter()
        .chain(OBJECT_MEMBERS)
        .find(|(member, _)| *member == name)
        .map(|&(member, arity)| Value::Function(Rc::new(Function::builtin(member, arity))))
}

/// Every canonical member name of `value`, kind members before object members
pub(crate) fn member_names(value: &Value) -> Vec<&'static str> {
    if value.is_absent() {
        return Vec::new();
    }
    let mut names: Vec<&'static str> = intrinsic_names(value).to_vec();
    for &(name, _) in kind_members(value).iter().chain(OBJECT_MEMBERS) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// True if `key` is an own data member of a non-object value (`length`, indices)
fn has_intrinsic(value: &Value, key: &PropertyKey) -> bool {
    intrinsic(value, key).is_some()
}

// ============================================================================
// Dispatch
// ============================================================================

/// Call builtin `name` with `this` as the receiver
pub(crate) fn apply(name: &str, this: &Value, args: &[Value]) -> Result<Value, Fault> {
    let result = match this {
        Value::Undefined | Value::Null => {
            return Err(Fault::TypeError(format!("{} called on {}", name, this)));
        }
        Value::Number(n) => number_method(name, *n, args),
        Value::String(s) => string_method(name, s, args),
        Value::Bool(b) => boolean_method(name, *b),
        Value::Symbol(_) => symbol_method(name, this),
        Value::Array(_) => array_method(name, this, args),
        Value::Set(_) => set_method(name, this, args),
        Value::Map(_) => map_method(name, this, args),
        Value::Function(f) => function_method(name, f, args),
        Value::Deferred(d) => promise_method(name, d, args),
        Value::Object(_) => None,
    };
    match result {
        Some(result) => result,
        None => object_method(name, this, args),
    }
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

/// Integer argument; `undefined` takes the default
fn int_arg(args: &[Value], index: usize, default: i64) -> Result<i64, Fault> {
    match args.get(index) {
        None | Some(Value::Undefined) => Ok(default),
        Some(Value::Number(n)) if n.is_nan() => Ok(0),
        Some(Value::Number(n)) => Ok(n.trunc() as i64),
        Some(other) => Err(Fault::TypeError(format!(
            "expected a number, got {}",
            other.type_name()
        ))),
    }
}

fn callable_arg(args: &[Value], index: usize, method: &str) -> Result<Rc<Function>, Fault> {
    match args.get(index) {
        Some(Value::Function(f)) => Ok(Rc::clone(f)),
        other => Err(Fault::TypeError(format!(
            "{}: {} is not a function",
            method,
            other.map_or("undefined", Value::type_name)
        ))),
    }
}

fn optional_callable(args: &[Value], index: usize) -> Option<Rc<Function>> {
    args.get(index).and_then(Value::as_function).cloned()
}

/// Resolve a possibly negative position against `len`, clamped to `0..=len`
fn relative_index(position: i64, len: usize) -> usize {
    if position < 0 {
        (len as i64 + position).max(0) as usize
    } else {
        (position as usize).min(len)
    }
}

// ============================================================================
// Object prototype
// ============================================================================

fn object_method(name: &str, this: &Value, args: &[Value]) -> Result<Value, Fault> {
    match name {
        "hasOwnProperty" => {
            let key = arg(args, 0).to_property_key();
            let own = match this {
                Value::Object(object) => object.has_own(&key),
                other => has_intrinsic(other, &key),
            };
            Ok(Value::Bool(own))
        }
        "isPrototypeOf" => match (this, &arg(args, 0)) {
            (Value::Object(proto), Value::Object(candidate)) => {
                Ok(Value::Bool(proto.is_prototype_of(candidate)))
            }
            _ => Ok(Value::Bool(false)),
        },
        "toLocaleString" => {
            let to_string = property::read_property(this, &PropertyKey::from("toString"))?;
            match to_string {
                Value::Function(f) => f.call(this, &[]),
                other => Err(Fault::TypeError(format!(
                    "toString is not a function ({})",
                    other.type_name()
                ))),
            }
        }
        "toString" => Ok(Value::from(format!("[object {}]", tag(this)))),
        "valueOf" => Ok(this.clone()),
        _ => Err(Fault::TypeError(format!(
            "{} is not a method of {}",
            name,
            this.type_name()
        ))),
    }
}

fn tag(value: &Value) -> &'static str {
    match value {
        Value::Undefined => "Undefined",
        Value::Null => "Null",
        Value::Bool(_) => "Boolean",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Symbol(_) => "Symbol",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
        Value::Function(_) => "Function",
        Value::Set(_) => "Set",
        Value::Map(_) => "Map",
        Value::Deferred(_) => "Promise",
    }
}

// ============================================================================
// Primitives
// ============================================================================

fn number_method(name: &str, n: f64, args: &[Value]) -> Option<Result<Value, Fault>> {
    let result = match name {
        "toFixed" => to_fixed(n, args),
        "toString" => to_radix_string(n, args),
        "valueOf" => Ok(Value::Number(n)),
        _ => return None,
    };
    Some(result)
}

fn to_fixed(n: f64, args: &[Value]) -> Result<Value, Fault> {
    let digits = int_arg(args, 0, 0)?;
    if !(0..=100).contains(&digits) {
        return Err(Fault::RangeError(
            "toFixed() digits argument must be between 0 and 100".into(),
        ));
    }
    if !n.is_finite() {
        return Ok(Value::from(format_number(n)));
    }
    // -0 renders as 0
    let n = if n == 0.0 { 0.0 } else { n };
    Ok(Value::from(format!("{:.*}", digits as usize, n)))
}

fn to_radix_string(n: f64, args: &[Value]) -> Result<Value, Fault> {
    let radix = int_arg(args, 0, 10)?;
    if !(2..=36).contains(&radix) {
        return Err(Fault::RangeError(
            "toString() radix must be between 2 and 36".into(),
        ));
    }
    if radix == 10 || !n.is_finite() || n.fract() != 0.0 {
        return Ok(Value::from(format_number(n)));
    }

    let negative = n < 0.0;
    let mut magnitude = n.abs() as u64;
    let mut digits = Vec::new();
    loop {
        let digit = (magnitude % radix as u64) as u32;
        digits.push(std::char::from_digit(digit, radix as u32).unwrap_or('?'));
        magnitude /= radix as u64;
        if magnitude == 0 {
            break;
        }
    }
    if negative {
        digits.push('-');
    }
    Ok(Value::from(digits.into_iter().rev().collect::<String>()))
}

fn string_method(name: &str, s: &Rc<str>, args: &[Value]) -> Option<Result<Value, Fault>> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let result = match name {
        "at" => int_arg(args, 0, 0).map(|i| {
            let index = if i < 0 { len as i64 + i } else { i };
            usize::try_from(index)
                .ok()
                .and_then(|i| chars.get(i))
                .map_or(Value::Undefined, |c| Value::from(c.to_string()))
        }),
        "charAt" => int_arg(args, 0, 0).map(|i| {
            usize::try_from(i)
                .ok()
                .and_then(|i| chars.get(i))
                .map_or(Value::from(""), |c| Value::from(c.to_string()))
        }),
        "concat" => {
            let mut out = s.to_string();
            for a in args {
                out.push_str(&a.to_string());
            }
            Ok(Value::from(out))
        }
        "endsWith" => Ok(Value::Bool(s.ends_with(&*arg(args, 0).to_string()))),
        "includes" => Ok(Value::Bool(s.contains(&*arg(args, 0).to_string()))),
        "indexOf" => {
            let needle = arg(args, 0).to_string();
            let position = s
                .find(&*needle)
                .map_or(-1.0, |byte| s[..byte].chars().count() as f64);
            Ok(Value::Number(position))
        }
        "repeat" => repeat(s, len, args),
        "slice" => {
            let start = int_arg(args, 0, 0).map(|i| relative_index(i, len));
            let end = int_arg(args, 1, len as i64).map(|i| relative_index(i, len));
            start.and_then(|start| {
                end.map(|end| {
                    let taken: String = chars[start..end.max(start)].iter().collect();
                    Value::from(taken)
                })
            })
        }
        "split" => Ok(match arg(args, 0) {
            Value::Undefined => Value::array([Value::String(Rc::clone(s))]),
            separator => {
                let separator = separator.to_string();
                if separator.is_empty() {
                    Value::array(chars.iter().map(|c| Value::from(c.to_string())))
                } else {
                    Value::array(s.split(&*separator).map(Value::from))
                }
            }
        }),
        "startsWith" => Ok(Value::Bool(s.starts_with(&*arg(args, 0).to_string()))),
        "toLowerCase" => Ok(Value::from(s.to_lowercase())),
        "toUpperCase" => Ok(Value::from(s.to_uppercase())),
        "trim" => Ok(Value::from(s.trim())),
        "toString" | "valueOf" => Ok(Value::String(Rc::clone(s))),
        _ => return None,
    };
    Some(result)
}

/// Longest string `repeat` will build, in characters
const MAX_STRING_LENGTH: usize = (1 << 29) - 24;

fn repeat(s: &str, len: usize, args: &[Value]) -> Result<Value, Fault> {
    if let Some(Value::Number(n)) = args.first() {
        if n.is_infinite() {
            return Err(Fault::RangeError(format!(
                "invalid count value: {}",
                format_number(*n)
            )));
        }
    }
    let count = int_arg(args, 0, 0)?;
    if count < 0 {
        return Err(Fault::RangeError(format!("invalid count value: {}", count)));
    }
    let total = usize::try_from(count).ok().and_then(|count| len.checked_mul(count));
    match total {
        Some(0) => Ok(Value::from("")),
        Some(total) if total <= MAX_STRING_LENGTH => Ok(Value::from(s.repeat(count as usize))),
        _ => Err(Fault::RangeError("invalid string length".into())),
    }
}

fn boolean_method(name: &str, b: bool) -> Option<Result<Value, Fault>> {
    match name {
        "toString" => Some(Ok(Value::from(b.to_string()))),
        "valueOf" => Some(Ok(Value::Bool(b))),
        _ => None,
    }
}

fn symbol_method(name: &str, this: &Value) -> Option<Result<Value, Fault>> {
    match name {
        "toString" => Some(Ok(Value::from(this.to_string()))),
        "valueOf" => Some(Ok(this.clone())),
        _ => None,
    }
}

// ============================================================================
// Collections
// ============================================================================

fn array_method(name: &str, this: &Value, args: &[Value]) -> Option<Result<Value, Fault>> {
    let Value::Array(items) = this else {
        return None;
    };
    // Callbacks may touch the array, so work on a snapshot
    let snapshot = items.borrow().clone();
    let len = snapshot.len();

    let result = match name {
        "at" => int_arg(args, 0, 0).map(|i| {
            let index = if i < 0 { len as i64 + i } else { i };
            usize::try_from(index)
                .ok()
                .and_then(|i| snapshot.get(i).cloned())
                .unwrap_or(Value::Undefined)
        }),
        "concat" => {
            let mut out = snapshot;
            for a in args {
                match a {
                    Value::Array(more) => out.extend(more.borrow().iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Ok(Value::from(out))
        }
        "entries" => Ok(Value::array(
            snapshot
                .into_iter()
                .enumerate()
                .map(|(i, v)| Value::array([Value::from(i), v])),
        )),
        "filter" => callable_arg(args, 0, "filter").and_then(|f| {
            let mut kept = Vec::new();
            for (i, item) in snapshot.into_iter().enumerate() {
                if f.call(&Value::Undefined, &[item.clone(), Value::from(i), this.clone()])?
                    .is_truthy()
                {
                    kept.push(item);
                }
            }
            Ok(Value::from(kept))
        }),
        "includes" => {
            let needle = arg(args, 0);
            Ok(Value::Bool(snapshot.iter().any(|v| v.same_value_zero(&needle))))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            let position = snapshot
                .iter()
                .position(|v| v.same_value_zero(&needle) && !matches!(v, Value::Number(n) if n.is_nan()));
            Ok(Value::Number(position.map_or(-1.0, |p| p as f64)))
        }
        "join" => {
            let separator = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                other => other.to_string(),
            };
            Ok(Value::from(join_array(items, &separator)))
        }
        "keys" => Ok(Value::array((0..len).map(Value::from))),
        "map" => callable_arg(args, 0, "map").and_then(|f| {
            let mut mapped = Vec::with_capacity(len);
            for (i, item) in snapshot.into_iter().enumerate() {
                mapped.push(f.call(&Value::Undefined, &[item, Value::from(i), this.clone()])?);
            }
            Ok(Value::from(mapped))
        }),
        "pop" => Ok(items.borrow_mut().pop().unwrap_or(Value::Undefined)),
        "push" => {
            let mut items = items.borrow_mut();
            items.extend(args.iter().cloned());
            Ok(Value::from(items.len()))
        }
        "reverse" => {
            items.borrow_mut().reverse();
            Ok(this.clone())
        }
        "slice" => {
            let start = int_arg(args, 0, 0).map(|i| relative_index(i, len));
            let end = int_arg(args, 1, len as i64).map(|i| relative_index(i, len));
            start.and_then(|start| end.map(|end| Value::from(snapshot[start..end.max(start)].to_vec())))
        }
        "toString" => Ok(Value::from(this.to_string())),
        "values" => Ok(Value::from(snapshot)),
        _ => return None,
    };
    Some(result)
}

fn set_method(name: &str, this: &Value, args: &[Value]) -> Option<Result<Value, Fault>> {
    let Value::Set(items) = this else {
        return None;
    };
    let result = match name {
        "add" => {
            let item = arg(args, 0);
            let mut items = items.borrow_mut();
            if !items.iter().any(|v| v.same_value_zero(&item)) {
                items.push(item);
            }
            Ok(this.clone())
        }
        "clear" => {
            items.borrow_mut().clear();
            Ok(Value::Undefined)
        }
        "delete" => {
            let item = arg(args, 0);
            let mut items = items.borrow_mut();
            let before = items.len();
            items.retain(|v| !v.same_value_zero(&item));
            Ok(Value::Bool(items.len() != before))
        }
        "entries" => Ok(Value::array(
            items
                .borrow()
                .iter()
                .map(|v| Value::array([v.clone(), v.clone()])),
        )),
        "has" => {
            let item = arg(args, 0);
            Ok(Value::Bool(items.borrow().iter().any(|v| v.same_value_zero(&item))))
        }
        "keys" | "values" => Ok(Value::from(items.borrow().clone())),
        _ => return None,
    };
    Some(result)
}

fn map_method(name: &str, this: &Value, args: &[Value]) -> Option<Result<Value, Fault>> {
    let Value::Map(pairs) = this else {
        return None;
    };
    let key = arg(args, 0);
    let result = match name {
        "clear" => {
            pairs.borrow_mut().clear();
            Ok(Value::Undefined)
        }
        "delete" => {
            let mut pairs = pairs.borrow_mut();
            let before = pairs.len();
            pairs.retain(|(k, _)| !k.same_value_zero(&key));
            Ok(Value::Bool(pairs.len() != before))
        }
        "entries" => Ok(Value::array(
            pairs
                .borrow()
                .iter()
                .map(|(k, v)| Value::array([k.clone(), v.clone()])),
        )),
        "get" => Ok(pairs
            .borrow()
            .iter()
            .find(|(k, _)| k.same_value_zero(&key))
            .map_or(Value::Undefined, |(_, v)| v.clone())),
        "has" => Ok(Value::Bool(pairs.borrow().iter().any(|(k, _)| k.same_value_zero(&key)))),
        "keys" => Ok(Value::array(pairs.borrow().iter().map(|(k, _)| k.clone()))),
        "set" => {
            let value = arg(args, 1);
            let mut pairs = pairs.borrow_mut();
            match pairs.iter_mut().find(|(k, _)| k.same_value_zero(&key)) {
                Some(slot) => slot.1 = value,
                None => pairs.push((key, value)),
            }
            Ok(this.clone())
        }
        "values" => Ok(Value::array(pairs.borrow().iter().map(|(_, v)| v.clone()))),
        _ => return None,
    };
    Some(result)
}

// ============================================================================
// Functions and Promises
// ============================================================================

fn function_method(name: &str, f: &Rc<Function>, args: &[Value]) -> Option<Result<Value, Fault>> {
    let rest = args.get(1..).unwrap_or(&[]);
    let result = match name {
        "apply" => match arg(args, 1) {
            Value::Undefined | Value::Null => f.call(&arg(args, 0), &[]),
            Value::Array(list) => {
                let list = list.borrow().clone();
                f.call(&arg(args, 0), &list)
            }
            other => Err(Fault::TypeError(format!(
                "apply: argument list must be an array, got {}",
                other.type_name()
            ))),
        },
        "bind" => Ok(Value::from(Function::bind(f, arg(args, 0), rest.to_vec()))),
        "call" => f.call(&arg(args, 0), rest),
        "toString" => Ok(Value::from(Value::Function(Rc::clone(f)).to_string())),
        _ => return None,
    };
    Some(result)
}

/// The promise operations, exposed as ordinary members of a `Value::Deferred`.
/// Non-callable handlers are ignored, as promise handlers are.
fn promise_method(name: &str, d: &Deferred, args: &[Value]) -> Option<Result<Value, Fault>> {
    let deferred = d.clone();
    let derived = match name {
        "then" => {
            let on_success = optional_callable(args, 0);
            let on_failure = optional_callable(args, 1);
            deferred.map_outcome(move |outcome| match outcome {
                Ok(value) => match &on_success {
                    Some(f) => f.call(&Value::Undefined, &[value]),
                    None => Ok(value),
                },
                Err(fault) => match &on_failure {
                    Some(f) => f.call(&Value::Undefined, &[fault.to_value()]),
                    None => Err(fault),
                },
            })
        }
        "catch" => {
            let on_failure = optional_callable(args, 0);
            deferred.map_outcome(move |outcome| match (outcome, &on_failure) {
                (Err(fault), Some(f)) => f.call(&Value::Undefined, &[fault.to_value()]),
                (outcome, _) => outcome,
            })
        }
        "finally" => {
            let on_settled = optional_callable(args, 0);
            deferred.map_outcome(move |outcome| {
                if let Some(f) = &on_settled {
                    f.call(&Value::Undefined, &[])?;
                }
                outcome
            })
        }
        _ => return None,
    };
    Some(Ok(Value::Deferred(derived)))
}
