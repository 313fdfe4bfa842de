//! Runtime values: every shape a deferred value can settle to
//!
//! Reference kinds (arrays, objects, collections, functions, deferreds) share
//! their storage on clone, so a method that mutates its receiver is visible
//! through every handle to it.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::builtins;
use crate::deferred::Deferred;
use crate::errors::Fault;

/// Signature of a native function: receiver first, then the argument list
pub type NativeFn = Rc<dyn Fn(&Value, &[Value]) -> Result<Value, Fault>>;

// ============================================================================
// Symbols and Property Keys
// ============================================================================

/// A unique symbol. Two symbols are equal only if they are the same symbol.
#[derive(Clone)]
pub struct Symbol(Rc<SymbolData>);

struct SymbolData {
    description: Option<Rc<str>>,
}

impl Symbol {
    pub fn new(description: Option<&str>) -> Self {
        Self(Rc::new(SymbolData {
            description: description.map(Rc::from),
        }))
    }

    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or(""))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Address of a member: a name, a numeric index, or a symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Name(Rc<str>),
    Index(usize),
    Symbol(Symbol),
}

impl PropertyKey {
    /// The key as a member name, if it is one
    pub fn name(&self) -> Option<&str> {
        match self {
            PropertyKey::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Canonical numeric strings ("0", "12") become indices, everything else is a name
    fn parse(key: &str) -> Self {
        let canonical = key == "0"
            || (key.starts_with(|c: char| ('1'..='9').contains(&c))
                && key.chars().all(|c| c.is_ascii_digit()));
        match key.parse::<usize>() {
            Ok(index) if canonical => PropertyKey::Index(index),
            _ => PropertyKey::Name(Rc::from(key)),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(key: &str) -> Self {
        PropertyKey::parse(key)
    }
}

impl From<String> for PropertyKey {
    fn from(key: String) -> Self {
        PropertyKey::parse(&key)
    }
}

impl From<usize> for PropertyKey {
    fn from(index: usize) -> Self {
        PropertyKey::Index(index)
    }
}

impl From<Symbol> for PropertyKey {
    fn from(symbol: Symbol) -> Self {
        PropertyKey::Symbol(symbol)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Name(name) => write!(f, "{}", name),
            PropertyKey::Index(index) => write!(f, "{}", index),
            PropertyKey::Symbol(symbol) => write!(f, "{}", symbol),
        }
    }
}

// ============================================================================
// Objects
// ============================================================================

/// A shared property bag with an optional prototype
#[derive(Clone, Default)]
pub struct Object(Rc<RefCell<ObjectData>>);

#[derive(Default)]
struct ObjectData {
    /// Own properties in insertion order
    properties: Vec<(PropertyKey, Value)>,
    proto: Option<Object>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty object whose prototype is `proto`
    pub fn inheriting(proto: &Object) -> Self {
        let object = Self::new();
        object.0.borrow_mut().proto = Some(proto.clone());
        object
    }

    pub fn proto(&self) -> Option<Object> {
        self.0.borrow().proto.clone()
    }

    pub fn get_own(&self, key: &PropertyKey) -> Option<Value> {
        self.0
            .borrow()
            .properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn has_own(&self, key: &PropertyKey) -> bool {
        self.0.borrow().properties.iter().any(|(k, _)| k == key)
    }

    /// Set an own property, replacing an existing one in place
    pub fn set(&self, key: impl Into<PropertyKey>, value: Value) {
        let key = key.into();
        let mut data = self.0.borrow_mut();
        match data.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => data.properties.push((key, value)),
        }
    }

    pub fn own_keys(&self) -> Vec<PropertyKey> {
        self.0
            .borrow()
            .properties
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Look `key` up on this object, then along its prototype chain
    pub fn lookup(&self, key: &PropertyKey) -> Option<Value> {
        let mut current = Some(self.clone());
        while let Some(object) = current {
            if let Some(value) = object.get_own(key) {
                return Some(value);
            }
            current = object.proto();
        }
        None
    }

    /// True if this object appears somewhere on `other`'s prototype chain
    pub fn is_prototype_of(&self, other: &Object) -> bool {
        let mut current = other.proto();
        while let Some(object) = current {
            if object.ptr_eq(self) {
                return true;
            }
            current = object.proto();
        }
        false
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Same own keys, each mapped to equal values
    fn same_shape(&self, other: &Object, visited: &mut Visited) -> bool {
        let ours = self.0.borrow();
        let theirs = other.0.borrow();
        ours.properties.len() == theirs.properties.len()
            && ours.properties.iter().all(|(key, value)| {
                theirs
                    .properties
                    .iter()
                    .any(|(k, v)| k == key && v.deep_eq(value, visited))
            })
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_map()
            .entries(data.properties.iter().map(|(k, v)| (k.to_string(), v)))
            .finish()
    }
}

// ============================================================================
// Functions
// ============================================================================

/// A callable value
pub struct Function {
    name: Rc<str>,
    arity: usize,
    kind: FunctionKind,
}

pub enum FunctionKind {
    /// A Rust closure
    Native(NativeFn),
    /// A member of a canonical representation, dispatched on the receiver
    Builtin(&'static str),
    /// A function with a fixed receiver and leading arguments
    Bound {
        target: Rc<Function>,
        this: Value,
        args: Vec<Value>,
    },
}

impl Function {
    pub fn native<F>(name: &str, arity: usize, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Fault> + 'static,
    {
        Self {
            name: Rc::from(name),
            arity,
            kind: FunctionKind::Native(Rc::new(f)),
        }
    }

    pub(crate) fn builtin(name: &'static str, arity: usize) -> Self {
        Self {
            name: Rc::from(name),
            arity,
            kind: FunctionKind::Builtin(name),
        }
    }

    /// Fix the receiver (and optionally leading arguments) of `target`.
    /// Calling the result ignores whatever receiver the caller supplies.
    pub fn bind(target: &Rc<Function>, this: Value, args: Vec<Value>) -> Self {
        Self {
            name: Rc::from(format!("bound {}", target.name)),
            arity: target.arity.saturating_sub(args.len()),
            kind: FunctionKind::Bound {
                target: Rc::clone(target),
                this,
                args,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn kind(&self) -> &FunctionKind {
        &self.kind
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value, Fault> {
        match &self.kind {
            FunctionKind::Native(f) => f(this, args),
            FunctionKind::Builtin(name) => builtins::apply(name, this, args),
            FunctionKind::Bound {
                target,
                this: bound_this,
                args: bound_args,
            } => {
                if bound_args.is_empty() {
                    target.call(bound_this, args)
                } else {
                    let mut full = bound_args.clone();
                    full.extend_from_slice(args);
                    target.call(bound_this, &full)
                }
            }
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Values
// ============================================================================

#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Symbol(Symbol),

    /// An ordered, growable list
    Array(Rc<RefCell<Vec<Value>>>),

    /// A property bag
    Object(Object),

    Function(Rc<Function>),

    /// Unique members in insertion order
    Set(Rc<RefCell<Vec<Value>>>),

    /// Key/value pairs in insertion order, keys unique
    Map(Rc<RefCell<Vec<(Value, Value)>>>),

    /// A promise held as an ordinary value
    Deferred(Deferred),
}

impl Value {
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn object<K: Into<PropertyKey>>(properties: impl IntoIterator<Item = (K, Value)>) -> Self {
        let object = Object::new();
        for (key, value) in properties {
            object.set(key, value);
        }
        Value::Object(object)
    }

    pub fn function<F>(name: &str, arity: usize, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Fault> + 'static,
    {
        Value::Function(Rc::new(Function::native(name, arity, f)))
    }

    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let mut members: Vec<Value> = Vec::new();
        for item in items {
            if !members.iter().any(|m| m.same_value_zero(&item)) {
                members.push(item);
            }
        }
        Value::Set(Rc::new(RefCell::new(members)))
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mut pairs: Vec<(Value, Value)> = Vec::new();
        for (key, value) in entries {
            match pairs.iter_mut().find(|(k, _)| k.same_value_zero(&key)) {
                Some(slot) => slot.1 = value,
                None => pairs.push((key, value)),
            }
        }
        Value::Map(Rc::new(RefCell::new(pairs)))
    }

    pub fn symbol(description: Option<&str>) -> Self {
        Value::Symbol(Symbol::new(description))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
            Value::Function(_) => "Function",
            Value::Set(_) => "Set",
            Value::Map(_) => "Map",
            Value::Deferred(_) => "Promise",
        }
    }

    /// Null or undefined
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Snapshot of the items of an array or set
    pub fn items(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(items) | Value::Set(items) => Some(items.borrow().clone()),
            _ => None,
        }
    }

    /// Identity for reference kinds, value for primitives, NaN equal to itself
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Array(a), Value::Array(b)) | (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Deferred(a), Value::Deferred(b)) => a.ptr_eq(b),
            _ => self == other,
        }
    }

    /// The key this value names when used as a property key
    pub fn to_property_key(&self) -> PropertyKey {
        match self {
            Value::Symbol(symbol) => PropertyKey::Symbol(symbol.clone()),
            Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= usize::MAX as f64 => {
                PropertyKey::Index(*n as usize)
            }
            other => PropertyKey::from(other.to_string()),
        }
    }
}

/// Render a number the way the host's string conversion does
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        // covers negative zero
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let formatted = format!("{:e}", n);
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        }
    } else {
        format!("{}", n)
    }
}

/// Join array items the way the host's `join` does. Absent items render
/// empty, and so does an array met again while it is still being joined.
pub(crate) fn join_array(items: &Rc<RefCell<Vec<Value>>>, separator: &str) -> String {
    let mut out = String::new();
    join_into(items, separator, &mut out, &mut Vec::new());
    out
}

fn join_into(
    items: &Rc<RefCell<Vec<Value>>>,
    separator: &str,
    out: &mut String,
    open: &mut Vec<*const RefCell<Vec<Value>>>,
) {
    let ptr = Rc::as_ptr(items);
    if open.contains(&ptr) {
        return;
    }
    open.push(ptr);
    for (i, item) in items.borrow().iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        match item {
            Value::Array(inner) => join_into(inner, ",", out, open),
            absent if absent.is_absent() => {}
            other => out.push_str(&other.to_string()),
        }
    }
    open.pop();
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Symbol(symbol) => write!(f, "{}", symbol),
            Value::Array(items) => write!(f, "{}", join_array(items, ",")),
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Function(function) => {
                write!(f, "function {}() {{ [native code] }}", function.name())
            }
            Value::Set(_) => write!(f, "[object Set]"),
            Value::Map(_) => write!(f, "[object Map]"),
            Value::Deferred(_) => write!(f, "[object Promise]"),
        }
    }
}

/// Container pairs already under comparison, by address
type Visited = Vec<(usize, usize)>;

/// Compare a container pair unless it is already being compared further up,
/// in which case the cycle counts as equal
fn enter(
    visited: &mut Visited,
    pair: (usize, usize),
    compare: impl FnOnce(&mut Visited) -> bool,
) -> bool {
    if visited.contains(&pair) {
        return true;
    }
    visited.push(pair);
    let equal = compare(visited);
    visited.pop();
    equal
}

impl Value {
    fn deep_eq(&self, other: &Value, visited: &mut Visited) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Array(a), Value::Array(b)) | (Value::Set(a), Value::Set(b)) => {
                let pair = (Rc::as_ptr(a) as usize, Rc::as_ptr(b) as usize);
                Rc::ptr_eq(a, b)
                    || enter(visited, pair, |visited| {
                        let (a, b) = (a.borrow(), b.borrow());
                        a.len() == b.len()
                            && a.iter().zip(b.iter()).all(|(x, y)| x.deep_eq(y, visited))
                    })
            }
            (Value::Map(a), Value::Map(b)) => {
                let pair = (Rc::as_ptr(a) as usize, Rc::as_ptr(b) as usize);
                Rc::ptr_eq(a, b)
                    || enter(visited, pair, |visited| {
                        let (a, b) = (a.borrow(), b.borrow());
                        a.len() == b.len()
                            && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| {
                                ka.deep_eq(kb, visited) && va.deep_eq(vb, visited)
                            })
                    })
            }
            (Value::Object(a), Value::Object(b)) => {
                a.ptr_eq(b)
                    || enter(visited, (a.addr(), b.addr()), |visited| a.same_shape(b, visited))
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Deferred(a), Value::Deferred(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Deep structural equality for arrays, objects and collections; identity for
/// functions, symbols and deferreds. Cycles compare equal where they line up.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other, &mut Vec::new())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<Symbol> for Value {
    fn from(symbol: Symbol) -> Self {
        Value::Symbol(symbol)
    }
}

impl From<Function> for Value {
    fn from(function: Function) -> Self {
        Value::Function(Rc::new(function))
    }
}

impl From<Deferred> for Value {
    fn from(deferred: Deferred) -> Self {
        Value::Deferred(deferred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_key_normalizes_indices() {
        assert_eq!(PropertyKey::from("0"), PropertyKey::Index(0));
        assert_eq!(PropertyKey::from("12"), PropertyKey::Index(12));
        assert_eq!(PropertyKey::from("012"), PropertyKey::Name(Rc::from("012")));
        assert_eq!(PropertyKey::from("-1"), PropertyKey::Name(Rc::from("-1")));
        assert_eq!(PropertyKey::from("length"), PropertyKey::Name(Rc::from("length")));
    }

    #[test]
    fn test_symbols_are_unique() {
        let a = Symbol::new(Some("foo"));
        let b = Symbol::new(Some("foo"));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "Symbol(foo)");
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Value::from(100.0).to_string(), "100");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from(-0.0).to_string(), "0");
        assert_eq!(Value::from(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::from(f64::NEG_INFINITY).to_string(), "-Infinity");
    }

    #[test]
    fn test_number_display_switches_to_exponent() {
        assert_eq!(Value::from(1e21).to_string(), "1e+21");
        assert_eq!(Value::from(-1.5e300).to_string(), "-1.5e+300");
        assert_eq!(Value::from(1e-7).to_string(), "1e-7");
        assert_eq!(Value::from(0.000001).to_string(), "0.000001");
        assert_eq!(Value::from(123456789012345680000.0).to_string(), "123456789012345680000");
    }

    #[test]
    fn test_cyclic_array_display_and_equality() {
        let a = Value::array([Value::from(1)]);
        let b = Value::array([Value::from(1)]);
        for v in [&a, &b] {
            if let Value::Array(items) = v {
                items.borrow_mut().push(v.clone());
            }
        }
        assert_eq!(a.to_string(), "1,");
        assert_eq!(a, a.clone());
        assert_eq!(a, b);
        assert_ne!(a, Value::array([Value::from(1), Value::from(2)]));
    }

    #[test]
    fn test_cyclic_object_equality() {
        let a = Object::new();
        a.set("self", Value::Object(a.clone()));
        let b = Object::new();
        b.set("self", Value::Object(b.clone()));
        assert_eq!(Value::Object(a), Value::Object(b));
    }

    #[test]
    fn test_array_display_skips_absent() {
        let v = Value::array([Value::from(1), Value::Undefined, Value::from("x")]);
        assert_eq!(v.to_string(), "1,,x");
    }

    #[test]
    fn test_deep_equality_vs_identity() {
        let a = Value::object([("b", Value::from(3))]);
        let b = Value::object([("b", Value::from(3))]);
        assert_eq!(a, b);
        assert!(!a.same_value_zero(&b));
        assert!(a.same_value_zero(&a.clone()));
    }

    #[test]
    fn test_nan_same_value_zero() {
        let nan = Value::from(f64::NAN);
        assert_ne!(nan, nan.clone());
        assert!(nan.same_value_zero(&Value::from(f64::NAN)));
    }

    #[test]
    fn test_set_and_map_dedupe() {
        let set = Value::set([Value::from(1), Value::from(2), Value::from(1)]);
        assert_eq!(set.items().map(|items| items.len()), Some(2));

        let map = Value::map([
            (Value::from("a"), Value::from(1)),
            (Value::from("a"), Value::from(2)),
        ]);
        match map {
            Value::Map(pairs) => {
                assert_eq!(pairs.borrow().len(), 1);
                assert_eq!(pairs.borrow()[0].1, Value::from(2));
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_prototype_chain_lookup() {
        let base = Object::new();
        base.set("greeting", Value::from("hi"));
        let child = Object::inheriting(&base);
        child.set("own", Value::from(1));

        assert_eq!(child.lookup(&"greeting".into()), Some(Value::from("hi")));
        assert!(!child.has_own(&"greeting".into()));
        assert!(base.is_prototype_of(&child));
        assert!(!child.is_prototype_of(&base));
    }

    #[test]
    fn test_bound_function_ignores_caller_receiver() {
        let read_x = Rc::new(Function::native("readX", 0, |this, _| {
            Ok(this
                .as_object()
                .and_then(|o| o.get_own(&"x".into()))
                .unwrap_or(Value::Undefined))
        }));
        let receiver = Value::object([("x", Value::from(7))]);
        let bound = Function::bind(&read_x, receiver, Vec::new());

        assert_eq!(bound.name(), "bound readX");
        assert_eq!(bound.call(&Value::Null, &[]), Ok(Value::from(7)));
    }

    #[test]
    fn test_bound_arguments_are_prepended() {
        let join = Rc::new(Function::native("join", 2, |_, args| {
            let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            Ok(Value::from(parts.join("-")))
        }));
        let bound = Function::bind(&join, Value::Undefined, vec![Value::from("a")]);

        assert_eq!(bound.arity(), 1);
        assert_eq!(bound.call(&Value::Undefined, &[Value::from("b")]), Ok(Value::from("a-b")));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(1).as_bool(), None);
        assert_eq!(Value::from("s").as_str(), Some("s"));

        let native = Rc::new(Function::native("f", 0, |_, _| Ok(Value::Undefined)));
        assert!(matches!(native.kind(), FunctionKind::Native(_)));
        assert!(matches!(Function::builtin("push", 1).kind(), FunctionKind::Builtin("push")));
        let bound = Function::bind(&native, Value::Null, Vec::new());
        assert!(matches!(bound.kind(), FunctionKind::Bound { this: Value::Null, .. }));
    }

    #[test]
    fn test_to_property_key() {
        assert_eq!(Value::from(2).to_property_key(), PropertyKey::Index(2));
        assert_eq!(Value::from(1.5).to_property_key(), PropertyKey::from("1.5"));
        assert_eq!(Value::from("name").to_property_key(), PropertyKey::from("name"));
    }
}
