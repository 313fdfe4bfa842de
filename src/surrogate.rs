//! The surrogate factory: member reads and calls on a value that has not
//! arrived yet.
//!
//! Every `get` or `call` registers a continuation on the wrapped deferred value
//! and hands back a new surrogate for the derived result. Nothing runs until
//! one of the blessed operations is observed.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::deferred::{Deferred, Outcome};
use crate::errors::Fault;
use crate::property;
use crate::value::{Function, PropertyKey, Value};

/// Member names that always mean the deferred value's own completion
/// operations, never a member of the value it settles to
pub const BLESSED: [&str; 3] = ["then", "catch", "finally"];

/// Stand-in for the value a deferred computation will produce
#[derive(Clone)]
#[must_use = "a surrogate does nothing until one of then/catch/finally is observed"]
pub struct Surrogate {
    deferred: Deferred,
    /// Access path from the wrapped root, e.g. `$.user.name[0]`
    path: Rc<str>,
}

/// Wrap a deferred value in a surrogate
pub fn wrap(deferred: Deferred) -> Surrogate {
    Surrogate::at(deferred, Rc::from("$"))
}

impl Surrogate {
    fn at(deferred: Deferred, path: Rc<str>) -> Self {
        Self { deferred, path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Derive the member `key` of the eventual value.
    ///
    /// Reading a blessed name yields the deferred value's own promise method,
    /// bound to it, without waiting for anything.
    pub fn get(&self, key: impl Into<PropertyKey>) -> Surrogate {
        let key = key.into();
        let path: Rc<str> = Rc::from(member_path(&self.path, &key));

        if key.name().is_some_and(|name| BLESSED.contains(&name)) {
            trace!(path = %path, "blessed member read");
            let promise = Value::Deferred(self.deferred.clone());
            let member = property::read_property(&promise, &key).map(|m| bind_to(m, &promise));
            return Surrogate::at(Deferred::settled(member), path);
        }

        trace!(path = %path, key = %key, "derive member read");
        let receiver_path = Rc::clone(&self.path);
        let derived = self
            .deferred
            .clone()
            .then(move |value| read_member(value, &key, &receiver_path));
        Surrogate::at(derived, path)
    }

    /// `get` for numeric indices
    pub fn index(&self, index: usize) -> Surrogate {
        self.get(index)
    }

    /// Invoke the eventual value with an `undefined` receiver
    pub fn call(&self, args: impl IntoIterator<Item = Value>) -> Surrogate {
        self.call_with(Value::Undefined, args)
    }

    /// Invoke the eventual value with an explicit receiver
    pub fn call_with(
        &self,
        this: impl Into<Value>,
        args: impl IntoIterator<Item = Value>,
    ) -> Surrogate {
        let this = this.into();
        let args: Vec<Value> = args.into_iter().collect();
        let path: Rc<str> = Rc::from(format!("{}()", self.path));

        trace!(path = %path, argc = args.len(), "derive call");
        let callee_path = Rc::clone(&self.path);
        let derived = self
            .deferred
            .clone()
            .then(move |value| apply(value, &this, &args, &callee_path));
        Surrogate::at(derived, path)
    }

    /// Read `name` and call it on the value that owns it
    pub fn invoke(&self, name: &str, args: impl IntoIterator<Item = Value>) -> Surrogate {
        self.get(name).call(args)
    }

    /// Subscribe to success
    pub fn then<F>(&self, on_success: F) -> Deferred
    where
        F: FnOnce(Value) -> Outcome + 'static,
    {
        self.deferred.clone().then(on_success)
    }

    /// Subscribe to failure
    pub fn catch<F>(&self, on_failure: F) -> Deferred
    where
        F: FnOnce(Fault) -> Outcome + 'static,
    {
        self.deferred.clone().catch(on_failure)
    }

    /// Subscribe to settlement either way
    pub fn finally<F>(&self, on_settled: F) -> Deferred
    where
        F: FnOnce() + 'static,
    {
        self.deferred.clone().finally(on_settled)
    }
}

impl fmt::Debug for Surrogate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surrogate")
            .field("path", &self.path)
            .field("deferred", &self.deferred)
            .finish()
    }
}

fn member_path(parent: &str, key: &PropertyKey) -> String {
    match key {
        PropertyKey::Name(name) => format!("{}.{}", parent, name),
        PropertyKey::Index(index) => format!("{}[{}]", parent, index),
        PropertyKey::Symbol(symbol) => format!("{}[{}]", parent, symbol),
    }
}

/// Methods keep the receiver they were read from
fn bind_to(member: Value, receiver: &Value) -> Value {
    match member {
        Value::Function(f) => Value::from(Function::bind(&f, receiver.clone(), Vec::new())),
        other => other,
    }
}

fn read_member(value: Value, key: &PropertyKey, path: &str) -> Outcome {
    if value.is_absent() {
        debug!(path, key = %key, receiver = value.type_name(), "member read on absent value");
        return Err(Fault::AbsentReceiver {
            key: key.clone(),
            receiver: value.type_name(),
            path: path.to_string(),
        });
    }
    if !property::is_reachable(&value, key) {
        trace!(path, key = %key, "member not present");
        return Ok(Value::Undefined);
    }
    let member = property::read_property(&value, key)?;
    Ok(bind_to(member, &value))
}

fn apply(value: Value, this: &Value, args: &[Value], path: &str) -> Outcome {
    match value {
        Value::Function(f) => f.call(this, args),
        other => {
            debug!(path, type_name = other.type_name(), "call on non-function");
            Err(Fault::NotCallable {
                type_name: other.type_name(),
                path: path.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn settle(surrogate: &Surrogate) -> Outcome {
        block_on(surrogate.then(Ok))
    }

    #[test]
    fn test_member_read() {
        let s = wrap(Deferred::resolved(Value::object([("a", Value::from(1))])));
        assert_eq!(settle(&s.get("a")), Ok(Value::from(1)));
        assert_eq!(settle(&s.get("missing")), Ok(Value::Undefined));
    }

    #[test]
    fn test_paths() {
        let s = wrap(Deferred::resolved(Value::Null));
        assert_eq!(s.path(), "$");
        assert_eq!(s.get("user").index(0).get("name").path(), "$.user[0].name");
        assert_eq!(s.invoke("go", []).path(), "$.go()");
    }

    #[test]
    fn test_absent_receiver_names_key_and_path() {
        let s = wrap(Deferred::resolved(Value::object([("user", Value::Null)])));
        let fault = settle(&s.get("user").get("name")).unwrap_err();
        assert_eq!(
            fault,
            Fault::AbsentReceiver {
                key: "name".into(),
                receiver: "null",
                path: "$.user".to_string(),
            }
        );
    }

    #[test]
    fn test_not_callable() {
        let s = wrap(Deferred::resolved(5));
        assert_eq!(
            settle(&s.call([])),
            Err(Fault::NotCallable {
                type_name: "number",
                path: "$".to_string(),
            })
        );
    }

    #[test]
    fn test_methods_keep_receiver() {
        let counter = Value::object([
            ("x", Value::from(2)),
            (
                "add",
                Value::function("add", 1, |this, args| {
                    let x = this
                        .as_object()
                        .and_then(|o| o.get_own(&"x".into()))
                        .and_then(|v| v.as_number())
                        .unwrap_or(f64::NAN);
                    Ok(Value::from(x + args[0].as_number().unwrap_or(0.0)))
                }),
            ),
        ]);
        let s = wrap(Deferred::resolved(counter));
        assert_eq!(settle(&s.invoke("add", [Value::from(3)])), Ok(Value::from(5)));
    }

    #[test]
    fn test_blessed_read_is_promise_method() {
        let inner = Value::object([("then", Value::from("shadowed"))]);
        let s = wrap(Deferred::resolved(inner.clone()));
        let echo = Value::function("echo", 1, |_, args| Ok(args[0].clone()));

        let via_member = s.get("then").call([echo]);
        assert_eq!(settle(&via_member), Ok(inner));
    }

    #[test]
    fn test_blessed_subscriptions() {
        let s = wrap(Deferred::rejected(Fault::thrown(1)));
        let recovered = s.catch(|fault| Ok(fault.to_value()));
        assert_eq!(block_on(recovered), Ok(Value::from(1)));
    }
}
