//! Safe member lookup on arbitrary values.
//!
//! Primitives are looked up on their canonical representation, objects on
//! their own properties and prototype chain first. Absent values have no
//! members at all.

use crate::builtins;
use crate::errors::{find_similar, Fault};
use crate::value::{PropertyKey, Value};

/// Maximum edit distance for "did you mean" suggestions
const SUGGESTION_DISTANCE: usize = 2;

fn find_member(value: &Value, key: &PropertyKey) -> Option<Value> {
    if let Value::Object(object) = value {
        if let Some(member) = object.lookup(key) {
            return Some(member);
        }
    }
    builtins::lookup(value, key)
}

/// True if `key` names a member of `value`
pub fn is_reachable(value: &Value, key: &PropertyKey) -> bool {
    find_member(value, key).is_some()
}

/// Read a member that is expected to exist.
///
/// A missing member is a `Fault::InvalidMember` rather than `Undefined`, so
/// "absent" and "present but undefined" stay distinguishable.
pub fn read_property(value: &Value, key: &PropertyKey) -> Result<Value, Fault> {
    find_member(value, key).ok_or_else(|| {
        let names = member_names(value);
        let suggestions = match key.name() {
            Some(name) => find_similar(name, names.iter().map(String::as_str), SUGGESTION_DISTANCE),
            None => Vec::new(),
        };
        Fault::InvalidMember {
            key: key.clone(),
            suggestions,
        }
    })
}

/// Every named member reachable on `value`, nearest first
pub fn member_names(value: &Value) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    };

    if let Value::Object(object) = value {
        let mut current = Some(object.clone());
        while let Some(object) = current {
            for key in object.own_keys() {
                if let Some(name) = key.name() {
                    push(name);
                }
            }
            current = object.proto();
        }
    }
    for name in builtins::member_names(value) {
        push(name);
    }
    names
}
