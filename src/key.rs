//! Key normalization: maps a `Value` to the handle used for hashing and
//! equality inside the map.
//!
//! - Primitives normalize by value. Numbers are canonicalized so that every
//!   NaN payload is one key and `-0.0` is the same key as `+0.0`.
//! - Reference variants normalize to their allocation address. The map
//!   keeps the original key alive while the entry exists, so the address
//!   cannot be recycled under a live handle.

use crate::value::Value;
use core::hash::{Hash, Hasher};
use std::rc::Rc;

/// Normalized key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyHandle {
    Primitive(PrimitiveKey),
    Reference(Identity),
}

/// By-value half of `KeyHandle`.
#[derive(Clone, Debug)]
pub enum PrimitiveKey {
    Undefined,
    Null,
    Bool(bool),
    /// Bit pattern of the canonicalized number.
    Number(u64),
    String(Rc<str>),
}

/// By-identity half of `KeyHandle`: variant tag plus allocation address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identity {
    kind: RefKind,
    addr: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum RefKind {
    Object,
    Array,
    Function,
}

impl KeyHandle {
    /// Normalize `key`. Total over every `Value`.
    pub fn new(key: &Value) -> Self {
        match key {
            Value::Undefined => KeyHandle::Primitive(PrimitiveKey::Undefined),
            Value::Null => KeyHandle::Primitive(PrimitiveKey::Null),
            Value::Bool(b) => KeyHandle::Primitive(PrimitiveKey::Bool(*b)),
            Value::Number(n) => KeyHandle::Primitive(PrimitiveKey::Number(canonical_bits(*n))),
            Value::String(s) => KeyHandle::Primitive(PrimitiveKey::String(s.clone())),
            Value::Object(o) => KeyHandle::Reference(Identity {
                kind: RefKind::Object,
                addr: o.addr(),
            }),
            Value::Array(a) => KeyHandle::Reference(Identity {
                kind: RefKind::Array,
                addr: a.addr(),
            }),
            Value::Function(f) => KeyHandle::Reference(Identity {
                kind: RefKind::Function,
                addr: f.addr(),
            }),
        }
    }
}

fn canonical_bits(n: f64) -> u64 {
    if n.is_nan() {
        f64::NAN.to_bits()
    } else if n == 0.0 {
        0.0f64.to_bits()
    } else {
        n.to_bits()
    }
}

impl PartialEq for PrimitiveKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PrimitiveKey::Undefined, PrimitiveKey::Undefined) => true,
            (PrimitiveKey::Null, PrimitiveKey::Null) => true,
            (PrimitiveKey::Bool(a), PrimitiveKey::Bool(b)) => a == b,
            (PrimitiveKey::Number(a), PrimitiveKey::Number(b)) => a == b,
            (PrimitiveKey::String(a), PrimitiveKey::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PrimitiveKey {}

impl Hash for PrimitiveKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            PrimitiveKey::Undefined | PrimitiveKey::Null => {}
            PrimitiveKey::Bool(b) => b.hash(state),
            PrimitiveKey::Number(bits) => bits.hash(state),
            PrimitiveKey::String(s) => s.hash(state),
        }
    }
}
