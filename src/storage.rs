/*!
 * The dataspace: the server's authoritative keyspace plus its
 * expiration-metadata map.
 *
 * `Dataspace` owns every key and value payload in the server. It is
 * not itself synchronized — the executor wraps one instance in a
 * single `Mutex` (see [`crate::exec`]) and takes the lock for the
 * duration of each command handler, so every method here runs under
 * exclusive access.
 */

use std::collections::HashMap;
use std::time::SystemTime;
use thiserror::Error;

/// A stored value's tag. Exactly one of these describes any given key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    String,
    Integer,
    Hash,
    SortedSet,
    List,
}

impl TypeTag {
    /// The bulk-string name `TYPE` reports for this tag.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Hash => "hash",
            TypeTag::SortedSet => "zset",
            TypeTag::List => "list",
        }
    }
}

/// A stored value. Every payload (string bytes, hash field names and
/// values) is owned; nothing here ever aliases a connection's read
/// buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(Vec<u8>),
    Integer(i64),
    Hash(HashMap<Vec<u8>, Vec<u8>>),
    /// Reserved: member -> score. Not driven by any executed command.
    SortedSet(HashMap<Vec<u8>, f64>),
    /// Reserved: ordered sequence of string elements.
    List(std::collections::VecDeque<Vec<u8>>),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::String(_) => TypeTag::String,
            Value::Integer(_) => TypeTag::Integer,
            Value::Hash(_) => TypeTag::Hash,
            Value::SortedSet(_) => TypeTag::SortedSet,
            Value::List(_) => TypeTag::List,
        }
    }
}

/// Errors raised by dataspace accessors. Both variants collapse to a
/// fixed wire message at the executor layer (see [`crate::exec`]).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DataError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("value is not an integer or out of range")]
    NotAnInteger,
}

/// The keyspace plus its expiration-metadata map.
#[derive(Default)]
pub struct Dataspace {
    keyspace: HashMap<Vec<u8>, Value>,
    expirations: HashMap<Vec<u8>, SystemTime>,
}

impl Dataspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the value stored at `key`, if any.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.keyspace.get(key)
    }

    /// Replace any prior value at `key` with `String(bytes)`,
    /// releasing the old value's memory and its expiration entry.
    pub fn put_string(&mut self, key: Vec<u8>, bytes: Vec<u8>) {
        self.expirations.remove(&key);
        self.keyspace.insert(key, Value::String(bytes));
    }

    /// Remove `key` and its expiration entry, returning the value that
    /// was there (if any).
    pub fn remove(&mut self, key: &[u8]) -> Option<Value> {
        self.expirations.remove(key);
        self.keyspace.remove(key)
    }

    pub fn exists(&self, key: &[u8]) -> bool {
        self.keyspace.contains_key(key)
    }

    pub fn type_of(&self, key: &[u8]) -> Option<TypeTag> {
        self.keyspace.get(key).map(Value::type_tag)
    }

    /// Borrow (creating if absent) the hash stored at `key`. Errors
    /// without mutating if the key holds a non-Hash value.
    pub fn get_or_create_hash(
        &mut self,
        key: &[u8],
    ) -> Result<&mut HashMap<Vec<u8>, Vec<u8>>, DataError> {
        if !self.keyspace.contains_key(key) {
            self.keyspace
                .insert(key.to_vec(), Value::Hash(HashMap::new()));
        }
        match self.keyspace.get_mut(key).expect("just inserted or present") {
            Value::Hash(h) => Ok(h),
            _ => Err(DataError::WrongType),
        }
    }

    /// Atomic read-modify-write: absent -> store `delta`; `Integer` ->
    /// checked add; `String` -> parse, add, rewrite tag to `Integer`;
    /// any other tag -> `WrongType`; unparsable string -> `NotAnInteger`.
    pub fn increment(&mut self, key: &[u8], delta: i64) -> Result<i64, DataError> {
        match self.keyspace.get_mut(key) {
            None => {
                self.keyspace.insert(key.to_vec(), Value::Integer(delta));
                Ok(delta)
            }
            Some(Value::Integer(i)) => {
                let next = i.checked_add(delta).ok_or(DataError::NotAnInteger)?;
                *i = next;
                Ok(next)
            }
            Some(Value::String(s)) => {
                let current: i64 = std::str::from_utf8(s)
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .ok_or(DataError::NotAnInteger)?;
                let next = current.checked_add(delta).ok_or(DataError::NotAnInteger)?;
                self.keyspace.insert(key.to_vec(), Value::Integer(next));
                Ok(next)
            }
            Some(_) => Err(DataError::WrongType),
        }
    }

    /// Record an expiration timestamp for `key`. Reserved for EXPIRE/
    /// EXPIREAT, which this implementation parses but does not
    /// execute (see DESIGN.md); kept so the invariant "the expiration
    /// map only contains keys currently present" is enforced by every
    /// removal path from day one.
    #[allow(dead_code)]
    pub fn set_expiration(&mut self, key: &[u8], at: SystemTime) {
        if self.keyspace.contains_key(key) {
            self.expirations.insert(key.to_vec(), at);
        }
    }

    /// Drop every key, value, and expiration entry.
    pub fn flush(&mut self) {
        self.keyspace.clear();
        self.expirations.clear();
    }
}
