/*!
 * The executor: one handler per [`Command`] variant, producing the
 * RESP2 reply. Lock-free handlers (PING, ECHO, CLIENT SETINFO) never
 * touch the dataspace. Every other handler takes the shared mutex for
 * the duration of the call, encodes its reply while still holding it
 * (the reply may borrow directly from stored `Value` memory), and
 * releases the lock before returning.
 */

use crate::command::{ClientInfoField, Command, CommandError};
use crate::protocol::{resp_array, resp_bulk, resp_error, resp_integer, resp_null, resp_simple};
use crate::storage::{DataError, Dataspace, Value};
use std::sync::{Arc, Mutex};

/// The dataspace behind the single global mutex spec.md's concurrency
/// model names.
pub type SharedDataspace = Arc<Mutex<Dataspace>>;

/// Per-connection identity: peer address plus whatever `CLIENT
/// SETINFO` has recorded. Owned by one connection's worker thread;
/// never shared.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub peer_addr: String,
    pub lib_name: Option<String>,
    pub lib_version: Option<String>,
}

impl ClientInfo {
    pub fn new(peer_addr: String) -> Self {
        Self {
            peer_addr,
            lib_name: None,
            lib_version: None,
        }
    }
}

fn wrong_type_reply() -> Vec<u8> {
    resp_error(&DataError::WrongType.to_string())
}

fn not_an_integer_reply() -> Vec<u8> {
    resp_error(&DataError::NotAnInteger.to_string())
}

fn data_error_reply(e: DataError) -> Vec<u8> {
    match e {
        DataError::WrongType => wrong_type_reply(),
        DataError::NotAnInteger => not_an_integer_reply(),
    }
}

/// Turn a [`CommandError`] (arity/type validation failure) into its
/// wire reply.
pub fn command_error_reply(err: CommandError) -> Vec<u8> {
    match err {
        CommandError::WrongNumberOfArguments(name) => resp_error(&format!(
            "ERR wrong number of arguments for '{}' command",
            name
        )),
        CommandError::InvalidArgumentType(_) => not_an_integer_reply(),
        CommandError::InvalidCommandFormat(detail) => resp_error(&format!("ERR {}", detail)),
    }
}

/// Dispatch a classified command and produce its encoded reply.
pub fn execute(cmd: Command, state: &SharedDataspace, client: &mut ClientInfo) -> Vec<u8> {
    match cmd {
        Command::Ping(None) => resp_simple("PONG"),
        Command::Ping(Some(msg)) => resp_bulk(&msg),
        Command::Echo(msg) => resp_bulk(&msg),
        Command::ClientSetInfo(field, value) => {
            let text = String::from_utf8_lossy(&value).into_owned();
            match field {
                ClientInfoField::LibName => client.lib_name = Some(text),
                ClientInfoField::LibVer => client.lib_version = Some(text),
                ClientInfoField::Other(_) => {}
            }
            resp_simple("OK")
        }

        Command::Set(k, v) => {
            let mut ds = state.lock().unwrap();
            ds.put_string(k, v);
            resp_simple("OK")
        }
        Command::Get(k) => {
            let ds = state.lock().unwrap();
            reply_for_readable(ds.get(&k))
        }
        Command::GetDel(k) => {
            let mut ds = state.lock().unwrap();
            let removable = matches!(ds.get(&k), Some(Value::String(_)) | Some(Value::Integer(_)));
            let reply = reply_for_readable(ds.get(&k));
            if removable {
                ds.remove(&k);
            }
            reply
        }
        Command::Incr(k) => increment_reply(state, &k, 1),
        Command::Decr(k) => increment_reply(state, &k, -1),
        Command::IncrBy(k, n) => increment_reply(state, &k, n),
        Command::DecrBy(k, n) => match n.checked_neg() {
            Some(neg) => increment_reply(state, &k, neg),
            None => not_an_integer_reply(),
        },
        Command::Del(keys) => {
            let mut ds = state.lock().unwrap();
            let count = keys.iter().filter(|k| ds.remove(k).is_some()).count();
            resp_integer(count as i64)
        }
        Command::Exists(keys) => {
            let ds = state.lock().unwrap();
            let count = keys.iter().filter(|k| ds.exists(k)).count();
            resp_integer(count as i64)
        }
        Command::FlushDb => {
            let mut ds = state.lock().unwrap();
            ds.flush();
            resp_simple("OK")
        }
        Command::Type(k) => {
            let ds = state.lock().unwrap();
            match ds.type_of(&k) {
                Some(tag) => resp_simple(tag.name()),
                None => resp_simple("none"),
            }
        }
        Command::HSet(k, pairs) => {
            let mut ds = state.lock().unwrap();
            match ds.get_or_create_hash(&k) {
                Ok(hash) => {
                    let mut new_fields = 0i64;
                    for (field, value) in pairs {
                        if hash.insert(field, value).is_none() {
                            new_fields += 1;
                        }
                    }
                    resp_integer(new_fields)
                }
                Err(e) => data_error_reply(e),
            }
        }
        Command::HGet(k, field) => {
            let ds = state.lock().unwrap();
            match ds.get(&k) {
                Some(Value::Hash(h)) => match h.get(&field) {
                    Some(v) => resp_bulk(v),
                    None => resp_null(),
                },
                Some(_) => wrong_type_reply(),
                None => resp_null(),
            }
        }
        Command::HGetAll(k) => {
            let ds = state.lock().unwrap();
            match ds.get(&k) {
                Some(Value::Hash(h)) => {
                    let mut items = Vec::with_capacity(h.len() * 2);
                    for (field, value) in h.iter() {
                        items.push(resp_bulk(field));
                        items.push(resp_bulk(value));
                    }
                    resp_array(items)
                }
                Some(_) => wrong_type_reply(),
                None => resp_array(Vec::new()),
            }
        }

        Command::ParsedButUnexecuted(name) | Command::Unknown(name) => {
            resp_error(&format!("ERR unknown command '{}'", String::from_utf8_lossy(&name)))
        }
    }
}

fn reply_for_readable(value: Option<&Value>) -> Vec<u8> {
    match value {
        Some(Value::String(b)) => resp_bulk(b),
        Some(Value::Integer(i)) => resp_integer(*i),
        Some(_) => wrong_type_reply(),
        None => resp_null(),
    }
}

fn increment_reply(state: &SharedDataspace, key: &[u8], delta: i64) -> Vec<u8> {
    let mut ds = state.lock().unwrap();
    match ds.increment(key, delta) {
        Ok(n) => resp_integer(n),
        Err(e) => data_error_reply(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    fn fresh() -> (SharedDataspace, ClientInfo) {
        (
            Arc::new(Mutex::new(Dataspace::new())),
            ClientInfo::new("127.0.0.1:0".into()),
        )
    }

    #[test]
    fn set_then_get() {
        let (state, mut client) = fresh();
        assert_eq!(
            execute(Command::Set(b"foo".to_vec(), b"bar".to_vec()), &state, &mut client),
            b"+OK\r\n"
        );
        assert_eq!(
            execute(Command::Get(b"foo".to_vec()), &state, &mut client),
            b"$3\r\nbar\r\n"
        );
    }

    #[test]
    fn get_missing_is_null() {
        let (state, mut client) = fresh();
        assert_eq!(
            execute(Command::Get(b"missing".to_vec()), &state, &mut client),
            b"$-1\r\n"
        );
    }

    #[test]
    fn del_counts_present_keys_only() {
        let (state, mut client) = fresh();
        execute(Command::Set(b"a".to_vec(), b"1".to_vec()), &state, &mut client);
        let n = execute(
            Command::Del(vec![b"a".to_vec(), b"b".to_vec()]),
            &state,
            &mut client,
        );
        assert_eq!(n, b":1\r\n");
        assert_eq!(
            execute(Command::Exists(vec![b"a".to_vec()]), &state, &mut client),
            b":0\r\n"
        );
    }

    #[test]
    fn incr_then_decrby() {
        let (state, mut client) = fresh();
        execute(Command::Set(b"n".to_vec(), b"10".to_vec()), &state, &mut client);
        assert_eq!(execute(Command::Incr(b"n".to_vec()), &state, &mut client), b":11\r\n");
        assert_eq!(
            execute(Command::DecrBy(b"n".to_vec(), 3), &state, &mut client),
            b":8\r\n"
        );
    }

    #[test]
    fn incrby_overflow_leaves_value_unchanged() {
        let (state, mut client) = fresh();
        {
            let mut ds = state.lock().unwrap();
            ds.increment(b"n", i64::MAX).unwrap();
        }
        assert_eq!(
            execute(Command::IncrBy(b"n".to_vec(), i64::MAX), &state, &mut client),
            resp_error("value is not an integer or out of range")
        );
        assert_eq!(
            execute(Command::Get(b"n".to_vec()), &state, &mut client),
            resp_integer(i64::MAX)
        );
    }

    #[test]
    fn incr_on_non_numeric_string_errors() {
        let (state, mut client) = fresh();
        execute(Command::Set(b"s".to_vec(), b"hi".to_vec()), &state, &mut client);
        assert_eq!(
            execute(Command::Incr(b"s".to_vec()), &state, &mut client),
            resp_error("value is not an integer or out of range")
        );
    }

    #[test]
    fn get_on_hash_is_wrongtype() {
        let (state, mut client) = fresh();
        execute(
            Command::HSet(b"h".to_vec(), vec![(b"f".to_vec(), b"v".to_vec())]),
            &state,
            &mut client,
        );
        let reply = execute(Command::Get(b"h".to_vec()), &state, &mut client);
        assert!(reply.starts_with(b"-WRONGTYPE"));
        // the prior value and tag are unchanged after a WRONGTYPE error
        assert_eq!(
            execute(Command::Type(b"h".to_vec()), &state, &mut client),
            b"+hash\r\n"
        );
    }

    #[test]
    fn hset_counts_new_fields_only() {
        let (state, mut client) = fresh();
        let cmd = Command::HSet(b"h".to_vec(), vec![(b"f".to_vec(), b"v1".to_vec())]);
        assert_eq!(execute(cmd, &state, &mut client), b":1\r\n");
        let cmd2 = Command::HSet(b"h".to_vec(), vec![(b"f".to_vec(), b"v2".to_vec())]);
        assert_eq!(execute(cmd2, &state, &mut client), b":0\r\n");
        assert_eq!(
            execute(Command::HGet(b"h".to_vec(), b"f".to_vec()), &state, &mut client),
            b"$2\r\nv2\r\n"
        );
    }

    #[test]
    fn flushdb_then_exists() {
        let (state, mut client) = fresh();
        execute(Command::Set(b"a".to_vec(), b"1".to_vec()), &state, &mut client);
        execute(Command::FlushDb, &state, &mut client);
        assert_eq!(
            execute(Command::Exists(vec![b"a".to_vec()]), &state, &mut client),
            b":0\r\n"
        );
    }

    #[test]
    fn client_setinfo_updates_identity_and_replies_ok() {
        let (state, mut client) = fresh();
        let reply = execute(
            Command::ClientSetInfo(ClientInfoField::LibName, b"redis-py".to_vec()),
            &state,
            &mut client,
        );
        assert_eq!(reply, b"+OK\r\n");
        assert_eq!(client.lib_name.as_deref(), Some("redis-py"));
    }

    #[test]
    fn unexecuted_command_reports_unknown() {
        let (state, mut client) = fresh();
        let reply = execute(
            Command::ParsedButUnexecuted(b"EXPIRE".to_vec()),
            &state,
            &mut client,
        );
        assert!(reply.starts_with(b"-ERR unknown command"));
    }
}
