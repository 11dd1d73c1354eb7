/*!
 * Typed command model.
 *
 * Converts a generic `Request { name, args }` (as produced by
 * [`crate::protocol::decode_frame`]) into a strongly-typed [`Command`]
 * variant, validating arity and argument types up front so the
 * executor never has to re-check them. This module never touches the
 * dataspace.
 */

use crate::protocol::Request;
use thiserror::Error;

/// A field name accepted (or merely tolerated) by `CLIENT SETINFO`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientInfoField {
    LibName,
    LibVer,
    /// Any subkey other than LIB-NAME/LIB-VER: accepted and ignored
    /// (see DESIGN.md's Open Question decision).
    Other(Vec<u8>),
}

/// The fully validated, strongly-typed command surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping(Option<Vec<u8>>),
    Echo(Vec<u8>),
    Set(Vec<u8>, Vec<u8>),
    Get(Vec<u8>),
    GetDel(Vec<u8>),
    Incr(Vec<u8>),
    Decr(Vec<u8>),
    IncrBy(Vec<u8>, i64),
    DecrBy(Vec<u8>, i64),
    Del(Vec<Vec<u8>>),
    Exists(Vec<Vec<u8>>),
    FlushDb,
    Type(Vec<u8>),
    HSet(Vec<u8>, Vec<(Vec<u8>, Vec<u8>)>),
    HGet(Vec<u8>, Vec<u8>),
    HGetAll(Vec<u8>),
    ClientSetInfo(ClientInfoField, Vec<u8>),
    /// A command name this server recognizes as part of the wider
    /// Redis command surface, arity/type-validated, but never
    /// executed (EXPIRE family, KEYS, TTL, GETSET, GETEX, ZSet
    /// commands — see spec's open questions).
    ParsedButUnexecuted(Vec<u8>),
    /// A command name outside the recognized surface entirely.
    Unknown(Vec<u8>),
}

/// Errors produced while classifying a [`Request`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("wrong number of arguments for '{0}' command")]
    WrongNumberOfArguments(String),
    #[error("invalid argument type for '{0}' command")]
    InvalidArgumentType(String),
    #[error("{0}")]
    InvalidCommandFormat(String),
}

fn wrong_arity(name: &[u8]) -> CommandError {
    CommandError::WrongNumberOfArguments(lowercase_name(name))
}

fn bad_type(name: &[u8]) -> CommandError {
    CommandError::InvalidArgumentType(lowercase_name(name))
}

fn lowercase_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).to_ascii_lowercase()
}

fn parse_i64(b: &[u8]) -> Option<i64> {
    std::str::from_utf8(b).ok()?.parse::<i64>().ok()
}

fn parse_f64(b: &[u8]) -> Option<f64> {
    std::str::from_utf8(b).ok()?.parse::<f64>().ok()
}

fn eq_ignore_case(a: &[u8], s: &str) -> bool {
    a.len() == s.len() && a.iter().zip(s.bytes()).all(|(x, y)| x.eq_ignore_ascii_case(&y))
}

/// Classify a decoded request into a typed [`Command`].
pub fn classify(req: Request) -> Result<Command, CommandError> {
    let upper = req.name.to_ascii_uppercase();
    let args = req.args;

    match upper.as_slice() {
        b"PING" => match args.len() {
            0 => Ok(Command::Ping(None)),
            1 => Ok(Command::Ping(Some(into_one(args)))),
            _ => Err(wrong_arity(b"ping")),
        },
        b"ECHO" => {
            if args.len() != 1 {
                return Err(wrong_arity(b"echo"));
            }
            Ok(Command::Echo(into_one(args)))
        }
        b"SET" => {
            if args.len() != 2 {
                return Err(wrong_arity(b"set"));
            }
            let mut it = args.into_iter();
            let k = it.next().unwrap();
            let v = it.next().unwrap();
            Ok(Command::Set(k, v))
        }
        b"GET" => {
            if args.len() != 1 {
                return Err(wrong_arity(b"get"));
            }
            Ok(Command::Get(into_one(args)))
        }
        b"GETDEL" => {
            if args.len() != 1 {
                return Err(wrong_arity(b"getdel"));
            }
            Ok(Command::GetDel(into_one(args)))
        }
        b"INCR" => {
            if args.len() != 1 {
                return Err(wrong_arity(b"incr"));
            }
            Ok(Command::Incr(into_one(args)))
        }
        b"DECR" => {
            if args.len() != 1 {
                return Err(wrong_arity(b"decr"));
            }
            Ok(Command::Decr(into_one(args)))
        }
        b"INCRBY" => {
            if args.len() != 2 {
                return Err(wrong_arity(b"incrby"));
            }
            let mut it = args.into_iter();
            let k = it.next().unwrap();
            let n = it.next().unwrap();
            let n = parse_i64(&n).ok_or_else(|| bad_type(b"incrby"))?;
            Ok(Command::IncrBy(k, n))
        }
        b"DECRBY" => {
            if args.len() != 2 {
                return Err(wrong_arity(b"decrby"));
            }
            let mut it = args.into_iter();
            let k = it.next().unwrap();
            let n = it.next().unwrap();
            let n = parse_i64(&n).ok_or_else(|| bad_type(b"decrby"))?;
            Ok(Command::DecrBy(k, n))
        }
        b"DEL" => {
            if args.is_empty() {
                return Err(wrong_arity(b"del"));
            }
            Ok(Command::Del(args))
        }
        b"EXISTS" => {
            if args.is_empty() {
                return Err(wrong_arity(b"exists"));
            }
            Ok(Command::Exists(args))
        }
        b"FLUSHDB" => {
            if !args.is_empty() {
                return Err(wrong_arity(b"flushdb"));
            }
            Ok(Command::FlushDb)
        }
        b"TYPE" => {
            if args.len() != 1 {
                return Err(wrong_arity(b"type"));
            }
            Ok(Command::Type(into_one(args)))
        }
        b"HSET" => {
            if args.len() < 3 {
                return Err(wrong_arity(b"hset"));
            }
            let mut it = args.into_iter();
            let key = it.next().unwrap();
            let rest: Vec<Vec<u8>> = it.collect();
            if rest.len() % 2 != 0 {
                return Err(wrong_arity(b"hset"));
            }
            let pairs = rest
                .chunks(2)
                .map(|c| (c[0].clone(), c[1].clone()))
                .collect();
            Ok(Command::HSet(key, pairs))
        }
        b"HGET" => {
            if args.len() != 2 {
                return Err(wrong_arity(b"hget"));
            }
            let mut it = args.into_iter();
            let k = it.next().unwrap();
            let f = it.next().unwrap();
            Ok(Command::HGet(k, f))
        }
        b"HGETALL" => {
            if args.len() != 1 {
                return Err(wrong_arity(b"hgetall"));
            }
            Ok(Command::HGetAll(into_one(args)))
        }
        b"CLIENT" => classify_client(args),
        b"EXPIRE" => {
            if args.len() != 2 || parse_i64(&args[1]).is_none() {
                return Err(wrong_arity(b"expire"));
            }
            Ok(Command::ParsedButUnexecuted(b"EXPIRE".to_vec()))
        }
        b"EXPIREAT" => {
            if args.len() != 2 || parse_i64(&args[1]).is_none() {
                return Err(wrong_arity(b"expireat"));
            }
            Ok(Command::ParsedButUnexecuted(b"EXPIREAT".to_vec()))
        }
        b"EXPIRETIME" => {
            if args.len() != 1 {
                return Err(wrong_arity(b"expiretime"));
            }
            Ok(Command::ParsedButUnexecuted(b"EXPIRETIME".to_vec()))
        }
        b"TTL" => {
            if args.len() != 1 {
                return Err(wrong_arity(b"ttl"));
            }
            Ok(Command::ParsedButUnexecuted(b"TTL".to_vec()))
        }
        b"KEYS" => {
            if args.len() != 1 {
                return Err(wrong_arity(b"keys"));
            }
            Ok(Command::ParsedButUnexecuted(b"KEYS".to_vec()))
        }
        b"GETSET" => {
            if args.len() != 2 {
                return Err(wrong_arity(b"getset"));
            }
            Ok(Command::ParsedButUnexecuted(b"GETSET".to_vec()))
        }
        b"GETEX" => {
            match args.len() {
                1 => {}
                3 if eq_ignore_case(&args[1], "EX") && parse_i64(&args[2]).is_some() => {}
                _ => return Err(wrong_arity(b"getex")),
            }
            Ok(Command::ParsedButUnexecuted(b"GETEX".to_vec()))
        }
        b"ZADD" => {
            if args.len() < 3 {
                return Err(wrong_arity(b"zadd"));
            }
            let rest = &args[1..];
            if rest.len() % 2 != 0 {
                return Err(wrong_arity(b"zadd"));
            }
            for pair in rest.chunks(2) {
                if parse_f64(&pair[0]).is_none() {
                    return Err(bad_type(b"zadd"));
                }
            }
            Ok(Command::ParsedButUnexecuted(b"ZADD".to_vec()))
        }
        b"ZCARD" => {
            if args.len() != 1 {
                return Err(wrong_arity(b"zcard"));
            }
            Ok(Command::ParsedButUnexecuted(b"ZCARD".to_vec()))
        }
        b"ZCOUNT" => {
            if args.len() != 3 || parse_f64(&args[1]).is_none() || parse_f64(&args[2]).is_none() {
                return Err(wrong_arity(b"zcount"));
            }
            Ok(Command::ParsedButUnexecuted(b"ZCOUNT".to_vec()))
        }
        b"ZPOPMIN" => classify_zpop(args, b"zpopmin"),
        b"ZPOPMAX" => classify_zpop(args, b"zpopmax"),
        b"ZRANK" => {
            if args.len() != 2 {
                return Err(wrong_arity(b"zrank"));
            }
            Ok(Command::ParsedButUnexecuted(b"ZRANK".to_vec()))
        }
        b"ZREM" => {
            if args.len() < 2 {
                return Err(wrong_arity(b"zrem"));
            }
            Ok(Command::ParsedButUnexecuted(b"ZREM".to_vec()))
        }
        b"ZRANGE" => classify_zrange(args),
        _ => Ok(Command::Unknown(req.name)),
    }
}

fn classify_zpop(args: Vec<Vec<u8>>, name: &[u8]) -> Result<Command, CommandError> {
    match args.len() {
        1 => {}
        2 if parse_i64(&args[1]).is_some() => {}
        _ => return Err(wrong_arity(name)),
    }
    Ok(Command::ParsedButUnexecuted(name.to_ascii_uppercase()))
}

fn classify_zrange(args: Vec<Vec<u8>>) -> Result<Command, CommandError> {
    match args.len() {
        3 => {}
        4 if eq_ignore_case(&args[3], "WITHSCORES") => {}
        4 => return Err(CommandError::InvalidCommandFormat(
            "Syntax error".to_string(),
        )),
        _ => return Err(wrong_arity(b"zrange")),
    }
    Ok(Command::ParsedButUnexecuted(b"ZRANGE".to_vec()))
}

fn classify_client(args: Vec<Vec<u8>>) -> Result<Command, CommandError> {
    if args.is_empty() {
        return Err(CommandError::InvalidCommandFormat(
            "Syntax error, try CLIENT HELP".to_string(),
        ));
    }
    if !eq_ignore_case(&args[0], "SETINFO") {
        return Err(CommandError::InvalidCommandFormat(
            "Syntax error, try CLIENT HELP".to_string(),
        ));
    }
    if args.len() != 3 {
        return Err(wrong_arity(b"client|setinfo"));
    }
    let field = if eq_ignore_case(&args[1], "LIB-NAME") {
        ClientInfoField::LibName
    } else if eq_ignore_case(&args[1], "LIB-VER") {
        ClientInfoField::LibVer
    } else {
        ClientInfoField::Other(args[1].clone())
    };
    Ok(Command::ClientSetInfo(field, args[2].clone()))
}

fn into_one(mut args: Vec<Vec<u8>>) -> Vec<u8> {
    args.pop().unwrap()
}
