use statedb::command::Command;
use statedb::exec::{execute, ClientInfo};
use statedb::storage::Dataspace;
use std::sync::{Arc, Mutex};

fn fresh() -> (Arc<Mutex<Dataspace>>, ClientInfo) {
    (
        Arc::new(Mutex::new(Dataspace::new())),
        ClientInfo::new("127.0.0.1:0".into()),
    )
}

#[test]
fn set_get_del_cycle() {
    let (state, mut client) = fresh();
    assert_eq!(
        execute(Command::Set(b"a".to_vec(), b"1".to_vec()), &state, &mut client),
        b"+OK\r\n"
    );
    assert_eq!(
        execute(Command::Get(b"a".to_vec()), &state, &mut client),
        b"$1\r\n1\r\n"
    );
    assert_eq!(
        execute(Command::Del(vec![b"a".to_vec()]), &state, &mut client),
        b":1\r\n"
    );
    assert_eq!(
        execute(Command::Get(b"a".to_vec()), &state, &mut client),
        b"$-1\r\n"
    );
    assert_eq!(
        execute(Command::Exists(vec![b"a".to_vec()]), &state, &mut client),
        b":0\r\n"
    );
}

#[test]
fn exists_counts_duplicates_separately() {
    let (state, mut client) = fresh();
    execute(Command::Set(b"x".to_vec(), b"1".to_vec()), &state, &mut client);
    assert_eq!(
        execute(
            Command::Exists(vec![b"x".to_vec(), b"x".to_vec(), b"missing".to_vec()]),
            &state,
            &mut client
        ),
        b":2\r\n"
    );
}

#[test]
fn incrby_on_string_tagged_value() {
    let (state, mut client) = fresh();
    execute(Command::Set(b"n".to_vec(), b"0".to_vec()), &state, &mut client);
    assert_eq!(
        execute(Command::IncrBy(b"n".to_vec(), 5), &state, &mut client),
        b":5\r\n"
    );
    assert_eq!(
        execute(Command::Get(b"n".to_vec()), &state, &mut client),
        b":5\r\n"
    );
}

#[test]
fn getdel_removes_only_string_or_integer() {
    let (state, mut client) = fresh();
    execute(Command::Set(b"k".to_vec(), b"v".to_vec()), &state, &mut client);
    assert_eq!(
        execute(Command::GetDel(b"k".to_vec()), &state, &mut client),
        b"$1\r\nv\r\n"
    );
    assert_eq!(
        execute(Command::Exists(vec![b"k".to_vec()]), &state, &mut client),
        b":0\r\n"
    );
}

#[test]
fn hset_hget_hgetall() {
    let (state, mut client) = fresh();
    assert_eq!(
        execute(
            Command::HSet(b"h".to_vec(), vec![(b"f".to_vec(), b"v".to_vec())]),
            &state,
            &mut client
        ),
        b":1\r\n"
    );
    // re-setting the same field reports zero new fields
    assert_eq!(
        execute(
            Command::HSet(b"h".to_vec(), vec![(b"f".to_vec(), b"v2".to_vec())]),
            &state,
            &mut client
        ),
        b":0\r\n"
    );
    assert_eq!(
        execute(Command::HGet(b"h".to_vec(), b"f".to_vec()), &state, &mut client),
        b"$2\r\nv2\r\n"
    );
    let all = execute(Command::HGetAll(b"h".to_vec()), &state, &mut client);
    assert_eq!(all, b"*2\r\n$1\r\nf\r\n$2\r\nv2\r\n");
}

#[test]
fn flushdb_clears_everything() {
    let (state, mut client) = fresh();
    execute(Command::Set(b"a".to_vec(), b"1".to_vec()), &state, &mut client);
    execute(Command::FlushDb, &state, &mut client);
    assert_eq!(
        execute(Command::Exists(vec![b"a".to_vec()]), &state, &mut client),
        b":0\r\n"
    );
}
