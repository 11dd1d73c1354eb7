/*!
 * Connection loop: accept TCP connections and run one blocking
 * read/decode/execute/write worker thread per connection.
 *
 * There is no async runtime and no thread pool here — spec.md's
 * concurrency model is deliberately the simplest one that's correct:
 * one OS thread per connection, serialized access to the dataspace
 * through a single mutex (see [`crate::exec::SharedDataspace`]).
 */

use crate::command::classify;
use crate::exec::{command_error_reply, execute, ClientInfo, SharedDataspace};
use crate::protocol::{decode_frame, resp_error};
use anyhow::{Context, Result};
use bytes::{Buf, BytesMut};
use log::{debug, info, warn};
use socket2::{Domain, Socket, Type};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

/// Bytes read from the socket per `read()` call. The per-connection
/// accumulator grows beyond this as needed to hold a frame that spans
/// multiple reads; this is just the syscall chunk size.
const READ_CHUNK: usize = 4096;

/// Bind a listener with `SO_REUSEADDR` set, the way a restarted server
/// expects to be able to rebind its port immediately.
pub fn bind_reuseaddr(addr: SocketAddr) -> Result<TcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, None).context("create socket")?;
    socket.set_reuse_address(true).context("set SO_REUSEADDR")?;
    socket.bind(&addr.into()).context("bind listener")?;
    socket.listen(1024).context("listen")?;
    Ok(socket.into())
}

/// Accept connections forever, spawning a detached worker thread per
/// connection. Blocks until the listener errors.
pub fn run_server(listener: TcpListener, state: SharedDataspace) -> Result<()> {
    info!("statedb listening on {}", listener.local_addr()?);
    for incoming in listener.incoming() {
        let stream = match incoming {
            Ok(s) => s,
            Err(e) => {
                warn!("accept error: {e}");
                continue;
            }
        };
        let state = state.clone();
        std::thread::spawn(move || handle_connection(stream, state));
    }
    Ok(())
}

fn handle_connection(stream: TcpStream, state: SharedDataspace) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    debug!("accepted connection from {peer}");
    let mut client = ClientInfo::new(peer.clone());

    if let Err(e) = connection_loop(stream, &state, &mut client) {
        warn!("connection {peer} closed with error: {e}");
    } else {
        debug!("connection {peer} closed");
    }
}

fn connection_loop(
    mut stream: TcpStream,
    state: &SharedDataspace,
    client: &mut ClientInfo,
) -> Result<()> {
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => return Ok(()), // peer closed
            Ok(n) => n,
            Err(e) if is_quiet_disconnect(&e) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        buf.extend_from_slice(&chunk[..n]);

        loop {
            if buf.is_empty() {
                break; // fully drained; wait for the next read
            }
            match decode_frame(&buf) {
                Ok(Some((consumed, req))) => {
                    buf.advance(consumed);
                    let reply = match classify(req) {
                        Ok(cmd) => execute(cmd, state, client),
                        Err(e) => command_error_reply(e),
                    };
                    write_all(&mut stream, &reply)?;
                }
                Ok(None) => break, // need more bytes
                Err(e) => {
                    debug!("decode error from {}: {e}", client.peer_addr);
                    write_all(&mut stream, &resp_error("ERR invalid command format"))?;
                    // The decoder does not resynchronize on error; the
                    // next read starts a fresh frame.
                    buf.clear();
                    break;
                }
            }
        }
    }
}

fn write_all(stream: &mut TcpStream, bytes: &[u8]) -> Result<()> {
    match stream.write_all(bytes) {
        Ok(()) => Ok(()),
        Err(e) if is_quiet_disconnect(&e) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn is_quiet_disconnect(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
    )
}

