//! # Relay Bidireccional
//! src/handlers/relay.rs
//!
//! Bombea bytes entre el cliente y el upstream usando `poll(2)` sobre los
//! dos sockets. La espera no tiene timeout: si ninguno de los dos lados
//! vuelve a estar listo, el worker queda ocupado hasta que termine el
//! proceso (visible en `MetricsCollector::active_relays`).
//!
//! Termina cuando cualquiera de los lados llega a EOF o falla una lectura o
//! escritura. En todos los casos ambos sockets quedan cerrados
//! (`shutdown(Both)`) al salir.

use crate::error::RelayError;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::fd::AsFd;

/// Lado de un relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Upstream,
}

impl Side {
    const BOTH: [Side; 2] = [Side::Client, Side::Upstream];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Client => "client",
            Side::Upstream => "upstream",
        }
    }

    fn other(self) -> Side {
        match self {
            Side::Client => Side::Upstream,
            Side::Upstream => Side::Client,
        }
    }
}

/// Resumen de un relay que terminó por EOF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOutcome {
    /// Bytes copiados del cliente al upstream
    pub to_upstream: u64,
    /// Bytes copiados del upstream al cliente
    pub to_client: u64,
    /// Lado que cerró primero
    pub closed_by: Side,
}

/// Hace relay entre `client` y `upstream` hasta EOF o error, y cierra ambos
/// sockets antes de retornar.
pub fn relay(
    client: &TcpStream,
    upstream: &TcpStream,
    buffer_size: usize,
) -> Result<RelayOutcome, RelayError> {
    let result = pump(client, upstream, buffer_size);

    // ENOTCONN si el peer ya cerró; no importa
    let _ = client.shutdown(Shutdown::Both);
    let _ = upstream.shutdown(Shutdown::Both);

    result
}

fn pump(
    client: &TcpStream,
    upstream: &TcpStream,
    buffer_size: usize,
) -> Result<RelayOutcome, RelayError> {
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut moved = [0u64; 2];
    let socket = |side: Side| match side {
        Side::Client => client,
        Side::Upstream => upstream,
    };

    loop {
        let mut fds = [
            PollFd::new(client.as_fd(), PollFlags::POLLIN),
            PollFd::new(upstream.as_fd(), PollFlags::POLLIN),
        ];

        match poll(&mut fds, PollTimeout::NONE) {
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(RelayError::Poll(errno)),
        }

        let mut ready = [false; 2];
        for (i, fd) in fds.iter().enumerate() {
            let revents = fd.revents().unwrap_or_else(PollFlags::empty);
            if revents.contains(PollFlags::POLLNVAL) {
                return Err(RelayError::InvalidDescriptor {
                    side: Side::BOTH[i].as_str(),
                });
            }
            // HUP y ERR también se resuelven con read: 0 bytes o el error
            ready[i] = revents
                .intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR);
        }

        for from in Side::BOTH {
            if !ready[from as usize] {
                continue;
            }

            let mut reader = socket(from);
            let n = match reader.read(&mut buffer) {
                Ok(0) => {
                    return Ok(RelayOutcome {
                        to_upstream: moved[Side::Client as usize],
                        to_client: moved[Side::Upstream as usize],
                        closed_by: from,
                    });
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(RelayError::Read {
                        side: from.as_str(),
                        source,
                    })
                }
            };

            // write_all reintenta escrituras cortas e interrumpidas
            let to = from.other();
            let mut writer = socket(to);
            writer
                .write_all(&buffer[..n])
                .map_err(|source| RelayError::Write {
                    side: to.as_str(),
                    source,
                })?;
            moved[from as usize] += n as u64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    /// Par de sockets TCP conectados por loopback
    fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let a = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (b, _) = listener.accept().unwrap();
        (a, b)
    }

    /// Upstream que devuelve todo lo que recibe hasta EOF
    fn spawn_echo(mut stream: TcpStream) -> thread::JoinHandle<u64> {
        thread::spawn(move || {
            let mut reader = stream.try_clone().unwrap();
            std::io::copy(&mut reader, &mut stream).unwrap_or(0)
        })
    }

    #[test]
    fn test_echo_is_byte_exact_across_chunks() {
        let (mut client, client_side) = socket_pair();
        let (upstream_side, upstream) = socket_pair();
        let echo = spawn_echo(upstream);

        // Buffer chico a propósito: el payload cruza muchos bloques
        let relay_thread =
            thread::spawn(move || relay(&client_side, &upstream_side, 7).unwrap());

        let payload: Vec<u8> = (0..200_000u32).map(|i| (i * 31 % 251) as u8).collect();
        let writer = {
            let mut client = client.try_clone().unwrap();
            let payload = payload.clone();
            thread::spawn(move || client.write_all(&payload).unwrap())
        };

        client.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        let mut echoed = vec![0u8; payload.len()];
        client.read_exact(&mut echoed).unwrap();
        writer.join().unwrap();
        assert_eq!(echoed, payload);

        client.shutdown(Shutdown::Write).unwrap();
        let outcome = relay_thread.join().unwrap();
        assert_eq!(outcome.closed_by, Side::Client);
        assert_eq!(outcome.to_upstream, payload.len() as u64);
        assert_eq!(outcome.to_client, payload.len() as u64);

        // El relay cerró el socket del cliente
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());
        echo.join().unwrap();
    }

    #[test]
    fn test_upstream_eof_ends_relay() {
        let (mut client, client_side) = socket_pair();
        let (upstream_side, mut upstream) = socket_pair();

        let relay_thread =
            thread::spawn(move || relay(&client_side, &upstream_side, 1024).unwrap());

        upstream.write_all(b"HTTP/1.0 200 OK\r\n\r\nbye").unwrap();
        upstream.shutdown(Shutdown::Write).unwrap();

        client.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        let mut received = Vec::new();
        client.read_to_end(&mut received).unwrap();
        assert_eq!(received, b"HTTP/1.0 200 OK\r\n\r\nbye");

        let outcome = relay_thread.join().unwrap();
        assert_eq!(outcome.closed_by, Side::Upstream);
        assert_eq!(outcome.to_client, received.len() as u64);
        assert_eq!(outcome.to_upstream, 0);

        // El upstream también ve EOF
        upstream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        let mut rest = Vec::new();
        upstream.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());
    }

    #[test]
    fn test_client_request_reaches_upstream() {
        let (mut client, client_side) = socket_pair();
        let (upstream_side, mut upstream) = socket_pair();

        let relay_thread =
            thread::spawn(move || relay(&client_side, &upstream_side, 16).unwrap());

        client.write_all(b"GET / HTTP/1.0\r\n\r\n").unwrap();

        upstream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        let mut request = [0u8; 18];
        upstream.read_exact(&mut request).unwrap();
        assert_eq!(&request, b"GET / HTTP/1.0\r\n\r\n");

        drop(client);
        let outcome = relay_thread.join().unwrap();
        assert_eq!(outcome.closed_by, Side::Client);
        assert_eq!(outcome.to_upstream, 18);
    }
}
