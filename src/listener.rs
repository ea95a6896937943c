//! Listener impl

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};
use std::os::fd::{FromRawFd, IntoRawFd};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

/// How long a worker waits in a read before an idle connection is dropped.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(15);

/// A passive IPv4 TCP socket bound to all interfaces.
///
/// The socket itself is non-blocking and driven by the acceptor's poll loop;
/// accepted connections are converted back to blocking streams, since each
/// one is owned by a single worker for its whole life.
#[derive(Debug)]
pub struct Listener {
    inner: mio::net::TcpListener,
}

impl Listener {
    /// Opens a listening socket on `port` with the given accept backlog.
    ///
    /// `SO_REUSEADDR` is set so a restart does not trip over sockets in
    /// TIME_WAIT. Port 0 binds an ephemeral port; see [`Listener::local_addr`].
    pub fn bind(port: u16, backlog: i32) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;

        let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
        socket.bind(&addr.into())?;
        socket.listen(backlog)?;
        socket.set_nonblocking(true)?;

        Ok(Listener {
            inner: mio::net::TcpListener::from_std(socket.into()),
        })
    }

    /// The bound address, chiefly useful after binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accepts one pending connection, returning a blocking stream with the
    /// receive timeout applied.
    ///
    /// Returns `WouldBlock` when the accept queue is empty; other errors are
    /// transient and the caller simply retries on the next readiness event.
    pub fn accept(&self) -> io::Result<TcpStream> {
        let (stream, _addr) = self.inner.accept()?;

        // mio hands out non-blocking sockets; workers want the plain
        // blocking kind.
        // SAFETY: into_raw_fd transfers ownership of a valid open socket.
        let stream = unsafe { TcpStream::from_raw_fd(stream.into_raw_fd()) };
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(RECV_TIMEOUT))?;
        Ok(stream)
    }

    pub(crate) fn source(&mut self) -> &mut mio::net::TcpListener {
        &mut self.inner
    }
}
