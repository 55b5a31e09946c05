use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// Datagram primitives the connection manager needs from its socket.
///
/// `try_recv` must never block: it returns `Ok(None)` when nothing is queued.
pub trait Transport {
    fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> io::Result<usize>;

    fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>>;

    fn local_addr(&self) -> io::Result<SocketAddr>;

    fn is_open(&self) -> bool;

    /// Releases the underlying handle. Calling it twice is harmless.
    fn close(&mut self);
}

/// Non-blocking UDP socket.
#[derive(Debug)]
pub struct UdpTransport {
    socket: Option<UdpSocket>,
}

impl UdpTransport {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;

        Ok(Self {
            socket: Some(socket),
        })
    }

    /// Binds every interface on `port`. Port 0 picks an ephemeral port.
    pub fn listen(port: u16) -> io::Result<Self> {
        Self::bind(("0.0.0.0", port))
    }

    fn socket(&self) -> io::Result<&UdpSocket> {
        self.socket
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Socket closed"))
    }
}

impl Transport for UdpTransport {
    fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
        let sent = self.socket()?.send_to(data, addr)?;
        if sent != data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("Short send: {} of {} bytes", sent, data.len()),
            ));
        }
        Ok(sent)
    }

    fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket()?.recv_from(buf) {
            Ok((size, addr)) => Ok(Some((size, addr))),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket()?.local_addr()
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    fn close(&mut self) {
        self.socket = None;
    }
}
