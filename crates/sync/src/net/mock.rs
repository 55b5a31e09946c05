//! In-memory transport for unit tests. Clones share the same queues.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;

use super::protocol::Packet;
use super::transport::Transport;

#[derive(Debug)]
struct Inner {
    inbox: VecDeque<(Vec<u8>, SocketAddr)>,
    sent: Vec<(Vec<u8>, SocketAddr)>,
    open: bool,
    fail_sends: bool,
    local_addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct MemoryTransport {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                inbox: VecDeque::new(),
                sent: Vec::new(),
                open: true,
                fail_sends: false,
                local_addr: "127.0.0.1:3450".parse().unwrap(),
            })),
        }
    }

    pub fn push_raw(&self, data: Vec<u8>, from: SocketAddr) {
        self.inner.borrow_mut().inbox.push_back((data, from));
    }

    pub fn push_packet(&self, packet: &Packet, from: SocketAddr) {
        self.push_raw(packet.encode(), from);
    }

    pub fn take_sent(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        std::mem::take(&mut self.inner.borrow_mut().sent)
    }

    pub fn take_sent_packets(&self) -> Vec<(Packet, SocketAddr)> {
        self.take_sent()
            .into_iter()
            .map(|(data, addr)| (Packet::decode(&data).unwrap(), addr))
            .collect()
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.inner.borrow_mut().fail_sends = fail;
    }
}

impl Transport for MemoryTransport {
    fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
        let mut inner = self.inner.borrow_mut();
        if !inner.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
        }
        if inner.fail_sends {
            return Err(io::Error::other("injected failure"));
        }
        inner.sent.push((data.to_vec(), addr));
        Ok(data.len())
    }

    fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        let mut inner = self.inner.borrow_mut();
        match inner.inbox.pop_front() {
            Some((data, from)) => {
                let size = data.len().min(buf.len());
                buf[..size].copy_from_slice(&data[..size]);
                Ok(Some((size, from)))
            }
            None => Ok(None),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.inner.borrow().local_addr)
    }

    fn is_open(&self) -> bool {
        self.inner.borrow().open
    }

    fn close(&mut self) {
        self.inner.borrow_mut().open = false;
    }
}
