//! UDP datagram transport.
//!
//! Each message travels as one datagram holding two length-prefixed frames:
//!
//! ```text
//! [u32 BE topic len][topic bytes][u32 BE body len][body bytes]
//! ```

use super::{Message, TopicFilter, Transport};
use crate::config::BroadcastConfig;
use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};
use tracing::warn;

/// Sleep between readiness checks while waiting in `poll`.
const POLL_TICK: Duration = Duration::from_millis(2);

/// Length prefix size for each frame.
const FRAME_HEADER: usize = 4;

/// Pub/sub over a non-blocking UDP socket.
///
/// Messages go to `target`, which may be the socket's own address (loopback
/// within one process) or a broadcast address shared by several processes.
pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
    max_datagram: usize,
    filter: TopicFilter,
}

impl UdpTransport {
    /// Bind according to `config`.
    pub fn bind(config: &BroadcastConfig) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind)?;
        Self::from_socket(socket, config.target, config.max_datagram)
    }

    /// Bind an ephemeral loopback port that sends to itself.
    pub fn loopback() -> Result<Self> {
        let socket = UdpSocket::bind(("127.0.0.1", 0))?;
        let target = socket.local_addr()?;
        Self::from_socket(socket, target, BroadcastConfig::default().max_datagram)
    }

    fn from_socket(socket: UdpSocket, target: SocketAddr, max_datagram: usize) -> Result<Self> {
        socket.set_nonblocking(true)?;
        socket.set_broadcast(true)?;
        Ok(Self {
            socket,
            target,
            max_datagram,
            filter: TopicFilter::default(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    fn has_datagram(&self) -> Result<bool> {
        let mut probe = [0u8; 1];
        match self.socket.peek_from(&mut probe) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn encode_frames(topic: &[u8], body: &[u8]) -> Vec<u8> {
    let mut datagram = Vec::with_capacity(2 * FRAME_HEADER + topic.len() + body.len());
    for part in [topic, body] {
        datagram.extend_from_slice(&(part.len() as u32).to_be_bytes());
        datagram.extend_from_slice(part);
    }
    datagram
}

fn split_frame(buf: &[u8]) -> Result<(&[u8], &[u8])> {
    if buf.len() < FRAME_HEADER {
        return Err(Error::Transport("truncated frame header".into()));
    }
    let (header, rest) = buf.split_at(FRAME_HEADER);
    let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    if rest.len() < len {
        return Err(Error::Transport(format!(
            "frame of {} bytes exceeds remaining {}",
            len,
            rest.len()
        )));
    }
    Ok(rest.split_at(len))
}

fn decode_frames(datagram: &[u8]) -> Result<Message> {
    let (topic, rest) = split_frame(datagram)?;
    let (body, rest) = split_frame(rest)?;
    if !rest.is_empty() {
        return Err(Error::Transport(format!("{} trailing bytes after body", rest.len())));
    }
    let topic = std::str::from_utf8(topic)
        .map_err(|e| Error::Transport(format!("topic is not UTF-8: {}", e)))?;
    Ok(Message {
        topic: topic.to_string(),
        body: body.to_vec(),
    })
}

impl Transport for UdpTransport {
    fn send(&self, topic: &str, body: &[u8]) -> Result<()> {
        let datagram = encode_frames(topic.as_bytes(), body);
        if datagram.len() > self.max_datagram {
            return Err(Error::Transport(format!(
                "message of {} bytes exceeds datagram limit {}",
                datagram.len(),
                self.max_datagram
            )));
        }
        self.socket.send_to(&datagram, self.target)?;
        Ok(())
    }

    fn poll(&self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.has_datagram()? {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            std::thread::sleep(POLL_TICK.min(deadline - now));
        }
    }

    fn recv(&self) -> Result<Option<Message>> {
        let mut buf = vec![0u8; self.max_datagram];
        let len = match self.socket.recv_from(&mut buf) {
            Ok((len, _)) => len,
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match decode_frames(&buf[..len]) {
            Ok(message) if self.filter.accepts(&message.topic) => Ok(Some(message)),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!(error = %e, bytes = len, "dropping unframeable datagram");
                Ok(None)
            }
        }
    }

    fn subscribe(&self, topic: &str) -> Result<()> {
        self.filter.add(topic);
        Ok(())
    }

    fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.filter.remove(topic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait_for(transport: &UdpTransport) -> Option<Message> {
        assert!(transport.poll(Duration::from_secs(2)).unwrap());
        transport.recv().unwrap()
    }

    #[test]
    fn test_frame_layout() {
        let datagram = encode_frames(b"ab", b"xyz");
        assert_eq!(datagram, [0, 0, 0, 2, b'a', b'b', 0, 0, 0, 3, b'x', b'y', b'z']);

        let message = decode_frames(&datagram).unwrap();
        assert_eq!(message.topic, "ab");
        assert_eq!(message.body, b"xyz");
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let datagram = encode_frames(b"topic", b"body");
        assert!(decode_frames(&datagram[..datagram.len() - 1]).is_err());
        assert!(decode_frames(&datagram[..2]).is_err());
    }

    #[test]
    fn test_loopback_delivery() {
        let transport = UdpTransport::loopback().unwrap();
        transport.subscribe("main").unwrap();

        transport.send("main", b"payload").unwrap();
        let message = wait_for(&transport).unwrap();
        assert_eq!(message.topic, "main");
        assert_eq!(message.body, b"payload");
    }

    #[test]
    fn test_loopback_filters_topics() {
        let transport = UdpTransport::loopback().unwrap();
        transport.subscribe("main").unwrap();

        transport.send("other", b"x").unwrap();
        assert_eq!(wait_for(&transport), None);
        assert!(!transport.poll(Duration::ZERO).unwrap());
    }

    #[test]
    fn test_discard_pending_empties_socket_buffer() {
        let transport = UdpTransport::loopback().unwrap();
        transport.send("main", b"before").unwrap();
        transport.send("other", b"before").unwrap();
        assert!(transport.poll(Duration::from_secs(2)).unwrap());

        transport.discard_pending().unwrap();
        assert!(!transport.poll(Duration::ZERO).unwrap());

        transport.subscribe("main").unwrap();
        transport.send("main", b"after").unwrap();
        assert_eq!(wait_for(&transport).unwrap().body, b"after");
    }

    #[test]
    fn test_oversized_send_rejected() {
        let transport = UdpTransport::loopback().unwrap();
        let body = vec![0u8; BroadcastConfig::default().max_datagram];
        assert!(matches!(transport.send("t", &body), Err(Error::Transport(_))));
    }

    #[test]
    fn test_garbage_datagram_dropped() {
        let transport = UdpTransport::loopback().unwrap();
        transport.subscribe("t").unwrap();

        let raw = UdpSocket::bind(("127.0.0.1", 0)).unwrap();
        raw.send_to(&[0xff, 0xff], transport.local_addr().unwrap()).unwrap();

        assert_eq!(wait_for(&transport), None);
    }
}
