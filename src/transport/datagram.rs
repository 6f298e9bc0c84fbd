use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// One UDP datagram per event, sent from a single reusable socket
#[derive(Debug)]
pub struct DatagramTransport {
    socket: UdpSocket,
    host: String,
    port: u16,
}

impl DatagramTransport {
    /// Binds an IPv4 socket unless the host only resolves to IPv6
    pub fn open(host: &str, port: u16) -> io::Result<Self> {
        let ipv6_only = match (host, port).to_socket_addrs() {
            Ok(addrs) => {
                let addrs: Vec<SocketAddr> = addrs.collect();
                !addrs.is_empty() && addrs.iter().all(SocketAddr::is_ipv6)
            }
            Err(e) => {
                log::debug!("Could not resolve {} yet: {}", host, e);
                false
            }
        };
        let bind_addr = if ipv6_only { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(bind_addr)?;
        log::info!("UDP transport ready, sending to {}:{}", host, port);
        Ok(Self {
            socket,
            host: host.to_string(),
            port,
        })
    }

    /// First resolved address in the socket's family
    fn target(&self) -> io::Result<SocketAddr> {
        let ipv4 = self.socket.local_addr()?.is_ipv4();
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .find(|addr| addr.is_ipv4() == ipv4)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!(
                        "{} has no {} address",
                        self.host,
                        if ipv4 { "IPv4" } else { "IPv6" }
                    ),
                )
            })
    }

    /// Payloads larger than the path MTU are not fragmented here
    pub fn send(&self, payload: &str) -> io::Result<()> {
        let target = self.target()?;
        let sent = self.socket.send_to(payload.as_bytes(), target)?;
        if sent < payload.len() {
            log::debug!("Datagram truncated: sent {} of {} bytes", sent, payload.len());
        }
        Ok(())
    }
}
