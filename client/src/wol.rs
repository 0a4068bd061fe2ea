//! Wake-on-LAN
//!
//! A magic packet is a single UDP broadcast. There is no acknowledgement, so
//! a successful send only means the OS accepted the datagram.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::info;

use crate::error::WakeError;
use crate::types::ServerDescriptor;
use crate::validate::is_valid_ipv4;

/// Discard port conventionally used for magic packets.
pub const WOL_PORT: u16 = 9;
pub const MAGIC_PACKET_LEN: usize = 102;

/// Parse a MAC address written with `:` or `-` separators (or none).
pub fn parse_mac(mac: &str) -> Result<[u8; 6], WakeError> {
    let hex: String = mac.chars().filter(|c| *c != ':' && *c != '-').collect();
    if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WakeError::InvalidMac(mac.to_string()));
    }

    let mut addr = [0u8; 6];
    for (i, byte) in addr.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|_| WakeError::InvalidMac(mac.to_string()))?;
    }
    Ok(addr)
}

/// 6 bytes of 0xFF followed by the MAC repeated 16 times.
pub fn build_magic_packet(mac: &[u8; 6]) -> [u8; MAGIC_PACKET_LEN] {
    let mut packet = [0xFFu8; MAGIC_PACKET_LEN];
    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(mac);
    }
    packet
}

/// Where and to whom a magic packet is sent.
#[derive(Debug, Clone)]
pub struct WakeTarget {
    pub mac_address: [u8; 6],
    pub broadcast_address: Ipv4Addr,
    pub port: u16,
}

impl WakeTarget {
    pub fn new(mac: &str, broadcast: &str) -> Result<Self, WakeError> {
        let mac_address = parse_mac(mac)?;
        if !is_valid_ipv4(broadcast) {
            return Err(WakeError::InvalidBroadcast(broadcast.to_string()));
        }
        let broadcast_address = broadcast
            .parse()
            .map_err(|_| WakeError::InvalidBroadcast(broadcast.to_string()))?;

        Ok(Self {
            mac_address,
            broadcast_address,
            port: WOL_PORT,
        })
    }

    pub fn from_descriptor(server: &ServerDescriptor) -> Result<Self, WakeError> {
        if !server.is_wake_configured() {
            return Err(WakeError::NotConfigured);
        }
        match (&server.mac_address, &server.broadcast_address) {
            (Some(mac), Some(broadcast)) => Self::new(mac, broadcast),
            _ => Err(WakeError::NotConfigured),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn packet(&self) -> [u8; MAGIC_PACKET_LEN] {
        build_magic_packet(&self.mac_address)
    }

    pub fn mac_string(&self) -> String {
        self.mac_address
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Send the packet once from an ephemeral, broadcast-enabled socket.
    pub async fn send(&self) -> Result<(), WakeError> {
        let packet = self.packet();

        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;

        let target = SocketAddr::new(IpAddr::V4(self.broadcast_address), self.port);
        socket.send_to(&packet, target).await?;

        info!("Magic packet for {} sent to {}", self.mac_string(), target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mac() {
        assert_eq!(
            parse_mac("A1-B2-C3-D4-E5-F6").unwrap(),
            [0xa1, 0xb2, 0xc3, 0xd4, 0xe5, 0xf6]
        );
        assert_eq!(
            parse_mac("aa:bb:cc:dd:ee:ff").unwrap(),
            [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]
        );
        assert!(parse_mac("aa:bb:cc").is_err());
        assert!(parse_mac("aa:bb:cc:dd:ee:gg").is_err());
        assert!(parse_mac("+a:bb:cc:dd:ee:ff").is_err());
    }

    #[test]
    fn test_magic_packet_format() {
        let mac = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        let packet = build_magic_packet(&mac);

        assert_eq!(packet.len(), 102);
        assert_eq!(&packet[0..6], &[0xFF; 6]);
        for i in 0..16 {
            let offset = 6 + (i * 6);
            assert_eq!(&packet[offset..offset + 6], &mac);
        }
    }

    #[test]
    fn test_wake_target() {
        let target = WakeTarget::new("A1-B2-C3-D4-E5-F6", "192.168.0.255").unwrap();
        assert_eq!(target.port, 9);
        assert_eq!(target.broadcast_address, Ipv4Addr::new(192, 168, 0, 255));
        assert_eq!(target.mac_string(), "a1:b2:c3:d4:e5:f6");

        assert!(matches!(
            WakeTarget::new("A1-B2-C3-D4-E5-F6", "2001:db8::1"),
            Err(WakeError::InvalidBroadcast(_))
        ));
    }

    #[test]
    fn test_from_descriptor_requires_wake_config() {
        let server = ServerDescriptor::new(1, "nas");
        assert!(matches!(
            WakeTarget::from_descriptor(&server),
            Err(WakeError::NotConfigured)
        ));

        let server = server.with_wake("A1-B2-C3-D4-E5-F6", "10.0.0.255");
        let target = WakeTarget::from_descriptor(&server).unwrap().with_port(4009);
        assert_eq!(target.port, 4009);
    }

    #[tokio::test]
    async fn test_send_reaches_listener() {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let target = WakeTarget::new("11:22:33:44:55:66", "127.0.0.1")
            .unwrap()
            .with_port(port);
        target.send().await.unwrap();

        let mut buf = [0u8; 256];
        let (n, _) = listener.recv_from(&mut buf).await.unwrap();
        assert_eq!(n, 102);
        assert_eq!(&buf[..n], &target.packet()[..]);
    }
}
