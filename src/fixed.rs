//! Single-client handler that always offers the same address.
//!
//! Suited to a point-to-point link such as a shared network adapter, where
//! exactly one device asks for an address. There is no lease bookkeeping:
//! every DISCOVER is offered the configured address and every REQUEST is
//! acknowledged with it.

use std::net::Ipv4Addr;

use tracing::{info, warn};

use crate::config::Config;
use crate::dispatch::{DhcpHandler, Exchange};
use crate::error::Result;
use crate::options::MessageType;
use crate::reply::{ReplyConfiguration, ReplyOverrides};

pub struct FixedAddressHandler {
    offered_address: Ipv4Addr,
    reply: ReplyConfiguration,
}

impl FixedAddressHandler {
    pub fn new(offered_address: Ipv4Addr, reply: ReplyConfiguration) -> Self {
        Self {
            offered_address,
            reply,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.offered_address, config.reply.clone())
    }

    pub fn offered_address(&self) -> Ipv4Addr {
        self.offered_address
    }
}

impl DhcpHandler for FixedAddressHandler {
    fn on_discover(&self, exchange: &mut Exchange<'_>) -> Result<()> {
        exchange.send_reply(
            MessageType::Offer,
            self.offered_address,
            Some(&self.reply),
            &ReplyOverrides::default(),
        );
        Ok(())
    }

    fn on_request(&self, exchange: &mut Exchange<'_>) -> Result<()> {
        let request = exchange.request();
        let requested = request.requested_ip();
        if let Some(requested) = requested.filter(|&ip| ip != self.offered_address) {
            info!(
                "{} asked for {}, acknowledging {} instead",
                request.packet().format_mac(),
                requested,
                self.offered_address
            );
        }

        exchange.send_reply(
            MessageType::Ack,
            self.offered_address,
            Some(&self.reply),
            &ReplyOverrides::default(),
        );
        Ok(())
    }

    fn on_decline(&self, exchange: &mut Exchange<'_>) -> Result<()> {
        warn!(
            "{} declined {}: address may already be in use",
            exchange.request().packet().format_mac(),
            self.offered_address
        );
        Ok(())
    }

    fn on_release(&self, exchange: &mut Exchange<'_>) -> Result<()> {
        info!(
            "{} released {}",
            exchange.request().packet().format_mac(),
            exchange
                .request()
                .client_ip()
                .unwrap_or(self.offered_address)
        );
        Ok(())
    }

    fn on_inform(&self, exchange: &mut Exchange<'_>) -> Result<()> {
        exchange.send_reply(
            MessageType::Ack,
            Ipv4Addr::UNSPECIFIED,
            Some(&self.reply),
            &ReplyOverrides::default(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Dispatcher, Transport};
    use crate::options::{OptionIter, encode_option};
    use crate::packet::{DHCP_MAGIC_COOKIE, DhcpMessage};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
    }

    impl Transport for RecordingTransport {
        async fn send_to(&self, bytes: &[u8], destination: SocketAddr) -> std::io::Result<usize> {
            self.sent.lock().await.push((bytes.to_vec(), destination));
            Ok(bytes.len())
        }
    }

    fn create_dhcp_packet(message_type: MessageType, ciaddr: [u8; 4], prl: &[u8]) -> Vec<u8> {
        let mut packet = vec![0u8; 240];
        packet[0] = 1;
        packet[1] = 1;
        packet[2] = 6;
        packet[4..8].copy_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        packet[12..16].copy_from_slice(&ciaddr);
        packet[28..34].copy_from_slice(&[0xaa, 0xbb, 0xcc, 0x00, 0x00, 0x01]);
        packet[236..240].copy_from_slice(&DHCP_MAGIC_COOKIE);
        encode_option(&mut packet, 53, &[message_type as u8]);
        encode_option(&mut packet, 55, prl);
        packet.push(255);
        packet
    }

    async fn exchange(message_type: MessageType, ciaddr: [u8; 4]) -> Vec<(DhcpMessage, SocketAddr)> {
        let config = Config::default();
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = Dispatcher::new(
            Arc::new(FixedAddressHandler::from_config(&config)),
            Arc::clone(&transport),
            config.reply_settings(),
        );

        dispatcher
            .dispatch(
                &create_dhcp_packet(message_type, ciaddr, &[1, 3, 6, 15]),
                "0.0.0.0:68".parse().unwrap(),
            )
            .await
            .unwrap();

        let sent = transport.sent.lock().await;
        sent.iter()
            .map(|(bytes, destination)| (DhcpMessage::decode(bytes).unwrap(), *destination))
            .collect()
    }

    fn codes(message: &DhcpMessage) -> Vec<u8> {
        OptionIter::new(&message.options)
            .map(|entry| entry.unwrap().0)
            .collect()
    }

    #[tokio::test]
    async fn test_discover_gets_offer() {
        let replies = exchange(MessageType::Discover, [0; 4]).await;
        assert_eq!(replies.len(), 1);

        let (offer, destination) = &replies[0];
        assert_eq!(*destination, "255.255.255.255:68".parse().unwrap());
        assert_eq!(offer.yiaddr, Ipv4Addr::new(192, 168, 137, 11));
        assert_eq!(offer.server_host_name().as_deref(), Some("dhcpserve"));
        assert_eq!(codes(offer), vec![53, 1, 3, 6, 15, 51, 54]);
        assert_eq!(
            crate::options::find_option(&offer.options, 15).unwrap(),
            Some(&b"dhcpserve"[..])
        );
        assert_eq!(
            crate::options::find_option(&offer.options, 53).unwrap(),
            Some(&[MessageType::Offer as u8][..])
        );
    }

    #[tokio::test]
    async fn test_request_gets_ack() {
        let replies = exchange(MessageType::Request, [0; 4]).await;
        assert_eq!(replies.len(), 1);

        let (ack, _) = &replies[0];
        assert_eq!(ack.yiaddr, Ipv4Addr::new(192, 168, 137, 11));
        assert_eq!(
            crate::options::find_option(&ack.options, 53).unwrap(),
            Some(&[MessageType::Ack as u8][..])
        );
    }

    #[tokio::test]
    async fn test_inform_ack_without_lease() {
        let replies = exchange(MessageType::Inform, [192, 168, 137, 11]).await;
        assert_eq!(replies.len(), 1);

        let (ack, _) = &replies[0];
        assert_eq!(ack.yiaddr, Ipv4Addr::UNSPECIFIED);
        assert_eq!(ack.ciaddr, Ipv4Addr::new(192, 168, 137, 11));
        assert_eq!(codes(ack), vec![53, 1, 3, 6, 15, 54]);
    }

    #[tokio::test]
    async fn test_release_and_decline_are_not_answered() {
        assert!(exchange(MessageType::Release, [192, 168, 137, 11]).await.is_empty());
        assert!(exchange(MessageType::Decline, [0; 4]).await.is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            offered_address: Ipv4Addr::new(10, 1, 1, 5),
            ..Default::default()
        };
        let handler = FixedAddressHandler::from_config(&config);
        assert_eq!(handler.offered_address(), Ipv4Addr::new(10, 1, 1, 5));
    }
}
