//! Read-only view of a received DHCP request.
//!
//! [`DhcpRequest`] pairs the decoded message with its parsed option table
//! and answers the questions a handler asks about a client: what it wants,
//! who it is, and where the answer has to go.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::error::Result;
use crate::options::{MessageType, OptionCode, OptionIter, parse_options};
use crate::packet::DhcpMessage;
use crate::relay::RelayInfo;
use crate::reply::{ReplyConfiguration, ReplyOverrides, select_reply_options};

/// Port DHCP clients listen on.
pub const DHCP_CLIENT_PORT: u16 = 68;

/// Port DHCP servers and relay agents listen on.
pub const DHCP_SERVER_PORT: u16 = 67;

/// A decoded request whose option stream is known to be well formed.
#[derive(Debug, Clone)]
pub struct DhcpRequest {
    message: DhcpMessage,
    options: BTreeMap<u8, Vec<u8>>,
}

fn non_zero(address: Ipv4Addr) -> Option<Ipv4Addr> {
    (!address.is_unspecified()).then_some(address)
}

impl DhcpRequest {
    /// Decodes a raw UDP payload and validates its option stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TruncatedPacket`](crate::Error::TruncatedPacket) for
    /// payloads under 240 bytes and
    /// [`Error::MalformedOptions`](crate::Error::MalformedOptions) when an
    /// option runs past the end of the payload.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::from_message(DhcpMessage::decode(data)?)
    }

    /// Wraps an already decoded message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOptions`](crate::Error::MalformedOptions)
    /// when the option stream is malformed.
    pub fn from_message(message: DhcpMessage) -> Result<Self> {
        let options = parse_options(&message.options)?;
        Ok(Self { message, options })
    }

    /// Raw Option 53 value, 0 when the option is absent or empty.
    pub fn message_type_code(&self) -> u8 {
        self.option(OptionCode::MessageType as u8)
            .and_then(|value| value.first().copied())
            .unwrap_or(0)
    }

    /// Message type, or `None` for an absent or unrecognized Option 53.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::try_from(self.message_type_code()).ok()
    }

    /// Client address from `ciaddr`, `None` when unset.
    pub fn client_ip(&self) -> Option<Ipv4Addr> {
        non_zero(self.message.ciaddr)
    }

    /// Relay agent address from `giaddr`, `None` when the client is local.
    pub fn relay_gateway_ip(&self) -> Option<Ipv4Addr> {
        non_zero(self.message.giaddr)
    }

    /// Client hardware address, `hlen` bytes long.
    pub fn client_hardware_address(&self) -> &[u8] {
        self.message.chaddr_bytes()
    }

    /// Address requested through Option 50.
    ///
    /// Values that are not exactly four bytes are ignored.
    pub fn requested_ip(&self) -> Option<Ipv4Addr> {
        let value = self.option(OptionCode::RequestedIpAddress as u8)?;
        let octets: [u8; 4] = value.try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }

    /// Parameter request list (Option 55), `None` when the client sent none.
    pub fn requested_options(&self) -> Option<&[u8]> {
        self.option(OptionCode::ParameterRequestList as u8)
    }

    /// Value of the first occurrence of `code`.
    ///
    /// [`options`](Self::options) keeps the last occurrence instead, so the
    /// two disagree when a client repeats a code.
    pub fn option(&self, code: u8) -> Option<&[u8]> {
        OptionIter::new(&self.message.options)
            .map_while(|entry| entry.ok())
            .find(|(found, _)| *found == code)
            .map(|(_, value)| value)
    }

    /// All options, the last occurrence winning for repeated codes.
    pub fn options(&self) -> &BTreeMap<u8, Vec<u8>> {
        &self.options
    }

    /// Parsed relay agent information, `None` when Option 82 is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOptions`](crate::Error::MalformedOptions)
    /// if a sub-option runs past the Option 82 value.
    pub fn relay_info(&self) -> Result<Option<RelayInfo>> {
        self.option(OptionCode::RelayAgentInfo as u8)
            .map(RelayInfo::parse)
            .transpose()
    }

    /// The decoded message as received.
    pub fn packet(&self) -> &DhcpMessage {
        &self.message
    }

    /// Where a reply to this request is sent.
    ///
    /// Relayed requests are answered through the relay agent on the server
    /// port; local clients are reached on the client port of
    /// `broadcast_address`.
    pub fn reply_destination(&self, broadcast_address: Ipv4Addr) -> SocketAddr {
        match self.relay_gateway_ip() {
            Some(gateway) => SocketAddrV4::new(gateway, DHCP_SERVER_PORT).into(),
            None => SocketAddrV4::new(broadcast_address, DHCP_CLIENT_PORT).into(),
        }
    }

    /// Builds a reply message with options chosen by the reply selector.
    pub fn build_reply(
        &self,
        message_type: MessageType,
        assigned: Ipv4Addr,
        config: Option<&ReplyConfiguration>,
        overrides: &ReplyOverrides,
        server_name: Option<&str>,
    ) -> DhcpMessage {
        let options = select_reply_options(message_type, self, config, overrides);
        DhcpMessage::create_reply(
            &self.message,
            assigned,
            config.and_then(|config| config.next_server),
            server_name,
            options,
        )
    }
}
