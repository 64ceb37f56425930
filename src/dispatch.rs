//! Per-datagram message dispatch.
//!
//! The [`Dispatcher`] decodes each datagram, hands it to the application's
//! [`DhcpHandler`], and sends whatever replies the handler queued. Handlers
//! are synchronous: they inspect the request through an [`Exchange`] and
//! call [`Exchange::send_reply`], which only encodes and queues. The
//! dispatcher performs the actual sends once the handler returns.

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::options::MessageType;
use crate::reply::{ReplyConfiguration, ReplyOverrides};
use crate::request::DhcpRequest;

/// Outgoing datagram sink.
///
/// Implemented for [`tokio::net::UdpSocket`]; tests substitute a recorder.
pub trait Transport: Send + Sync {
    fn send_to(
        &self,
        bytes: &[u8],
        destination: SocketAddr,
    ) -> impl Future<Output = std::io::Result<usize>> + Send;
}

impl Transport for UdpSocket {
    async fn send_to(&self, bytes: &[u8], destination: SocketAddr) -> std::io::Result<usize> {
        UdpSocket::send_to(self, bytes, destination).await
    }
}

impl<T: Transport> Transport for Arc<T> {
    fn send_to(
        &self,
        bytes: &[u8],
        destination: SocketAddr,
    ) -> impl Future<Output = std::io::Result<usize>> + Send {
        T::send_to(self, bytes, destination)
    }
}

/// Application callbacks, one per client message type.
///
/// [`on_message`](Self::on_message) runs for every decoded datagram, then at
/// most one typed callback runs. Every method defaults to doing nothing, so
/// an application implements only what it answers.
///
/// # Errors
///
/// A callback error drops the datagram: nothing queued for it is sent.
pub trait DhcpHandler: Send + Sync {
    fn on_message(&self, _exchange: &mut Exchange<'_>) -> Result<()> {
        Ok(())
    }

    fn on_discover(&self, _exchange: &mut Exchange<'_>) -> Result<()> {
        Ok(())
    }

    fn on_request(&self, _exchange: &mut Exchange<'_>) -> Result<()> {
        Ok(())
    }

    fn on_decline(&self, _exchange: &mut Exchange<'_>) -> Result<()> {
        Ok(())
    }

    fn on_release(&self, _exchange: &mut Exchange<'_>) -> Result<()> {
        Ok(())
    }

    fn on_inform(&self, _exchange: &mut Exchange<'_>) -> Result<()> {
        Ok(())
    }
}

/// Server-wide values applied to every reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplySettings {
    /// Written to the `sname` field of replies when set.
    pub server_name: Option<String>,
    /// Destination for replies to clients on the local segment.
    pub broadcast_address: Ipv4Addr,
}

impl Default for ReplySettings {
    fn default() -> Self {
        Self {
            server_name: None,
            broadcast_address: Ipv4Addr::BROADCAST,
        }
    }
}

/// An encoded reply waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingReply {
    pub message_type: MessageType,
    pub destination: SocketAddr,
    pub bytes: Vec<u8>,
}

/// One request and the replies queued for it.
pub struct Exchange<'a> {
    request: &'a DhcpRequest,
    source: SocketAddr,
    settings: &'a ReplySettings,
    outbox: Vec<OutgoingReply>,
}

impl<'a> Exchange<'a> {
    pub fn new(request: &'a DhcpRequest, source: SocketAddr, settings: &'a ReplySettings) -> Self {
        Self {
            request,
            source,
            settings,
            outbox: Vec::new(),
        }
    }

    /// The request being answered.
    pub fn request(&self) -> &'a DhcpRequest {
        self.request
    }

    /// Address the datagram arrived from.
    pub fn source(&self) -> SocketAddr {
        self.source
    }

    /// Builds, encodes and queues a reply.
    ///
    /// The reply goes to the relay agent on port 67 when the request was
    /// relayed, otherwise to the broadcast address on port 68.
    pub fn send_reply(
        &mut self,
        message_type: MessageType,
        assigned: Ipv4Addr,
        config: Option<&ReplyConfiguration>,
        overrides: &ReplyOverrides,
    ) {
        let reply = self.request.build_reply(
            message_type,
            assigned,
            config,
            overrides,
            self.settings.server_name.as_deref(),
        );

        self.outbox.push(OutgoingReply {
            message_type,
            destination: self.request.reply_destination(self.settings.broadcast_address),
            bytes: reply.encode(),
        });
    }

    /// Replies queued so far.
    pub fn replies(&self) -> &[OutgoingReply] {
        &self.outbox
    }

    pub fn into_replies(self) -> Vec<OutgoingReply> {
        self.outbox
    }
}

/// Routes datagrams to a handler and sends its replies.
pub struct Dispatcher<H, T> {
    handler: Arc<H>,
    transport: T,
    settings: ReplySettings,
}

impl<H: DhcpHandler, T: Transport> Dispatcher<H, T> {
    pub fn new(handler: Arc<H>, transport: T, settings: ReplySettings) -> Self {
        Self {
            handler,
            transport,
            settings,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn settings(&self) -> &ReplySettings {
        &self.settings
    }

    /// Handles one datagram and returns the number of replies sent.
    ///
    /// # Errors
    ///
    /// Decode errors, handler errors and [`Error::TransportSend`] are
    /// returned for the caller to log. Replies are sent in the order they
    /// were queued; the first failed send stops the rest.
    pub async fn dispatch(&self, data: &[u8], source: SocketAddr) -> Result<usize> {
        let request = DhcpRequest::decode(data)?;
        let mac = request.packet().format_mac();

        let replies = {
            let mut exchange = Exchange::new(&request, source, &self.settings);
            self.handler.on_message(&mut exchange)?;

            match request.message_type() {
                Some(message_type) => {
                    info!("{} from {} ({})", message_type, mac, source);
                    match message_type {
                        MessageType::Discover => self.handler.on_discover(&mut exchange)?,
                        MessageType::Request => self.handler.on_request(&mut exchange)?,
                        MessageType::Decline => self.handler.on_decline(&mut exchange)?,
                        MessageType::Release => self.handler.on_release(&mut exchange)?,
                        MessageType::Inform => self.handler.on_inform(&mut exchange)?,
                        _ => debug!("No handler for {} from {}", message_type, mac),
                    }
                }
                None => debug!(
                    "Unrecognized message type {} from {} ({})",
                    request.message_type_code(),
                    mac,
                    source
                ),
            }

            exchange.into_replies()
        };

        for reply in &replies {
            self.transport
                .send_to(&reply.bytes, reply.destination)
                .await
                .map_err(|source| Error::TransportSend {
                    destination: reply.destination,
                    source,
                })?;
            info!("{} to {} via {}", reply.message_type, mac, reply.destination);
        }

        Ok(replies.len())
    }
}
