use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dispatch::{DhcpHandler, Dispatcher, Transport};
use crate::error::{Error, Result};
use crate::request::DHCP_SERVER_PORT;

const RECV_BUFFER_SIZE: usize = 1500;

/// Receives on `socket` and sends replies through `T`, which is the same
/// socket unless the server was built with [`DhcpServer::with_transport`].
pub struct DhcpServer<H, T = Arc<UdpSocket>> {
    config: Arc<Config>,
    socket: Arc<UdpSocket>,
    dispatcher: Arc<Dispatcher<H, T>>,
}

impl<H: DhcpHandler + 'static> DhcpServer<H> {
    pub fn new(config: Config, handler: H) -> Result<Self> {
        let bind_addr = SocketAddrV4::new(config.bind_address, DHCP_SERVER_PORT);
        let socket = Arc::new(create_socket(bind_addr, config.interface_index)?);
        Ok(Self::with_socket(config, handler, socket))
    }

    /// Serves on an already bound socket.
    pub fn with_socket(config: Config, handler: H, socket: Arc<UdpSocket>) -> Self {
        let transport = Arc::clone(&socket);
        Self::with_transport(config, handler, socket, transport)
    }
}

impl<H: DhcpHandler + 'static, T: Transport + 'static> DhcpServer<H, T> {
    /// Receives on `socket` but hands every reply to `transport`.
    pub fn with_transport(config: Config, handler: H, socket: Arc<UdpSocket>, transport: T) -> Self {
        let dispatcher = Dispatcher::new(Arc::new(handler), transport, config.reply_settings());

        info!(
            "DHCP server starting on {}:{}",
            config.bind_address, DHCP_SERVER_PORT
        );
        info!(
            "Offering {} with replies broadcast to {}",
            config.offered_address, config.broadcast_address
        );

        Self {
            config: Arc::new(config),
            socket,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Receives datagrams until the task is cancelled.
    ///
    /// Each datagram is dispatched on its own task; a failure is logged and
    /// dropped without affecting the loop.
    pub async fn run(&self) -> Result<()> {
        let mut buffer = [0u8; RECV_BUFFER_SIZE];

        info!("DHCP server ready and listening");

        loop {
            match self.socket.recv_from(&mut buffer).await {
                Ok((size, source)) => {
                    let data = buffer[..size].to_vec();
                    let dispatcher = Arc::clone(&self.dispatcher);

                    tokio::spawn(async move {
                        handle_datagram(&dispatcher, &data, source).await;
                    });
                }
                Err(error) => {
                    error!("Error receiving packet: {}", error);
                }
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn handler(&self) -> &H {
        self.dispatcher.handler()
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

async fn handle_datagram<H: DhcpHandler, T: Transport>(
    dispatcher: &Dispatcher<H, T>,
    data: &[u8],
    source: SocketAddr,
) {
    if let Err(error) = dispatcher.dispatch(data, source).await {
        warn!("Error handling packet from {}: {}", source, error);
    }
}

fn socket_error(action: &str) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |error| Error::Socket(format!("Failed to {}: {}", action, error))
}

/// Opens a non-blocking broadcast-capable UDP socket bound to `bind_addr`.
fn create_socket(bind_addr: SocketAddrV4, interface_index: Option<u32>) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(socket_error("create socket"))?;
    socket
        .set_reuse_address(true)
        .map_err(socket_error("set SO_REUSEADDR"))?;
    socket
        .set_broadcast(true)
        .map_err(socket_error("set SO_BROADCAST"))?;
    socket
        .set_nonblocking(true)
        .map_err(socket_error("set non-blocking"))?;

    let bind_target = format!("bind to {}", bind_addr);
    socket
        .bind(&bind_addr.into())
        .map_err(socket_error(&bind_target))?;

    if let Some(index) = interface_index {
        bind_interface(&socket, index);
    }

    UdpSocket::from_std(socket.into()).map_err(socket_error("register socket with tokio"))
}

/// Pins outgoing datagrams to one interface. A failure leaves the socket
/// unpinned.
#[cfg(windows)]
fn bind_interface(socket: &Socket, index: u32) {
    use std::os::windows::io::AsRawSocket;

    if let Err(error) = set_interface_index(socket.as_raw_socket(), index) {
        warn!("Failed to set interface index {}: {}", index, error);
    }
}

#[cfg(not(windows))]
fn bind_interface(_socket: &Socket, index: u32) {
    warn!(
        "interface_index ({}) is only supported on Windows and will be ignored",
        index
    );
}

#[cfg(windows)]
fn set_interface_index(raw_socket: std::os::windows::io::RawSocket, index: u32) -> Result<()> {
    use windows_sys::Win32::Networking::WinSock::{IPPROTO_IP, SOCKET, setsockopt};

    const IP_UNICAST_IF: i32 = 31;

    let index_bytes = index.to_be_bytes();
    let result = unsafe {
        setsockopt(
            raw_socket as SOCKET,
            IPPROTO_IP,
            IP_UNICAST_IF,
            index_bytes.as_ptr(),
            std::mem::size_of::<u32>() as i32,
        )
    };

    if result != 0 {
        return Err(Error::Socket(format!(
            "setsockopt IP_UNICAST_IF failed: {}",
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}
