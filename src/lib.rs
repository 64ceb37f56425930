//! # dhcpserve
//!
//! DHCP message handling per RFC 2131 and RFC 2132: a packet and option
//! codec, a reply option selector, and a dispatcher that routes client
//! messages to application callbacks.
//!
//! ## Features
//!
//! - Decoding and encoding of the fixed DHCP header and TLV option stream
//! - Reply options chosen from the client's parameter request list
//! - Relay agent support (Option 82 echo and sub-option parsing)
//! - Classless static routes (Options 121 and 249)
//! - Async/await with Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use dhcpserve::{Config, DhcpServer, FixedAddressHandler};
//!
//! #[tokio::main]
//! async fn main() -> dhcpserve::Result<()> {
//!     let config = Config::load_or_create("config.json")?;
//!     let handler = FixedAddressHandler::from_config(&config);
//!     let server = DhcpServer::new(config, handler)?;
//!     server.run().await
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`DhcpMessage`] - DHCP packet parsing and encoding
//! - [`DhcpRequest`] - Validated view of a received request
//! - [`ReplyConfiguration`] - Values a reply may carry
//! - [`DhcpHandler`] - Application callbacks, one per message type
//! - [`Dispatcher`] - Decodes datagrams, runs callbacks, sends replies
//! - [`DhcpServer`] - UDP port 67 listener driving a dispatcher
//! - [`FixedAddressHandler`] - Offers one configured address to any client

pub mod config;
pub mod dispatch;
pub mod error;
pub mod fixed;
pub mod options;
pub mod packet;
pub mod relay;
pub mod reply;
pub mod request;
pub mod route;
pub mod server;

pub use config::Config;
pub use dispatch::{DhcpHandler, Dispatcher, Exchange, OutgoingReply, ReplySettings, Transport};
pub use error::{Error, Result};
pub use fixed::FixedAddressHandler;
pub use options::{MessageType, OptionCode};
pub use packet::DhcpMessage;
pub use relay::RelayInfo;
pub use reply::{ReplyConfiguration, ReplyOverrides, select_reply_options};
pub use request::DhcpRequest;
pub use route::NetworkRoute;
pub use server::DhcpServer;
