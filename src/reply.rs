//! Reply option selection.
//!
//! A reply's option stream is computed from three sources: what the client
//! asked for in its parameter request list (Option 55), codes the server
//! forces in regardless, and the values in a [`ReplyConfiguration`]. Raw
//! override values can replace anything computed, and a relay agent's
//! Option 82 is echoed back unless overridden.
//!
//! The resulting stream always starts with the message type (Option 53),
//! lists every other option in ascending code order, and ends with a
//! single END marker.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::options::{MessageType, OptionCode, encode_option, encoded_len};
use crate::request::DhcpRequest;
use crate::route::NetworkRoute;

/// Maximum number of IP addresses in a list option such as DNS Server (6).
///
/// Options have a 1-byte length field, so maximum data is 255 bytes.
/// With 4 bytes per IPv4 address, that's 63 addresses maximum.
const MAX_ADDRESSES_PER_OPTION: usize = 63;

/// Default lease time: one day.
const DEFAULT_LEASE_TIME_SECONDS: u32 = 86400;

/// Server-authored template for reply options.
///
/// Built by the application for each reply. Fields left unset produce no
/// option; nothing here is ever sent unless the client requested it or the
/// code is forced, except the server identifier and the lease timers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyConfiguration {
    /// Subnet mask (Option 1).
    pub subnet_mask: Option<Ipv4Addr>,
    /// Next server address, written to `siaddr` rather than an option.
    pub next_server: Option<Ipv4Addr>,
    /// Lease time in seconds (Option 51).
    pub lease_time: u32,
    /// Renewal time T1 in seconds (Option 58).
    pub renewal_time: Option<u32>,
    /// Rebinding time T2 in seconds (Option 59).
    pub rebinding_time: Option<u32>,
    /// Domain name (Option 15).
    pub domain_name: Option<String>,
    /// This server's address (Option 54). Sent with every reply when set.
    pub server_identifier: Option<Ipv4Addr>,
    /// Default gateway (Option 3).
    pub router: Option<Ipv4Addr>,
    /// DNS servers in preference order (Option 6).
    pub dns_servers: Vec<Ipv4Addr>,
    /// Log server (Option 7).
    pub log_server: Option<Ipv4Addr>,
    /// Static routes (Options 121 and 249).
    pub static_routes: Vec<NetworkRoute>,
    /// Raw values for any other code, sent when requested or forced.
    pub other_options: BTreeMap<u8, Vec<u8>>,
}

impl Default for ReplyConfiguration {
    fn default() -> Self {
        Self {
            subnet_mask: None,
            next_server: None,
            lease_time: DEFAULT_LEASE_TIME_SECONDS,
            renewal_time: None,
            rebinding_time: None,
            domain_name: None,
            server_identifier: None,
            router: None,
            dns_servers: Vec::new(),
            log_server: None,
            static_routes: Vec::new(),
            other_options: BTreeMap::new(),
        }
    }
}

impl ReplyConfiguration {
    /// Resolves the configured value for one option code.
    ///
    /// Returns `None` when nothing is configured for the code. Codes 121 and
    /// 249 share the static route list.
    pub fn resolve(&self, code: u8) -> Option<Vec<u8>> {
        let value = match OptionCode::try_from(code) {
            Ok(OptionCode::SubnetMask) => self.subnet_mask.map(|mask| mask.octets().to_vec()),
            Ok(OptionCode::Router) => self.router.map(|router| router.octets().to_vec()),
            Ok(OptionCode::DnsServer) => Some(
                self.dns_servers
                    .iter()
                    .take(MAX_ADDRESSES_PER_OPTION)
                    .flat_map(|server| server.octets())
                    .collect(),
            ),
            Ok(OptionCode::DomainName) => self.domain_name.as_deref().map(ascii_bytes),
            Ok(OptionCode::ServerIdentifier) => {
                self.server_identifier.map(|server| server.octets().to_vec())
            }
            Ok(OptionCode::LogServer) => self.log_server.map(|server| server.octets().to_vec()),
            Ok(OptionCode::ClasslessStaticRoute | OptionCode::MsClasslessStaticRoute) => {
                Some(NetworkRoute::encode_list(&self.static_routes))
            }
            _ => self.other_options.get(&code).cloned(),
        };

        value.filter(|value| !value.is_empty())
    }
}

/// Caller overrides applied on top of the requested options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyOverrides {
    /// Raw values sent whether or not the client asked, replacing any
    /// computed value for the same code.
    pub other_forced_options: BTreeMap<u8, Vec<u8>>,
    /// Codes resolved from the configuration even when not requested.
    pub forced_option_codes: Vec<u8>,
}

impl ReplyOverrides {
    /// Adds a raw value sent regardless of the request.
    pub fn with_option(mut self, code: u8, value: impl Into<Vec<u8>>) -> Self {
        self.other_forced_options.insert(code, value.into());
        self
    }

    /// Adds a code resolved from the configuration regardless of the request.
    pub fn with_forced_code(mut self, code: u8) -> Self {
        self.forced_option_codes.push(code);
        self
    }
}

/// Encodes text as ASCII, replacing every non-ASCII character with `?`.
fn ascii_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

/// Codes the selector writes itself or that cannot be TLV-encoded.
fn is_reserved(code: u8) -> bool {
    code == OptionCode::Pad as u8
        || code == OptionCode::MessageType as u8
        || code == OptionCode::End as u8
}

fn is_lease_timer(code: u8) -> bool {
    code == OptionCode::LeaseTime as u8
        || code == OptionCode::RenewalTime as u8
        || code == OptionCode::RebindingTime as u8
}

/// Computes the option stream of a reply, END marker included.
///
/// Lease timers are left out when either the reply or the request being
/// answered is an INFORM, since INFORM allocates no address. Explicit
/// entries in `overrides.other_forced_options` are always sent verbatim.
/// Without a configuration only the message type, the overrides, and the
/// relay echo are emitted.
pub fn select_reply_options(
    message_type: MessageType,
    request: &DhcpRequest,
    config: Option<&ReplyConfiguration>,
    overrides: &ReplyOverrides,
) -> Vec<u8> {
    let forced = &overrides.other_forced_options;
    let informing =
        message_type == MessageType::Inform || request.message_type() == Some(MessageType::Inform);

    let mut staged: BTreeMap<u8, Vec<u8>> = BTreeMap::new();

    if let Some(config) = config {
        if let Some(server_identifier) = config.server_identifier {
            staged.insert(
                OptionCode::ServerIdentifier as u8,
                server_identifier.octets().to_vec(),
            );
        }

        let candidates: BTreeSet<u8> = request
            .requested_options()
            .unwrap_or_default()
            .iter()
            .chain(&overrides.forced_option_codes)
            .copied()
            .collect();

        for code in candidates {
            if forced.contains_key(&code) || is_reserved(code) {
                continue;
            }
            if informing && is_lease_timer(code) {
                continue;
            }
            if let Some(value) = config.resolve(code) {
                staged.insert(code, value);
            }
        }

        if !informing {
            staged.insert(
                OptionCode::LeaseTime as u8,
                config.lease_time.to_be_bytes().to_vec(),
            );
            if let Some(renewal) = config.renewal_time {
                staged.insert(OptionCode::RenewalTime as u8, renewal.to_be_bytes().to_vec());
            }
            if let Some(rebinding) = config.rebinding_time {
                staged.insert(
                    OptionCode::RebindingTime as u8,
                    rebinding.to_be_bytes().to_vec(),
                );
            }
        }
    }

    let mut relay_echo = request.option(OptionCode::RelayAgentInfo as u8);

    for (&code, value) in forced {
        if is_reserved(code) {
            continue;
        }
        staged.insert(code, value.clone());
        if code == OptionCode::RelayAgentInfo as u8 {
            relay_echo = None;
        }
    }

    if let Some(relay_info) = relay_echo {
        staged.insert(OptionCode::RelayAgentInfo as u8, relay_info.to_vec());
    }

    let message_type_value = [message_type as u8];
    let capacity = encoded_len(&message_type_value)
        + staged.values().map(|value| encoded_len(value)).sum::<usize>()
        + 1;

    let mut stream = Vec::with_capacity(capacity);
    encode_option(&mut stream, OptionCode::MessageType as u8, &message_type_value);
    for (&code, value) in &staged {
        encode_option(&mut stream, code, value);
    }
    stream.push(OptionCode::End as u8);

    stream
}
