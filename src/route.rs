//! Static routes for options 121 and 249 (RFC 3442).
//!
//! Each route is encoded as one prefix-length byte, the significant bytes of
//! the destination network, then the four gateway bytes. Entries are packed
//! back to back; a reader derives each entry's size from its first byte.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Longest valid IPv4 prefix.
pub const MAX_PREFIX_LENGTH: u8 = 32;

/// A destination network reachable through a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRoute {
    /// Destination network address.
    pub network: Ipv4Addr,
    /// Prefix length of the destination, 0 to 32.
    pub prefix_length: u8,
    /// Next hop for the destination.
    pub gateway: Ipv4Addr,
}

impl NetworkRoute {
    /// Creates a route from an explicit prefix length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `prefix_length` exceeds 32.
    pub fn new(network: Ipv4Addr, prefix_length: u8, gateway: Ipv4Addr) -> Result<Self> {
        if prefix_length > MAX_PREFIX_LENGTH {
            return Err(Error::InvalidConfig(format!(
                "route prefix length {} exceeds {}",
                prefix_length, MAX_PREFIX_LENGTH
            )));
        }

        Ok(Self {
            network,
            prefix_length,
            gateway,
        })
    }

    /// Creates a route from a dotted subnet mask.
    ///
    /// Each octet contributes its leading one bits, so a non-contiguous
    /// mask such as `255.0.255.0` counts 16.
    pub fn from_mask(network: Ipv4Addr, mask: Ipv4Addr, gateway: Ipv4Addr) -> Self {
        let prefix_length = mask
            .octets()
            .iter()
            .map(|octet| octet.leading_ones() as u8)
            .sum();

        Self {
            network,
            prefix_length,
            gateway,
        }
    }

    /// Number of destination bytes carried on the wire.
    fn significant_octets(&self) -> usize {
        match self.prefix_length {
            0..=8 => 1,
            9..=16 => 2,
            17..=24 => 3,
            _ => 4,
        }
    }

    /// Size of this route's encoded entry.
    pub fn encoded_len(&self) -> usize {
        1 + self.significant_octets() + 4
    }

    /// Appends this route's encoded entry to `buffer`.
    pub fn encode_into(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.prefix_length);
        buffer.extend_from_slice(&self.network.octets()[..self.significant_octets()]);
        buffer.extend_from_slice(&self.gateway.octets());
    }

    /// Encodes a route list in order, with no separators.
    pub fn encode_list(routes: &[NetworkRoute]) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(routes.iter().map(Self::encoded_len).sum());
        for route in routes {
            route.encode_into(&mut buffer);
        }
        buffer
    }
}
