//! DHCP packet parsing and encoding per RFC 2131.
//!
//! A DHCP packet consists of a fixed 236-byte header followed by a 4-byte
//! magic cookie and a variable-length option stream. This module decodes
//! the fixed layout, keeps the option stream as raw bytes for the
//! [`options`](crate::options) codec, and encodes replies.
//!
//! Multi-byte header fields other than the addresses are kept as the
//! bytes seen on the wire, so `xid`, `secs` and `flags` echo verbatim.
//!
//! # Packet Structure
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     op (1)    |   htype (1)   |   hlen (1)    |   hops (1)    |
//! +---------------+---------------+---------------+---------------+
//! |                            xid (4)                            |
//! +-------------------------------+-------------------------------+
//! |           secs (2)            |           flags (2)           |
//! +-------------------------------+-------------------------------+
//! |                          ciaddr (4)                           |
//! +---------------------------------------------------------------+
//! |                          yiaddr (4)                           |
//! +---------------------------------------------------------------+
//! |                          siaddr (4)                           |
//! +---------------------------------------------------------------+
//! |                          giaddr (4)                           |
//! +---------------------------------------------------------------+
//! |                          chaddr (16)                          |
//! +---------------------------------------------------------------+
//! |                          sname (64)                           |
//! +---------------------------------------------------------------+
//! |                          file (128)                           |
//! +---------------------------------------------------------------+
//! |                    magic cookie (4) = 99.130.83.99            |
//! +---------------------------------------------------------------+
//! |                          options (variable)                   |
//! +---------------------------------------------------------------+
//! ```
//!
//! # References
//!
//! - RFC 2131: Dynamic Host Configuration Protocol

use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// DHCP magic cookie that identifies DHCP packets (vs BOOTP).
pub const DHCP_MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

const DHCP_OP_HTYPE_HLEN_HOPS_SIZE: usize = 4;
const DHCP_XID_SIZE: usize = 4;
const DHCP_SECS_SIZE: usize = 2;
const DHCP_FLAGS_SIZE: usize = 2;
const DHCP_ADDRESS_SIZE: usize = 4;
const DHCP_CHADDR_SIZE: usize = 16;
const DHCP_SNAME_SIZE: usize = 64;
const DHCP_FILE_SIZE: usize = 128;

const DHCP_XID_OFFSET: usize = DHCP_OP_HTYPE_HLEN_HOPS_SIZE;
const DHCP_SECS_OFFSET: usize = DHCP_XID_OFFSET + DHCP_XID_SIZE;
const DHCP_FLAGS_OFFSET: usize = DHCP_SECS_OFFSET + DHCP_SECS_SIZE;
const DHCP_CIADDR_OFFSET: usize = DHCP_FLAGS_OFFSET + DHCP_FLAGS_SIZE;
const DHCP_YIADDR_OFFSET: usize = DHCP_CIADDR_OFFSET + DHCP_ADDRESS_SIZE;
const DHCP_SIADDR_OFFSET: usize = DHCP_YIADDR_OFFSET + DHCP_ADDRESS_SIZE;
const DHCP_GIADDR_OFFSET: usize = DHCP_SIADDR_OFFSET + DHCP_ADDRESS_SIZE;
const DHCP_CHADDR_OFFSET: usize = DHCP_GIADDR_OFFSET + DHCP_ADDRESS_SIZE;
const DHCP_SNAME_OFFSET: usize = DHCP_CHADDR_OFFSET + DHCP_CHADDR_SIZE;
const DHCP_FILE_OFFSET: usize = DHCP_SNAME_OFFSET + DHCP_SNAME_SIZE;
const DHCP_MAGIC_COOKIE_OFFSET: usize = DHCP_FILE_OFFSET + DHCP_FILE_SIZE;

/// Size of the fixed header portion including magic cookie.
pub const DHCP_FIXED_HEADER_SIZE: usize = DHCP_MAGIC_COOKIE_OFFSET + DHCP_MAGIC_COOKIE.len();

/// Minimum size of an encoded packet.
///
/// BOOTP relay agents and some clients drop frames shorter than 300 bytes,
/// so shorter encodings are zero-padded.
pub const DHCP_MIN_PACKET_SIZE: usize = 300;

/// BOOTP/DHCP operation code for client requests.
pub const BOOTREQUEST: u8 = 1;

/// BOOTP/DHCP operation code for server replies.
pub const BOOTREPLY: u8 = 2;

/// Hardware type for Ethernet (most common).
pub const HTYPE_ETHERNET: u8 = 1;

/// Hardware address length for Ethernet (6 bytes).
pub const HLEN_ETHERNET: u8 = 6;

/// Broadcast bit in the first byte of `flags`.
const FLAGS_BROADCAST_BIT: u8 = 0x80;

/// A decoded DHCP message.
///
/// This struct represents both client requests and server replies.
/// Use [`decode`](Self::decode) for incoming datagrams and
/// [`create_reply`](Self::create_reply) to construct responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpMessage {
    /// Operation code: [`BOOTREQUEST`] (1) or [`BOOTREPLY`] (2).
    pub op: u8,

    /// Hardware address type. [`HTYPE_ETHERNET`] (1) for Ethernet.
    pub htype: u8,

    /// Hardware address length. [`HLEN_ETHERNET`] (6) for Ethernet.
    pub hlen: u8,

    /// Hop count, incremented by relay agents.
    pub hops: u8,

    /// Transaction ID chosen by client, echoed in replies.
    pub xid: [u8; 4],

    /// Seconds elapsed since client began address acquisition.
    pub secs: [u8; 2],

    /// Flags. The top bit of the first byte is the broadcast flag.
    pub flags: [u8; 2],

    /// Client IP address (set by client in RENEWING/REBINDING states).
    pub ciaddr: Ipv4Addr,

    /// "Your" IP address - the address being assigned to the client.
    pub yiaddr: Ipv4Addr,

    /// Next server IP address.
    pub siaddr: Ipv4Addr,

    /// Relay agent address, zero when the client is on the local segment.
    pub giaddr: Ipv4Addr,

    /// Client hardware address. Only the first `hlen` bytes are significant.
    pub chaddr: [u8; 16],

    /// Server host name, NUL-terminated.
    pub sname: [u8; 64],

    /// Boot file name, NUL-terminated.
    pub file: [u8; 128],

    /// Magic cookie as received.
    pub magic_cookie: [u8; 4],

    /// Raw option stream following the magic cookie.
    pub options: Vec<u8>,
}

fn read_array<const N: usize>(data: &[u8], offset: usize) -> [u8; N] {
    let mut field = [0u8; N];
    field.copy_from_slice(&data[offset..offset + N]);
    field
}

fn read_address(data: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::from(read_array::<4>(data, offset))
}

fn nul_terminated(field: &[u8]) -> Option<String> {
    let end = field.iter().position(|&byte| byte == 0).unwrap_or(field.len());
    if end == 0 {
        return None;
    }
    Some(String::from_utf8_lossy(&field[..end]).into_owned())
}

impl DhcpMessage {
    /// Decodes a DHCP message from a raw UDP payload.
    ///
    /// Every byte after the magic cookie becomes the option stream; the
    /// stream is not interpreted here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TruncatedPacket`] if `data` is shorter than the
    /// 240-byte fixed header.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < DHCP_FIXED_HEADER_SIZE {
            return Err(Error::TruncatedPacket {
                length: data.len(),
                minimum: DHCP_FIXED_HEADER_SIZE,
            });
        }

        Ok(Self {
            op: data[0],
            htype: data[1],
            hlen: data[2],
            hops: data[3],
            xid: read_array(data, DHCP_XID_OFFSET),
            secs: read_array(data, DHCP_SECS_OFFSET),
            flags: read_array(data, DHCP_FLAGS_OFFSET),
            ciaddr: read_address(data, DHCP_CIADDR_OFFSET),
            yiaddr: read_address(data, DHCP_YIADDR_OFFSET),
            siaddr: read_address(data, DHCP_SIADDR_OFFSET),
            giaddr: read_address(data, DHCP_GIADDR_OFFSET),
            chaddr: read_array(data, DHCP_CHADDR_OFFSET),
            sname: read_array(data, DHCP_SNAME_OFFSET),
            file: read_array(data, DHCP_FILE_OFFSET),
            magic_cookie: read_array(data, DHCP_MAGIC_COOKIE_OFFSET),
            options: data[DHCP_FIXED_HEADER_SIZE..].to_vec(),
        })
    }

    /// Encodes the message to bytes for transmission.
    ///
    /// The option stream is written as-is, so it must already carry its
    /// END marker. The returned buffer is at least [`DHCP_MIN_PACKET_SIZE`]
    /// bytes.
    pub fn encode(&self) -> Vec<u8> {
        let length = DHCP_FIXED_HEADER_SIZE + self.options.len();
        let mut packet = Vec::with_capacity(length.max(DHCP_MIN_PACKET_SIZE));

        packet.push(self.op);
        packet.push(self.htype);
        packet.push(self.hlen);
        packet.push(self.hops);

        packet.extend_from_slice(&self.xid);
        packet.extend_from_slice(&self.secs);
        packet.extend_from_slice(&self.flags);

        packet.extend_from_slice(&self.ciaddr.octets());
        packet.extend_from_slice(&self.yiaddr.octets());
        packet.extend_from_slice(&self.siaddr.octets());
        packet.extend_from_slice(&self.giaddr.octets());

        packet.extend_from_slice(&self.chaddr);
        packet.extend_from_slice(&self.sname);
        packet.extend_from_slice(&self.file);

        packet.extend_from_slice(&self.magic_cookie);
        packet.extend_from_slice(&self.options);

        if packet.len() < DHCP_MIN_PACKET_SIZE {
            packet.resize(DHCP_MIN_PACKET_SIZE, 0);
        }

        packet
    }

    /// Returns true if the magic cookie marks this as a DHCP (not plain BOOTP) message.
    pub fn has_magic_cookie(&self) -> bool {
        self.magic_cookie == DHCP_MAGIC_COOKIE
    }

    /// Returns true if the client set the broadcast flag.
    pub fn is_broadcast(&self) -> bool {
        self.flags[0] & FLAGS_BROADCAST_BIT != 0
    }

    /// Returns the client hardware address bytes (respecting hlen).
    ///
    /// An `hlen` larger than the 16-byte field is clamped.
    pub fn chaddr_bytes(&self) -> &[u8] {
        let len = (self.hlen as usize).min(self.chaddr.len());
        &self.chaddr[..len]
    }

    /// Formats the client hardware address as a colon-separated string.
    ///
    /// For Ethernet, returns format like "aa:bb:cc:dd:ee:ff".
    pub fn format_mac(&self) -> String {
        use std::fmt::Write;
        let bytes = self.chaddr_bytes();
        let mut result = String::with_capacity(bytes.len() * 3);
        for (index, byte) in bytes.iter().enumerate() {
            if index > 0 {
                result.push(':');
            }
            let _ = write!(result, "{:02x}", byte);
        }
        result
    }

    /// Returns the server host name up to its NUL terminator, if any.
    pub fn server_host_name(&self) -> Option<String> {
        nul_terminated(&self.sname)
    }

    /// Returns the boot file name up to its NUL terminator, if any.
    pub fn boot_file_name(&self) -> Option<String> {
        nul_terminated(&self.file)
    }

    /// Creates a reply from a request.
    ///
    /// The reply is a fresh value; the request is left untouched.
    ///
    /// # Arguments
    ///
    /// * `request` - The client's request
    /// * `your_ip` - Address assigned to the client (yiaddr)
    /// * `next_server` - Replaces siaddr when set
    /// * `server_name` - Written to sname when set, truncated to 63 bytes
    /// * `options` - Complete option stream, END marker included
    ///
    /// # Preserved Fields
    ///
    /// `htype`, `hlen`, `hops`, `xid`, `secs`, `flags`, `ciaddr`, `giaddr`,
    /// `chaddr` and `file` are copied from the request.
    pub fn create_reply(
        request: &DhcpMessage,
        your_ip: Ipv4Addr,
        next_server: Option<Ipv4Addr>,
        server_name: Option<&str>,
        options: Vec<u8>,
    ) -> Self {
        let sname = match server_name.filter(|name| !name.is_empty()) {
            Some(name) => {
                let mut sname = [0u8; DHCP_SNAME_SIZE];
                let bytes = name.as_bytes();
                let len = bytes.len().min(DHCP_SNAME_SIZE - 1);
                sname[..len].copy_from_slice(&bytes[..len]);
                sname
            }
            None => request.sname,
        };

        Self {
            op: BOOTREPLY,
            htype: request.htype,
            hlen: request.hlen,
            hops: request.hops,
            xid: request.xid,
            secs: request.secs,
            flags: request.flags,
            ciaddr: request.ciaddr,
            yiaddr: your_ip,
            siaddr: next_server.unwrap_or(request.siaddr),
            giaddr: request.giaddr,
            chaddr: request.chaddr,
            sname,
            file: request.file,
            magic_cookie: DHCP_MAGIC_COOKIE,
            options,
        }
    }
}
