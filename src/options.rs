//! DHCP option stream codec (RFC 2132).
//!
//! DHCP uses options to convey configuration parameters between servers and clients.
//! Each option has a code (1 byte), length (1 byte), and variable-length data.
//! Two single-byte control codes carry no length: [`OptionCode::Pad`] and
//! [`OptionCode::End`].
//!
//! Options are handled as raw `(code, value)` pairs. Typed interpretation
//! lives with the callers that need it (the request view and the reply
//! option selector).
//!
//! # Lookup semantics
//!
//! [`find_option`] stops at the first occurrence of a code, while
//! [`parse_options`] walks the whole stream and keeps the last occurrence.
//! Clients rarely repeat a code, but when they do the two disagree.
//!
//! # References
//!
//! - RFC 2132: DHCP Options and BOOTP Vendor Extensions
//! - RFC 3046: DHCP Relay Agent Information Option (Option 82)
//! - RFC 3442: Classless Static Route Option (Option 121)

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Largest value an option can carry behind its one-byte length field.
pub const MAX_OPTION_LENGTH: usize = 255;

/// DHCP option codes the crate interprets.
///
/// Codes outside this list are still parsed and forwarded as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum OptionCode {
    /// Padding (no operation). Used for alignment.
    Pad = 0,
    /// Subnet mask (RFC 2132 §3.3).
    SubnetMask = 1,
    /// Router/gateway addresses (RFC 2132 §3.5).
    Router = 3,
    /// DNS server addresses (RFC 2132 §3.8).
    DnsServer = 6,
    /// Log server addresses (RFC 2132 §3.9).
    LogServer = 7,
    /// Domain name for DNS resolution (RFC 2132 §3.17).
    DomainName = 15,
    /// Requested IP address (RFC 2132 §9.1).
    RequestedIpAddress = 50,
    /// IP address lease time in seconds (RFC 2132 §9.2).
    LeaseTime = 51,
    /// DHCP message type (RFC 2132 §9.6).
    MessageType = 53,
    /// Server identifier (RFC 2132 §9.7).
    ServerIdentifier = 54,
    /// Parameter request list (RFC 2132 §9.8).
    ParameterRequestList = 55,
    /// Renewal time T1 (RFC 2132 §9.11).
    RenewalTime = 58,
    /// Rebinding time T2 (RFC 2132 §9.12).
    RebindingTime = 59,
    /// Relay agent information (RFC 3046).
    RelayAgentInfo = 82,
    /// Classless static routes (RFC 3442).
    ClasslessStaticRoute = 121,
    /// Pre-standard Microsoft alias of option 121.
    MsClasslessStaticRoute = 249,
    /// End of options marker.
    End = 255,
}

impl TryFrom<u8> for OptionCode {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pad),
            1 => Ok(Self::SubnetMask),
            3 => Ok(Self::Router),
            6 => Ok(Self::DnsServer),
            7 => Ok(Self::LogServer),
            15 => Ok(Self::DomainName),
            50 => Ok(Self::RequestedIpAddress),
            51 => Ok(Self::LeaseTime),
            53 => Ok(Self::MessageType),
            54 => Ok(Self::ServerIdentifier),
            55 => Ok(Self::ParameterRequestList),
            58 => Ok(Self::RenewalTime),
            59 => Ok(Self::RebindingTime),
            82 => Ok(Self::RelayAgentInfo),
            121 => Ok(Self::ClasslessStaticRoute),
            249 => Ok(Self::MsClasslessStaticRoute),
            255 => Ok(Self::End),
            other => Err(other),
        }
    }
}

/// DHCP message types (Option 53) as defined in RFC 2132 §9.6.
///
/// These values indicate the purpose of a DHCP message in the protocol exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Client broadcast to locate servers.
    Discover = 1,
    /// Server response to DISCOVER with IP offer.
    Offer = 2,
    /// Client request for offered parameters.
    Request = 3,
    /// Client indicates address is already in use.
    Decline = 4,
    /// Server acknowledgement with configuration.
    Ack = 5,
    /// Server negative acknowledgement.
    Nak = 6,
    /// Client releases IP address.
    Release = 7,
    /// Client requests config without IP allocation.
    Inform = 8,
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Discover),
            2 => Ok(Self::Offer),
            3 => Ok(Self::Request),
            4 => Ok(Self::Decline),
            5 => Ok(Self::Ack),
            6 => Ok(Self::Nak),
            7 => Ok(Self::Release),
            8 => Ok(Self::Inform),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discover => write!(f, "DISCOVER"),
            Self::Offer => write!(f, "OFFER"),
            Self::Request => write!(f, "REQUEST"),
            Self::Decline => write!(f, "DECLINE"),
            Self::Ack => write!(f, "ACK"),
            Self::Nak => write!(f, "NAK"),
            Self::Release => write!(f, "RELEASE"),
            Self::Inform => write!(f, "INFORM"),
        }
    }
}

/// Iterator over the `(code, value)` entries of an option stream.
///
/// Skips [`OptionCode::Pad`], stops at [`OptionCode::End`] or at the end of
/// the buffer. A length byte or value that would run past the buffer yields
/// one [`Error::MalformedOptions`] and ends the iteration.
pub struct OptionIter<'a> {
    data: &'a [u8],
    index: usize,
    finished: bool,
}

impl<'a> OptionIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            index: 0,
            finished: false,
        }
    }

    fn fail(&mut self, message: String) -> Option<Result<(u8, &'a [u8])>> {
        self.finished = true;
        Some(Err(Error::MalformedOptions(message)))
    }
}

impl<'a> Iterator for OptionIter<'a> {
    type Item = Result<(u8, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let &code = self.data.get(self.index)?;

            if code == OptionCode::Pad as u8 {
                self.index += 1;
                continue;
            }

            if code == OptionCode::End as u8 {
                self.finished = true;
                return None;
            }

            let Some(&length) = self.data.get(self.index + 1) else {
                return self.fail(format!(
                    "option {} at offset {} is missing its length",
                    code, self.index
                ));
            };

            let start = self.index + 2;
            let end = start + length as usize;
            let Some(value) = self.data.get(start..end) else {
                return self.fail(format!(
                    "option {} declares {} bytes but only {} remain",
                    code,
                    length,
                    self.data.len() - start
                ));
            };

            self.index = end;
            return Some(Ok((code, value)));
        }

        None
    }
}

/// Returns the value of the first occurrence of `code` in the stream.
///
/// The scan returns as soon as the code is found, so a malformed entry
/// after it goes unnoticed.
///
/// # Errors
///
/// Returns [`Error::MalformedOptions`] if an entry before the match (or
/// before the end of the stream when there is no match) is truncated.
pub fn find_option(stream: &[u8], code: u8) -> Result<Option<&[u8]>> {
    for entry in OptionIter::new(stream) {
        let (found, value) = entry?;
        if found == code {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Parses the whole stream into a code → value table.
///
/// Later duplicates of a code overwrite earlier ones.
///
/// # Errors
///
/// Returns [`Error::MalformedOptions`] if any entry before END is truncated.
pub fn parse_options(stream: &[u8]) -> Result<BTreeMap<u8, Vec<u8>>> {
    let mut table = BTreeMap::new();
    for entry in OptionIter::new(stream) {
        let (code, value) = entry?;
        table.insert(code, value.to_vec());
    }
    Ok(table)
}

/// Number of bytes [`encode_option`] writes for a value of this length.
pub fn encoded_len(value: &[u8]) -> usize {
    2 + value.len().min(MAX_OPTION_LENGTH)
}

/// Appends one TLV entry to `buffer`.
///
/// Values longer than [`MAX_OPTION_LENGTH`] are truncated.
pub fn encode_option(buffer: &mut Vec<u8>, code: u8, value: &[u8]) {
    let length = value.len().min(MAX_OPTION_LENGTH);
    buffer.push(code);
    buffer.push(length as u8);
    buffer.extend_from_slice(&value[..length]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_conversions() {
        for value in 1..=8u8 {
            let msg_type = MessageType::try_from(value).unwrap();
            assert_eq!(msg_type as u8, value);
        }
        assert!(MessageType::try_from(0).is_err());
        assert!(MessageType::try_from(9).is_err());
    }

    #[test]
    fn test_option_code_conversions() {
        assert_eq!(OptionCode::try_from(82), Ok(OptionCode::RelayAgentInfo));
        assert_eq!(OptionCode::try_from(249), Ok(OptionCode::MsClasslessStaticRoute));
        assert_eq!(OptionCode::try_from(200), Err(200));
    }

    #[test]
    fn test_parse_skips_pad_and_stops_at_end() {
        let stream = [0, 0, 53, 1, 1, 0, 1, 4, 255, 255, 255, 0, 255, 3, 4, 10, 0, 0, 1];
        let table = parse_options(&stream).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table[&53], vec![1]);
        assert_eq!(table[&1], vec![255, 255, 255, 0]);
        assert!(!table.contains_key(&3));
    }

    #[test]
    fn test_stream_without_end_is_accepted() {
        let table = parse_options(&[53, 1, 3]).unwrap();
        assert_eq!(table[&53], vec![3]);
    }

    #[test]
    fn test_zero_length_option() {
        let table = parse_options(&[55, 0, 255]).unwrap();
        assert_eq!(table[&55], Vec::<u8>::new());
    }

    #[test]
    fn test_missing_length_is_malformed() {
        let result = parse_options(&[51]);
        assert!(matches!(result, Err(Error::MalformedOptions(_))));
    }

    #[test]
    fn test_truncated_value_is_malformed() {
        let result = parse_options(&[51, 4, 0, 0]);
        assert!(matches!(result, Err(Error::MalformedOptions(_))));

        let result = find_option(&[51, 4, 0, 0], 53);
        assert!(matches!(result, Err(Error::MalformedOptions(_))));
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let mut iter = OptionIter::new(&[53, 1, 1, 51, 9, 0]);
        assert!(matches!(iter.next(), Some(Ok((53, [1])))));
        assert!(matches!(iter.next(), Some(Err(_))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_duplicate_codes_first_versus_last() {
        let stream = [53, 1, 1, 53, 1, 3, 255];

        assert_eq!(find_option(&stream, 53).unwrap(), Some(&[1u8][..]));
        assert_eq!(parse_options(&stream).unwrap()[&53], vec![3]);
    }

    #[test]
    fn test_find_option_ignores_entries_after_end() {
        let stream = [53, 1, 1, 255, 50, 4, 10, 0, 0, 5];
        assert_eq!(find_option(&stream, 50).unwrap(), None);
    }

    #[test]
    fn test_find_option_returns_before_malformed_tail() {
        let stream = [53, 1, 1, 51, 200];
        assert_eq!(find_option(&stream, 53).unwrap(), Some(&[1u8][..]));
    }

    #[test]
    fn test_encode_option_layout() {
        let mut buffer = Vec::new();
        encode_option(&mut buffer, 51, &86400u32.to_be_bytes());
        assert_eq!(buffer, vec![51, 4, 0x00, 0x01, 0x51, 0x80]);
        assert_eq!(encoded_len(&86400u32.to_be_bytes()), buffer.len());
    }

    #[test]
    fn test_encode_option_truncates_long_values() {
        let mut buffer = Vec::new();
        let value = vec![b'a'; 300];
        encode_option(&mut buffer, 15, &value);
        assert_eq!(buffer[1], 255);
        assert_eq!(buffer.len(), 257);
        assert_eq!(encoded_len(&value), 257);
    }

    #[test]
    fn test_message_type_display() {
        assert_eq!(format!("{}", MessageType::Discover), "DISCOVER");
        assert_eq!(format!("{}", MessageType::Offer), "OFFER");
        assert_eq!(format!("{}", MessageType::Request), "REQUEST");
        assert_eq!(format!("{}", MessageType::Decline), "DECLINE");
        assert_eq!(format!("{}", MessageType::Ack), "ACK");
        assert_eq!(format!("{}", MessageType::Nak), "NAK");
        assert_eq!(format!("{}", MessageType::Release), "RELEASE");
        assert_eq!(format!("{}", MessageType::Inform), "INFORM");
    }
}
