//! Relay agent information (Option 82, RFC 3046).
//!
//! A relay agent appends Option 82 to the requests it forwards. Its value is
//! itself a sequence of `(sub-code, length, value)` entries; sub-option 1 is
//! the agent circuit ID and sub-option 2 the agent remote ID. Unlike the main
//! option stream there are no PAD or END codes.

use crate::error::{Error, Result};
use crate::options::MAX_OPTION_LENGTH;

/// Sub-option code of the agent circuit ID.
pub const SUBOPTION_CIRCUIT_ID: u8 = 1;

/// Sub-option code of the agent remote ID.
pub const SUBOPTION_REMOTE_ID: u8 = 2;

/// Parsed Option 82 content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayInfo {
    /// Agent circuit ID (sub-option 1).
    pub circuit_id: Option<Vec<u8>>,
    /// Agent remote ID (sub-option 2).
    pub remote_id: Option<Vec<u8>>,
}

impl RelayInfo {
    /// Parses the raw value of Option 82.
    ///
    /// Unknown sub-options are skipped by their length. A repeated circuit or
    /// remote ID replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOptions`] if a sub-option's length byte or
    /// value runs past the end of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut info = Self::default();
        let mut index = 0;

        while index < data.len() {
            let sub_code = data[index];

            let Some(&length) = data.get(index + 1) else {
                return Err(Error::MalformedOptions(format!(
                    "relay sub-option {} is missing its length",
                    sub_code
                )));
            };

            let start = index + 2;
            let end = start + length as usize;
            let Some(value) = data.get(start..end) else {
                return Err(Error::MalformedOptions(format!(
                    "relay sub-option {} declares {} bytes but only {} remain",
                    sub_code,
                    length,
                    data.len() - start
                )));
            };

            match sub_code {
                SUBOPTION_CIRCUIT_ID => info.circuit_id = Some(value.to_vec()),
                SUBOPTION_REMOTE_ID => info.remote_id = Some(value.to_vec()),
                _ => {}
            }

            index = end;
        }

        Ok(info)
    }

    /// Encodes the known sub-options back into an Option 82 value.
    ///
    /// Useful for forcing a rewritten relay option into a reply. Each
    /// sub-option value is truncated to 255 bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::new();
        for (sub_code, value) in [
            (SUBOPTION_CIRCUIT_ID, &self.circuit_id),
            (SUBOPTION_REMOTE_ID, &self.remote_id),
        ] {
            if let Some(value) = value {
                let len = value.len().min(MAX_OPTION_LENGTH);
                result.push(sub_code);
                result.push(len as u8);
                result.extend_from_slice(&value[..len]);
            }
        }
        result
    }
}
