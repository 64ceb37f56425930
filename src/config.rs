use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;

use crate::dispatch::ReplySettings;
use crate::error::{Error, Result};
use crate::reply::ReplyConfiguration;
use crate::route::MAX_PREFIX_LENGTH;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub bind_address: Ipv4Addr,
    pub server_name: Option<String>,
    pub broadcast_address: Ipv4Addr,
    pub offered_address: Ipv4Addr,
    pub interface_index: Option<u32>,
    pub reply: ReplyConfiguration,
}

impl Default for Config {
    fn default() -> Self {
        let server = Ipv4Addr::new(192, 168, 137, 1);
        let server_name = "dhcpserve".to_string();

        Self {
            bind_address: Ipv4Addr::UNSPECIFIED,
            server_name: Some(server_name.clone()),
            broadcast_address: Ipv4Addr::BROADCAST,
            offered_address: Ipv4Addr::new(192, 168, 137, 11),
            interface_index: None,
            reply: ReplyConfiguration {
                subnet_mask: Some(Ipv4Addr::new(255, 255, 255, 0)),
                server_identifier: Some(server),
                router: Some(server),
                dns_servers: vec![Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(8, 8, 4, 4)],
                domain_name: Some(server_name),
                ..Default::default()
            },
        }
    }
}

impl Config {
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.offered_address.is_unspecified() || self.offered_address.is_broadcast() {
            return Err(Error::InvalidConfig(format!(
                "offered_address {} cannot be assigned to a client",
                self.offered_address
            )));
        }

        if self.offered_address == self.broadcast_address {
            return Err(Error::InvalidConfig(
                "offered_address must differ from broadcast_address".to_string(),
            ));
        }

        let reply = &self.reply;

        if reply.lease_time == 0 {
            return Err(Error::InvalidConfig(
                "reply.lease_time must be greater than 0".to_string(),
            ));
        }

        if reply
            .renewal_time
            .is_some_and(|renewal| renewal > reply.lease_time)
        {
            return Err(Error::InvalidConfig(
                "reply.renewal_time must not exceed reply.lease_time".to_string(),
            ));
        }

        if let Some(rebinding) = reply.rebinding_time {
            if rebinding > reply.lease_time {
                return Err(Error::InvalidConfig(
                    "reply.rebinding_time must not exceed reply.lease_time".to_string(),
                ));
            }
            if reply.renewal_time.is_some_and(|renewal| renewal > rebinding) {
                return Err(Error::InvalidConfig(
                    "reply.renewal_time must not exceed reply.rebinding_time".to_string(),
                ));
            }
        }

        for route in &reply.static_routes {
            if route.prefix_length > MAX_PREFIX_LENGTH {
                return Err(Error::InvalidConfig(format!(
                    "static route {}/{} has a prefix longer than {}",
                    route.network, route.prefix_length, MAX_PREFIX_LENGTH
                )));
            }
        }

        Ok(())
    }

    pub fn reply_settings(&self) -> ReplySettings {
        ReplySettings {
            server_name: self.server_name.clone(),
            broadcast_address: self.broadcast_address,
        }
    }
}
