use std::net::SocketAddr;

use pcload_stream::DEFAULT_DISPLAY_CAP;

#[derive(Clone, Debug, derive_builder::Builder)]
pub struct ServerConfig {
    #[builder(default = "SocketAddr::from(([127, 0, 0, 1], 8080))")]
    interface: SocketAddr,

    /// How many records may be waiting for the client before the pipeline blocks.
    #[builder(default = "64")]
    channel_capacity: usize,

    #[builder(default = "DEFAULT_DISPLAY_CAP")]
    display_cap: usize,

    /// Log progress every this many records.
    #[builder(default = "1_000")]
    progress_every: u64,
}

impl ServerConfig {
    pub fn get_interface(&self) -> SocketAddr {
        self.interface
    }

    pub fn get_channel_capacity(&self) -> usize {
        self.channel_capacity.max(1)
    }

    pub fn get_display_cap(&self) -> usize {
        self.display_cap
    }

    pub fn get_progress_every(&self) -> u64 {
        self.progress_every
    }
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfigBuilder::default()
            .build()
            .expect("Every field has a default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.get_interface(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.get_channel_capacity(), 64);
        assert_eq!(config.get_display_cap(), 50);
        assert_eq!(config.get_progress_every(), 1_000);
    }

    #[test]
    fn zero_sizes_are_clamped() {
        let config = ServerConfigBuilder::default()
            .channel_capacity(0)
            .build()
            .unwrap();
        assert_eq!(config.get_channel_capacity(), 1);
    }
}
