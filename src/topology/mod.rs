//! # Endpoint/cluster topology
//!
//! The topology is what the network stack exposes: an ordered list of
//! endpoints, each holding an ordered list of clusters. It is laid out once
//! per boot from a [`DeviceConfig`] and read-only afterwards.
//!
//! ```text
//! endpoint 1             endpoint 2            ...   endpoint S+R
//! ┌──────────────────┐   ┌──────────────────┐        ┌──────────────────┐
//! │ Basic            │   │ SwitchConfig(1)  │        │ OnOff(R-1)       │
//! │ Ota              │   └──────────────────┘        │ Groups           │
//! │ SwitchConfig(0)  │                               └──────────────────┘
//! └──────────────────┘
//! ```
//!
//! Switch endpoints come first in parse order, relay endpoints follow. A
//! configuration without peripherals still yields one endpoint carrying the
//! shared clusters.

use heapless::Vec;

use crate::config::ConfigError;
use crate::config::device::{AttrString, DeviceConfig, MAX_RELAYS, MAX_SWITCHES};

/// Most endpoints a topology can hold.
pub const MAX_ENDPOINTS: usize = MAX_SWITCHES + MAX_RELAYS;

/// Most clusters attached to one endpoint.
pub const MAX_CLUSTERS_PER_ENDPOINT: usize = 4;

/// Home Automation profile.
pub const PROFILE_HOME_AUTOMATION: u16 = 0x0104;

/// Device id reported by every endpoint.
pub const DEVICE_ID_CUSTOM: u16 = 0xFFFF;

/// A cluster attached to an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cluster {
    /// Shared identity cluster, see [`BasicInfo`].
    Basic,
    /// Firmware update client.
    Ota,
    /// Configuration of the switch with this index.
    SwitchConfig(u8),
    /// On/off control of the relay with this index.
    OnOff(u8),
    /// Stateless group membership.
    Groups,
}

impl Cluster {
    /// Protocol cluster id.
    pub fn id(&self) -> u16 {
        match self {
            Cluster::Basic => 0x0000,
            Cluster::Groups => 0x0004,
            Cluster::OnOff(_) => 0x0006,
            Cluster::SwitchConfig(_) => 0x0007,
            Cluster::Ota => 0x0019,
        }
    }

    /// Whether the device serves this cluster (as opposed to being a client).
    pub fn is_server(&self) -> bool {
        !matches!(self, Cluster::Ota)
    }
}

/// Attribute data of the basic cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicInfo {
    /// Manufacturer name.
    pub manufacturer: AttrString,
    /// Model identifier.
    pub model: AttrString,
    /// Whether the status-LED attribute is exposed; only with a dedicated LED.
    pub status_led_exposed: bool,
}

/// An addressable endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Endpoint id, one-based.
    pub id: u8,
    /// Application profile.
    pub profile_id: u16,
    /// Device id.
    pub device_id: u16,
    /// Attached clusters, in attach order.
    pub clusters: Vec<Cluster, MAX_CLUSTERS_PER_ENDPOINT>,
}

impl Endpoint {
    fn new(index: usize) -> Self {
        Self {
            id: index as u8 + 1,
            profile_id: PROFILE_HOME_AUTOMATION,
            device_id: DEVICE_ID_CUSTOM,
            clusters: Vec::new(),
        }
    }

    fn attach(&mut self, cluster: Cluster) -> Result<(), ConfigError> {
        self.clusters
            .push(cluster)
            .map_err(|_| ConfigError::TopologyOverflow)
    }

    /// Whether the endpoint carries `cluster`.
    pub fn has(&self, cluster: Cluster) -> bool {
        self.clusters.contains(&cluster)
    }
}

/// The assembled topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    endpoints: Vec<Endpoint, MAX_ENDPOINTS>,
    basic: BasicInfo,
    image_type: Option<u32>,
}

impl Topology {
    /// Lay out endpoints and clusters for `config`.
    ///
    /// # Errors
    ///
    /// `TopologyOverflow` if the tables cannot hold the layout. The
    /// configuration arrays are bounded so that this only happens when the
    /// bounds are changed inconsistently.
    pub fn assemble(config: &DeviceConfig) -> Result<Self, ConfigError> {
        let mut endpoints: Vec<Endpoint, MAX_ENDPOINTS> = Vec::new();
        for index in 0..config.endpoint_count() {
            endpoints
                .push(Endpoint::new(index))
                .map_err(|_| ConfigError::TopologyOverflow)?;
        }

        let first = endpoints.first_mut().ok_or(ConfigError::TopologyOverflow)?;
        first.attach(Cluster::Basic)?;
        first.attach(Cluster::Ota)?;

        let mut slot = 0;
        for switch in config.switches.iter() {
            endpoints[slot].attach(Cluster::SwitchConfig(switch.index))?;
            slot += 1;
        }
        for relay in config.relays.iter() {
            let endpoint = &mut endpoints[slot];
            endpoint.attach(Cluster::OnOff(relay.index))?;
            endpoint.attach(Cluster::Groups)?;
            slot += 1;
        }

        debug!("topology: {} endpoints", endpoints.len());

        Ok(Self {
            endpoints,
            basic: BasicInfo {
                manufacturer: config.manufacturer.clone(),
                model: config.model.clone(),
                status_led_exposed: config.network_indicator.has_dedicated_led,
            },
            image_type: config.image_type,
        })
    }

    /// Endpoints in id order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Endpoint by one-based id.
    pub fn endpoint(&self, id: u8) -> Option<&Endpoint> {
        self.endpoints.iter().find(|endpoint| endpoint.id == id)
    }

    /// Basic cluster attributes.
    pub fn basic(&self) -> &BasicInfo {
        &self.basic
    }

    /// Image type advertised by the update cluster.
    pub fn image_type(&self) -> Option<u32> {
        self.image_type
    }

    /// Endpoint id carrying the given switch.
    pub fn switch_endpoint(&self, switch_idx: u8) -> Option<u8> {
        self.find(Cluster::SwitchConfig(switch_idx))
    }

    /// Endpoint id carrying the given relay.
    pub fn relay_endpoint(&self, relay_idx: u8) -> Option<u8> {
        self.find(Cluster::OnOff(relay_idx))
    }

    fn find(&self, cluster: Cluster) -> Option<u8> {
        self.endpoints
            .iter()
            .find(|endpoint| endpoint.has(cluster))
            .map(|endpoint| endpoint.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::descriptor::PeripheralDescriptor;
    use crate::hal::{Pin, Pull};

    fn config(switches: u8, relays: u8) -> DeviceConfig {
        let mut config = DeviceConfig::new();
        for n in 0..switches {
            config
                .apply(PeripheralDescriptor::Switch {
                    pin: Pin::new(1, n),
                    pull: Pull::Up,
                })
                .unwrap();
        }
        for n in 0..relays {
            config
                .apply(PeripheralDescriptor::Relay {
                    pin: Pin::new(0, n),
                    off_pin: None,
                })
                .unwrap();
        }
        config
    }

    #[test]
    fn test_empty_config_has_one_endpoint() {
        let topology = Topology::assemble(&DeviceConfig::new()).unwrap();
        assert_eq!(topology.endpoints().len(), 1);
        assert_eq!(&topology.endpoints()[0].clusters[..], &[Cluster::Basic, Cluster::Ota]);
        assert_eq!(topology.endpoints()[0].id, 1);
    }

    #[test]
    fn test_switches_before_relays() {
        let topology = Topology::assemble(&config(2, 2)).unwrap();
        let endpoints = topology.endpoints();
        assert_eq!(endpoints.len(), 4);
        assert_eq!(
            &endpoints[0].clusters[..],
            &[Cluster::Basic, Cluster::Ota, Cluster::SwitchConfig(0)]
        );
        assert_eq!(&endpoints[1].clusters[..], &[Cluster::SwitchConfig(1)]);
        assert_eq!(&endpoints[2].clusters[..], &[Cluster::OnOff(0), Cluster::Groups]);
        assert_eq!(&endpoints[3].clusters[..], &[Cluster::OnOff(1), Cluster::Groups]);
        assert_eq!(topology.switch_endpoint(1), Some(2));
        assert_eq!(topology.relay_endpoint(0), Some(3));
        assert_eq!(topology.relay_endpoint(2), None);
    }

    #[test]
    fn test_relay_only_shares_first_endpoint() {
        let topology = Topology::assemble(&config(0, 1)).unwrap();
        assert_eq!(
            &topology.endpoints()[0].clusters[..],
            &[Cluster::Basic, Cluster::Ota, Cluster::OnOff(0), Cluster::Groups]
        );
    }

    #[test]
    fn test_full_config_fits() {
        let topology = Topology::assemble(&config(5, 5)).unwrap();
        assert_eq!(topology.endpoints().len(), MAX_ENDPOINTS);
        assert!(topology.endpoints().iter().all(|e| e.profile_id == PROFILE_HOME_AUTOMATION));
    }

    #[test]
    fn test_cluster_ids() {
        assert_eq!(Cluster::Basic.id(), 0x0000);
        assert_eq!(Cluster::OnOff(3).id(), 0x0006);
        assert!(!Cluster::Ota.is_server());
        assert!(Cluster::Groups.is_server());
    }
}
