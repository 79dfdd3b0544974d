//! Network singleton: Ethernet/IP configuration as reported by the
//! device (spec.md §3). Distinct from the host-side `ConnectionManager`
//! configuration query (spec.md §4.2's `GetConfiguration`).

use std::net::Ipv4Addr;

use super::field::{Assignment, Field};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetEui48(pub [u8; 6]);

#[derive(Debug, Clone, Default)]
pub struct Network {
    ethernet_euid48: Field<EthernetEui48>,
    host_ip: Field<Ipv4Addr>,
    netmask: Field<Ipv4Addr>,
    default_router_ip: Field<Ipv4Addr>,
    dhcp_enabled: Field<bool>,
    sddp_enabled: Field<bool>,
}

impl Network {
    pub(crate) fn new() -> Self {
        Network::default()
    }

    pub fn ethernet_euid48(&self) -> Result<EthernetEui48> {
        self.ethernet_euid48.get().copied()
    }

    pub fn set_ethernet_euid48(&mut self, addr: EthernetEui48) -> Result<Assignment> {
        self.ethernet_euid48.set(addr)
    }

    pub fn host_ip(&self) -> Result<Ipv4Addr> {
        self.host_ip.get().copied()
    }

    pub fn set_host_ip(&mut self, ip: Ipv4Addr) -> Result<Assignment> {
        self.host_ip.set(ip)
    }

    pub fn netmask(&self) -> Result<Ipv4Addr> {
        self.netmask.get().copied()
    }

    pub fn set_netmask(&mut self, netmask: Ipv4Addr) -> Result<Assignment> {
        self.netmask.set(netmask)
    }

    pub fn default_router_ip(&self) -> Result<Ipv4Addr> {
        self.default_router_ip.get().copied()
    }

    pub fn set_default_router_ip(&mut self, ip: Ipv4Addr) -> Result<Assignment> {
        self.default_router_ip.set(ip)
    }

    pub fn dhcp_enabled(&self) -> Result<bool> {
        self.dhcp_enabled.get().copied()
    }

    pub fn set_dhcp_enabled(&mut self, enabled: bool) -> Result<Assignment> {
        self.dhcp_enabled.set(enabled)
    }

    pub fn sddp_enabled(&self) -> Result<bool> {
        self.sddp_enabled.get().copied()
    }

    pub fn set_sddp_enabled(&mut self, enabled: bool) -> Result<Assignment> {
        self.sddp_enabled.set(enabled)
    }
}
