//! Network controller (spec.md §4.6, component H). See
//! [`super::front_panel`] for the direct-accessor rationale. The
//! device-reported configuration this controller exposes is distinct
//! from `ConnectionManager::local_configuration` (spec.md §4.2), which
//! describes *this host's* interface, not the device's.

use crate::client::controller::SharedState;
use crate::error::Result;
use crate::model::field::Assignment;
use crate::model::network::EthernetEui48;
use std::net::Ipv4Addr;

#[derive(Clone)]
pub struct NetworkController {
    shared: SharedState,
}

impl NetworkController {
    pub fn new(shared: SharedState) -> Self {
        NetworkController { shared }
    }

    pub fn ethernet_euid48(&self) -> Result<EthernetEui48> {
        self.shared.model.lock().unwrap().network.ethernet_euid48()
    }

    pub fn host_ip(&self) -> Result<Ipv4Addr> {
        self.shared.model.lock().unwrap().network.host_ip()
    }

    pub fn netmask(&self) -> Result<Ipv4Addr> {
        self.shared.model.lock().unwrap().network.netmask()
    }

    pub fn default_router_ip(&self) -> Result<Ipv4Addr> {
        self.shared.model.lock().unwrap().network.default_router_ip()
    }

    pub fn set_host_ip(&self, ip: Ipv4Addr) -> Result<Assignment> {
        self.shared.model.lock().unwrap().network.set_host_ip(ip)
    }
}
