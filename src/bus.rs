use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Initiator-driven pins of one transaction. `select`/`address`/`write`/
/// `wdata` are valid from the setup phase onward; `enable` is high only
/// during the access phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusRequest {
    pub select: bool,
    pub enable: bool,
    pub address: u32,
    pub write: bool,
    pub wdata: u32,
}

/// Peer-driven pins, sampled each access tick. `rdata` and `slverr` are
/// meaningful only on the tick `ready` is high.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusReply {
    pub ready: bool,
    pub rdata: u32,
    pub slverr: bool,
}

impl BusReply {
    pub fn wait() -> Self {
        Self::default()
    }

    pub fn ready(rdata: u32) -> Self {
        Self {
            ready: true,
            rdata,
            slverr: false,
        }
    }

    pub fn error() -> Self {
        Self {
            ready: true,
            rdata: 0,
            slverr: true,
        }
    }
}

/// Anything that answers bus transactions. The initiator calls [`setup`] once
/// per transaction during the address phase, then [`access`] once per tick
/// until the peer answers with `ready`. Holding `ready` low is the peer's
/// only backpressure mechanism; the initiator never times out on its own.
///
/// [`setup`]: BusPeer::setup
/// [`access`]: BusPeer::access
pub trait BusPeer {
    fn setup(&mut self, _req: &BusRequest) {}
    fn access(&mut self, req: &BusRequest) -> BusReply;
}

/// Word-addressed scratch memory peer with fixed wait-states and optional
/// faulting address ranges. Suitable as the demo responder for script runs.
#[derive(Debug, Clone, Default)]
pub struct SramPeer {
    mem: HashMap<u32, u32>,
    wait_states: u32,
    waits_left: u32,
    fault_ranges: Vec<(u32, u32)>,
}

impl SramPeer {
    pub fn new(wait_states: u32) -> Self {
        Self {
            wait_states,
            ..Self::default()
        }
    }

    pub fn preload(&mut self, pairs: impl IntoIterator<Item = (u32, u32)>) {
        for (addr, value) in pairs {
            self.mem.insert(addr, value);
        }
    }

    /// Inclusive range of addresses that answer with a slave error.
    pub fn add_fault_range(&mut self, start: u32, end: u32) {
        self.fault_ranges.push((start, end));
    }

    pub fn dump(&self) -> Vec<(u32, u32)> {
        let mut pairs: Vec<(u32, u32)> = self.mem.iter().map(|(k, v)| (*k, *v)).collect();
        pairs.sort_unstable();
        pairs
    }

    fn faults(&self, addr: u32) -> bool {
        self.fault_ranges
            .iter()
            .any(|(start, end)| addr >= *start && addr <= *end)
    }
}

impl BusPeer for SramPeer {
    fn setup(&mut self, _req: &BusRequest) {
        self.waits_left = self.wait_states;
    }

    fn access(&mut self, req: &BusRequest) -> BusReply {
        if self.waits_left > 0 {
            self.waits_left -= 1;
            return BusReply::wait();
        }
        if self.faults(req.address) {
            return BusReply::error();
        }
        if req.write {
            self.mem.insert(req.address, req.wdata);
            BusReply::ready(0)
        } else {
            BusReply::ready(self.mem.get(&req.address).copied().unwrap_or(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_req(address: u32, wdata: u32) -> BusRequest {
        BusRequest {
            select: true,
            enable: true,
            address,
            write: true,
            wdata,
        }
    }

    fn read_req(address: u32) -> BusRequest {
        BusRequest {
            select: true,
            enable: true,
            address,
            write: false,
            wdata: 0,
        }
    }

    #[test]
    fn sram_round_trips_writes() {
        let mut peer = SramPeer::new(0);
        peer.setup(&write_req(0x10, 0xAA));
        assert_eq!(peer.access(&write_req(0x10, 0xAA)), BusReply::ready(0));
        peer.setup(&read_req(0x10));
        assert_eq!(peer.access(&read_req(0x10)), BusReply::ready(0xAA));
        assert_eq!(peer.dump(), vec![(0x10, 0xAA)]);
    }

    #[test]
    fn unwritten_addresses_read_zero() {
        let mut peer = SramPeer::new(0);
        peer.setup(&read_req(0x44));
        assert_eq!(peer.access(&read_req(0x44)), BusReply::ready(0));
    }

    #[test]
    fn wait_states_delay_each_transaction() {
        let mut peer = SramPeer::new(2);
        let req = read_req(0x04);
        peer.setup(&req);
        assert_eq!(peer.access(&req), BusReply::wait());
        assert_eq!(peer.access(&req), BusReply::wait());
        assert_eq!(peer.access(&req), BusReply::ready(0));
        // Next transaction waits again from the top.
        peer.setup(&req);
        assert_eq!(peer.access(&req), BusReply::wait());
    }

    #[test]
    fn fault_range_answers_slave_error() {
        let mut peer = SramPeer::new(0);
        peer.add_fault_range(0x80, 0xFF);
        peer.setup(&write_req(0x90, 1));
        assert_eq!(peer.access(&write_req(0x90, 1)), BusReply::error());
        peer.setup(&write_req(0x7F, 1));
        assert_eq!(peer.access(&write_req(0x7F, 1)), BusReply::ready(0));
    }
}
