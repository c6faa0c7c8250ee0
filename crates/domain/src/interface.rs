use crate::address::{AddressFamily, AddressKey};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// One address on one network interface, as seen by a single enumeration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: Arc<str>,
    pub address: AddressKey,
    pub netmask: IpAddr,
    pub dhcp_ok: bool,
    pub mtu: u32,
    pub index: Option<u32>,
}

impl Interface {
    pub fn new(name: impl Into<Arc<str>>, address: AddressKey, netmask: IpAddr) -> Self {
        Self {
            name: name.into(),
            address,
            netmask,
            dhcp_ok: true,
            mtu: 0,
            index: None,
        }
    }

    pub fn with_mtu(mut self, mtu: u32) -> Self {
        self.mtu = mtu;
        self
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_dhcp(mut self, dhcp_ok: bool) -> Self {
        self.dhcp_ok = dhcp_ok;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.address = self.address.with_port(port);
        self
    }

    pub fn family(&self) -> AddressFamily {
        self.address.family()
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Generation-tagged handle into an [`InterfaceArena`].
///
/// Once the slot it points at is freed the handle goes stale: `get` returns
/// `None` instead of handing out whatever interface reused the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceId {
    index: u32,
    generation: u32,
}

impl InterfaceId {
    pub fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot {
    // Odd generations are occupied, even ones are free.
    generation: u32,
    value: Option<Interface>,
}

#[derive(Debug, Default)]
pub struct InterfaceArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl InterfaceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, interface: Interface) -> InterfaceId {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.value = Some(interface);
            return InterfaceId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            value: Some(interface),
        });
        InterfaceId {
            index,
            generation: 1,
        }
    }

    pub fn get(&self, id: InterfaceId) -> Option<&Interface> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn contains(&self, id: InterfaceId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: InterfaceId) -> Option<Interface> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (InterfaceId, &Interface)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    InterfaceId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }
}
