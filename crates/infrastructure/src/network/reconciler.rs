use super::listener::ListenerSet;
use ferrous_netd_domain::{AddressKey, InterfaceArena, InterfaceId, NetworkError};
use smallvec::SmallVec;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub removed: usize,
    pub retargeted: usize,
    pub wildcard_closed: bool,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.removed == 0 && !self.wildcard_closed
    }
}

/// Brings the listener set in line with a freshly enumerated interface list
/// while leaving listeners on unchanged addresses alone.
pub struct ListenerReconciler {
    service_port: u16,
}

impl ListenerReconciler {
    pub fn new(service_port: u16) -> Self {
        Self { service_port }
    }

    /// `old` is consumed: once this returns, those ids are gone from the
    /// arena and no listener references them, even on error.
    pub fn reconcile(
        &self,
        arena: &mut InterfaceArena,
        old: Vec<InterfaceId>,
        new: &[InterfaceId],
        listeners: &mut ListenerSet,
    ) -> Result<ReconcileReport, NetworkError> {
        let mut report = ReconcileReport::default();

        let new_keys: SmallVec<[(InterfaceId, AddressKey); 16]> = new
            .iter()
            .filter_map(|id| arena.get(*id).map(|iface| (*id, iface.address)))
            .collect();
        let mut old_keys: SmallVec<[AddressKey; 16]> = SmallVec::new();

        for old_id in &old {
            let Some(old_iface) = arena.get(*old_id) else {
                continue;
            };
            let old_key = old_iface.address;
            old_keys.push(old_key);

            match new_keys.iter().find(|(_, key)| *key == old_key) {
                Some((new_id, _)) => {
                    if let Some(new_iface) = arena.get(*new_id) {
                        report.retargeted += listeners.retarget(*old_id, *new_id, new_iface);
                    }
                }
                None => {
                    debug!(address = %old_key, "Interface address gone");
                    report.removed += listeners.remove_bound_to(*old_id);
                }
            }
        }

        let was_wild = listeners.has_wildcard();
        if was_wild {
            report.removed += listeners.remove_wildcards();
            report.wildcard_closed = true;
        }

        let mut failure = None;
        for (new_id, key) in &new_keys {
            // An earlier failed pass may have recorded the address without
            // ever opening its listener.
            if !was_wild
                && old_keys.contains(key)
                && listeners.find(&key.with_port(self.service_port)).is_some()
            {
                continue;
            }
            let Some(iface) = arena.get(*new_id) else {
                continue;
            };
            match listeners.add_bound(*new_id, iface, self.service_port) {
                Ok(true) => report.created += 1,
                Ok(false) => {}
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        for old_id in old {
            if !new.contains(&old_id) {
                arena.remove(old_id);
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        if !report.is_noop() {
            info!(
                created = report.created,
                removed = report.removed,
                retargeted = report.retargeted,
                wildcard_closed = report.wildcard_closed,
                "Listeners reconciled"
            );
        }
        Ok(report)
    }
}
