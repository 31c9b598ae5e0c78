//! Call routing between the two networks.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dmr::LinkControl;
use crate::lookup::CallsignLookup;
use crate::types::{CallType, Callsign, DmrId, Slot};
use crate::ysf::FrameAddress;

/// How the DMR source ID of a YSF call is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceIdPolicy {
    /// Look the YSF callsign up, falling back to the gateway ID.
    #[default]
    Lookup,
    /// Always use the gateway ID.
    Fixed,
}

/// Routing configuration, fixed for the life of the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingPolicy {
    /// The gateway's own DMR ID.
    pub gateway_id: DmrId,
    pub gateway_callsign: Callsign,
    pub source_id: SourceIdPolicy,
    /// Destination of YSF-originated calls, and the talkgroup accepted from DMR.
    pub dst_id: DmrId,
    pub call_type: CallType,
    pub slot: Slot,
    pub color_code: u8,
}

impl RoutingPolicy {
    /// DMR link control for a call from YSF station `source`.
    pub fn dmr_route(&self, source: &Callsign, lookup: &dyn CallsignLookup) -> LinkControl {
        let src = match self.source_id {
            SourceIdPolicy::Fixed => self.gateway_id,
            SourceIdPolicy::Lookup => {
                let base = source.base();
                match lookup.find_id(&base) {
                    Some(id) => id,
                    None => {
                        warn!(
                            "No DMR ID for {}, using gateway ID {}",
                            source, self.gateway_id
                        );
                        self.gateway_id
                    }
                }
            }
        };
        LinkControl::new(self.call_type, src, self.dst_id)
    }

    /// Whether a DMR call should be relayed to YSF.
    pub fn accepts(&self, slot: Slot, dst: DmrId, call_type: CallType) -> bool {
        if slot != self.slot {
            return false;
        }
        match call_type {
            CallType::Group => dst == self.dst_id,
            CallType::Private => dst == self.gateway_id,
        }
    }

    /// YSF callsign fields for a call from DMR.
    pub fn ysf_address(
        &self,
        src: DmrId,
        dst: DmrId,
        call_type: CallType,
        lookup: &dyn CallsignLookup,
    ) -> FrameAddress {
        let source = lookup
            .find_callsign(src)
            .unwrap_or_else(|| src.to_string());
        let destination = match call_type {
            CallType::Group => format!("TG {dst}"),
            CallType::Private => lookup
                .find_callsign(dst)
                .unwrap_or_else(|| dst.to_string()),
        };

        FrameAddress {
            gateway: self.gateway_callsign,
            source: Callsign::new(&source),
            destination: Callsign::new(&destination),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory lookup for tests.
    #[derive(Default)]
    pub(crate) struct MapLookup(pub HashMap<u32, &'static str>);

    impl CallsignLookup for MapLookup {
        fn find_callsign(&self, id: DmrId) -> Option<String> {
            self.0.get(&id.value()).map(|s| s.to_string())
        }

        fn find_id(&self, callsign: &str) -> Option<DmrId> {
            self.0
                .iter()
                .find(|(_, cs)| cs.eq_ignore_ascii_case(callsign))
                .map(|(&id, _)| DmrId::new(id))
        }
    }

    pub(crate) fn policy() -> RoutingPolicy {
        RoutingPolicy {
            gateway_id: DmrId::new(2_140_001),
            gateway_callsign: Callsign::new("EA7EE"),
            source_id: SourceIdPolicy::Lookup,
            dst_id: DmrId::new(214),
            call_type: CallType::Group,
            slot: Slot::Two,
            color_code: 1,
        }
    }

    fn lookup() -> MapLookup {
        MapLookup(HashMap::from([(1_234_567, "G4KLX"), (3_100_001, "W1AW")]))
    }

    #[test]
    fn test_lookup_strips_suffix() {
        let lc = policy().dmr_route(&Callsign::new("G4KLX-7"), &lookup());
        assert_eq!(lc.src, DmrId::new(1_234_567));
        assert_eq!(lc.dst, DmrId::new(214));
        assert_eq!(lc.call_type, CallType::Group);
    }

    #[test]
    fn test_lookup_miss_falls_back() {
        let lc = policy().dmr_route(&Callsign::new("N0CALL"), &lookup());
        assert_eq!(lc.src, policy().gateway_id);

        let fixed = RoutingPolicy {
            source_id: SourceIdPolicy::Fixed,
            ..policy()
        };
        let lc = fixed.dmr_route(&Callsign::new("G4KLX"), &lookup());
        assert_eq!(lc.src, policy().gateway_id);
    }

    #[test]
    fn test_accepts_only_bridged_traffic() {
        let p = policy();
        assert!(p.accepts(Slot::Two, DmrId::new(214), CallType::Group));
        assert!(!p.accepts(Slot::One, DmrId::new(214), CallType::Group));
        assert!(!p.accepts(Slot::Two, DmrId::new(91), CallType::Group));
        assert!(p.accepts(Slot::Two, p.gateway_id, CallType::Private));
    }

    #[test]
    fn test_ysf_address() {
        let p = policy();
        let addr = p.ysf_address(DmrId::new(3_100_001), DmrId::new(214), CallType::Group, &lookup());
        assert_eq!(addr.source.to_string(), "W1AW");
        assert_eq!(addr.destination.to_string(), "TG 214");
        assert_eq!(addr.gateway, p.gateway_callsign);

        let addr = p.ysf_address(DmrId::new(5), DmrId::new(1_234_567), CallType::Private, &lookup());
        assert_eq!(addr.source.to_string(), "5");
        assert_eq!(addr.destination.to_string(), "G4KLX");
    }
}
