//! A burst together with the addressing the network carries alongside it.

use super::{Burst, DataType};
use crate::types::{CallType, DmrId, Slot};

/// One DMR burst as exchanged with the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmrData {
    pub slot: Slot,
    pub src: DmrId,
    pub dst: DmrId,
    pub call_type: CallType,
    pub data_type: DataType,
    /// Superframe position of voice bursts, 0 to 5.
    pub n: u8,
    pub burst: Burst,
    /// Bit error rate reported by the sender.
    pub ber: u8,
    pub rssi: u8,
}

impl DmrData {
    pub fn new(
        slot: Slot,
        src: DmrId,
        dst: DmrId,
        call_type: CallType,
        data_type: DataType,
        burst: Burst,
    ) -> Self {
        Self {
            slot,
            src,
            dst,
            call_type,
            data_type,
            n: 0,
            burst,
            ber: 0,
            rssi: 0,
        }
    }

    pub fn with_n(mut self, n: u8) -> Self {
        self.n = n;
        self
    }
}
