//! Codec property tests.
//!
//! - Full link control survives header and terminator bursts for any addressing
//! - Embedded link control reassembles from bursts 1 to 4 of a superframe
//! - YSF voice frames carry the source and destination only in their own slots

mod common;

use proptest::prelude::*;

use ysf2dmr::dmr::{Burst, DataType, DecodedBurst, DmrData, EmbeddedCollector, EmbeddedLc, LinkControl, VoiceSlice};
use ysf2dmr::ysf::{FrameIndicator, PayloadSlot, YsfFrame};
use ysf2dmr::{CallType, Callsign, DmrId, Slot};

fn arb_link_control() -> impl Strategy<Value = LinkControl> {
    (
        prop_oneof![Just(CallType::Group), Just(CallType::Private)],
        0..=DmrId::MAX,
        0..=DmrId::MAX,
    )
        .prop_map(|(call_type, src, dst)| LinkControl::new(call_type, DmrId::new(src), DmrId::new(dst)))
}

// ============================================================================
// Full Link Control
// ============================================================================

proptest! {
    #[test]
    fn prop_header_round_trip(lc in arb_link_control(), color_code in 0u8..16) {
        let burst = Burst::encode_header(&lc, color_code);
        prop_assert_eq!(burst.data_type(), Ok(DataType::VoiceLcHeader));
        prop_assert_eq!(burst.decode(DataType::VoiceLcHeader), Ok(DecodedBurst::Header(lc)));
    }

    #[test]
    fn prop_terminator_round_trip(lc in arb_link_control(), color_code in 0u8..16) {
        let burst = Burst::encode_terminator(&lc, color_code);
        prop_assert_eq!(burst.data_type(), Ok(DataType::TerminatorWithLc));
        prop_assert_eq!(burst.decode(DataType::TerminatorWithLc), Ok(DecodedBurst::Terminator(lc)));
    }

    #[test]
    fn prop_header_is_not_a_terminator(lc in arb_link_control()) {
        let burst = Burst::encode_header(&lc, 1);
        prop_assert!(burst.decode(DataType::TerminatorWithLc).is_err());
    }
}

// ============================================================================
// Embedded Link Control
// ============================================================================

proptest! {
    #[test]
    fn prop_embedded_lc_reassembles(lc in arb_link_control(), color_code in 0u8..16) {
        let embedded = EmbeddedLc::new(&lc);
        let mut collector = EmbeddedCollector::new();
        let mut recovered = None;

        for n in 0..6u8 {
            let burst = Burst::encode_voice_burst(&[VoiceSlice::SILENCE; 3], n, &embedded, color_code);
            let data_type = if n == 0 { DataType::VoiceSync } else { DataType::Voice };
            let Ok(DecodedBurst::Voice { fragment, .. }) = burst.decode(data_type) else {
                return Err(TestCaseError::fail("voice burst did not decode"));
            };
            prop_assert_eq!(fragment.is_some(), n != 0);
            if let Some(lc) = fragment.and_then(|f| collector.push(&f)) {
                prop_assert_eq!(n, 4, "LC completed early");
                recovered = Some(lc);
            }
        }
        prop_assert_eq!(recovered, Some(lc));
    }

    #[test]
    fn prop_missing_fragment_yields_nothing(lc in arb_link_control(), skip in 1u8..=4) {
        let embedded = EmbeddedLc::new(&lc);
        let mut collector = EmbeddedCollector::new();
        for n in (1..=4u8).filter(|&n| n != skip) {
            prop_assert_eq!(collector.push(&embedded.fragment(n)), None);
        }
    }
}

#[test]
fn test_voice_slices_pass_through_unchanged() {
    let lc = LinkControl::new(CallType::Group, DmrId::new(3_100_001), DmrId::new(214));
    let slices = [
        VoiceSlice::from_bytes([0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0x10]),
        VoiceSlice::SILENCE,
        VoiceSlice::from_bytes([0xFF; 9]),
    ];
    let burst = Burst::encode_voice_burst(&slices, 2, &EmbeddedLc::new(&lc), 1);
    assert_eq!(burst.slices(), slices);
}

// ============================================================================
// YSF Payload Slots
// ============================================================================

#[test]
fn test_24_frame_call_slots() {
    let mut bridge = common::bridge(400);
    let lc = LinkControl::new(CallType::Group, DmrId::new(3_100_001), DmrId::new(214));
    let embedded = EmbeddedLc::new(&lc);
    let packet = |data_type, burst| DmrData::new(Slot::Two, lc.src, lc.dst, lc.call_type, data_type, burst);

    bridge
        .push_dmr(&packet(DataType::VoiceLcHeader, Burst::encode_header(&lc, 1)))
        .unwrap();
    // 24 YSF frames of five slices is 40 bursts of three.
    for i in 0..40u8 {
        let n = i % 6;
        let burst = Burst::encode_voice_burst(&[VoiceSlice::from_bytes([i; 9]); 3], n, &embedded, 1);
        let data_type = if n == 0 { DataType::VoiceSync } else { DataType::Voice };
        bridge.push_dmr(&packet(data_type, burst).with_n(n)).unwrap();
    }
    bridge
        .push_dmr(&packet(DataType::TerminatorWithLc, Burst::encode_terminator(&lc, 1)))
        .unwrap();

    let frames: Vec<YsfFrame> = std::iter::from_fn(|| bridge.next_ysf()).collect();
    assert_eq!(frames.len(), 26);

    let source = Callsign::new("W1AW");
    let destination = Callsign::new("TG 214");
    let voice: Vec<&YsfFrame> = frames
        .iter()
        .filter(|f| f.fich().map(|fich| fich.fi) == Ok(FrameIndicator::Communications))
        .collect();
    assert_eq!(voice.len(), 24);

    for (i, frame) in voice.iter().enumerate() {
        let frame_number = frame.fich().unwrap().frame_number;
        assert_eq!(usize::from(frame_number), i % 8);

        let as_source = frame.read_payload_slot(1).ok();
        let as_destination = frame.read_payload_slot(2).ok();
        assert_eq!(
            as_source == Some(PayloadSlot::Source(source)),
            frame_number == 1,
            "frame {i}"
        );
        assert_eq!(
            as_destination == Some(PayloadSlot::Destination(destination)),
            frame_number == 2,
            "frame {i}"
        );
    }
}

#[test]
fn test_counters_are_sequential() {
    let mut bridge = common::bridge(400);
    let lc = LinkControl::new(CallType::Group, DmrId::new(3_100_001), DmrId::new(214));
    let embedded = EmbeddedLc::new(&lc);
    let packet = |data_type, burst| DmrData::new(Slot::Two, lc.src, lc.dst, lc.call_type, data_type, burst);

    bridge
        .push_dmr(&packet(DataType::VoiceLcHeader, Burst::encode_header(&lc, 1)))
        .unwrap();
    for n in 0..6u8 {
        let burst = Burst::encode_voice_burst(&[VoiceSlice::SILENCE; 3], n, &embedded, 1);
        let data_type = if n == 0 { DataType::VoiceSync } else { DataType::Voice };
        bridge.push_dmr(&packet(data_type, burst)).unwrap();
    }
    bridge
        .push_dmr(&packet(DataType::TerminatorWithLc, Burst::encode_terminator(&lc, 1)))
        .unwrap();

    let frames: Vec<YsfFrame> = std::iter::from_fn(|| bridge.next_ysf()).collect();
    let counters: Vec<u8> = frames.iter().map(YsfFrame::counter).collect();
    assert_eq!(counters, (0..frames.len() as u8).collect::<Vec<_>>());
    assert!(frames.iter().take(frames.len() - 1).all(|f| !f.is_end()));
    assert!(frames.last().unwrap().is_end());
}
