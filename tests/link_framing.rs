use telemlink::protocol::{
    OUTBOUND_FRAME_SIZE, encode_command, encode_outbound, internet_checksum,
};
use telemlink::transport::{FrameEvent, Framer, FramerConfig, MemoryLink};
use telemlink::{RawMessage, SOF};

fn poll_all(framer: &mut Framer, link: &mut MemoryLink) -> Vec<FrameEvent> {
    let mut events = Vec::new();
    while link.pending() > 0 || framer.buffered() >= 15 {
        let parsed = framer
            .poll(link, |event| events.push(event))
            .expect("memory link never fails");
        if parsed == 0 && link.pending() == 0 {
            break;
        }
    }
    events
}

fn valid_messages(events: &[FrameEvent]) -> Vec<RawMessage> {
    events
        .iter()
        .filter_map(|event| match event {
            FrameEvent::Valid(payload) => Some(RawMessage::from_payload(payload)),
            FrameEvent::Invalid { .. } => None,
        })
        .collect()
}

#[test]
fn frames_split_across_reads_are_reassembled() {
    let mut link = MemoryLink::new();
    let mut framer = Framer::new(FramerConfig::default());
    let first = RawMessage::new(0x0000_0308, 0x1122_3344_5566_7788);
    let second = RawMessage::new(0x0001_0B02, 42);

    let stream: Vec<u8> = [first.encode_frame(), second.encode_frame()].concat();
    let mut events = Vec::new();
    for chunk in stream.chunks(4) {
        link.inject(chunk);
        events.extend(poll_all(&mut framer, &mut link));
    }

    assert_eq!(valid_messages(&events), vec![first, second]);
    assert_eq!(framer.buffered(), 0);
}

#[test]
fn leading_noise_is_skipped() {
    let mut link = MemoryLink::new();
    let mut framer = Framer::new(FramerConfig::default());
    let message = RawMessage::new(0x0000_0185, 7);

    link.inject(&[0x00, 0x13, 0x37]);
    link.inject(&message.encode_frame());

    let events = poll_all(&mut framer, &mut link);
    assert_eq!(valid_messages(&events), vec![message]);
}

#[test]
fn corrupted_frame_reported_and_stream_resynchronizes() {
    let mut link = MemoryLink::new();
    let mut framer = Framer::new(FramerConfig::default());
    let lost = RawMessage::new(0x0000_0308, 1);
    let kept = RawMessage::new(0x0000_0308, 2);

    let mut bad = lost.encode_frame().to_vec();
    bad[10] ^= 0x01;
    link.inject(&bad);
    link.inject(&kept.encode_frame());

    let events = poll_all(&mut framer, &mut link);
    assert!(matches!(
        events.first(),
        Some(FrameEvent::Invalid { expected, found, .. }) if expected != found
    ));
    assert_eq!(valid_messages(&events), vec![kept]);
}

#[test]
fn long_noise_without_sof_is_discarded() {
    let mut link = MemoryLink::new();
    let mut framer = Framer::new(FramerConfig::default());

    link.inject(&[0x55; 200]);
    let events = poll_all(&mut framer, &mut link);
    assert!(events.is_empty());
    assert_eq!(framer.buffered(), 0);

    let message = RawMessage::new(0x0000_0301, 9);
    link.inject(&message.encode_frame());
    let events = poll_all(&mut framer, &mut link);
    assert_eq!(valid_messages(&events), vec![message]);
}

#[test]
fn per_poll_limit_leaves_remaining_frames_buffered() {
    let mut link = MemoryLink::new();
    let mut framer = Framer::new(FramerConfig {
        max_frames_per_poll: Some(1),
        ..FramerConfig::default()
    });
    for data in 0..3 {
        link.inject(&RawMessage::new(0x0000_0301, data).encode_frame());
    }

    let mut events = Vec::new();
    let parsed = framer
        .poll(&mut link, |event| events.push(event))
        .expect("memory link never fails");
    assert_eq!(parsed, 1);
    assert_eq!(framer.buffered(), 30);

    assert_eq!(framer.drain(|event| events.push(event)), 1);
    assert_eq!(framer.drain(|event| events.push(event)), 1);
    assert_eq!(valid_messages(&events).len(), 3);
}

#[test]
fn update_value_command_frames_for_the_wire() {
    let payload = encode_command("updateValue5").expect("valid command");
    let frame = encode_outbound(&payload);

    assert_eq!(frame.len(), OUTBOUND_FRAME_SIZE);
    assert_eq!(frame[0], SOF);
    assert_eq!(&frame[..], &[0xFF, 0xFA, 0xFF, 5, 0, 0, 0, 0, 0, 0, 0]);

    let carried = u16::from_le_bytes([frame[1], frame[2]]);
    assert_eq!(carried, internet_checksum(&frame[3..]));
}
