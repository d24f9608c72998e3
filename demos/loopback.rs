//! Loopback station over an in-memory link
//!
//! Plays the microcontroller side by injecting frames, then prints whatever the station
//! queued for the UI.

use std::sync::Arc;
use std::time::Duration;

use telemlink::protocol::metrics_snapshot;
use telemlink::transport::MemoryLink;
use telemlink::{
    BridgeConfig, CanIdentifier, DataInfoMeta, DataKey, FunctionCode, ProtocolTables, RawMessage,
    SerialBridge, Sinks, Station, StationConfig, StaticRegistry, UiQueue,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("telemlink loopback");
    println!("==================\n");

    let registry = StaticRegistry::builder()
        .node(1, "vitals")
        .node(8, "pedals")
        .frame(8, 0, 50)
        .data_point(
            DataKey::new(8, 0, 0),
            DataInfoMeta {
                name: "throttle".into(),
                bit_length: 10,
                min: 0,
                max: 1023,
                min_warning: 0,
                max_warning: 900,
                min_critical: 0,
                max_critical: 1000,
            },
        )
        .build();

    let link = MemoryLink::new();
    let bridge = SerialBridge::from_parts(
        "loopback",
        Box::new(link.clone()),
        Box::new(link.clone()),
        BridgeConfig::default(),
    );
    let (queue, events) = UiQueue::new();
    let config = StationConfig {
        port: "loopback".into(),
        ..StationConfig::default()
    };
    let mut station = Station::with_bridge(
        bridge,
        &config,
        Arc::new(registry),
        Sinks::from_queue(Arc::new(queue)),
        ProtocolTables::default(),
    )?;

    let id = |node, function: FunctionCode, ext| {
        CanIdentifier::new(node, function.as_u8(), ext).to_raw()
    };
    for throttle in [120, 480, 950] {
        link.inject(&RawMessage::new(id(8, FunctionCode::TransmitData, 0), throttle).encode_frame());
    }
    link.inject(&RawMessage::new(id(1, FunctionCode::HeartbeatPong, 0), 0).encode_frame());
    link.inject(&[0x00, 0x42]);

    station.submit_command("updateValue5")?;
    println!("Sent command frame: {:02x?}", link.take_written());

    std::thread::sleep(Duration::from_millis(2_500));
    station.close();

    for event in events.try_iter() {
        println!("{event:?}");
    }

    let metrics = metrics_snapshot();
    println!(
        "\nvalid={} invalid={} discarded={} sent={}",
        metrics.valid_frames, metrics.invalid_frames, metrics.discarded_bytes, metrics.sent_frames
    );

    Ok(())
}
