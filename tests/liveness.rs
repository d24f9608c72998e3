use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use telemlink::monitor::TickPolicy;
use telemlink::{
    CanIdentifier, FrameKey, FrameTimeoutMonitor, FunctionCode, HeartbeatMonitor, MessageDecoder,
    MonitorConfig, MonitorHandle, ProtocolLayout, ProtocolTables, Severity, Sinks,
    StaticRegistry, UiEvent, UiQueue,
};

fn decoder() -> (MessageDecoder, Receiver<UiEvent>) {
    let registry = StaticRegistry::builder()
        .node(1, "vitals")
        .node(2, "pedals")
        .node(3, "motor")
        .frame(2, 0, 100)
        .frame(3, 1, 20)
        .build();
    let (queue, events) = UiQueue::new();
    let decoder = MessageDecoder::new(
        Arc::new(registry),
        Sinks::from_queue(Arc::new(queue)),
        ProtocolLayout::default(),
        ProtocolTables::default(),
    )
    .expect("default layout is valid");
    (decoder, events)
}

fn id(node: u8, function: FunctionCode, extended: u32) -> u32 {
    CanIdentifier::new(node, function.as_u8(), extended).to_raw()
}

fn post_texts(events: &Receiver<UiEvent>) -> Vec<String> {
    events
        .try_iter()
        .filter_map(|event| match event {
            UiEvent::Post { text, .. } => Some(text),
            _ => None,
        })
        .collect()
}

#[test]
fn pong_windows_do_not_overlap() {
    let (decoder, events) = decoder();
    let monitor = HeartbeatMonitor::new(&decoder);

    for node in [1, 2, 3] {
        decoder.decode(id(node, FunctionCode::HeartbeatPong, 0), 0);
    }
    let report = monitor.evaluate();
    assert_eq!(report.severity(), Severity::Ok);
    assert_eq!(post_texts(&events), vec!["HB Pong Status (3/3)".to_string()]);

    decoder.decode(id(2, FunctionCode::HeartbeatPong, 0), 0);
    let report = monitor.evaluate();
    assert_eq!(report.collected, 1);
    assert_eq!(report.missing, vec!["vitals".to_string(), "motor".to_string()]);
    assert_eq!(
        report.text(),
        "HB Pong Status (1/3). Missing: vitals, motor"
    );
}

#[test]
fn silent_frame_alerts_then_backs_off() {
    let (decoder, events) = decoder();
    let policy = TickPolicy::default();
    let monitor = FrameTimeoutMonitor::new(&decoder, policy);
    let motor = FrameKey::new(3, 1);

    // 20 ms timeout: reported once the countdown passes -5 ms.
    let mut first_alert = None;
    for tick in 1..=10 {
        if monitor.tick().iter().any(|frame| frame.key == motor) {
            first_alert = Some(tick);
            break;
        }
    }
    assert_eq!(first_alert, Some(6));
    assert_eq!(decoder.timers().remaining(motor), Some(1000));
    assert_eq!(
        post_texts(&events),
        vec![
            "Missing CAN frame: motor (frameIndex=1). Expected every ~20ms; overdue by 10ms."
                .to_string()
        ]
    );

    // Back-off: silence for another 199 ticks stays quiet for this frame.
    for _ in 0..199 {
        assert!(!monitor.tick().iter().any(|frame| frame.key == motor));
    }
}

#[test]
fn receipt_preempts_the_alert() {
    let (decoder, events) = decoder();
    let monitor = FrameTimeoutMonitor::new(&decoder, TickPolicy::default());
    let pedals = FrameKey::new(2, 0);

    for _ in 0..5 {
        for _ in 0..19 {
            monitor.tick();
        }
        decoder.decode(id(2, FunctionCode::TransmitData, 0), 0);
        assert_eq!(decoder.timers().remaining(pedals), Some(100));
    }

    let alerts: Vec<String> = post_texts(&events)
        .into_iter()
        .filter(|text| text.contains("pedals"))
        .collect();
    assert!(alerts.is_empty());
}

#[test]
fn background_monitors_publish_and_stop() {
    let (decoder, events) = decoder();
    let config = MonitorConfig {
        heartbeat_interval: Duration::from_millis(20),
        ..MonitorConfig::default()
    };
    let mut handle = MonitorHandle::spawn(&decoder, &config).expect("threads spawn");

    let mut texts = Vec::new();
    for _ in 0..200 {
        texts.extend(post_texts(&events));
        if texts.iter().any(|text| text.starts_with("HB Pong Status"))
            && texts.iter().any(|text| text.starts_with("Missing CAN frame: motor"))
        {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    handle.stop();

    assert!(texts.iter().any(|text| text == "HB Pong Status (0/3). Missing: vitals, pedals, motor"));
    assert!(texts.iter().any(|text| text.starts_with("Missing CAN frame: motor")));
}
