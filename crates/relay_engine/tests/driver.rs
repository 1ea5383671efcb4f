mod common;

use common::{service, wechat_host};
use relay_core::{Message, MessageKind};
use relay_engine::{run_realtime, HostEvent};
use tokio::sync::mpsc;

#[tokio::test(start_paused = true)]
async fn realtime_driver_runs_a_harvest_to_completion() {
    let (mut service, sink) = service(wechat_host(&[]));
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(HostEvent::window_changed("com.tencent.mm")).unwrap();

    service.sync_contacts().unwrap();
    run_realtime(&mut service, rx).await;

    assert!(!service.is_active());
    assert_eq!(sink.harvests().len(), 1);
    assert_eq!(sink.harvests()[0].len(), 6);
    // Tab open, start delay and seven scroll settles.
    assert!(service.now_ms() >= 2_000 + 2_000 + 7 * 1_500);
}

#[tokio::test(start_paused = true)]
async fn realtime_driver_survives_a_closed_event_channel() {
    let (mut service, sink) = service(wechat_host(&["Alice"]));
    let (tx, rx) = mpsc::unbounded_channel::<HostEvent>();
    drop(tx);

    service
        .submit(vec!["Alice".into()], vec![Message::Text("hi".into())])
        .unwrap();
    run_realtime(&mut service, rx).await;

    assert!(!service.is_active());
    assert_eq!(
        sink.deliveries(),
        vec![("Alice".to_string(), 0, MessageKind::Text)]
    );
    assert!(sink.finished().unwrap().is_complete_success());
}
