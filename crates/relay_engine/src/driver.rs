use std::time::Duration;

use relay_logging::{relay_info, relay_warn};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{self, Instant};

use crate::{AccessibilityHost, AutomationService, HostEvent};

/// Drives the service against wall time until it goes idle.
///
/// Sleeps until the next timeline deadline or the next host notification,
/// whichever comes first. A closed event channel is tolerated; the run then
/// continues on timers alone.
pub async fn run_realtime<H: AccessibilityHost>(
    service: &mut AutomationService<H>,
    mut events: UnboundedReceiver<HostEvent>,
) {
    let origin = Instant::now();
    let base = service.now_ms();
    let elapsed = |origin: Instant| base + origin.elapsed().as_millis() as u64;
    let mut events_open = true;

    while service.is_active() {
        let deadline = service.next_deadline();
        if deadline.is_none() && !events_open {
            relay_warn!("nothing scheduled and no event source left; giving up");
            break;
        }
        let wake_at = deadline.map(|due| origin + Duration::from_millis(due.saturating_sub(base)));

        tokio::select! {
            _ = async {
                match wake_at {
                    Some(at) => time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                service.advance_to(elapsed(origin));
            }
            event = events.recv(), if events_open => match event {
                Some(event) => {
                    service.advance_to(elapsed(origin));
                    service.handle_event(&event);
                }
                None => events_open = false,
            },
        }
    }
    relay_info!("automation session idle at t={}ms", service.now_ms());
}
