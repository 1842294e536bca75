use std::time::Duration;

use crossterm::event::{Event as TermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::{interval, MissedTickBehavior};

/// Everything the dashboard loop reacts to.
#[derive(Debug, Clone)]
pub enum Event {
    Key(KeyEvent),
    /// Terminal was resized; the next draw picks up the new size
    Resize,
    /// Animation / flash expiry tick
    Tick,
    /// Auto-refresh interval elapsed
    Refresh,
}

pub struct EventHandler {
    rx: UnboundedReceiver<Event>,
}

impl EventHandler {
    pub fn new(tick: Duration, refresh: Duration) -> Self {
        let (tx, rx) = unbounded_channel();
        tokio::spawn(pump(tx, tick, refresh.max(Duration::from_secs(1))));
        EventHandler { rx }
    }

    pub async fn next(&mut self) -> Event {
        self.rx.recv().await.unwrap_or(Event::Tick)
    }
}

fn translate(event: TermEvent) -> Option<Event> {
    match event {
        // Windows also reports key releases
        TermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
        TermEvent::Resize(..) => Some(Event::Resize),
        _ => None,
    }
}

/// Merge terminal input with the two timers until the receiver goes away.
async fn pump(tx: UnboundedSender<Event>, tick: Duration, refresh: Duration) {
    let mut terminal = EventStream::new();
    let mut ticks = interval(tick);
    let mut refreshes = interval(refresh);
    refreshes.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Skip the immediate first refresh; startup already spawns a fetch
    refreshes.tick().await;

    loop {
        let next = tokio::select! {
            input = terminal.next() => match input {
                Some(Ok(event)) => translate(event),
                _ => None,
            },
            _ = ticks.tick() => Some(Event::Tick),
            _ = refreshes.tick() => Some(Event::Refresh),
        };

        if let Some(event) = next {
            if tx.send(event).is_err() {
                return;
            }
        }
    }
}
