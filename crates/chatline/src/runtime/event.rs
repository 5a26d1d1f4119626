use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossterm::event::Event;
use tokio::sync::mpsc;

use crate::app::ChatWidget;
use crate::runtime::host::EchoHost;
use crate::runtime::{EventResult, key_handler};

/// Host-side state advanced by the event loop.
pub(crate) struct LoopState {
    pub(crate) host: EchoHost,
    pub(crate) last_tick: Instant,
}

pub(crate) fn spawn_event_reader(event_tx: mpsc::UnboundedSender<Event>, shutdown: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        while !shutdown.load(Ordering::Relaxed) {
            match crossterm::event::poll(Duration::from_millis(250)) {
                Ok(true) => {
                    if let Ok(event) = crossterm::event::read()
                        && event_tx.send(event).is_err()
                    {
                        break;
                    }
                }
                Ok(false) => {}
                Err(_) => break,
            }
        }
    });
}

pub(crate) async fn process_events(
    widget: &mut ChatWidget,
    state: &mut LoopState,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    tick: &mut tokio::time::Interval,
) -> EventResult {
    enum LoopSignal {
        Event(Option<Event>),
        Tick,
    }

    // Wait for either a terminal event or the next tick so timers and the
    // answer stream advance while the user is idle.
    let signal = tokio::select! {
        biased;
        event = event_rx.recv() => LoopSignal::Event(event),
        _ = tick.tick() => LoopSignal::Tick,
    };
    match signal {
        LoopSignal::Event(None) => return EventResult::Quit,
        LoopSignal::Event(Some(event)) => {
            if matches!(process_event(widget, event), EventResult::Quit) {
                return EventResult::Quit;
            }
        }
        LoopSignal::Tick => advance_clock(widget, state),
    }

    // Drain queued events before re-rendering so rapid key presses and
    // pastes are applied in one frame.
    while let Ok(event) = event_rx.try_recv() {
        if matches!(process_event(widget, event), EventResult::Quit) {
            return EventResult::Quit;
        }
    }

    EventResult::Continue
}

/// Runs the host and the widget timers for the real time elapsed since the
/// previous tick.
pub(crate) fn advance_clock(widget: &mut ChatWidget, state: &mut LoopState) {
    let now = Instant::now();
    let elapsed = now.duration_since(state.last_tick);
    state.last_tick = now;

    state.host.tick(widget, elapsed);
    widget.tick(elapsed);
}

fn process_event(widget: &mut ChatWidget, event: Event) -> EventResult {
    match event {
        Event::Key(key) => key_handler::handle_key_event(widget, key),
        Event::Paste(text) => {
            handle_paste(widget, &text);

            EventResult::Continue
        }
        _ => EventResult::Continue,
    }
}

/// Treats a paste made only of existing file paths as a file drop, and any
/// other paste as text.
fn handle_paste(widget: &mut ChatWidget, text: &str) {
    if let Some(paths) = dropped_paths(text)
        && widget.drop_files(&paths)
    {
        return;
    }

    widget.paste(text);
}

fn dropped_paths(text: &str) -> Option<Vec<PathBuf>> {
    let paths: Vec<PathBuf> = text
        .split_whitespace()
        .map(|token| PathBuf::from(token.trim_matches(|ch| ch == '\'' || ch == '"')))
        .collect();
    if paths.is_empty() || !paths.iter().all(|path| path.is_file()) {
        return None;
    }

    Some(paths)
}
