use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use crate::app::ChatWidget;
use crate::runtime::event::LoopState;
use crate::runtime::host::EchoHost;
use crate::runtime::terminal::TerminalSession;
use crate::ui;
use crate::ui::util::prompt_wrap_width;

mod event;
pub mod host;
mod key_handler;
mod terminal;

pub(crate) type TuiTerminal = Terminal<CrosstermBackend<io::Stdout>>;

pub(crate) enum EventResult {
    Continue,
    Quit,
}

/// Interval between two timer and render ticks.
const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Runs the TUI event/render loop until the user exits.
///
/// Opens a first tab when `widget` has none.
///
/// # Errors
/// Returns an error if terminal setup or rendering fails.
pub async fn run(widget: &mut ChatWidget) -> io::Result<()> {
    if widget.tab_ids().is_empty() {
        key_handler::open_tab(widget);
    }

    let mut session = TerminalSession::enter()?;

    // Crossterm reads block, so they run on a dedicated thread feeding the
    // async loop.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let shutdown = Arc::new(AtomicBool::new(false));
    event::spawn_event_reader(event_tx, Arc::clone(&shutdown));

    let mut tick = tokio::time::interval(TICK_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut state = LoopState {
        host: EchoHost::attach(widget.bus()),
        last_tick: Instant::now(),
    };
    let result = run_main_loop(
        widget,
        &mut state,
        session.terminal_mut(),
        &mut event_rx,
        &mut tick,
    )
    .await;
    shutdown.store(true, Ordering::Relaxed);

    result
}

async fn run_main_loop(
    widget: &mut ChatWidget,
    state: &mut LoopState,
    terminal: &mut TuiTerminal,
    event_rx: &mut mpsc::UnboundedReceiver<crossterm::event::Event>,
    tick: &mut tokio::time::Interval,
) -> io::Result<()> {
    loop {
        render_frame(widget, terminal)?;

        if matches!(
            event::process_events(widget, state, event_rx, tick).await,
            EventResult::Quit
        ) {
            break;
        }
    }

    Ok(())
}

fn render_frame(widget: &mut ChatWidget, terminal: &mut TuiTerminal) -> io::Result<()> {
    let width = terminal.size()?.width;
    if let Some(tab) = widget.selected_tab_mut() {
        tab.prompt_input_mut()
            .set_wrap_width(prompt_wrap_width(width));
    }

    terminal.draw(|frame| ui::render(frame, widget))?;

    Ok(())
}
