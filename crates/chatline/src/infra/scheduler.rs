use std::cell::{Cell, RefCell};
use std::time::Duration;

/// Delay before a prompt input regains focus after an attachment change.
pub const FOCUS_AFTER_ATTACHMENT: Duration = Duration::from_millis(100);
/// Delay before a prompt input regains focus after its text is replaced.
pub const FOCUS_AFTER_TEXT_UPDATE: Duration = Duration::from_millis(750);
/// Lifetime of the confirmation shown after voting on a card.
pub const VOTE_CONFIRMATION_LIFETIME: Duration = Duration::from_millis(3500);
/// Delay before the conversation list stops snapping to a new prompt.
pub const SCROLL_SNAP_RELEASE: Duration = Duration::from_millis(100);

/// Deferred work owned by a widget component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduledTask {
    FocusPromptInput { tab_id: String },
    DismissVoteConfirmation { tab_id: String, message_id: String },
    ClearScrollSnap { tab_id: String },
}

impl ScheduledTask {
    /// Returns the tab owning this task.
    pub fn tab_id(&self) -> &str {
        match self {
            ScheduledTask::FocusPromptInput { tab_id }
            | ScheduledTask::DismissVoteConfirmation { tab_id, .. }
            | ScheduledTask::ClearScrollSnap { tab_id } => tab_id,
        }
    }
}

#[derive(Debug)]
struct Timer {
    due: Duration,
    sequence: u64,
    task: ScheduledTask,
}

/// Fire-and-forget timers on a virtual clock.
///
/// Timers are never cancelled. Owners must tolerate a task firing after the
/// component it targets has gone away.
#[derive(Debug, Default)]
pub struct Scheduler {
    next_sequence: Cell<u64>,
    now: Cell<Duration>,
    timers: RefCell<Vec<Timer>>,
}

impl Scheduler {
    /// Creates a scheduler with its clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task` to fire once `delay` has elapsed.
    pub fn schedule(&self, delay: Duration, task: ScheduledTask) {
        let sequence = self.next_sequence.get();
        self.next_sequence.set(sequence + 1);
        tracing::trace!(?task, delay_ms = delay.as_millis(), "task scheduled");
        self.timers.borrow_mut().push(Timer {
            due: self.now.get() + delay,
            sequence,
            task,
        });
    }

    /// Moves the clock forward and returns every due task in firing order.
    pub fn advance(&self, elapsed: Duration) -> Vec<ScheduledTask> {
        let now = self.now.get() + elapsed;
        self.now.set(now);

        let mut due = Vec::new();
        self.timers.borrow_mut().retain_mut(|timer| {
            if timer.due <= now {
                due.push((timer.due, timer.sequence, timer.task.clone()));

                return false;
            }

            true
        });
        due.sort_by_key(|(due_at, sequence, _)| (*due_at, *sequence));

        due.into_iter().map(|(_, _, task)| task).collect()
    }

    /// Returns the virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Returns the number of timers that have not fired yet.
    pub fn pending_count(&self) -> usize {
        self.timers.borrow().len()
    }
}
