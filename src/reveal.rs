//! Timed answer reveal for a single quiz question.
//!
//! ```text
//! Unanswered ──select(a)──▶ Pending{a} ──verify_delay──▶ Revealed{a, correct} ──reveal_hold──▶ Finished
//!     │
//!     └──answer_window──▶ Skipped
//! ```
//!
//! Every stage runs on one tokio timer task. Leaving a stage aborts its task,
//! and dropping the [`AnswerCycle`] aborts whatever is outstanding, so no
//! transition fires into a question that is gone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::notifier::{Published, Subscription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerPhase {
    Unanswered,
    Pending { selected: String },
    Revealed { selected: String, correct: bool },
    Finished { selected: String, correct: bool },
    Skipped,
}

impl AnswerPhase {
    /// Style hint for the answer buttons: `""`, `"answered"`, `"correct"` or
    /// `"wrong"`.
    pub fn label(&self) -> &'static str {
        match self {
            AnswerPhase::Unanswered | AnswerPhase::Skipped => "",
            AnswerPhase::Pending { .. } => "answered",
            AnswerPhase::Revealed { correct, .. } | AnswerPhase::Finished { correct, .. } => {
                if *correct {
                    "correct"
                } else {
                    "wrong"
                }
            }
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, AnswerPhase::Finished { .. } | AnswerPhase::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealTimings {
    /// How long the player has to pick an answer.
    pub answer_window: Duration,
    /// Pause between picking and revealing correctness.
    pub verify_delay: Duration,
    /// How long the verdict stays visible before the question finishes.
    pub reveal_hold: Duration,
}

impl Default for RevealTimings {
    fn default() -> Self {
        RevealTimings {
            answer_window: Duration::from_secs(10),
            verify_delay: Duration::from_secs(1),
            reveal_hold: Duration::from_secs(2),
        }
    }
}

struct CycleInner {
    correct_answer: String,
    timings: RevealTimings,
    phase: Published<AnswerPhase>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl CycleInner {
    fn timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `next` only if the current phase satisfies `expected`.
    fn advance(&self, expected: impl Fn(&AnswerPhase) -> bool, next: AnswerPhase) -> bool {
        let moved = self.phase.update(|phase| {
            if expected(phase) {
                (Some(next.clone()), true)
            } else {
                (None, false)
            }
        });
        if moved {
            debug!(phase = ?next, "answer phase changed");
            self.phase.flush();
        }
        moved
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.timer().take() {
            handle.abort();
        }
    }
}

/// One question's answer cycle. Must be created inside a tokio runtime.
pub struct AnswerCycle {
    inner: Arc<CycleInner>,
}

impl AnswerCycle {
    /// Start the answer window for a question whose right answer is
    /// `correct_answer`.
    pub fn start(correct_answer: impl Into<String>, timings: RevealTimings) -> Self {
        let inner = Arc::new(CycleInner {
            correct_answer: correct_answer.into(),
            timings,
            phase: Published::new(AnswerPhase::Unanswered),
            timer: Mutex::new(None),
        });

        let weak = Arc::downgrade(&inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timings.answer_window).await;
            if let Some(inner) = weak.upgrade() {
                inner.advance(
                    |phase| matches!(phase, AnswerPhase::Unanswered),
                    AnswerPhase::Skipped,
                );
            }
        });
        *inner.timer() = Some(handle);

        AnswerCycle { inner }
    }

    pub fn phase(&self) -> AnswerPhase {
        self.inner.phase.get()
    }

    pub fn timings(&self) -> RevealTimings {
        self.inner.timings
    }

    /// Length of the stage the cycle is currently in, `None` once settled.
    pub fn stage_duration(&self) -> Option<Duration> {
        match self.inner.phase.get() {
            AnswerPhase::Unanswered => Some(self.inner.timings.answer_window),
            AnswerPhase::Pending { .. } => Some(self.inner.timings.verify_delay),
            AnswerPhase::Revealed { .. } => Some(self.inner.timings.reveal_hold),
            AnswerPhase::Finished { .. } | AnswerPhase::Skipped => None,
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&AnswerPhase) + Send + Sync + 'static,
    {
        self.inner.phase.subscribe(callback)
    }

    /// Pick an answer. Ignored (returns `false`) unless the question is still
    /// unanswered.
    pub fn select(&self, answer: impl Into<String>) -> bool {
        let selected = answer.into();
        let pending = AnswerPhase::Pending {
            selected: selected.clone(),
        };
        if !self
            .inner
            .advance(|phase| matches!(phase, AnswerPhase::Unanswered), pending)
        {
            return false;
        }
        self.inner.cancel_timer();

        let correct = selected == self.inner.correct_answer;
        let timings = self.inner.timings;
        let weak: Weak<CycleInner> = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timings.verify_delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let revealed = AnswerPhase::Revealed {
                selected: selected.clone(),
                correct,
            };
            if !inner.advance(|phase| matches!(phase, AnswerPhase::Pending { .. }), revealed) {
                return;
            }
            drop(inner);

            tokio::time::sleep(timings.reveal_hold).await;
            if let Some(inner) = weak.upgrade() {
                inner.advance(
                    |phase| matches!(phase, AnswerPhase::Revealed { .. }),
                    AnswerPhase::Finished { selected, correct },
                );
            }
        });
        *self.inner.timer() = Some(handle);
        true
    }

    /// Abort the outstanding timer. The phase stays where it is.
    pub fn cancel(&self) {
        self.inner.cancel_timer();
    }
}

impl Drop for AnswerCycle {
    fn drop(&mut self) {
        self.inner.cancel_timer();
    }
}
