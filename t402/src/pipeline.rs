//! The hook-pipeline state machine.
//!
//! Every role runs its operations through the same lifecycle:
//!
//! ```text
//! INIT → before hooks (abortable) → invoke the operation
//!      → on success: after hooks → DONE
//!      → on failure: failure hooks (any may recover) → DONE
//! ```
//!
//! [`HookPipeline`] encodes that lifecycle as a pure state machine. It
//! performs no I/O and holds no hook or result values: a driver (async
//! or sync shell) executes each emitted [`Command`], reports what
//! happened as an [`Event`], and keeps the actual values itself. Both
//! concurrency models therefore share one source of truth for ordering,
//! first-abort-wins, and first-recovery-wins semantics.
//!
//! Event/state mismatches are driver bugs and panic.

/// The result a before-hook returns to stop an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortResult {
    /// Machine-readable reason for the abort.
    pub reason: String,
}

impl AbortResult {
    /// Creates an abort with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// What the driver must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the before-hook at this index.
    RunBefore(usize),
    /// Invoke the wrapped operation.
    Invoke,
    /// Run the after-hook at this index with the success value.
    RunAfter(usize),
    /// Run the failure-hook at this index with the failure.
    RunFailure(usize),
}

/// How the wrapped operation ended, as classified by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// The operation produced its success value.
    Success,
    /// The operation returned a business-failure value (e.g., an invalid
    /// `VerifyResponse`). Failure hooks run; if none recovers, the value
    /// is still delivered to the caller.
    SoftFailure,
    /// The operation raised an infrastructure error. Failure hooks run;
    /// if none recovers, the error propagates.
    HardFailure,
}

/// What the driver observed while executing the last [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A before-hook returned; `abort` is whether it signaled an abort.
    Before {
        /// Whether the hook aborted the operation.
        abort: bool,
    },
    /// The operation was invoked.
    Invoked(InvokeOutcome),
    /// An after-hook returned. After-hooks cannot affect the outcome.
    After,
    /// A failure-hook returned; `recovered` is whether it substituted a
    /// result.
    Failure {
        /// Whether the hook supplied a recovered result.
        recovered: bool,
    },
}

/// Terminal decision of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Deliver the operation's success value.
    Completed,
    /// Deliver the operation's business-failure value unchanged.
    CompletedUnrecovered,
    /// Deliver the value supplied by the recovering failure-hook.
    Recovered,
    /// Surface the before-hook abort as `PaymentAbortedError`.
    Aborted,
    /// Propagate the operation's infrastructure error.
    Failed,
}

/// Either the next command to execute, or the terminal decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Execute this command and report back with [`HookPipeline::advance`].
    Next(Command),
    /// The pipeline finished.
    Done(Disposition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Before(usize),
    Invoke,
    After(usize),
    Failure(usize, InvokeOutcome),
    Done,
}

/// Pure lifecycle state machine over hook counts.
#[derive(Debug)]
pub struct HookPipeline {
    before: usize,
    after: usize,
    failure: usize,
    state: State,
}

impl HookPipeline {
    /// Creates a pipeline over the given hook counts.
    #[must_use]
    pub const fn new(before: usize, after: usize, failure: usize) -> Self {
        Self {
            before,
            after,
            failure,
            state: State::Before(0),
        }
    }

    /// Returns the first command.
    #[must_use]
    pub fn start(&mut self) -> Status {
        if self.before == 0 {
            self.state = State::Invoke;
            Status::Next(Command::Invoke)
        } else {
            self.state = State::Before(0);
            Status::Next(Command::RunBefore(0))
        }
    }

    /// Feeds the outcome of the last command and returns what to do next.
    ///
    /// # Panics
    ///
    /// Panics when the event does not match the pipeline's state — that
    /// is a driver bug, not a runtime condition.
    #[must_use]
    pub fn advance(&mut self, event: Event) -> Status {
        match (self.state, event) {
            (State::Before(_), Event::Before { abort: true }) => {
                self.state = State::Done;
                Status::Done(Disposition::Aborted)
            }
            (State::Before(idx), Event::Before { abort: false }) => {
                let next = idx + 1;
                if next < self.before {
                    self.state = State::Before(next);
                    Status::Next(Command::RunBefore(next))
                } else {
                    self.state = State::Invoke;
                    Status::Next(Command::Invoke)
                }
            }
            (State::Invoke, Event::Invoked(InvokeOutcome::Success)) => {
                if self.after == 0 {
                    self.state = State::Done;
                    Status::Done(Disposition::Completed)
                } else {
                    self.state = State::After(0);
                    Status::Next(Command::RunAfter(0))
                }
            }
            (State::Invoke, Event::Invoked(outcome)) => {
                if self.failure == 0 {
                    self.state = State::Done;
                    Status::Done(Self::unrecovered(outcome))
                } else {
                    self.state = State::Failure(0, outcome);
                    Status::Next(Command::RunFailure(0))
                }
            }
            (State::After(idx), Event::After) => {
                let next = idx + 1;
                if next < self.after {
                    self.state = State::After(next);
                    Status::Next(Command::RunAfter(next))
                } else {
                    self.state = State::Done;
                    Status::Done(Disposition::Completed)
                }
            }
            (State::Failure(..), Event::Failure { recovered: true }) => {
                self.state = State::Done;
                Status::Done(Disposition::Recovered)
            }
            (State::Failure(idx, outcome), Event::Failure { recovered: false }) => {
                let next = idx + 1;
                if next < self.failure {
                    self.state = State::Failure(next, outcome);
                    Status::Next(Command::RunFailure(next))
                } else {
                    self.state = State::Done;
                    Status::Done(Self::unrecovered(outcome))
                }
            }
            (state, event) => {
                panic!("hook pipeline driver bug: event {event:?} in state {state:?}")
            }
        }
    }

    const fn unrecovered(outcome: InvokeOutcome) -> Disposition {
        match outcome {
            InvokeOutcome::SoftFailure => Disposition::CompletedUnrecovered,
            _ => Disposition::Failed,
        }
    }
}

/// How the driver classified the wrapped operation's outcome.
///
/// `Soft` carries a business-failure value plus its reason string so
/// failure hooks can inspect it; `Hard` carries an infrastructure error.
#[derive(Debug)]
pub enum Invoked<T, E> {
    /// The operation succeeded.
    Success(T),
    /// The operation returned a business-failure value.
    Soft(T, String),
    /// The operation raised an infrastructure error.
    Hard(E),
}

/// Terminal value of a driven pipeline.
#[derive(Debug)]
pub enum Delivered<T, E> {
    /// The operation's (possibly recovered) result.
    Value(T),
    /// A before-hook aborted the operation.
    Aborted(AbortResult),
    /// The operation failed and no hook recovered.
    Error(E),
}

/// Drives a [`HookPipeline`] with async callbacks.
///
/// This is the single async shell shared by all role cores: the machine
/// decides, the callbacks act. `run_failure` receives the failure
/// description and may return a substitute value.
pub(crate) async fn drive_async<T, E: std::fmt::Display>(
    counts: (usize, usize, usize),
    mut run_before: impl FnMut(usize) -> crate::scheme::BoxFuture<'_, Option<AbortResult>>,
    invoke: impl FnOnce() -> crate::scheme::BoxFuture<'_, Invoked<T, E>>,
    mut run_after: impl FnMut(usize, &T) -> crate::scheme::BoxFuture<'_, ()>,
    mut run_failure: impl FnMut(usize, &str) -> crate::scheme::BoxFuture<'_, Option<T>>,
) -> Delivered<T, E> {
    let mut machine = HookPipeline::new(counts.0, counts.1, counts.2);
    let mut status = machine.start();

    let mut invoke = Some(invoke);
    let mut held: Option<Invoked<T, E>> = None;
    let mut abort: Option<AbortResult> = None;
    let mut recovered: Option<T> = None;

    loop {
        match status {
            Status::Next(Command::RunBefore(i)) => {
                let decision = run_before(i).await;
                let aborted = decision.is_some();
                abort = decision.or(abort);
                status = machine.advance(Event::Before { abort: aborted });
            }
            Status::Next(Command::Invoke) => {
                let op = invoke.take().expect("pipeline invoked twice");
                let outcome = op().await;
                let event = Event::Invoked(match &outcome {
                    Invoked::Success(_) => InvokeOutcome::Success,
                    Invoked::Soft(..) => InvokeOutcome::SoftFailure,
                    Invoked::Hard(_) => InvokeOutcome::HardFailure,
                });
                held = Some(outcome);
                status = machine.advance(event);
            }
            Status::Next(Command::RunAfter(i)) => {
                match &held {
                    Some(Invoked::Success(value)) => run_after(i, value).await,
                    _ => unreachable!("pipeline ran after-hooks without a success value"),
                }
                status = machine.advance(Event::After);
            }
            Status::Next(Command::RunFailure(i)) => {
                let description = match &held {
                    Some(Invoked::Soft(_, reason)) => reason.clone(),
                    Some(Invoked::Hard(error)) => error.to_string(),
                    _ => unreachable!("pipeline ran failure-hooks without a failure"),
                };
                let substituted = run_failure(i, &description).await;
                let did_recover = substituted.is_some();
                recovered = substituted.or(recovered);
                status = machine.advance(Event::Failure {
                    recovered: did_recover,
                });
            }
            Status::Done(disposition) => {
                return finish(disposition, held, abort, recovered);
            }
        }
    }
}

/// Drives a [`HookPipeline`] with synchronous callbacks.
///
/// The blocking shells use this; only sync hooks and backends fit its
/// signature, so an async/sync mismatch is a compile error rather than a
/// runtime check.
pub(crate) fn drive_blocking<T, E: std::fmt::Display>(
    counts: (usize, usize, usize),
    mut run_before: impl FnMut(usize) -> Option<AbortResult>,
    invoke: impl FnOnce() -> Invoked<T, E>,
    mut run_after: impl FnMut(usize, &T),
    mut run_failure: impl FnMut(usize, &str) -> Option<T>,
) -> Delivered<T, E> {
    let mut machine = HookPipeline::new(counts.0, counts.1, counts.2);
    let mut status = machine.start();

    let mut invoke = Some(invoke);
    let mut held: Option<Invoked<T, E>> = None;
    let mut abort: Option<AbortResult> = None;
    let mut recovered: Option<T> = None;

    loop {
        match status {
            Status::Next(Command::RunBefore(i)) => {
                let decision = run_before(i);
                let aborted = decision.is_some();
                abort = decision.or(abort);
                status = machine.advance(Event::Before { abort: aborted });
            }
            Status::Next(Command::Invoke) => {
                let op = invoke.take().expect("pipeline invoked twice");
                let outcome = op();
                let event = Event::Invoked(match &outcome {
                    Invoked::Success(_) => InvokeOutcome::Success,
                    Invoked::Soft(..) => InvokeOutcome::SoftFailure,
                    Invoked::Hard(_) => InvokeOutcome::HardFailure,
                });
                held = Some(outcome);
                status = machine.advance(event);
            }
            Status::Next(Command::RunAfter(i)) => {
                match &held {
                    Some(Invoked::Success(value)) => run_after(i, value),
                    _ => unreachable!("pipeline ran after-hooks without a success value"),
                }
                status = machine.advance(Event::After);
            }
            Status::Next(Command::RunFailure(i)) => {
                let description = match &held {
                    Some(Invoked::Soft(_, reason)) => reason.clone(),
                    Some(Invoked::Hard(error)) => error.to_string(),
                    _ => unreachable!("pipeline ran failure-hooks without a failure"),
                };
                let substituted = run_failure(i, &description);
                let did_recover = substituted.is_some();
                recovered = substituted.or(recovered);
                status = machine.advance(Event::Failure {
                    recovered: did_recover,
                });
            }
            Status::Done(disposition) => {
                return finish(disposition, held, abort, recovered);
            }
        }
    }
}

fn finish<T, E>(
    disposition: Disposition,
    held: Option<Invoked<T, E>>,
    abort: Option<AbortResult>,
    recovered: Option<T>,
) -> Delivered<T, E> {
    match disposition {
        Disposition::Completed => match held {
            Some(Invoked::Success(value)) => Delivered::Value(value),
            _ => unreachable!("pipeline completed without a success value"),
        },
        Disposition::CompletedUnrecovered => match held {
            Some(Invoked::Soft(value, _)) => Delivered::Value(value),
            _ => unreachable!("pipeline delivered without a soft-failure value"),
        },
        Disposition::Recovered => match recovered {
            Some(value) => Delivered::Value(value),
            None => unreachable!("pipeline recovered without a substitute"),
        },
        Disposition::Aborted => Delivered::Aborted(abort.unwrap_or_else(|| AbortResult::new(""))),
        Disposition::Failed => match held {
            Some(Invoked::Hard(error)) => Delivered::Error(error),
            _ => unreachable!("pipeline failed without an error"),
        },
    }
}
