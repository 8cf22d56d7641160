//! Startup contexts.
//!
//! A context records every service started while it is the innermost open
//! context. Closing it shuts those services down again, in reverse start
//! order, through the normal cascading shutdown.

use std::fmt;

use tracing::{debug, error};
use uuid::Uuid;

use modlife_protocols::error::LifecycleError;

use crate::orchestrator::{Frame, Orchestrator};

/// Identity of an open startup context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An open startup context.
///
/// Closed by [`close`](ContextGuard::close) or, at the latest, on drop.
#[must_use = "dropping the guard closes the context immediately"]
pub struct ContextGuard<'a> {
    orchestrator: &'a Orchestrator,
    id: ContextId,
    closed: bool,
}

impl ContextGuard<'_> {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the context and shut down what it started.
    ///
    /// Idempotent, also after an enclosing context was dropped first. Fails
    /// without side effects if the context is not the innermost open one;
    /// it then stays open.
    pub fn close(&mut self) -> Result<(), LifecycleError> {
        if self.closed {
            return Ok(());
        }
        self.orchestrator.close_context(self.id, false)?;
        self.closed = true;
        Ok(())
    }
}

impl Drop for ContextGuard<'_> {
    /// Closes the context together with any context still open inside it.
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.orchestrator.close_context(self.id, true) {
            error!(context = %self.id, "Failed to close startup context: {}", err);
        }
    }
}

impl Orchestrator {
    /// Open a startup context nested in the current one.
    pub fn begin_context(&self) -> ContextGuard<'_> {
        let id = ContextId::new();
        self.with_state(|state| {
            state.contexts.push(Frame::Scoped {
                id,
                started: Vec::new(),
            })
        });
        debug!(context = %id, "Opened startup context");
        ContextGuard {
            orchestrator: self,
            id,
            closed: false,
        }
    }

    /// Number of open context frames, including detached ones.
    pub fn context_depth(&self) -> usize {
        self.read_state(|state| state.contexts.len())
    }

    /// Close the context `id` and shut down what it started.
    ///
    /// Without `force` the context must be the innermost one. With `force`,
    /// contexts opened inside it are closed first, innermost first; detached
    /// frames stay in place. A context that is no longer open counts as closed.
    fn close_context(&self, id: ContextId, force: bool) -> Result<(), LifecycleError> {
        let _lock = self.state.lock();
        let closed = self.with_state(|state| {
            let Some(position) = state
                .contexts
                .iter()
                .rposition(|frame| matches!(frame, Frame::Scoped { id: open, .. } if *open == id))
            else {
                return Ok(Vec::new());
            };
            if !force && position + 1 != state.contexts.len() {
                return Err(LifecycleError::NotInnermostContext {
                    context: id.to_string(),
                });
            }

            let mut closed = Vec::new();
            let mut detached = 0;
            for frame in state.contexts.split_off(position).into_iter().rev() {
                match frame {
                    Frame::Scoped { id, started } => closed.push((id, started)),
                    Frame::Detached => detached += 1,
                }
            }
            state.contexts.extend((0..detached).map(|_| Frame::Detached));
            Ok(closed)
        })?;

        for (context, started) in closed {
            debug!(context = %context, "Closing startup context, stopping {} services", started.len());
            for key in started.iter().rev() {
                self.shut_down(key);
            }
        }
        Ok(())
    }

    /// Push a frame that keeps starts out of any enclosing context.
    pub(crate) fn detach_context(&self) -> DetachedContext<'_> {
        self.with_state(|state| state.contexts.push(Frame::Detached));
        DetachedContext { orchestrator: self }
    }
}

/// Removes its detached frame on drop.
pub(crate) struct DetachedContext<'a> {
    orchestrator: &'a Orchestrator,
}

impl Drop for DetachedContext<'_> {
    fn drop(&mut self) {
        self.orchestrator.with_state(|state| {
            if let Some(position) = state
                .contexts
                .iter()
                .rposition(|frame| matches!(frame, Frame::Detached))
            {
                state.contexts.remove(position);
            }
        });
    }
}
