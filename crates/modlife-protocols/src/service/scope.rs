//! Ambient scope around start and stop sequences.

use crate::error::LifecycleError;

/// Scope established around the part of a start or stop sequence that runs
/// while a designated bootstrap service is active.
///
/// Implementations install whatever ambient state the services expect
/// (e.g. a thread-bound interaction), run `body` exactly once, and tear the
/// state down again.
pub trait AmbientScope: Send + Sync {
    fn run(
        &self,
        body: &mut dyn FnMut() -> Result<(), LifecycleError>,
    ) -> Result<(), LifecycleError>;
}
