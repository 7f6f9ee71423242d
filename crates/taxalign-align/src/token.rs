//! The propagation re-entrancy guard.

/// Explicit Idle/Propagating state for one alignment concern.
///
/// The session owns one context per concern (alignment and selection are
/// scoped independently) and passes it `&mut` into each request. A request
/// that finds the context active is dropped; that is what prevents two
/// mutually triggering views from ping-ponging forever. Presentation
/// adapters that echo applied state back as input events can also bracket
/// their apply phase with [`enter`]/[`exit`] to mute the echo.
///
/// This is not a lock: it suppresses same-thread feedback only and must not
/// be relied on for cross-thread exclusion.
///
/// [`enter`]: PropagationContext::enter
/// [`exit`]: PropagationContext::exit
#[derive(Debug, Default)]
pub struct PropagationContext {
    active: bool,
}

impl PropagationContext {
    /// Create an idle context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a propagation is in flight.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Try to start propagating. Returns `false` (and changes nothing) if a
    /// propagation is already in flight.
    pub fn enter(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        true
    }

    /// Finish propagating. Idempotent.
    pub fn exit(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_exit_cycle() {
        let mut ctx = PropagationContext::new();
        assert!(!ctx.is_active());
        assert!(ctx.enter());
        assert!(ctx.is_active());
        ctx.exit();
        assert!(!ctx.is_active());
    }

    #[test]
    fn reentrant_enter_is_refused() {
        let mut ctx = PropagationContext::new();
        assert!(ctx.enter());
        assert!(!ctx.enter());
        // The refused enter must not have clobbered the state.
        assert!(ctx.is_active());
    }

    #[test]
    fn exit_is_idempotent() {
        let mut ctx = PropagationContext::new();
        ctx.exit();
        assert!(ctx.enter());
        ctx.exit();
        ctx.exit();
        assert!(ctx.enter());
    }
}
