//! Ordered, append-only callback lists.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::debug;

use crate::lifecycle::run_loop::TickError;

/// Called once for every failed tick.
pub type ErrorHandler = dyn FnMut(&TickError) -> anyhow::Result<()>;
/// Called once after the run loop and resource release.
pub type ExitHandler = dyn FnMut() -> anyhow::Result<()>;

/// Handlers in registration order.
///
/// Dispatch is best-effort: a handler that returns an error or panics is
/// logged and skipped, and the remaining handlers still run.
pub struct HandlerRegistry<H: ?Sized> {
    kind: &'static str,
    handlers: Vec<Box<H>>,
}

impl<H: ?Sized> HandlerRegistry<H> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            handlers: Vec::new(),
        }
    }

    pub fn register(&mut self, handler: Box<H>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke `call` on every handler in order. Returns how many failed.
    pub fn dispatch<F>(&mut self, mut call: F) -> usize
    where
        F: FnMut(&mut H) -> anyhow::Result<()>,
    {
        let mut failures = 0;
        for (index, handler) in self.handlers.iter_mut().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| call(handler.as_mut()))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures += 1;
                    debug!(kind = self.kind, index, error = %err, "Handler failed");
                }
                Err(_) => {
                    failures += 1;
                    debug!(kind = self.kind, index, "Handler panicked");
                }
            }
        }
        failures
    }
}

impl HandlerRegistry<ErrorHandler> {
    pub fn notify(&mut self, error: &TickError) -> usize {
        self.dispatch(|handler| handler(error))
    }
}

impl HandlerRegistry<ExitHandler> {
    pub fn notify(&mut self) -> usize {
        self.dispatch(|handler| handler())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn exit_handlers_run_in_registration_order() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry: HandlerRegistry<ExitHandler> = HandlerRegistry::new("exit");
        for id in 0..3 {
            let calls = Rc::clone(&calls);
            registry.register(Box::new(move || {
                calls.borrow_mut().push(id);
                Ok(())
            }));
        }

        assert_eq!(registry.notify(), 0);
        assert_eq!(*calls.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn failing_handlers_do_not_stop_dispatch() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry: HandlerRegistry<ExitHandler> = HandlerRegistry::new("exit");

        registry.register(Box::new(|| -> anyhow::Result<()> { anyhow::bail!("first fails") }));
        registry.register(Box::new(|| -> anyhow::Result<()> { panic!("second panics") }));
        let tail = Rc::clone(&calls);
        registry.register(Box::new(move || {
            tail.borrow_mut().push("third");
            Ok(())
        }));

        assert_eq!(registry.notify(), 2);
        assert_eq!(*calls.borrow(), vec!["third"]);
    }

    #[test]
    fn empty_registry_dispatches_nothing() {
        let mut registry: HandlerRegistry<ExitHandler> = HandlerRegistry::new("exit");
        assert!(registry.is_empty());
        assert_eq!(registry.notify(), 0);
    }
}
