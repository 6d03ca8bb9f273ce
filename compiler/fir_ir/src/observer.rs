//! Mutation observers.
//!
//! An [`Observer`] registered on a [`Module`] is called once before and
//! once after every recorded mutation, in registration order, including
//! when the mutation fails. Observers get shared access to the module
//! only; they cannot mutate it.
//!
//! The observers shipped here are cloneable handles over shared state, so
//! a caller keeps one clone to inspect while the module owns the other.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::{IrError, Module, Mutation, Returned};

pub trait Observer {
    fn before(&mut self, module: &Module, mutation: &Mutation) {
        let _ = (module, mutation);
    }

    fn after(&mut self, module: &Module, mutation: &Mutation, outcome: Result<&Returned, &IrError>) {
        let _ = (module, mutation, outcome);
    }
}

// ── Event log ───────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Ok(Returned),
    Failed(IrError),
}

/// One mutation as seen by an [`EventLog`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Operation name.
    pub name: &'static str,
    /// The full rendered call, `name(args)`.
    pub call: String,
    /// `None` while the operation is running.
    pub outcome: Option<Outcome>,
}

/// Records every mutation in order.
///
/// An event whose outcome is still `None` after the module is dropped
/// marks an operation that started but never finished.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// One line per mutation: `call -> result` or `call FAILED: error`.
    pub fn trace(&self) -> String {
        let mut out = String::new();
        for event in self.events.borrow().iter() {
            let _ = match &event.outcome {
                Some(Outcome::Ok(returned)) => writeln!(out, "{} -> {returned}", event.call),
                Some(Outcome::Failed(error)) => writeln!(out, "{} FAILED: {error}", event.call),
                None => writeln!(out, "{} (unfinished)", event.call),
            };
        }
        out
    }
}

impl Observer for EventLog {
    fn before(&mut self, _module: &Module, mutation: &Mutation) {
        self.events.borrow_mut().push(Event {
            name: mutation.name(),
            call: mutation.to_string(),
            outcome: None,
        });
    }

    fn after(&mut self, _module: &Module, _mutation: &Mutation, outcome: Result<&Returned, &IrError>) {
        if let Some(event) = self.events.borrow_mut().last_mut() {
            event.outcome = Some(match outcome {
                Ok(returned) => Outcome::Ok(returned.clone()),
                Err(error) => Outcome::Failed(error.clone()),
            });
        }
    }
}

// ── Tracing ─────────────────────────────────────────────────────────

/// Forwards every mutation to `tracing`: a `debug` event on entry and on
/// success, a `warn` event on failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn before(&mut self, module: &Module, mutation: &Mutation) {
        tracing::debug!(module = %module.id(), op = mutation.name(), "{mutation}");
    }

    fn after(&mut self, module: &Module, mutation: &Mutation, outcome: Result<&Returned, &IrError>) {
        match outcome {
            Ok(returned) => {
                tracing::debug!(module = %module.id(), op = mutation.name(), %returned, "done");
            }
            Err(error) => {
                tracing::warn!(module = %module.id(), op = mutation.name(), %error, "{mutation} failed");
            }
        }
    }
}
