//! Results that become available later in the frame loop
//!
//! Callers register continuations up front, before the work that produces the
//! value has run, and the producer completes the result exactly once.

use thiserror::Error;

/// Errors raised by [`DelayedResult`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DelayedError {
    /// `complete` was called on a result that already completed
    #[error("the operation has already completed")]
    AlreadyCompleted,
}

type Callback<T> = Box<dyn FnOnce(&T)>;

/// A value delivered to callbacks once it is produced
pub struct DelayedResult<T> {
    value: Option<T>,
    callbacks: Vec<Callback<T>>,
}

impl<T> Default for DelayedResult<T> {
    fn default() -> Self {
        Self {
            value: None,
            callbacks: Vec::new(),
        }
    }
}

impl<T> DelayedResult<T> {
    /// Create a pending result
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an already completed result
    pub fn completed(value: T) -> Self {
        Self {
            value: Some(value),
            callbacks: Vec::new(),
        }
    }

    /// Check if the value has been produced
    pub fn is_completed(&self) -> bool {
        self.value.is_some()
    }

    /// The produced value, if any
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Register a callback. Runs immediately when the result already completed.
    pub fn on_complete(&mut self, callback: impl FnOnce(&T) + 'static) {
        match &self.value {
            Some(value) => callback(value),
            None => self.callbacks.push(Box::new(callback)),
        }
    }

    /// Complete the result and run every registered callback in registration order
    ///
    /// Completing twice is a sequencing bug in the caller and is reported as
    /// [`DelayedError::AlreadyCompleted`] without touching the stored value.
    pub fn complete(&mut self, value: T) -> Result<(), DelayedError> {
        if self.value.is_some() {
            log::error!("Delayed result completed twice");
            return Err(DelayedError::AlreadyCompleted);
        }

        let value = self.value.insert(value);
        for callback in self.callbacks.drain(..) {
            callback(value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_callbacks_run_in_order_on_completion() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut result = DelayedResult::new();

        let first = Rc::clone(&log);
        result.on_complete(move |value: &u32| first.borrow_mut().push(*value));
        let second = Rc::clone(&log);
        result.on_complete(move |value: &u32| second.borrow_mut().push(*value * 10));
        assert!(log.borrow().is_empty());

        result.complete(4).unwrap();

        assert_eq!(*log.borrow(), vec![4, 40]);
    }

    #[test]
    fn test_late_callback_runs_immediately() {
        let hit = Rc::new(RefCell::new(false));
        let mut result = DelayedResult::completed(());

        let flag = Rc::clone(&hit);
        result.on_complete(move |_| *flag.borrow_mut() = true);

        assert!(*hit.borrow());
    }

    #[test]
    fn test_double_completion_is_rejected() {
        let mut result = DelayedResult::new();
        result.complete("first").unwrap();

        assert_eq!(result.complete("second"), Err(DelayedError::AlreadyCompleted));
        assert_eq!(result.value(), Some(&"first"));
    }
}
