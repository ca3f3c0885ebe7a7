//! The callback capability behind every local handler.
//!
//! Registration binds an event name to a [`Callback`] value. [`CallbackFn`]
//! wraps a closure `F: Fn(Event) -> Fut`, producing a fresh future per
//! invocation, so the closure needs no interior mutability; shared state
//! goes through an explicit `Arc` inside the closure.
//!
//! ## Example
//! ```rust
//! use eventrouter::{CallbackFn, CallbackRef, Event};
//!
//! let cb: CallbackRef = CallbackFn::arc("audit", |event: Event| async move {
//!     println!("saw {event}");
//!     Ok(())
//! });
//! assert_eq!(cb.name(), "audit");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::CallbackError;
use crate::events::Event;

/// Boxed future returned by a callback invocation.
pub type BoxCallbackFuture = Pin<Box<dyn Future<Output = Result<(), CallbackError>> + Send>>;

/// Shared handle to a callback.
pub type CallbackRef = Arc<dyn Callback>;

/// A handler callback. Invoked from the handler's dedicated worker task,
/// one event at a time, in enqueue order.
///
/// Implementations may be slow — they delay only their own queue, never the
/// dispatcher or other handlers. Errors and panics are caught by the worker
/// and logged.
pub trait Callback: Send + Sync + 'static {
    /// Handles one event. The callback owns its copy of the event.
    fn invoke(&self, event: Event) -> BoxCallbackFuture;

    /// Endpoint name for reports and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Function-backed callback.
pub struct CallbackFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> CallbackFn<F> {
    /// Creates a new function-backed callback.
    ///
    /// Prefer [`CallbackFn::arc`] when you immediately need a
    /// [`CallbackRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the callback and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Callback for CallbackFn<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CallbackError>> + Send + 'static,
{
    fn invoke(&self, event: Event) -> BoxCallbackFuture {
        Box::pin((self.f)(event))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_invoke_runs_the_closure() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_cb = Arc::clone(&calls);
        let cb = CallbackFn::new("counter", move |_event: Event| {
            let calls = Arc::clone(&calls_in_cb);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        cb.invoke(Event::new("tick")).await.unwrap();
        cb.invoke(Event::new("tick")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cb.name(), "counter");
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let cb = CallbackFn::new("failing", |_event: Event| async move {
            Err(CallbackError::new("boom"))
        });
        let err = cb.invoke(Event::new("tick")).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
