//! Event dispatch: handler resolution, context filtering, invocation.
//!
//! ## Contents
//! - [`Dispatcher`] — resolves handlers, applies the context predicate,
//!   invokes survivors
//! - [`DispatchReport`] — what one dispatch call touched (diagnostics)

mod dispatcher;
mod report;

pub use dispatcher::Dispatcher;
pub use report::DispatchReport;
