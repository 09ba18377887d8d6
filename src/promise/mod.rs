//! The promise primitive: state machine, chaining, combinators, await.
//!
//! A [`Promise`] settles at most once, and everything it does downstream of
//! a settlement runs as tasks on the scheduler it was built with:
//!
//! - [`Promise::new`] / [`Promise::with_resolver`] create a pending promise
//!   plus the [`Resolver`] capability that settles it
//! - [`Promise::then`], [`Promise::catch`], [`Promise::then_catch`], and
//!   [`Promise::finally`] chain continuations, each returning a new promise
//! - `resolve`, `reject`, [`Promise::all`], [`Promise::all_settled`],
//!   [`Promise::race`], and [`Promise::any`] are the static constructors
//!   and combinators
//! - [`PromiseFuture`] lets a promise be `.await`ed from async code
//!
//! Resolving with [`Resolution::Deferred`] adopts another promise's
//! eventual outcome, recursively, so a promise is never observed fulfilled
//! with a promise.

mod combinators;
mod core;
mod future;

pub use self::core::{Promise, PromiseState, Resolution, Resolver, Settled};
pub use self::future::PromiseFuture;
