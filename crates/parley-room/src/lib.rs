//! Client-side room and message state for Parley.
//!
//! The store is a pure state machine: [`RoomStore::apply`] takes the
//! current store and one [`RoomEvent`] and returns the next store. It never
//! talks to the network and never decides which room a message belongs
//! to. Routing is the session layer's job.
//!
//! # Key types
//!
//! - [`RoomStore`]: ordered rooms, each with its message history
//! - [`Room`]: one room's name and messages
//! - [`RoomEvent`]: the two state transitions the server can cause

mod store;

pub use store::{Room, RoomEvent, RoomStore};
