//! The real-time half of the service: connection admission, presence,
//! rooms, and event fanout.

pub mod events;
pub mod fanout;
pub mod handler;
pub mod presence;
pub mod server;
pub mod session;
