//! Storage boundaries. Both stores are traits with in-memory defaults;
//! real deployments plug platform-backed adapters in via `AppState`.

pub mod messages;
pub mod users;
