// Creation store: persisted results of every successful generation, the
// per-user history, the community feed, and like toggling.

pub mod handlers;
pub mod store;
