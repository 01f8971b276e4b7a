// Generation proxy: one handler per capability. Each gates the caller, calls
// its vendor(s), records a creation, and only then reports success.

pub mod handlers;
pub mod policy;
pub mod upload;
