pub mod checks;
pub mod corpus;
pub mod notify;
pub mod pipeline;
pub mod prompt;
pub mod reconcile;
pub mod references;
pub mod report;
pub mod retry;
pub mod sanitize;
pub mod sleep;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
