pub mod collectors;
pub mod engine;
pub mod enrich;
pub mod intake;
pub mod scout;
pub mod sources;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
