// tests/common/mod.rs

#[allow(unused_imports)]
pub use backupwatch_test_utils::*;
