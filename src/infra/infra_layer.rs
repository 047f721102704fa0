// The infra module contains implementations of core traits.
// Each external integration goes in its own submodule.

#[path = "google_auth/mod.rs"]
pub mod google_auth;

#[path = "google_docs/mod.rs"]
pub mod google_docs;

#[cfg(test)]
#[path = "test_support.rs"]
pub mod test_support;
