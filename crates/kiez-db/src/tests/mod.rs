//! Integration tests against a live PostgreSQL instance.
//!
//! These require a migrated database (see `migrations/`) reachable via
//! `DATABASE_URL` and are therefore `#[ignore]`d by default. Run with:
//!
//! ```text
//! cargo test -p kiez-db -- --ignored
//! ```

mod listing_pipeline_tests;
mod messaging_tests;
