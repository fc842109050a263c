//! Wallet ↔ Discord linking.
//!
//! A wallet client sends the user through Discord's OAuth2 consent page.
//! When Discord redirects back, the linker exchanges the code for a token,
//! reads the account's display name, and stores `address → name` in the
//! mapping store.
//!
//! ## Invariants
//!
//! 1. **One identity per address**: re-linking an address replaces its name
//! 2. **One address per identity**: linking a name that is already bound to
//!    another address is refused with a conflict
//! 3. **Case-insensitive addresses**: keys are stored lowercase

pub mod api;
pub mod config;
pub mod linker;
pub mod oauth;
pub mod pending;
pub mod store;

pub use config::LinkConfig;
pub use linker::Linker;
pub use pending::{PendingLinks, Taken};
pub use store::{normalize_address, LinkOutcome, MappingStore};
