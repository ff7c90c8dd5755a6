//! Token authority for the DevOps microservice.
//!
//! Issues HS256-signed, time-limited tokens that can each be redeemed exactly
//! once, and keeps an in-memory ledger of every issued token so usage can be
//! enforced and reported.
//!
//! # Modules
//!
//! - [`authority`]: [`TokenAuthority`]: API key check, issuance, validation
//! - [`ledger`]: [`TransactionLedger`] trait and the DashMap-backed [`InMemoryLedger`]
//! - [`clock`]: injectable time source for expiry checks
//! - [`security`]: constant-time secret comparison
//! - [`error`]: [`TokenError`] taxonomy

pub mod authority;
pub mod clock;
pub mod error;
pub mod ledger;
pub mod security;

pub use authority::{AuthorityConfig, Claims, TokenAuthority, DEFAULT_TOKEN_TTL_SECS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::TokenError;
pub use ledger::{InMemoryLedger, TransactionLedger, TransactionRecord, TransactionStats};
