//! nYNAB client - local mirror and delta sync for hosted budgets
//!
//! This library keeps an in-memory mirror of a budget server's data and
//! exchanges changes with it through knowledge-based delta sync. Local
//! mutations are staged in the mirror and pushed by the sync that follows
//! them.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `models`: Entity schema (catalog budgets, accounts, payees, categories, transactions)
//! - `session`: The local mirror with change tracking and lookups
//! - `sync`: Catalog and budget sync rounds and their wire shapes
//! - `remote`: The `Connection` seam and an in-memory server
//! - `client`: The `Client` orchestrating sync and mutations
//! - `config`: Configuration and path management
//! - `storage`: Atomic JSON snapshots of the mirror
//! - `journal`: Append-only record of sync rounds
//! - `error`: Custom error types
//!
//! # Example
//!
//! ```rust,ignore
//! use nynab::{Client, MemoryServer, Account, AccountType, Money};
//!
//! let server = MemoryServer::with_budgets(&["Household"]);
//! let mut client = Client::new(server, Some("Household"))?;
//! client.add_account(
//!     Account::new("Checking", AccountType::Checking),
//!     Money::from_decimal(500.0),
//!     chrono::Local::now().date_naive(),
//! )?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod journal;
pub mod models;
pub mod remote;
pub mod session;
pub mod storage;
pub mod sync;

pub use client::Client;
pub use error::{NynabError, NynabResult};
pub use models::{Account, AccountId, AccountType, Money, Payee, Transaction};
pub use remote::{Connection, MemoryServer};
pub use session::Session;
