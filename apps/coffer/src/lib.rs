//! # coffer
//!
//! The async half of Coffer: everything that talks to the network or decides
//! where the document lives.
//!
//! - `remote`: HTTP client for remote endpoints
//! - `coordinator`: load/save with backing-store selection and fallback
//! - `vault`: the single-writer state holder and its mutation entry points
//! - `config`: layered configuration
//! - `api`: a self-hostable remote endpoint server
//! - `cli`: the `coffer` command line

pub mod api;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod remote;
pub mod vault;

pub use config::CofferConfig;
pub use coordinator::{
    BackingStore, DocumentSource, LoadReport, PersistenceCoordinator, RemoteMigration, SaveOutcome,
};
pub use remote::{HttpRemote, RemoteAddress, RemoteEndpoint, TransportError};
pub use vault::{Committed, ConnectReport, SharedVault, Vault};
