//! Building blocks for driving the server and client
//!
//! Everything here treats the TLS binaries as black boxes: a launch
//! contract, a termination contract and an observable exit code plus output.

pub mod client;
pub mod poll;
pub mod provision;
pub mod readiness;
pub mod supervisor;

pub use client::{ClientVariant, ServerEndpoint};
pub use poll::Poller;
pub use provision::{CredentialBundle, Provisioner};
pub use readiness::await_readiness;
pub use supervisor::{ManagedProcess, ProcessOutcome, Supervisor};
