pub mod actions;
pub mod address;
pub mod admin;
pub mod chain;
pub mod decode;
pub mod deployment;
pub mod error;
pub mod format;
pub mod gateway;
pub mod pools;
pub mod signer;
pub mod tickets;
pub mod transactions;

pub mod test_helpers;

pub use error::{
    Error,
    Result,
};
