//! Client for the custodial execution API.
//!
//! All write tools (and most reads) are backed by a downstream financial
//! API that holds custody of funds and submits contract calls. The core
//! only depends on the [`Custodian`] trait; `RestCustodian` is the HTTP
//! implementation and [`mock::MockCustodian`] the test double.

pub mod mock;
mod provider;
mod rest;
mod types;

pub use provider::Custodian;
pub use rest::RestCustodian;
pub use types::CustodianConfig;
