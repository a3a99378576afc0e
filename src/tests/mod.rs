//! Integration and unit tests for the Heimwolke application.
//!
//! - **share_store_tests**: store contracts for the disk and memory stores
//! - **credentials_tests**: sign-in, token validation and revocation
//! - **api_tests**: full-router tests covering the authorization chain

pub mod api_tests;
