//! Loan application intake and tracking backend.
//!
//! Applications are validated against the applicant schema, persisted through an
//! [`applications::ApplicationStore`], and their supporting documents are kept in an
//! [`documents::DocumentStore`] under keys derived from the applicant's name and the
//! application id. Case workers query, update, and export summary reports.

pub mod applications;
pub mod config;
pub mod documents;
pub mod error;
pub mod reports;
pub mod telemetry;
