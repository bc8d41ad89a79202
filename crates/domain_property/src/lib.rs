//! Property Domain
//!
//! Properties are offered to investors as a fixed supply of shares, each
//! property held by its own SPV.
//!
//! # Key Concepts
//!
//! - **Property**: the offering, with its share price and share inventory
//! - **Share inventory**: `available_shares`, decremented by purchases and
//!   incremented only by refunds
//! - **SPV**: the legal entity whose shares investors actually own
//! - **Due diligence**: valuation and legal review shown on the property page
//!
//! # Inventory invariant
//!
//! `0 <= available_shares <= total_shares` at all times. Purchases that would
//! oversell fail with [`PropertyError::InsufficientShares`].

pub mod property;
pub mod spv;
pub mod document;
pub mod error;

pub use property::{Property, PropertyStatus};
pub use spv::Spv;
pub use document::{PropertyDocument, DocumentKind, DueDiligence, PropertyDetails};
pub use error::PropertyError;
