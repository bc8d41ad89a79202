//! Investor Domain
//!
//! Everything the platform knows about an investor independent of any
//! particular property: the KYC gate, the documents feeding it, and the
//! custodial wallet.
//!
//! # KYC gate
//!
//! Only investors whose status is `verified` may invest or trade. Status is
//! derived from reviewed documents:
//!
//! ```rust
//! use core_kernel::{Currency, UserId};
//! use domain_investor::{InvestorProfile, KycStatus};
//!
//! let mut profile = InvestorProfile::new(UserId::new(), Currency::USD);
//! assert!(!profile.is_eligible_to_invest());
//!
//! profile.set_kyc_status(KycStatus::Verified);
//! assert!(profile.is_eligible_to_invest());
//! ```

pub mod profile;
pub mod kyc;
pub mod error;

pub use profile::InvestorProfile;
pub use kyc::{
    aggregate_kyc_status, status_after_review, DocumentStatus, KycDocument, KycDocumentType,
    KycStatus, ReviewDecision,
};
pub use error::InvestorError;
