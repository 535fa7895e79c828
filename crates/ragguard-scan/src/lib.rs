//! Upload scanning: content hashing, file-type sniffing and the external
//! reputation lookup that turns a file into a [`Verdict`].
//!
//! [`Verdict`]: ragguard_types::models::Verdict

pub mod hash;
pub mod lookup;
pub mod sniff;
pub mod virustotal;

pub use hash::sha256_hex;
pub use lookup::{ReputationLookup, ScanError, ScanOutcome, ScanSubject, UnconfiguredLookup};
pub use virustotal::{VirusTotalClient, VirusTotalConfig};
