pub mod config;
pub mod error;
pub mod normalize;
pub mod types;

pub use config::Config;
pub use error::{FundScoutError, Result};
pub use normalize::{
    bare_domain, extract_domain, is_null_amount, name_similarity, normalize_name, normalize_url,
    parse_funding_amount,
};
pub use types::{
    CandidateRecord, CanonicalRecord, Evidence, ExtractedCompany, RawItem, SourceDescriptor,
    SourceKind, ValidationStatus,
};
