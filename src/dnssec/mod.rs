pub mod algorithm;
pub mod digest;
pub mod key_tag;
pub mod roles;
pub mod trust_anchor;

pub use algorithm::{DnsSecAlgorithm, algorithm_name, estimate_key_size};
pub use digest::{DigestType, digest_type_name};
pub use key_tag::calculate_key_tag;
pub use roles::{KeyRole, PrimaryRole, RoleAssignment, RoleConfidence, classify_key, classify_zone_keys};
pub use trust_anchor::{FallbackKey, RootKeyTable};

/// DNSSEC constants
pub mod constants {
    /// DNS UDP payload size for DNSSEC (RFC 4035)
    pub const DNSSEC_UDP_SIZE: u16 = 4096;

    /// Secure Entry Point bit in DNSKEY flags
    pub const SEP_FLAG: u16 = 0x0001;
}
