use std::fmt;

/// DNSSEC Algorithm numbers (RFC 4034, 5155, 5702, 5933, 6605, 8080)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DnsSecAlgorithm {
    /// RSA/MD5 (deprecated)
    RsaMd5 = 1,
    /// DSA/SHA1 (RFC 2536)
    DSA = 3,
    /// RSA/SHA-1 (RFC 3110)
    RsaSha1 = 5,
    /// DSA-NSEC3-SHA1 (RFC 5155)
    DsaNsec3Sha1 = 6,
    /// RSASHA1-NSEC3-SHA1 (RFC 5155)
    RsaSha1Nsec3Sha1 = 7,
    /// RSA/SHA-256 (RFC 5702)
    RsaSha256 = 8,
    /// RSA/SHA-512 (RFC 5702)
    RsaSha512 = 10,
    /// GOST R 34.10-2001 (RFC 5933)
    EccGost = 12,
    /// ECDSA Curve P-256 with SHA-256 (RFC 6605)
    EcdsaP256Sha256 = 13,
    /// ECDSA Curve P-384 with SHA-384 (RFC 6605)
    EcdsaP384Sha384 = 14,
    /// Ed25519 (RFC 8080)
    Ed25519 = 15,
    /// Ed448 (RFC 8080)
    Ed448 = 16,
}

impl DnsSecAlgorithm {
    /// Create from algorithm number
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::RsaMd5),
            3 => Some(Self::DSA),
            5 => Some(Self::RsaSha1),
            6 => Some(Self::DsaNsec3Sha1),
            7 => Some(Self::RsaSha1Nsec3Sha1),
            8 => Some(Self::RsaSha256),
            10 => Some(Self::RsaSha512),
            12 => Some(Self::EccGost),
            13 => Some(Self::EcdsaP256Sha256),
            14 => Some(Self::EcdsaP384Sha384),
            15 => Some(Self::Ed25519),
            16 => Some(Self::Ed448),
            _ => None,
        }
    }

    /// Convert to algorithm number
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// RSA variants whose public key uses the RFC 3110 layout
    pub fn is_rsa(&self) -> bool {
        matches!(
            self,
            Self::RsaSha1 | Self::RsaSha1Nsec3Sha1 | Self::RsaSha256 | Self::RsaSha512
        )
    }
}

impl fmt::Display for DnsSecAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RsaMd5 => write!(f, "RSAMD5"),
            Self::DSA => write!(f, "DSA"),
            Self::RsaSha1 => write!(f, "RSASHA1"),
            Self::DsaNsec3Sha1 => write!(f, "DSA-NSEC3-SHA1"),
            Self::RsaSha1Nsec3Sha1 => write!(f, "RSASHA1-NSEC3-SHA1"),
            Self::RsaSha256 => write!(f, "RSASHA256"),
            Self::RsaSha512 => write!(f, "RSASHA512"),
            Self::EccGost => write!(f, "ECC-GOST"),
            Self::EcdsaP256Sha256 => write!(f, "ECDSAP256SHA256"),
            Self::EcdsaP384Sha384 => write!(f, "ECDSAP384SHA384"),
            Self::Ed25519 => write!(f, "ED25519"),
            Self::Ed448 => write!(f, "ED448"),
        }
    }
}

/// Mnemonic for an algorithm number, `Unknown(n)` when unassigned.
pub fn algorithm_name(value: u8) -> String {
    match DnsSecAlgorithm::from_u8(value) {
        Some(algorithm) => algorithm.to_string(),
        None => format!("Unknown({})", value),
    }
}

/// Estimated key size in bits.
///
/// RSA keys are measured by their modulus (RFC 3110: exponent length, exponent,
/// modulus). Curve algorithms have fixed sizes. Anything else is the raw key
/// length in bits.
pub fn estimate_key_size(algorithm: u8, public_key: &[u8]) -> u32 {
    let raw_bits = (public_key.len() as u32).saturating_mul(8);
    match DnsSecAlgorithm::from_u8(algorithm) {
        Some(alg) if alg.is_rsa() => rsa_modulus_bits(public_key).unwrap_or(raw_bits),
        Some(DnsSecAlgorithm::EcdsaP256Sha256) => 256,
        Some(DnsSecAlgorithm::EcdsaP384Sha384) => 384,
        Some(DnsSecAlgorithm::Ed25519) => 255,
        Some(DnsSecAlgorithm::Ed448) => 448,
        _ => raw_bits,
    }
}

fn rsa_modulus_bits(public_key: &[u8]) -> Option<u32> {
    let (&first, rest) = public_key.split_first()?;
    let (exponent_len, rest) = if first == 0 {
        let (len_bytes, rest) = rest.split_at_checked(2)?;
        (usize::from(u16::from_be_bytes([len_bytes[0], len_bytes[1]])), rest)
    } else {
        (usize::from(first), rest)
    };
    let (_, modulus) = rest.split_at_checked(exponent_len)?;
    if modulus.is_empty() {
        return None;
    }
    Some(modulus.len() as u32 * 8)
}
