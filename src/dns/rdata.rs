//! Typed RDATA for the record types the chain analysis inspects.
//!
//! Names inside RDATA may be compressed, so decoding needs the whole packet and
//! the RDATA offset rather than just the RDATA bytes.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::{
    ParseError,
    common::{WireReader, labels_to_fqdn},
    enums::DNSResourceType,
};
use crate::dnssec::calculate_key_tag;
use crate::dnssec::constants::SEP_FLAG;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RData {
    #[default]
    Empty,
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    NS(String),
    CNAME(String),
    MX {
        preference: u16,
        exchange: String,
    },
    TXT(Vec<String>),
    SOA(SoaData),
    DS(DsData),
    DNSKEY(DnskeyData),
    RRSIG(RrsigData),
    NSEC(NsecData),
    NSEC3(Nsec3Data),
    Unknown(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoaData {
    pub mname: String,
    pub rname: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DsData {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnskeyData {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: Vec<u8>,
}

impl DnskeyData {
    /// Secure Entry Point bit (RFC 4034 section 2.1.1)
    pub fn is_sep(&self) -> bool {
        self.flags & SEP_FLAG != 0
    }

    pub fn key_tag(&self) -> u16 {
        calculate_key_tag(self.flags, self.protocol, self.algorithm, &self.public_key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RrsigData {
    pub type_covered: DNSResourceType,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
    pub signer_name: String,
    pub signature: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NsecData {
    pub next_domain: String,
    pub types: Vec<DNSResourceType>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nsec3Data {
    pub hash_algorithm: u8,
    pub flags: u8,
    pub iterations: u16,
    pub salt: Vec<u8>,
    pub next_hashed_owner: Vec<u8>,
    pub types: Vec<DNSResourceType>,
}

impl RData {
    /// Decode `rdlength` bytes of RDATA starting at `start` in `packet`.
    pub fn decode(
        rtype: DNSResourceType,
        packet: &[u8],
        start: usize,
        rdlength: u16,
    ) -> Result<Self, ParseError> {
        let mut reader = WireReader::bounded(packet, start, usize::from(rdlength))?;
        let rdata = match rtype {
            DNSResourceType::A => {
                let b = reader.read_bytes(4)?;
                RData::A(Ipv4Addr::new(b[0], b[1], b[2], b[3]))
            }
            DNSResourceType::AAAA => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(reader.read_bytes(16)?);
                RData::AAAA(Ipv6Addr::from(octets))
            }
            DNSResourceType::NS => RData::NS(labels_to_fqdn(&reader.read_name()?)),
            DNSResourceType::CNAME => RData::CNAME(labels_to_fqdn(&reader.read_name()?)),
            DNSResourceType::MX => RData::MX {
                preference: reader.read_u16()?,
                exchange: labels_to_fqdn(&reader.read_name()?),
            },
            DNSResourceType::TXT => {
                let mut strings = Vec::new();
                while reader.remaining() > 0 {
                    let len = reader.read_u8()?;
                    let bytes = reader.read_bytes(usize::from(len))?;
                    strings.push(String::from_utf8_lossy(bytes).into_owned());
                }
                RData::TXT(strings)
            }
            DNSResourceType::SOA => RData::SOA(SoaData {
                mname: labels_to_fqdn(&reader.read_name()?),
                rname: labels_to_fqdn(&reader.read_name()?),
                serial: reader.read_u32()?,
                refresh: reader.read_u32()?,
                retry: reader.read_u32()?,
                expire: reader.read_u32()?,
                minimum: reader.read_u32()?,
            }),
            DNSResourceType::DS | DNSResourceType::CDS => RData::DS(DsData {
                key_tag: reader.read_u16()?,
                algorithm: reader.read_u8()?,
                digest_type: reader.read_u8()?,
                digest: reader.read_remaining().to_vec(),
            }),
            DNSResourceType::DNSKEY | DNSResourceType::CDNSKEY => RData::DNSKEY(DnskeyData {
                flags: reader.read_u16()?,
                protocol: reader.read_u8()?,
                algorithm: reader.read_u8()?,
                public_key: reader.read_remaining().to_vec(),
            }),
            DNSResourceType::RRSIG => RData::RRSIG(RrsigData {
                type_covered: reader.read_u16()?.into(),
                algorithm: reader.read_u8()?,
                labels: reader.read_u8()?,
                original_ttl: reader.read_u32()?,
                expiration: reader.read_u32()?,
                inception: reader.read_u32()?,
                key_tag: reader.read_u16()?,
                signer_name: labels_to_fqdn(&reader.read_name()?),
                signature: reader.read_remaining().to_vec(),
            }),
            DNSResourceType::NSEC => RData::NSEC(NsecData {
                next_domain: labels_to_fqdn(&reader.read_name()?),
                types: read_type_bitmaps(&mut reader)?,
            }),
            DNSResourceType::NSEC3 => {
                let hash_algorithm = reader.read_u8()?;
                let flags = reader.read_u8()?;
                let iterations = reader.read_u16()?;
                let salt_len = reader.read_u8()?;
                let salt = reader.read_bytes(usize::from(salt_len))?.to_vec();
                let hash_len = reader.read_u8()?;
                let next_hashed_owner = reader.read_bytes(usize::from(hash_len))?.to_vec();
                RData::NSEC3(Nsec3Data {
                    hash_algorithm,
                    flags,
                    iterations,
                    salt,
                    next_hashed_owner,
                    types: read_type_bitmaps(&mut reader)?,
                })
            }
            _ => RData::Unknown(reader.read_remaining().to_vec()),
        };
        Ok(rdata)
    }
}

/// Decode NSEC/NSEC3 type bitmap windows (RFC 4034 section 4.1.2).
fn read_type_bitmaps(reader: &mut WireReader<'_>) -> Result<Vec<DNSResourceType>, ParseError> {
    let mut types = Vec::new();
    while reader.remaining() > 0 {
        let window = reader.read_u8()?;
        let len = reader.read_u8()?;
        if len == 0 || len > 32 {
            return Err(ParseError::InvalidRdata(format!(
                "type bitmap window {} has length {}",
                window, len
            )));
        }
        for (index, byte) in reader.read_bytes(usize::from(len))?.iter().enumerate() {
            for bit in 0..8 {
                if byte & (0x80 >> bit) != 0 {
                    let code = u16::from(window) * 256 + (index as u16) * 8 + bit;
                    types.push(DNSResourceType::from(code));
                }
            }
        }
    }
    Ok(types)
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RData::Empty => Ok(()),
            RData::A(addr) => write!(f, "{}", addr),
            RData::AAAA(addr) => write!(f, "{}", addr),
            RData::NS(name) | RData::CNAME(name) => write!(f, "{}", name),
            RData::MX {
                preference,
                exchange,
            } => write!(f, "{} {}", preference, exchange),
            RData::TXT(strings) => {
                let quoted: Vec<String> = strings.iter().map(|s| format!("\"{}\"", s)).collect();
                write!(f, "{}", quoted.join(" "))
            }
            RData::SOA(soa) => write!(
                f,
                "{} {} {} {} {} {} {}",
                soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum
            ),
            RData::DS(ds) => write!(
                f,
                "{} {} {} {}",
                ds.key_tag,
                ds.algorithm,
                ds.digest_type,
                hex::encode_upper(&ds.digest)
            ),
            RData::DNSKEY(key) => write!(
                f,
                "{} {} {} ({} bytes)",
                key.flags,
                key.protocol,
                key.algorithm,
                key.public_key.len()
            ),
            RData::RRSIG(sig) => write!(
                f,
                "{} {} {} {} {}",
                sig.type_covered, sig.algorithm, sig.labels, sig.key_tag, sig.signer_name
            ),
            RData::NSEC(nsec) => {
                write!(f, "{}", nsec.next_domain)?;
                for t in &nsec.types {
                    write!(f, " {}", t)?;
                }
                Ok(())
            }
            RData::NSEC3(nsec3) => {
                write!(
                    f,
                    "{} {} {} {} {}",
                    nsec3.hash_algorithm,
                    nsec3.flags,
                    nsec3.iterations,
                    if nsec3.salt.is_empty() {
                        "-".to_string()
                    } else {
                        hex::encode_upper(&nsec3.salt)
                    },
                    hex::encode_upper(&nsec3.next_hashed_owner)
                )?;
                for t in &nsec3.types {
                    write!(f, " {}", t)?;
                }
                Ok(())
            }
            RData::Unknown(bytes) => write!(f, "\\# {} {}", bytes.len(), hex::encode(bytes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_bitmap_decoding() {
        // Window 0: A(1) NS(2) SOA(6) RRSIG(46) NSEC(47) DNSKEY(48)
        let mut bitmap = vec![0u8; 7];
        bitmap[0] = 0b0110_0010;
        bitmap[5] = 0b0000_0011;
        bitmap[6] = 0b1000_0000;
        let mut rdata = vec![0, 7];
        rdata.extend_from_slice(&bitmap);

        let mut reader = WireReader::new(&rdata);
        let types = read_type_bitmaps(&mut reader).unwrap();
        assert_eq!(
            types,
            vec![
                DNSResourceType::A,
                DNSResourceType::NS,
                DNSResourceType::SOA,
                DNSResourceType::RRSIG,
                DNSResourceType::NSEC,
                DNSResourceType::DNSKEY,
            ]
        );
    }

    #[test]
    fn test_bad_bitmap_window_rejected() {
        let rdata = [0u8, 0];
        let mut reader = WireReader::new(&rdata);
        assert!(read_type_bitmaps(&mut reader).is_err());
    }

    #[test]
    fn test_ds_decoding() {
        let mut rdata = vec![];
        rdata.extend_from_slice(&20326u16.to_be_bytes());
        rdata.push(8);
        rdata.push(2);
        rdata.extend_from_slice(&[0xE0, 0x6D]);

        match RData::decode(DNSResourceType::DS, &rdata, 0, rdata.len() as u16).unwrap() {
            RData::DS(ds) => {
                assert_eq!(ds.key_tag, 20326);
                assert_eq!(ds.algorithm, 8);
                assert_eq!(ds.digest_type, 2);
                assert_eq!(ds.digest, vec![0xE0, 0x6D]);
            }
            other => panic!("unexpected rdata {:?}", other),
        }
    }

    #[test]
    fn test_truncated_soa_rejected() {
        let rdata = [0u8, 0, 0, 0];
        assert!(RData::decode(DNSResourceType::SOA, &rdata, 0, 4).is_err());
    }

    #[test]
    fn test_nsec3_decoding() {
        let mut rdata = vec![1, 0];
        rdata.extend_from_slice(&0u16.to_be_bytes());
        rdata.push(0); // no salt
        rdata.push(4);
        rdata.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        rdata.extend_from_slice(&[0, 1, 0b0100_0000]); // window 0: A

        match RData::decode(DNSResourceType::NSEC3, &rdata, 0, rdata.len() as u16).unwrap() {
            RData::NSEC3(n) => {
                assert_eq!(n.hash_algorithm, 1);
                assert!(n.salt.is_empty());
                assert_eq!(n.next_hashed_owner, vec![0xDE, 0xAD, 0xBE, 0xEF]);
                assert_eq!(n.types, vec![DNSResourceType::A]);
            }
            other => panic!("unexpected rdata {:?}", other),
        }
    }
}
