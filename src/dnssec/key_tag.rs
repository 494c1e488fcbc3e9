/// Calculate the key tag for a DNSKEY record (RFC 4034 Appendix B)
pub fn calculate_key_tag(flags: u16, protocol: u8, algorithm: u8, public_key: &[u8]) -> u16 {
    // RSAMD5 uses the low 16 bits of the modulus (Appendix B.1)
    if algorithm == 1 {
        if public_key.len() >= 2 {
            return u16::from_be_bytes([
                public_key[public_key.len() - 2],
                public_key[public_key.len() - 1],
            ]);
        }
        return 0;
    }

    // DNSKEY RDATA: flags (2) + protocol (1) + algorithm (1) + public key
    let header = [
        (flags >> 8) as u8,
        (flags & 0xFF) as u8,
        protocol,
        algorithm,
    ];

    let mut accumulator: u32 = 0;
    for (i, &byte) in header.iter().chain(public_key.iter()).enumerate() {
        if i % 2 == 0 {
            accumulator += u32::from(byte) << 8;
        } else {
            accumulator += u32::from(byte);
        }
    }

    accumulator += accumulator >> 16;
    (accumulator & 0xFFFF) as u16
}
