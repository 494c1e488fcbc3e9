use bitstream_io::{BitWrite, BitWriter, Endianness};

use super::ParseError;

/// Upper bound on compression pointers followed while decoding one name.
const MAX_POINTER_JUMPS: usize = 16;

/// Maximum wire length of a domain name (RFC 1035 section 3.1).
const MAX_NAME_OCTETS: usize = 255;

pub trait PacketComponent: Sized {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError>;

    fn read(reader: &mut WireReader<'_>) -> Result<Self, ParseError>;

    /// Write labels uncompressed, terminated by the root label.
    fn write_labels<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
        labels: &[String],
    ) -> Result<(), ParseError> {
        for label in labels.iter().filter(|l| !l.is_empty()) {
            if label.len() > 63 {
                return Err(ParseError::InvalidLabel);
            }
            writer.write_var::<u8>(8, label.len() as u8)?;
            writer.write_bytes(label.as_bytes())?;
        }
        writer.write_var::<u8>(8, 0)?;
        Ok(())
    }
}

/// Cursor over a received packet.
///
/// Reads are bounded by `limit`, which is the end of the packet for section
/// parsing and the end of the RDATA for record payloads. Compression pointers
/// may still target any earlier offset in the packet.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    limit: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            limit: buf.len(),
        }
    }

    /// Reader over `buf[start..start + len]` that can still resolve pointers
    /// into the whole packet.
    pub fn bounded(buf: &'a [u8], start: usize, len: usize) -> Result<Self, ParseError> {
        let limit = start
            .checked_add(len)
            .filter(|end| *end <= buf.len())
            .ok_or(ParseError::UnexpectedEnd)?;
        Ok(Self {
            buf,
            pos: start,
            limit,
        })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn packet(&self) -> &'a [u8] {
        self.buf
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.pos)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        if self.remaining() < len {
            return Err(ParseError::UnexpectedEnd);
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_remaining(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.pos..self.limit];
        self.pos = self.limit;
        bytes
    }

    pub fn read_u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ParseError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ParseError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a possibly compressed domain name. The root label is not included
    /// in the returned list, so the root name decodes to an empty vector.
    pub fn read_name(&mut self) -> Result<Vec<String>, ParseError> {
        let mut labels = Vec::new();
        let mut offset = self.pos;
        let mut resume = None;
        let mut jumps = 0;
        let mut octets = 1;

        loop {
            // Until the first jump the name must stay inside the current bound.
            let bound = if resume.is_none() {
                self.limit
            } else {
                self.buf.len()
            };
            if offset >= bound {
                return Err(ParseError::UnexpectedEnd);
            }

            let len = self.buf[offset];
            match len & 0xC0 {
                0xC0 => {
                    if offset + 1 >= bound {
                        return Err(ParseError::UnexpectedEnd);
                    }
                    let target = (usize::from(len & 0x3F) << 8) | usize::from(self.buf[offset + 1]);
                    if target >= offset {
                        return Err(ParseError::InvalidLabel);
                    }
                    jumps += 1;
                    if jumps > MAX_POINTER_JUMPS {
                        return Err(ParseError::InvalidLabel);
                    }
                    if resume.is_none() {
                        resume = Some(offset + 2);
                    }
                    offset = target;
                }
                0x00 if len == 0 => {
                    offset += 1;
                    break;
                }
                0x00 => {
                    let start = offset + 1;
                    let end = start + usize::from(len);
                    if end > bound {
                        return Err(ParseError::UnexpectedEnd);
                    }
                    octets += usize::from(len) + 1;
                    if octets > MAX_NAME_OCTETS {
                        return Err(ParseError::InvalidLabel);
                    }
                    labels.push(String::from_utf8_lossy(&self.buf[start..end]).into_owned());
                    offset = end;
                }
                // 0x40 and 0x80 label types are obsolete or undefined.
                _ => return Err(ParseError::InvalidLabel),
            }
        }

        self.pos = resume.unwrap_or(offset);
        Ok(labels)
    }
}

/// Render labels as an absolute name with a trailing dot (`"."` for root).
pub fn labels_to_fqdn(labels: &[String]) -> String {
    let mut name = String::new();
    for label in labels.iter().filter(|l| !l.is_empty()) {
        name.push_str(label);
        name.push('.');
    }
    if name.is_empty() {
        name.push('.');
    }
    name
}

/// Split a presentation-format name into labels, ignoring the trailing dot.
pub fn name_to_labels(name: &str) -> Vec<String> {
    name.trim_end_matches('.')
        .split('.')
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
