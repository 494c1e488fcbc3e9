use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::{
    ParseError,
    common::{PacketComponent, WireReader},
};

pub const HEADER_LEN: usize = 12;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSHeader {
    pub id: u16,
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: bool,
    /// Authenticated data (RFC 4035 section 3.2.3)
    pub ad: bool,
    /// Checking disabled
    pub cd: bool,
    pub rcode: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl PacketComponent for DNSHeader {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        writer.write_var::<u16>(16, self.id)?;
        writer.write_var::<u8>(1, self.qr as u8)?;
        writer.write_var::<u8>(4, self.opcode)?;
        writer.write_var::<u8>(1, self.aa as u8)?;
        writer.write_var::<u8>(1, self.tc as u8)?;
        writer.write_var::<u8>(1, self.rd as u8)?;
        writer.write_var::<u8>(1, self.ra as u8)?;
        writer.write_var::<u8>(1, self.z as u8)?;
        writer.write_var::<u8>(1, self.ad as u8)?;
        writer.write_var::<u8>(1, self.cd as u8)?;
        writer.write_var::<u8>(4, self.rcode)?;
        writer.write_var::<u16>(16, self.qdcount)?;
        writer.write_var::<u16>(16, self.ancount)?;
        writer.write_var::<u16>(16, self.nscount)?;
        writer.write_var::<u16>(16, self.arcount)?;
        Ok(())
    }

    fn read(reader: &mut WireReader<'_>) -> Result<Self, ParseError> {
        let bytes = reader
            .read_bytes(HEADER_LEN)
            .map_err(|_| ParseError::InvalidHeader)?;
        let mut bits = BitReader::<_, BigEndian>::new(bytes);
        Ok(DNSHeader {
            id: bits.read_var::<u16>(16)?,
            qr: bits.read_var::<u8>(1)? == 1,
            opcode: bits.read_var::<u8>(4)?,
            aa: bits.read_var::<u8>(1)? == 1,
            tc: bits.read_var::<u8>(1)? == 1,
            rd: bits.read_var::<u8>(1)? == 1,
            ra: bits.read_var::<u8>(1)? == 1,
            z: bits.read_var::<u8>(1)? == 1,
            ad: bits.read_var::<u8>(1)? == 1,
            cd: bits.read_var::<u8>(1)? == 1,
            rcode: bits.read_var::<u8>(4)?,
            qdcount: bits.read_var::<u16>(16)?,
            ancount: bits.read_var::<u16>(16)?,
            nscount: bits.read_var::<u16>(16)?,
            arcount: bits.read_var::<u16>(16)?,
        })
    }
}
