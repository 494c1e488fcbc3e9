use bitstream_io::{BitWrite, BitWriter, Endianness};

use super::{
    ParseError,
    common::{PacketComponent, WireReader, labels_to_fqdn},
    enums::{DNSResourceClass, DNSResourceType},
    rdata::RData,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSResource {
    pub labels: Vec<String>,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdlength: u16,
    /// RDATA exactly as received (may contain compression pointers)
    pub rdata: Vec<u8>,
    pub parsed_rdata: RData,
}

impl DNSResource {
    /// Build a record from uncompressed RDATA, decoding it eagerly.
    pub fn new(
        labels: Vec<String>,
        rtype: DNSResourceType,
        ttl: u32,
        rdata: Vec<u8>,
    ) -> Result<Self, ParseError> {
        let rdlength = u16::try_from(rdata.len())
            .map_err(|_| ParseError::InvalidRdata("RDATA longer than 65535 octets".into()))?;
        let parsed_rdata = RData::decode(rtype, &rdata, 0, rdlength)?;
        Ok(Self {
            labels,
            rtype,
            rclass: DNSResourceClass::IN,
            ttl,
            rdlength,
            rdata,
            parsed_rdata,
        })
    }

    /// Owner name with a trailing dot.
    pub fn owner(&self) -> String {
        labels_to_fqdn(&self.labels)
    }
}

impl PacketComponent for DNSResource {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        self.write_labels(writer, &self.labels)?;
        writer.write_var::<u16>(16, self.rtype.into())?;
        writer.write_var::<u16>(16, self.rclass.into())?;
        writer.write_var::<u32>(32, self.ttl)?;
        writer.write_var::<u16>(16, self.rdlength)?;
        writer.write_bytes(&self.rdata)?;
        Ok(())
    }

    fn read(reader: &mut WireReader<'_>) -> Result<Self, ParseError> {
        let labels = reader.read_name()?;
        let rtype: DNSResourceType = reader.read_u16()?.into();
        let rclass = reader.read_u16()?.into();
        let ttl = reader.read_u32()?;
        let rdlength = reader.read_u16()?;

        let rdata_start = reader.position();
        let rdata = reader.read_bytes(usize::from(rdlength))?.to_vec();
        // OPT payload is interpreted separately by the EDNS layer.
        let parsed_rdata = if rtype == DNSResourceType::OPT {
            RData::Unknown(rdata.clone())
        } else {
            RData::decode(rtype, reader.packet(), rdata_start, rdlength)?
        };

        Ok(DNSResource {
            labels,
            rtype,
            rclass,
            ttl,
            rdlength,
            rdata,
            parsed_rdata,
        })
    }
}
