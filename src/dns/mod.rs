pub mod common;
pub mod edns;
pub mod enums;
pub mod header;
pub mod question;
pub mod rdata;
pub mod resource;

use bitstream_io::{BigEndian, BitWrite, BitWriter};
use common::{PacketComponent, WireReader};
use edns::EdnsOpt;
use enums::DNSResourceType;
use header::DNSHeader;
use question::DNSQuestion;
use rdata::RData;
use resource::DNSResource;
use tracing::{debug, trace};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSPacket {
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
    pub resources: Vec<DNSResource>,
    /// EDNS0 OPT record if present (extracted from additional records)
    pub edns: Option<EdnsOpt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidHeader,
    InvalidLabel,
    InvalidQuestionSection,
    InvalidAnswerSection,
    InvalidAuthoritySection,
    InvalidAdditionalSection,
    InvalidRdata(String),
    UnexpectedEnd,
    InvalidBitStream(String),
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::InvalidBitStream(e.to_string())
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidHeader => write!(f, "Invalid DNS header"),
            ParseError::InvalidLabel => write!(f, "Invalid DNS label"),
            ParseError::InvalidQuestionSection => write!(f, "Invalid question section"),
            ParseError::InvalidAnswerSection => write!(f, "Invalid answer section"),
            ParseError::InvalidAuthoritySection => write!(f, "Invalid authority section"),
            ParseError::InvalidAdditionalSection => write!(f, "Invalid additional section"),
            ParseError::InvalidRdata(e) => write!(f, "Invalid RDATA: {}", e),
            ParseError::UnexpectedEnd => write!(f, "Unexpected end of packet"),
            ParseError::InvalidBitStream(e) => write!(f, "Invalid bit stream: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

/// Which section of a response a record was taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Answer,
    Authority,
    Additional,
}

impl DNSPacket {
    /// Build a recursive query for `name`/`qtype`.
    ///
    /// With `dnssec_ok` the query carries an EDNS0 OPT record with the DO bit
    /// and sets AD, so resolvers return RRSIG/NSEC material alongside answers.
    pub fn query(id: u16, name: &str, qtype: DNSResourceType, payload_size: u16, dnssec_ok: bool) -> Self {
        let mut packet = DNSPacket {
            header: DNSHeader {
                id,
                rd: true,
                ad: dnssec_ok,
                qdcount: 1,
                ..Default::default()
            },
            questions: vec![DNSQuestion::new(name, qtype)],
            ..Default::default()
        };
        if dnssec_ok {
            let mut edns = EdnsOpt::with_payload_size(payload_size);
            edns.set_do_flag(true);
            packet.edns = Some(edns);
        }
        packet
    }

    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        trace!("Parsing DNS packet, size: {} bytes", buf.len());
        let mut reader = WireReader::new(buf);
        let mut packet = DNSPacket {
            header: DNSHeader::read(&mut reader)?,
            ..Default::default()
        };
        debug!(
            "Parsed DNS header: id={}, qr={}, rcode={}, an={}, ns={}, ar={}",
            packet.header.id,
            packet.header.qr,
            packet.header.rcode,
            packet.header.ancount,
            packet.header.nscount,
            packet.header.arcount
        );

        for _ in 0..packet.header.qdcount {
            let question = DNSQuestion::read(&mut reader).map_err(|e| {
                debug!("Question parse failed: {}", e);
                ParseError::InvalidQuestionSection
            })?;
            packet.questions.push(question);
        }

        for _ in 0..packet.header.ancount {
            let answer = Self::read_record(&mut reader, ParseError::InvalidAnswerSection)?;
            packet.answers.push(answer);
        }

        for _ in 0..packet.header.nscount {
            let authority = Self::read_record(&mut reader, ParseError::InvalidAuthoritySection)?;
            packet.authorities.push(authority);
        }

        for _ in 0..packet.header.arcount {
            let resource = Self::read_record(&mut reader, ParseError::InvalidAdditionalSection)?;

            // The OPT pseudo-record is owned by the root name
            if resource.rtype == DNSResourceType::OPT && resource.labels.is_empty() {
                match EdnsOpt::parse_from_resource(
                    resource.rclass.into(),
                    resource.ttl,
                    &resource.rdata,
                ) {
                    Ok(edns_opt) => {
                        debug!("Parsed {}", edns_opt);
                        packet.edns = Some(edns_opt);
                        continue;
                    }
                    Err(e) => debug!("Failed to parse EDNS OPT record: {}", e),
                }
            }

            packet.resources.push(resource);
        }

        Ok(packet)
    }

    fn read_record(reader: &mut WireReader<'_>, section_error: ParseError) -> Result<DNSResource, ParseError> {
        DNSResource::read(reader).map_err(|e| {
            debug!("{}: {}", section_error, e);
            match e {
                ParseError::InvalidRdata(_) => e,
                _ => section_error,
            }
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut buf = Vec::new();
        let mut writer: BitWriter<&mut Vec<u8>, BigEndian> = BitWriter::new(&mut buf);

        let mut header = self.header.clone();
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authorities.len() as u16;
        header.arcount = self.resources.len() as u16 + u16::from(self.edns.is_some());
        header.write(&mut writer)?;

        for question in &self.questions {
            question.write(&mut writer)?;
        }
        for answer in &self.answers {
            answer.write(&mut writer)?;
        }
        for authority in &self.authorities {
            authority.write(&mut writer)?;
        }
        for resource in &self.resources {
            resource.write(&mut writer)?;
        }

        if let Some(edns) = &self.edns {
            let (udp_payload_size, ttl, rdata) = edns.to_resource_format();
            // Root owner, TYPE=OPT, CLASS=payload size
            writer.write_var::<u8>(8, 0)?;
            writer.write_var::<u16>(16, DNSResourceType::OPT.into())?;
            writer.write_var::<u16>(16, udp_payload_size)?;
            writer.write_var::<u32>(32, ttl)?;
            writer.write_var::<u16>(16, rdata.len() as u16)?;
            writer.write_bytes(&rdata)?;
        }

        Ok(buf)
    }

    pub fn section(&self, section: Section) -> &[DNSResource] {
        match section {
            Section::Answer => &self.answers,
            Section::Authority => &self.authorities,
            Section::Additional => &self.resources,
        }
    }

    /// Records of `rtype` in `section`.
    pub fn records_of(&self, section: Section, rtype: DNSResourceType) -> impl Iterator<Item = &DNSResource> {
        self.section(section)
            .iter()
            .filter(move |rr| rr.rtype == rtype)
    }

    /// Whether any RRSIG in `section` covers `rtype`.
    pub fn has_rrsig_covering(&self, section: Section, rtype: DNSResourceType) -> bool {
        self.records_of(section, DNSResourceType::RRSIG)
            .any(|rr| matches!(&rr.parsed_rdata, RData::RRSIG(sig) if sig.type_covered == rtype))
    }

    pub fn dnssec_requested(&self) -> bool {
        self.edns.as_ref().map(|edns| edns.do_flag()).unwrap_or(false)
    }
}
