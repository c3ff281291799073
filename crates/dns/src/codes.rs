//! Numeric protocol codes: record types, classes, opcodes and response codes.

use num_enum::{FromPrimitive, IntoPrimitive};

crate::wire_code_enum! {
    /// Resource record type (IANA "Resource Record (RR) TYPEs").
    pub enum RecordType("TYPE") {
        A = 1,
        NS = 2,
        MD = 3,
        MF = 4,
        CNAME = 5,
        SOA = 6,
        MB = 7,
        MG = 8,
        MR = 9,
        NULL = 10,
        WKS = 11,
        PTR = 12,
        HINFO = 13,
        MINFO = 14,
        MX = 15,
        TXT = 16,
        RP = 17,
        AFSDB = 18,
        X25 = 19,
        ISDN = 20,
        RT = 21,
        NSAP = 22,
        SIG = 24,
        KEY = 25,
        PX = 26,
        GPOS = 27,
        AAAA = 28,
        LOC = 29,
        NXT = 30,
        SRV = 33,
        NAPTR = 35,
        KX = 36,
        CERT = 37,
        A6 = 38,
        DNAME = 39,
        /// EDNS pseudo record, only legal in the additional section.
        OPT = 41,
        APL = 42,
        DS = 43,
        SSHFP = 44,
        IPSECKEY = 45,
        RRSIG = 46,
        NSEC = 47,
        DNSKEY = 48,
        DHCID = 49,
        NSEC3 = 50,
        NSEC3PARAM = 51,
        TLSA = 52,
        SMIMEA = 53,
        HIP = 55,
        CDS = 59,
        CDNSKEY = 60,
        OPENPGPKEY = 61,
        CSYNC = 62,
        ZONEMD = 63,
        SVCB = 64,
        HTTPS = 65,
        SPF = 99,
        EUI48 = 108,
        EUI64 = 109,
        TKEY = 249,
        TSIG = 250,
        IXFR = 251,
        AXFR = 252,
        MAILB = 253,
        MAILA = 254,
        ANY = 255,
        URI = 256,
        CAA = 257,
    }
}

crate::wire_code_enum! {
    pub enum ClassType("CLASS") {
        IN = 1,
        CS = 2,
        CH = 3,
        HS = 4,
        NONE = 254,
        ANY = 255,
    }
}

crate::wire_code_enum! {
    /// EDNS option code (IANA "DNS EDNS0 Option Codes").
    #[allow(non_camel_case_types)]
    pub enum EdnsOptionCode("OPTION") {
        LLQ = 1,
        UPDATE_LEASE = 2,
        NSID = 3,
        DAU = 5,
        DHU = 6,
        N3U = 7,
        CLIENT_SUBNET = 8,
        EXPIRE = 9,
        COOKIE = 10,
        TCP_KEEPALIVE = 11,
        PADDING = 12,
        CHAIN = 13,
        KEY_TAG = 14,
        EDE = 15,
        REPORT_CHANNEL = 18,
        ZONEVERSION = 19,
    }
}

/// Four bit header opcode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum DnsOpcode {
    Query = 0,
    IQuery = 1,
    Status = 2,
    Notify = 4,
    Update = 5,
    Dso = 6,
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl Default for DnsOpcode {
    fn default() -> Self {
        Self::Query
    }
}

/// Full 12 bit response code: four bits from the header, eight from the OPT record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum DnsResponseCode {
    NoError = 0,
    FormErr = 1,
    ServFail = 2,
    NxDomain = 3,
    NotImp = 4,
    Refused = 5,
    YxDomain = 6,
    YxRrSet = 7,
    NxRrSet = 8,
    NotAuth = 9,
    NotZone = 10,
    DsoTypeNi = 11,
    BadVers = 16,
    BadKey = 17,
    BadTime = 18,
    BadMode = 19,
    BadName = 20,
    BadAlg = 21,
    BadTrunc = 22,
    BadCookie = 23,
    #[num_enum(catch_all)]
    Unknown(u16),
}

impl Default for DnsResponseCode {
    fn default() -> Self {
        Self::NoError
    }
}

impl DnsResponseCode {
    /// Bits that do not fit the header and need an OPT record.
    pub(crate) fn extended_bits(self) -> u8 {
        (u16::from(self) >> 4) as u8
    }

    pub(crate) fn header_bits(self) -> u8 {
        (u16::from(self) & 0x0F) as u8
    }

    pub(crate) fn from_parts(extended: u8, header: u8) -> Self {
        Self::from(u16::from(extended) << 4 | u16::from(header & 0x0F))
    }
}
