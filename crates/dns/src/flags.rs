use crate::codes::DnsOpcode;

const QR: u16 = 1 << 15;
const AA: u16 = 1 << 10;
const TC: u16 = 1 << 9;
const RD: u16 = 1 << 8;
const RA: u16 = 1 << 7;
const Z: u16 = 1 << 6;
const AD: u16 = 1 << 5;
const CD: u16 = 1 << 4;

const OPCODE_SHIFT: u16 = 11;
const NIBBLE: u16 = 0x0F;

/// Header flag bits.
///
/// The low four response code bits share the header word but are kept on the message,
/// which also owns the extended bits carried by EDNS.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DnsFlags {
    pub response: bool,
    pub opcode: DnsOpcode,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    /// Reserved bit, kept so it can be logged as received.
    pub z: bool,
    pub authentic_data: bool,
    pub checking_disabled: bool,
}

impl DnsFlags {
    /// Split a header flags word into the flags and the low response code bits.
    pub fn unpack(word: u16) -> (Self, u8) {
        let set = |bit: u16| word & bit != 0;
        let flags = Self {
            response: set(QR),
            opcode: DnsOpcode::from(((word >> OPCODE_SHIFT) & NIBBLE) as u8),
            authoritative: set(AA),
            truncated: set(TC),
            recursion_desired: set(RD),
            recursion_available: set(RA),
            z: set(Z),
            authentic_data: set(AD),
            checking_disabled: set(CD),
        };
        (flags, (word & NIBBLE) as u8)
    }

    pub fn pack(&self, rcode_low: u8) -> u16 {
        let opcode = u16::from(u8::from(self.opcode)) & NIBBLE;
        self.bits()
            .into_iter()
            .filter(|(on, _, _)| *on)
            .fold((opcode << OPCODE_SHIFT) | (u16::from(rcode_low) & NIBBLE), |word, (_, bit, _)| word | bit)
    }

    /// Mnemonics of the bits that are set, in header order.
    pub fn mnemonics(&self) -> impl Iterator<Item = &'static str> {
        self.bits().into_iter().filter(|(on, _, _)| *on).map(|(_, _, name)| name)
    }

    fn bits(&self) -> [(bool, u16, &'static str); 8] {
        [
            (self.response, QR, "qr"),
            (self.authoritative, AA, "aa"),
            (self.truncated, TC, "tc"),
            (self.recursion_desired, RD, "rd"),
            (self.recursion_available, RA, "ra"),
            (self.z, Z, "z"),
            (self.authentic_data, AD, "ad"),
            (self.checking_disabled, CD, "cd"),
        ]
    }
}
