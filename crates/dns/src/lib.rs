pub mod codes;
pub mod domain_name;
pub mod edns;
pub mod flags;
pub mod helpers;
pub mod macros;
pub mod message;
pub mod presentation;
pub mod reader;
pub mod record;
pub mod writer;

pub use codes::{ClassType, DnsOpcode, DnsResponseCode, EdnsOptionCode, RecordType};
pub use domain_name::DomainName;
pub use edns::{Edns, EdnsOption};
pub use flags::DnsFlags;
pub use message::DnsMessage;
pub use record::{DnsQuestion, DnsRecord, DnsRecordData};

pub use reader::DnsMessageReader;
pub use writer::DnsMessageWriter;
