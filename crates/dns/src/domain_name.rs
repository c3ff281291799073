use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use anyhow::{bail, ensure};

/// A wrapper type for domain names.
///
/// Names keep the case they were received in (observed traffic may use 0x20 casing), while
/// comparisons and hashing are case-insensitive. The trailing dot is not stored; the root is `.`.
/// Label bytes that are not printable ASCII, as well as `.` and `\` inside a label, are kept in
/// escaped presentation form (`\.`, `\\`, `\DDD`).
#[derive(Debug, Clone)]
pub struct DomainName(Arc<str>);

impl DomainName {
    /// The root name.
    pub fn root() -> Self {
        Self(Arc::from("."))
    }

    /// Create a new DomainName from an ASCII presentation string.
    /// The domain name is validated according to RFC 1035.
    pub fn from_ascii(s: impl AsRef<str>) -> anyhow::Result<Self> {
        let input = s.as_ref().trim();

        if input == "." || input.is_empty() {
            return Ok(Self::root());
        }

        ensure!(input.is_ascii(), "domain name is not ascii: {}", input);

        let name = input.strip_suffix('.').unwrap_or(input);

        // Validates label and total lengths.
        let labels = parse_labels(name)?;
        let wire_len = labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
        ensure!(wire_len <= 255, "domain name too long ({} bytes): {}", wire_len, name);

        Ok(Self(Arc::from(name)))
    }

    /// Build a name from raw wire labels, escaping bytes that are not safe in presentation form.
    pub(crate) fn from_wire_labels(labels: &[&[u8]]) -> Self {
        if labels.is_empty() {
            return Self::root();
        }

        let mut name = String::new();
        for label in labels {
            if !name.is_empty() {
                name.push('.');
            }
            for &b in *label {
                match b {
                    b'.' | b'\\' => {
                        name.push('\\');
                        name.push(b as char);
                    }
                    0x21..=0x7e => name.push(b as char),
                    _ => name.push_str(&format!("\\{:03}", b)),
                }
            }
        }

        Self(Arc::from(name))
    }

    /// Get the string representation of the DomainName, without the trailing dot.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the root name.
    pub fn is_root(&self) -> bool {
        &*self.0 == "."
    }

    /// Fully qualified form, with a trailing dot.
    pub fn fqdn(&self) -> String {
        if self.is_root() {
            return ".".into();
        }
        format!("{}.", self.0)
    }

    /// Decoded wire labels of this name.
    pub fn wire_labels(&self) -> anyhow::Result<Vec<Vec<u8>>> {
        if self.is_root() {
            return Ok(Vec::new());
        }
        parse_labels(&self.0)
    }
}

/// Split a presentation name (without trailing dot) into raw labels, resolving escapes.
fn parse_labels(name: &str) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut labels = Vec::new();
    let mut current = Vec::new();
    let mut chars = name.bytes().peekable();

    while let Some(b) = chars.next() {
        match b {
            b'.' => {
                ensure!(!current.is_empty(), "empty domain label in: {}", name);
                labels.push(std::mem::take(&mut current));
            }
            b'\\' => {
                let Some(next) = chars.next() else {
                    bail!("dangling escape in: {}", name);
                };
                if next.is_ascii_digit() {
                    let d2 = chars.next().filter(u8::is_ascii_digit);
                    let d3 = chars.next().filter(u8::is_ascii_digit);
                    let (Some(d2), Some(d3)) = (d2, d3) else {
                        bail!("invalid decimal escape in: {}", name);
                    };
                    let value = (next - b'0') as u16 * 100 + (d2 - b'0') as u16 * 10 + (d3 - b'0') as u16;
                    ensure!(value <= 255, "decimal escape out of range in: {}", name);
                    current.push(value as u8);
                } else {
                    current.push(next);
                }
            }
            other => current.push(other),
        }

        if let Some(label) = labels.last() {
            ensure!(label.len() <= 63, "domain label too long in: {}", name);
        }
        ensure!(current.len() <= 63, "domain label too long in: {}", name);
    }

    ensure!(!current.is_empty(), "empty domain label in: {}", name);
    labels.push(current);

    Ok(labels)
}

impl PartialEq for DomainName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for DomainName {}

impl Hash for DomainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl Deref for DomainName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for DomainName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fqdn())
    }
}
