/// Hex rendering of at most `max` leading bytes of a raw message.
pub fn short_hex(data: &[u8], max: usize) -> String {
    let mut out = String::with_capacity(max.min(data.len()) * 2);
    for b in data.iter().take(max) {
        out.push_str(&format!("{:02x}", b));
    }
    if data.len() > max {
        out.push_str("..");
    }
    out
}
