/// djb2 in its xor form: `h = h * 33 ^ byte`, starting from 5381.
///
/// Used to match mount points and device names against constants without
/// comparing strings on the hot path. Callers confirm a hash hit against
/// the literal name.
pub const fn djb2(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 5381;
    let mut i = 0;
    while i < bytes.len() {
        hash = (hash << 5).wrapping_add(hash) ^ bytes[i] as u32;
        i += 1;
    }
    hash
}
