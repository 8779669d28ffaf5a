use rand::Rng;

pub const SHORT_CODE_LEN: usize = 7;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random 7-character alphanumeric short code.
///
/// Uniqueness is enforced by the store; callers regenerate on a duplicate.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    (0..SHORT_CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
