//! Random file identifiers.

use rand::Rng;

/// Length of a generated file identifier.
pub const FILE_ID_LEN: usize = 8;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates an 8-character uppercase alphanumeric file identifier.
///
/// Collisions with existing records are not checked; with 36^8 possible
/// values they are not expected in a single tree.
pub fn generate_file_id() -> String {
    let mut rng = rand::thread_rng();
    (0..FILE_ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
