use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

const TOKEN_BYTES: usize = 32;

/// Length of every token returned by [`generate_review_token`].
pub const TOKEN_LEN: usize = 43;

/// 256 random bits from the OS RNG, base64url without padding.
///
/// Panics if the operating system cannot provide randomness; there is no
/// sensible way to continue issuing credentials without it.
pub fn generate_review_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
