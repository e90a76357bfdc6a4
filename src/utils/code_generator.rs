use rand::Rng;

const COUPON_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random uppercase alphanumeric coupon code of the given length.
/// Uniqueness is enforced by the database, not here.
pub fn generate_coupon_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| COUPON_CHARSET[rng.gen_range(0..COUPON_CHARSET.len())] as char)
        .collect()
}
