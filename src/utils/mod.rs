pub mod code_generator;
pub mod jwt;
pub mod money;

pub use code_generator::generate_coupon_code;
pub use jwt::*;
pub use money::to_cents;
