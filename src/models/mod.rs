pub mod common;
pub mod coupon_code;
pub mod dashboard;
pub mod points;
pub mod promotion;
pub mod redemption;
pub mod reward;

pub use common::*;
pub use coupon_code::*;
pub use dashboard::*;
pub use points::*;
pub use promotion::*;
pub use redemption::*;
pub use reward::*;
