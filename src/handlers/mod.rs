pub mod admin;
pub mod coupon_code;
pub mod loyalty;

pub use admin::admin_config;
pub use coupon_code::coupon_code_config;
pub use loyalty::loyalty_config;
