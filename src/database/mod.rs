pub mod connection;

#[cfg(test)]
pub mod test_support;

pub use connection::*;
