pub mod clock;
pub mod jwt;
pub mod policy;
