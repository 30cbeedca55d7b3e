pub mod admin;
pub mod order;
pub mod support;
pub mod vendor;
