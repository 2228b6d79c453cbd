pub mod forwarded;
pub mod upload;
