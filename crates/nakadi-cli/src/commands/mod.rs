//! Command implementations for nakadi-cli

pub mod publish;
pub mod stream;
pub mod subscribe;

pub use publish::publish;
pub use stream::stream;
pub use subscribe::subscribe;
