pub mod identity;

pub use identity::{format_mac, IdentityResolver, SystemIdentityResolver};
