mod authority;
mod middleware;

pub use authority::{Authority, Claims};
pub use middleware::{AuthError, Bearer, RequireAdmin};
