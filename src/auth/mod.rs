pub mod credentials;
pub mod handlers;
pub mod session;

pub use session::{ConsultantIdentity, IdentityContext, UserIdentity};
