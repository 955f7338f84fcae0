//! Site authentication: credentials, session cookies, and the login handshake.
//!
//! The session is a single serialized `Cookie` header. It is issued by
//! [`SiteLoginClient`], cached and persisted by [`CredentialStore`], and
//! attached to outbound traffic by [`crate::fetch::AuthenticatingClient`].

mod credentials;
mod error;
mod login;
mod store;

pub use credentials::{Credentials, Session};
pub use error::AuthError;
pub use login::{LOGIN_PAGE_PATH, LoginForm, SiteLoginClient, session_from_set_cookie};
pub use store::CredentialStore;
