//! Store-backed authentication provider.

mod stored_auth;

pub use stored_auth::StoredAuthProvider;
