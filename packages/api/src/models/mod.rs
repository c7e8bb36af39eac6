//! Data models shared by the resolver, the synchronizer and the HTTP layer.

mod credentials;
mod identity;
mod profile;

pub use credentials::{AuthResponse, GoogleRequest, LoginRequest, SignupRequest};
pub use identity::{display_name_or_email, Identity, IdentityMetadata};
pub use profile::{Profile, ProfileView};
