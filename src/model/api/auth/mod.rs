mod owner;
mod token;
mod user;

pub use owner::{OwnerCredentials, OwnerDescription, OwnerRegistration, MIN_PASSWORD_LENGTH};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
pub use user::User;
