use argon2::Config as Argon2Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{id::ApiId, validation::FormErrors},
    db::{NewOwner, Owner},
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Sign-up details received from a prospective owner. The password is in
/// plaintext, so this is never stored directly.
#[derive(Clone, Deserialize, Serialize)]
pub struct OwnerRegistration {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl TryFrom<OwnerRegistration> for NewOwner {
    type Error = FormErrors;

    /// Convert an [`OwnerRegistration`] to a new [`Owner`] by hashing the password.
    /// This enforces a plausible email, a non-blank name, and the minimum password length.
    fn try_from(registration: OwnerRegistration) -> Result<Self, Self::Error> {
        let mut errors = FormErrors::new();
        errors.require_email("email", "Email", &registration.email);
        errors.require("name", "Name", &registration.name);
        if registration.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("Passwordは{MIN_PASSWORD_LENGTH}文字以上で入力してください"),
            );
        }
        errors.with_input(&registration).into_result()?;

        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash = argon2::hash_encoded(
            registration.password.as_bytes(),
            &salt,
            &Argon2Config::default(),
        )
        .expect("the default argon2 config is valid");
        Ok(Self {
            email: registration.email.trim().to_string(),
            name: registration.name.trim().to_string(),
            password_hash,
        })
    }
}

/// Sign-in credentials.
#[derive(Clone, Deserialize, Serialize)]
pub struct OwnerCredentials {
    pub email: String,
    pub password: String,
}

/// The signed-in owner, as shown in the page header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerDescription {
    pub id: ApiId,
    pub email: String,
    pub name: String,
}

impl From<Owner> for OwnerDescription {
    fn from(owner: Owner) -> Self {
        Self {
            id: owner.id.into(),
            email: owner.owner.email,
            name: owner.owner.name,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl OwnerRegistration {
        pub fn example() -> Self {
            Self {
                email: "john@example.com".into(),
                name: "John".into(),
                password: "correct horse battery".into(),
            }
        }

        /// The JSON a client would send. The password is never serialised
        /// by this type, so it is spelled out here.
        pub fn to_request_body(&self) -> String {
            rocket::serde::json::json!({
                "email": self.email,
                "name": self.name,
                "password": self.password,
            })
            .to_string()
        }

        pub fn example2() -> Self {
            Self {
                email: "jane@example.com".into(),
                name: "Jane".into(),
                password: "another fine password".into(),
            }
        }
    }

    impl OwnerCredentials {
        pub fn example() -> Self {
            let registration = OwnerRegistration::example();
            Self {
                email: registration.email,
                password: registration.password,
            }
        }
    }

    #[test]
    fn registration_is_validated() {
        let registration = OwnerRegistration {
            email: "john".into(),
            name: " ".into(),
            password: "short".into(),
        };
        let errors = NewOwner::try_from(registration).unwrap_err();
        assert_eq!(errors.field("email"), ["Emailは不正な値です"]);
        assert_eq!(errors.field("name"), ["Nameを入力してください"]);
        assert_eq!(errors.field("password").len(), 1);
        // The password is never echoed back.
        assert!(!errors.input.unwrap().to_string().contains("short"));
    }
}
