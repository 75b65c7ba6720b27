//! DTOs for the user endpoints.

use std::borrow::Cow;

use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::auth::Role;
use crate::domain::entities::{NewUser, UserPatch};

/// Request body for `POST /v1/users`.
#[derive(Debug, Deserialize, Validate)]
pub struct NewUserRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "at least one role is required"))]
    pub roles: Vec<Role>,

    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "passwords do not match"))]
    pub password_confirm: String,
}

impl From<NewUserRequest> for NewUser {
    fn from(req: NewUserRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            roles: req.roles.into_iter().collect(),
            password: req.password,
        }
    }
}

/// Request body for `PUT /v1/users/{id}`.
///
/// All fields are optional; only provided fields are changed. A new
/// password must be repeated in `password_confirm`.
#[derive(Debug, Default, Deserialize, Validate)]
#[validate(schema(function = "passwords_match"))]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,

    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,

    #[validate(length(min = 1, message = "at least one role is required"))]
    pub roles: Option<Vec<Role>>,

    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: Option<String>,

    pub password_confirm: Option<String>,
}

fn passwords_match(req: &UpdateUserRequest) -> Result<(), ValidationError> {
    if req.password.is_some() && req.password != req.password_confirm {
        return Err(ValidationError::new("password_mismatch")
            .with_message(Cow::Borrowed("passwords do not match")));
    }
    Ok(())
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            roles: req.roles.map(|r| r.into_iter().collect()),
            password: req.password,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_user(body: serde_json::Value) -> NewUserRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_new_user_valid() {
        let req = new_user(json!({
            "name": "Jane",
            "email": "jane@example.com",
            "roles": ["USER"],
            "password": "gophers",
            "password_confirm": "gophers"
        }));

        assert!(req.validate().is_ok());

        let user: NewUser = req.into();
        assert!(user.roles.contains(&Role::User));
    }

    #[test]
    fn test_new_user_invalid_fields() {
        let req = new_user(json!({
            "name": "",
            "email": "nope",
            "roles": [],
            "password": "gophers",
            "password_confirm": "other"
        }));

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("roles"));
        assert!(fields.contains_key("password_confirm"));
        assert!(!fields.contains_key("password"));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = serde_json::from_value::<NewUserRequest>(json!({
            "name": "Jane",
            "email": "jane@example.com",
            "roles": ["ROOT"],
            "password": "gophers",
            "password_confirm": "gophers"
        }));

        assert!(result.is_err());
    }

    #[test]
    fn test_update_partial() {
        let req: UpdateUserRequest = serde_json::from_value(json!({ "name": "Jane Doe" })).unwrap();
        assert!(req.validate().is_ok());

        let patch: UserPatch = req.into();
        assert_eq!(patch.name.as_deref(), Some("Jane Doe"));
        assert!(patch.email.is_none());
        assert!(patch.roles.is_none());
    }

    fn is_mismatch(errors: &validator::ValidationErrors) -> bool {
        errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .any(|e| e.code == "password_mismatch")
    }

    #[test]
    fn test_update_password_mismatch() {
        let req: UpdateUserRequest = serde_json::from_value(json!({
            "password": "a",
            "password_confirm": "b"
        }))
        .unwrap();
        assert!(is_mismatch(&req.validate().unwrap_err()));

        let missing: UpdateUserRequest =
            serde_json::from_value(json!({ "password": "a" })).unwrap();
        assert!(is_mismatch(&missing.validate().unwrap_err()));

        let matching: UpdateUserRequest = serde_json::from_value(json!({
            "password": "a",
            "password_confirm": "a"
        }))
        .unwrap();
        assert!(matching.validate().is_ok());
    }
}
