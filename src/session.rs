//! Authenticated session state.
//!
//! The state only changes through [`reduce`], a pure function of the previous
//! state and an action. The HTTP client keeps one behind a lock and routes
//! login, token refresh and logout through it.
use crate::user::{RoleSet, User};
use serde::{Deserialize, Serialize};

// region:    --- Wire Types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub campus: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub password: String,
    pub confirmpassword: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub status: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
    #[serde(default)]
    pub roles: RoleSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredAccount {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub active: bool,
}
// endregion: --- Wire Types

// region:    --- State
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum SessionAction {
    SetCredentials {
        user: User,
        token: String,
        refresh_token: Option<String>,
    },
    TokenRefreshed {
        token: String,
        refresh_token: Option<String>,
    },
    Logout,
}

pub fn reduce(state: SessionState, action: SessionAction) -> SessionState {
    match action {
        SessionAction::SetCredentials {
            mut user,
            token,
            refresh_token,
        } => {
            // an empty role set keeps the roles already held for the same user
            if user.roles.iter().next().is_none() {
                user.roles = state
                    .user
                    .as_ref()
                    .filter(|prev| prev.id == user.id)
                    .map(|prev| prev.roles.clone())
                    .unwrap_or_default();
            }
            SessionState {
                user: Some(user),
                token: Some(token),
                refresh_token,
            }
        }
        // a refresh without a user in the session has nothing to attach to
        SessionAction::TokenRefreshed { .. } if state.user.is_none() => state,
        SessionAction::TokenRefreshed {
            token,
            refresh_token,
        } => SessionState {
            token: Some(token),
            refresh_token: refresh_token.or(state.refresh_token),
            ..state
        },
        SessionAction::Logout => SessionState::default(),
    }
}

impl From<AuthResponse> for SessionAction {
    fn from(auth: AuthResponse) -> Self {
        let mut user = auth.user;
        if user.roles.iter().next().is_none() {
            user.roles = auth.roles;
        }
        SessionAction::SetCredentials {
            user,
            token: auth.access_token,
            refresh_token: auth.refresh_token,
        }
    }
}
// endregion: --- State

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::Role;
    use serde_json::json;

    fn auth_response() -> AuthResponse {
        serde_json::from_value(json!({
            "status": "SUCCESS",
            "accessToken": "access-1",
            "refreshToken": "refresh-1",
            "user": { "_id": "u1", "name": "Ada", "roles": [] },
            "roles": ["Student"]
        }))
        .unwrap()
    }

    #[test]
    fn login_then_refresh_then_logout() {
        let state = reduce(SessionState::default(), auth_response().into());
        assert!(state.is_authenticated());
        assert_eq!(state.user_id(), Some("u1"));
        assert!(state.user.as_ref().unwrap().roles.contains(&Role::Student));

        let state = reduce(
            state,
            SessionAction::TokenRefreshed {
                token: "access-2".to_string(),
                refresh_token: None,
            },
        );
        assert_eq!(state.token.as_deref(), Some("access-2"));
        assert_eq!(state.refresh_token.as_deref(), Some("refresh-1"));

        let state = reduce(state, SessionAction::Logout);
        assert_eq!(state, SessionState::default());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn empty_roles_keep_those_held_for_the_same_user() {
        let state = reduce(SessionState::default(), auth_response().into());
        let bare: User = serde_json::from_value(json!({ "_id": "u1", "name": "Ada" })).unwrap();

        let same = reduce(
            state.clone(),
            SessionAction::SetCredentials {
                user: bare.clone(),
                token: "access-2".to_string(),
                refresh_token: None,
            },
        );
        assert!(same.user.as_ref().unwrap().roles.contains(&Role::Student));

        let other = User {
            id: "u2".to_string(),
            ..bare
        };
        let switched = reduce(
            state,
            SessionAction::SetCredentials {
                user: other,
                token: "access-3".to_string(),
                refresh_token: None,
            },
        );
        assert!(switched.user.as_ref().unwrap().roles.iter().next().is_none());
    }

    #[test]
    fn refresh_without_user_is_ignored() {
        let state = reduce(
            SessionState::default(),
            SessionAction::TokenRefreshed {
                token: "orphan".to_string(),
                refresh_token: None,
            },
        );
        assert_eq!(state.token, None);
    }
}
