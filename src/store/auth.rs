use serde::{Deserialize, Serialize};

use crate::models::AuthUser;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    #[serde(default)]
    pub user: Option<AuthUser>,
    #[serde(default)]
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    SetUser(Option<AuthUser>),
    Logout,
}

pub fn reduce(state: &mut AuthState, action: AuthAction) {
    match action {
        AuthAction::SetUser(user) => {
            state.is_authenticated = user.is_some();
            state.user = user;
        }
        AuthAction::Logout => {
            state.user = None;
            state.is_authenticated = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthUser {
        AuthUser {
            uid: "u1".into(),
            email: Some("ada@example.com".into()),
            display_name: Some("Ada".into()),
            photo_url: None,
        }
    }

    #[test]
    fn set_user_tracks_authentication_flag() {
        let mut state = AuthState::default();
        reduce(&mut state, AuthAction::SetUser(Some(user())));
        assert!(state.is_authenticated);
        assert_eq!(state.user, Some(user()));

        reduce(&mut state, AuthAction::SetUser(None));
        assert!(!state.is_authenticated);
        assert!(state.user.is_none());
    }

    #[test]
    fn logout_resets_session() {
        let mut state = AuthState::default();
        reduce(&mut state, AuthAction::SetUser(Some(user())));
        reduce(&mut state, AuthAction::Logout);
        assert_eq!(state, AuthState::default());
    }
}
