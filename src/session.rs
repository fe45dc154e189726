//! Identity-provider session mirroring and route guarding.

use std::sync::Arc;

use crate::models::AuthUser;
use crate::store::{AuthAction, Store};

pub const LOGIN_ROUTE: &str = "/login";
pub const HOME_ROUTE: &str = "/";

/// Viewports at or below this width sign in with a full-page redirect.
pub const REDIRECT_MAX_VIEWPORT_WIDTH: u32 = 768;

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub provider_id: String,
    pub email_verified: bool,
}

impl ProviderUser {
    /// Only the public profile fields are mirrored into client state.
    pub fn public_profile(&self) -> AuthUser {
        AuthUser {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}

pub type SessionListener = Box<dyn Fn(Option<&ProviderUser>) + Send + Sync>;
pub type ListenerId = u64;

pub trait IdentityProvider: Send + Sync {
    fn on_auth_state_changed(&self, listener: SessionListener) -> ListenerId;
    fn remove_listener(&self, id: ListenerId);
}

/// Keeps the auth slice in sync with the provider until dropped.
pub struct SessionMirror {
    provider: Arc<dyn IdentityProvider>,
    listener: ListenerId,
}

impl SessionMirror {
    pub fn start(provider: Arc<dyn IdentityProvider>, store: Store) -> Self {
        let listener = provider.on_auth_state_changed(Box::new(move |user| {
            log::debug!("session changed signed_in={}", user.is_some());
            store.dispatch(AuthAction::SetUser(user.map(ProviderUser::public_profile)));
        }));
        Self { provider, listener }
    }
}

impl Drop for SessionMirror {
    fn drop(&mut self) {
        self.provider.remove_listener(self.listener);
    }
}

/// Where to send the user for `path`, or `None` to stay.
pub fn route_guard(is_authenticated: bool, path: &str) -> Option<&'static str> {
    match (is_authenticated, path == LOGIN_ROUTE) {
        (true, true) => Some(HOME_ROUTE),
        (false, false) => Some(LOGIN_ROUTE),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInMethod {
    Popup,
    Redirect,
}

impl SignInMethod {
    pub fn for_viewport(width: u32) -> Self {
        if width <= REDIRECT_MAX_VIEWPORT_WIDTH {
            SignInMethod::Redirect
        } else {
            SignInMethod::Popup
        }
    }
}

/// User-facing text for a provider sign-in error code.
pub fn sign_in_error_message(code: &str) -> &'static str {
    match code {
        "auth/unauthorized-domain" => {
            "This domain is not authorized for sign-in. Add it to the provider's authorized domains."
        }
        "auth/popup-blocked" => {
            "Popup was blocked by your browser. Please allow popups or try the redirect method."
        }
        "auth/popup-closed-by-user" => {
            "Sign-in popup was closed before completing the sign-in process."
        }
        "auth/cancelled-popup-request" => {
            "Multiple popup requests were triggered. Only the latest one will be processed."
        }
        "auth/configuration-not-found" => {
            "Authentication configuration not found. Please check the identity provider setup."
        }
        _ => "Failed to sign in. Please try again.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RootState;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProvider {
        listeners: Mutex<Vec<(ListenerId, SessionListener)>>,
        next_id: Mutex<ListenerId>,
    }

    impl FakeProvider {
        fn emit(&self, user: Option<&ProviderUser>) {
            for (_, listener) in self.listeners.lock().unwrap().iter() {
                listener(user);
            }
        }

        fn listener_count(&self) -> usize {
            self.listeners.lock().unwrap().len()
        }
    }

    impl IdentityProvider for FakeProvider {
        fn on_auth_state_changed(&self, listener: SessionListener) -> ListenerId {
            let mut next = self.next_id.lock().unwrap();
            let id = *next;
            *next += 1;
            self.listeners.lock().unwrap().push((id, listener));
            id
        }

        fn remove_listener(&self, id: ListenerId) {
            self.listeners.lock().unwrap().retain(|(lid, _)| *lid != id);
        }
    }

    fn provider_user() -> ProviderUser {
        ProviderUser {
            uid: "uid-1".into(),
            email: Some("ada@example.com".into()),
            display_name: Some("Ada".into()),
            photo_url: Some("https://img/ada.png".into()),
            provider_id: "google.com".into(),
            email_verified: true,
        }
    }

    #[test]
    fn mirror_overwrites_auth_slice_on_each_notification() {
        let provider = Arc::new(FakeProvider::default());
        let store = Store::new(RootState::default());
        let mirror = SessionMirror::start(provider.clone(), store.clone());

        provider.emit(Some(&provider_user()));
        let auth = store.state().auth;
        assert!(auth.is_authenticated);
        assert_eq!(auth.user, Some(provider_user().public_profile()));

        provider.emit(None);
        let auth = store.state().auth;
        assert!(!auth.is_authenticated);
        assert!(auth.user.is_none());

        drop(mirror);
        assert_eq!(provider.listener_count(), 0);
        provider.emit(Some(&provider_user()));
        assert!(!store.state().auth.is_authenticated);
    }

    #[test]
    fn guard_redirects_by_session_and_route() {
        assert_eq!(route_guard(true, "/login"), Some("/"));
        assert_eq!(route_guard(true, "/board"), None);
        assert_eq!(route_guard(false, "/board"), Some("/login"));
        assert_eq!(route_guard(false, "/"), Some("/login"));
        assert_eq!(route_guard(false, "/login"), None);
    }

    #[test]
    fn narrow_viewports_use_redirect() {
        assert_eq!(SignInMethod::for_viewport(375), SignInMethod::Redirect);
        assert_eq!(SignInMethod::for_viewport(768), SignInMethod::Redirect);
        assert_eq!(SignInMethod::for_viewport(769), SignInMethod::Popup);
    }

    #[test]
    fn error_codes_map_to_messages() {
        assert!(sign_in_error_message("auth/popup-blocked").starts_with("Popup was blocked"));
        assert!(sign_in_error_message("auth/unauthorized-domain").contains("not authorized"));
        assert_eq!(
            sign_in_error_message("auth/network-request-failed"),
            "Failed to sign in. Please try again."
        );
    }
}
