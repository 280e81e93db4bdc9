//! The authentication session.
//!
//! The session is an explicit object owned by the application and passed by reference
//! to the code that needs the current user. Changes are announced to the listeners
//! registered with [`Session::subscribe`].
//!
//! The session follows a small state machine:
//!
//! | state             | event                               | next state            |
//! |-------------------|-------------------------------------|-----------------------|
//! | unauthenticated   | sign-in requested                   | authenticating        |
//! | authenticating    | sign-in failed                      | unauthenticated       |
//! | any               | signed in as U                      | authenticated(U)      |
//! | authenticated(U)  | refresh started                     | refreshing(U)         |
//! | not signed out    | token refreshed / user updated as U | authenticated(U)      |
//! | any               | signed out                          | unauthenticated       |
//!
//! All the other combinations leave the state unchanged. Reaching the state the session
//! is already in is not a change: listeners are only called when the state
//! actually differs.

pub use crate::config::*;

use log::{debug, info, warn};

/// The identity known to the external provider.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
}

/// The profile stored next to an identity.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Profile {
    pub full_name: Option<String>,
    pub role: Option<String>,
}

/// An error reported by the identity provider, with its raw message.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: &str) -> ProviderError {
        ProviderError {
            message: message.to_string(),
        }
    }
}

/// The external identity service (authentication and profile store).
pub trait IdentityProvider {
    fn sign_in_with_password(&mut self, email: &str, password: &str)
        -> Result<(), ProviderError>;

    /// The full name is passed along as metadata; the profile is created by the provider.
    fn sign_up(&mut self, full_name: &str, email: &str, password: &str)
        -> Result<(), ProviderError>;

    fn sign_out(&mut self) -> Result<(), ProviderError>;

    fn current_identity(&self) -> Option<Identity>;

    fn load_profile(&self, user_id: &str) -> Result<Profile, ProviderError>;
}

/// The notifications pushed by the identity provider.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Notification {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated(AuthUser),
    Refreshing(AuthUser),
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AuthEvent {
    SignInRequested,
    SignedIn(AuthUser),
    SignInFailed,
    RefreshStarted,
    TokenRefreshed(AuthUser),
    UserUpdated(AuthUser),
    SignedOut,
}

impl AuthState {
    /// The state reached after applying the event.
    pub fn apply(&self, event: &AuthEvent) -> AuthState {
        use AuthEvent as E;
        use AuthState as S;
        match (self, event) {
            (S::Unauthenticated | S::Authenticating, E::SignInRequested) => S::Authenticating,
            (_, E::SignedIn(u)) => S::Authenticated(u.clone()),
            (S::Authenticating, E::SignInFailed) => S::Unauthenticated,
            (S::Authenticated(u), E::RefreshStarted) => S::Refreshing(u.clone()),
            (S::Unauthenticated, E::TokenRefreshed(_) | E::UserUpdated(_)) => S::Unauthenticated,
            (_, E::TokenRefreshed(u) | E::UserUpdated(u)) => S::Authenticated(u.clone()),
            (_, E::SignedOut) => S::Unauthenticated,
            (s, _) => s.clone(),
        }
    }

    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            AuthState::Authenticated(u) | AuthState::Refreshing(u) => Some(u),
            _ => None,
        }
    }
}

/// Handle returned by [`Session::subscribe`].
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct SubscriptionId(u64);

/// The outcome of guarding a page that needs a signed-in user.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Access<'a> {
    /// The session is still being established.
    Pending,
    Granted(&'a AuthUser),
    /// The caller should send the user to the login page, then back to `return_to`.
    RedirectToLogin { return_to: String },
}

type Listener = Box<dyn FnMut(&AuthState)>;

pub struct Session {
    state: AuthState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
    disposed: bool,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    pub fn new() -> Session {
        Session {
            state: AuthState::Unauthenticated,
            listeners: Vec::new(),
            next_id: 0,
            disposed: false,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.state.user()
    }

    pub fn is_loading(&self) -> bool {
        self.state == AuthState::Authenticating
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Registers a listener, called with the new state after every change.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&AuthState) + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the subscription was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() < before
    }

    /// Drops all the listeners. Events received afterwards are ignored.
    pub fn teardown(&mut self) {
        debug!(
            "Session::teardown: dropping {} listeners",
            self.listeners.len()
        );
        self.listeners.clear();
        self.disposed = true;
    }

    /// Applies an event. Returns true if the state changed.
    pub fn dispatch(&mut self, event: AuthEvent) -> bool {
        if self.disposed {
            debug!("Session::dispatch: disposed, ignoring {:?}", event);
            return false;
        }
        let next = self.state.apply(&event);
        if next == self.state {
            debug!("Session::dispatch: {:?} is a no-op", event);
            return false;
        }
        debug!("Session::dispatch: {:?} -> {:?}", event, next);
        self.state = next;
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state);
        }
        true
    }

    /// Establishes the initial state from the provider.
    ///
    /// A session that was signed in is signed out when the provider no longer knows
    /// the identity.
    pub fn bootstrap<P: IdentityProvider + ?Sized>(&mut self, provider: &P) -> Option<&AuthUser> {
        self.dispatch(AuthEvent::SignInRequested);
        match load_current_user(provider) {
            Some(u) => {
                info!("Session::bootstrap: signed in as {:?}", u.email);
                self.dispatch(AuthEvent::SignedIn(u));
            }
            None => {
                info!("Session::bootstrap: no signed-in user");
                self.dispatch(AuthEvent::SignedOut);
            }
        }
        self.user()
    }

    pub fn sign_in<P: IdentityProvider + ?Sized>(
        &mut self,
        provider: &mut P,
        email: &str,
        password: &str,
    ) -> Result<&AuthUser, SessionErrors> {
        if self.disposed {
            return Err(SessionErrors::Disposed);
        }
        info!("Session::sign_in: attempt for {:?}", email);
        self.dispatch(AuthEvent::SignInRequested);
        if let Err(e) = provider.sign_in_with_password(email, password) {
            warn!("Session::sign_in: {:?}", e.message);
            self.dispatch(AuthEvent::SignInFailed);
            return Err(classify_sign_in_error(&e.message));
        }
        match load_current_user(&*provider) {
            Some(u) => {
                info!("Session::sign_in: signed in as {:?}, role {:?}", u.email, u.role);
                self.dispatch(AuthEvent::SignedIn(u));
                self.user().ok_or(SessionErrors::MissingUser)
            }
            None => {
                self.dispatch(AuthEvent::SignInFailed);
                Err(SessionErrors::MissingUser)
            }
        }
    }

    /// Registers a new account. The state does not change: the account usually has to
    /// be confirmed by email before signing in.
    pub fn sign_up<P: IdentityProvider + ?Sized>(
        &mut self,
        provider: &mut P,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), SessionErrors> {
        if self.disposed {
            return Err(SessionErrors::Disposed);
        }
        provider
            .sign_up(full_name, email, password)
            .map_err(|e| SessionErrors::Provider(e.message))
    }

    pub fn sign_out<P: IdentityProvider + ?Sized>(
        &mut self,
        provider: &mut P,
    ) -> Result<(), SessionErrors> {
        if self.disposed {
            return Err(SessionErrors::Disposed);
        }
        provider
            .sign_out()
            .map_err(|e| SessionErrors::Provider(e.message))?;
        self.dispatch(AuthEvent::SignedOut);
        Ok(())
    }

    /// Handles a notification pushed by the provider. Returns true if the state changed.
    ///
    /// A sign-in notification that follows [`Session::sign_in`] resolves to the same
    /// user and is therefore a no-op.
    ///
    /// A token refresh always calls the listeners twice, with the refreshing state and
    /// then with the reloaded user, even when the user did not change.
    pub fn on_notification<P: IdentityProvider + ?Sized>(
        &mut self,
        provider: &P,
        notification: Notification,
    ) -> bool {
        if self.disposed {
            return false;
        }
        debug!("Session::on_notification: {:?}", notification);
        if notification == Notification::SignedOut {
            return self.dispatch(AuthEvent::SignedOut);
        }
        if notification == Notification::TokenRefreshed {
            self.dispatch(AuthEvent::RefreshStarted);
        }
        match (load_current_user(provider), notification) {
            (None, _) => self.dispatch(AuthEvent::SignedOut),
            (Some(u), Notification::SignedIn) => self.dispatch(AuthEvent::SignedIn(u)),
            (Some(u), Notification::UserUpdated) => self.dispatch(AuthEvent::UserUpdated(u)),
            (Some(u), _) => self.dispatch(AuthEvent::TokenRefreshed(u)),
        }
    }

    /// Guards a page that requires a signed-in user.
    pub fn access(&self, path: &str) -> Access<'_> {
        match &self.state {
            AuthState::Authenticating => Access::Pending,
            AuthState::Authenticated(u) | AuthState::Refreshing(u) => Access::Granted(u),
            AuthState::Unauthenticated => Access::RedirectToLogin {
                return_to: path.to_string(),
            },
        }
    }
}

/// Loads the signed-in user and its profile.
///
/// A profile that cannot be loaded is not an error: the user is returned without
/// name and role.
pub fn load_current_user<P: IdentityProvider + ?Sized>(provider: &P) -> Option<AuthUser> {
    let identity = provider.current_identity()?;
    debug!("load_current_user: identity {:?}", identity);
    let profile = match provider.load_profile(&identity.id) {
        Ok(p) => p,
        Err(e) => {
            warn!(
                "load_current_user: could not load the profile of {:?}: {}",
                identity.id, e.message
            );
            Profile::default()
        }
    };
    Some(AuthUser {
        id: identity.id,
        email: identity.email.unwrap_or_default(),
        full_name: profile.full_name,
        role: profile.role.as_deref().map(Role::parse),
    })
}

/// Maps the raw message of a failed sign-in to an error.
pub fn classify_sign_in_error(message: &str) -> SessionErrors {
    if message.contains("Invalid login credentials") {
        SessionErrors::InvalidCredentials
    } else if message.contains("Email not confirmed") {
        SessionErrors::EmailNotConfirmed
    } else {
        SessionErrors::Provider(message.to_string())
    }
}
