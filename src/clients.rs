use std::fmt;

use crate::{redirect, Client};

/// A named client configuration.
///
/// Each profile maps to exactly one redirect policy; two clients built from
/// the same profile behave identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Follows redirects, up to [`redirect::DEFAULT_MAX_HOPS`].
    Following,
    /// Never follows redirects; the 3xx is returned to the caller.
    NeverRedirecting,
}

impl Profile {
    /// Every profile, in a stable order.
    pub const ALL: [Profile; 2] = [Profile::Following, Profile::NeverRedirecting];

    /// The redirect policy a client of this profile is built with.
    pub fn policy(self) -> redirect::Policy {
        match self {
            Profile::Following => redirect::Policy::follow(),
            Profile::NeverRedirecting => redirect::Policy::none(),
        }
    }

    /// A short, stable name for logs and test output.
    pub fn name(self) -> &'static str {
        match self {
            Profile::Following => "following",
            Profile::NeverRedirecting => "never-redirecting",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of pre-configured clients, one per [`Profile`].
///
/// ```
/// use redirect_demo::{ClientSet, Profile};
///
/// let clients = ClientSet::build()?;
/// assert!(clients.get(Profile::Following).redirect_policy().follows());
/// assert!(!clients.never_redirecting().redirect_policy().follows());
/// # Ok::<(), redirect_demo::Error>(())
/// ```
#[derive(Clone)]
pub struct ClientSet {
    following: Client,
    never_redirecting: Client,
}

impl ClientSet {
    /// Build one client per profile.
    pub fn build() -> crate::Result<ClientSet> {
        Ok(ClientSet {
            following: Client::builder(Profile::Following.policy()).build()?,
            never_redirecting: Client::builder(Profile::NeverRedirecting.policy()).build()?,
        })
    }

    /// The client for `profile`.
    pub fn get(&self, profile: Profile) -> &Client {
        match profile {
            Profile::Following => &self.following,
            Profile::NeverRedirecting => &self.never_redirecting,
        }
    }

    /// The client that follows redirects.
    pub fn following(&self) -> &Client {
        &self.following
    }

    /// The client that never follows redirects.
    pub fn never_redirecting(&self) -> &Client {
        &self.never_redirecting
    }

    /// Iterate over `(profile, client)` pairs in [`Profile::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Profile, &Client)> + '_ {
        Profile::ALL.into_iter().map(move |profile| (profile, self.get(profile)))
    }
}

impl fmt::Debug for ClientSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
