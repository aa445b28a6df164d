//! Redirect Handling
//!
//! Every `Client` is built with an explicit `redirect::Policy`; there is no
//! implicit default. A policy either never follows redirects, handing the
//! 3xx response back to the caller as-is, or follows them up to a maximum
//! number of hops.
//!
//! ```
//! use redirect_demo::{redirect, Client};
//!
//! let following = Client::new(redirect::Policy::follow());
//! let never = Client::new(redirect::Policy::none());
//! # drop((following, never));
//! ```

use std::error::Error as StdError;
use std::fmt;

use log::trace;

use crate::{StatusCode, Url};

/// The number of hops `Policy::follow()` allows before failing.
pub const DEFAULT_MAX_HOPS: usize = 10;

/// A type that controls the policy on how to handle the following of redirects.
///
/// - `follow` follows a redirect chain of up to [`DEFAULT_MAX_HOPS`] hops.
/// - `limited` does the same, with a caller-chosen maximum.
/// - `none` disables all redirect behavior.
///
/// The policy is fixed once a `Client` is built and applies to every
/// request that client sends.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    inner: PolicyKind,
}

impl Policy {
    /// Create a `Policy` with a maximum number of redirects.
    ///
    /// An `Error` will be returned if the max is reached.
    pub fn limited(max: usize) -> Self {
        Self {
            inner: PolicyKind::Limit(max),
        }
    }

    /// Create a `Policy` that follows redirects, up to [`DEFAULT_MAX_HOPS`].
    pub fn follow() -> Self {
        Self::limited(DEFAULT_MAX_HOPS)
    }

    /// Create a `Policy` that does not follow any redirect.
    ///
    /// The 3xx response is returned as the `Ok` result.
    pub fn none() -> Self {
        Self {
            inner: PolicyKind::None,
        }
    }

    /// Returns true if this policy would follow at least one redirect.
    pub fn follows(&self) -> bool {
        match self.inner {
            PolicyKind::Limit(max) => max > 0,
            PolicyKind::None => false,
        }
    }

    /// The maximum number of hops this policy will follow.
    pub fn max_hops(&self) -> usize {
        match self.inner {
            PolicyKind::Limit(max) => max,
            PolicyKind::None => 0,
        }
    }

    pub(crate) fn check(&self, status: StatusCode, next: &Url, previous: &[Url]) -> ActionKind {
        trace!("checking {status} redirect to '{next}' after {} hop(s)", previous.len());
        match self.inner {
            PolicyKind::Limit(max) => {
                if previous.len() > max {
                    ActionKind::Error(Box::new(TooManyRedirects))
                } else {
                    ActionKind::Follow
                }
            }
            PolicyKind::None => ActionKind::Stop,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PolicyKind {
    Limit(usize),
    None,
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Policy").field(&self.inner).finish()
    }
}

impl fmt::Debug for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PolicyKind::Limit(max) => f.debug_tuple("Limit").field(&max).finish(),
            PolicyKind::None => f.pad("None"),
        }
    }
}

// pub(crate)

#[derive(Debug)]
pub(crate) enum ActionKind {
    Follow,
    Stop,
    Error(Box<dyn StdError + Send + Sync>),
}

/// Status codes the client treats as a redirect. Every hop is re-issued as
/// a `GET`.
pub(crate) fn is_redirect_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

#[derive(Debug)]
pub(crate) struct TooManyRedirects;

impl fmt::Display for TooManyRedirects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("too many redirects")
    }
}

impl StdError for TooManyRedirects {}
