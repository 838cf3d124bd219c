//! Transport URL construction.
//!
//! The server accepts session connections at
//!
//! ```text
//! <ws|wss>://<host>/ws/<room>?token=<bearer>
//! ```
//!
//! optionally with the connection kind folded into the path
//! (`/ws/<kind>/<room>`). [`UrlBuilder`] produces everything up to the
//! query string; the driver appends the token with [`with_token`] so the
//! builder never sees credentials. Both are built on [`url::Url`].

use partyline_protocol::{ConnectionKind, RoomId};
use url::Url;

use crate::SessionError;

/// Builds the transport URL for a room and connection kind.
///
/// Implemented for any matching closure, so tests can point the driver at
/// a loopback server without an [`Endpoint`].
pub trait UrlBuilder: Send + Sync + 'static {
    fn build_url(
        &self,
        room: &RoomId,
        kind: ConnectionKind,
    ) -> Result<String, SessionError>;
}

impl<F> UrlBuilder for F
where
    F: Fn(&RoomId, ConnectionKind) -> Result<String, SessionError>
        + Send
        + Sync
        + 'static,
{
    fn build_url(
        &self,
        room: &RoomId,
        kind: ConnectionKind,
    ) -> Result<String, SessionError> {
        self(room, kind)
    }
}

/// The standard URL scheme, rooted at the origin the app was served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// `ws://host[:port]/` or `wss://host[:port]/`: no credentials, path,
    /// query or fragment.
    base: Url,
    kind_in_path: bool,
}

impl Endpoint {
    /// Derives the endpoint from a page origin.
    ///
    /// `https://` maps to `wss://` and `http://` to `ws://`; `ws(s)://`
    /// origins are used as given. Credentials, path, query and fragment
    /// are discarded.
    ///
    /// # Errors
    /// [`SessionError::InvalidEndpoint`] if the origin does not parse, has
    /// another scheme, or has no host.
    pub fn from_origin(origin: &str) -> Result<Self, SessionError> {
        let invalid = || SessionError::InvalidEndpoint(origin.to_owned());

        let mut base = Url::parse(origin.trim()).map_err(|_| invalid())?;
        let ws_scheme = match base.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            _ => return Err(invalid()),
        };
        if base.host_str().is_none_or(str::is_empty) {
            return Err(invalid());
        }

        base.set_scheme(ws_scheme).map_err(|()| invalid())?;
        base.set_username("").map_err(|()| invalid())?;
        base.set_password(None).map_err(|()| invalid())?;
        base.set_path("");
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self {
            base,
            kind_in_path: false,
        })
    }

    /// Places the connection kind in the path: `/ws/<kind>/<room>`.
    pub fn with_kind_in_path(mut self) -> Self {
        self.kind_in_path = true;
        self
    }

    /// The `ws(s)://host[:port]` prefix every URL starts with.
    pub fn base(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }
}

impl UrlBuilder for Endpoint {
    fn build_url(
        &self,
        room: &RoomId,
        kind: ConnectionKind,
    ) -> Result<String, SessionError> {
        if room.as_str().trim().is_empty() {
            return Err(SessionError::InvalidRoom("room id is empty".into()));
        }

        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                SessionError::InvalidEndpoint(self.base.to_string())
            })?;
            segments.clear().push("ws");
            if self.kind_in_path {
                segments.push(kind.as_str());
            }
            segments.push(room.as_str());
        }
        Ok(url.into())
    }
}

/// Appends the bearer token as the `token` query parameter.
///
/// Existing query pairs are kept. Any fragment is dropped since it is
/// never sent to the server.
///
/// # Errors
/// [`SessionError::InvalidEndpoint`] if `url` does not parse.
pub fn with_token(url: &str, token: &str) -> Result<String, SessionError> {
    let mut url = Url::parse(url)
        .map_err(|_| SessionError::InvalidEndpoint(url.to_owned()))?;
    url.set_fragment(None);
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.into())
}
