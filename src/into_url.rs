use url::Url;

/// A trait to try to convert some type into a `Url`.
///
/// This trait is "sealed", such that only types within redirect-demo can
/// implement it.
pub trait IntoUrl: IntoUrlSealed {}

impl IntoUrl for Url {}
impl IntoUrl for String {}
impl<'a> IntoUrl for &'a str {}
impl<'a> IntoUrl for &'a String {}

pub trait IntoUrlSealed {
    // Besides parsing as a valid `Url`, the `Url` must be a valid
    // `http::Uri`, in that it makes sense to use in a network request.
    fn into_url(self) -> crate::Result<Url>;
}

impl IntoUrlSealed for Url {
    fn into_url(self) -> crate::Result<Url> {
        if !matches!(self.scheme(), "http" | "https") {
            return Err(crate::error::url_bad_scheme(self));
        }
        if self.has_host() {
            Ok(self)
        } else {
            Err(crate::error::url_missing_host(self))
        }
    }
}

impl<'a> IntoUrlSealed for &'a str {
    fn into_url(self) -> crate::Result<Url> {
        Url::parse(self).map_err(crate::error::builder)?.into_url()
    }
}

impl<'a> IntoUrlSealed for &'a String {
    fn into_url(self) -> crate::Result<Url> {
        (&**self).into_url()
    }
}

impl IntoUrlSealed for String {
    fn into_url(self) -> crate::Result<Url> {
        (&*self).into_url()
    }
}

pub(crate) fn try_uri(url: &Url) -> crate::Result<http::Uri> {
    url.as_str()
        .parse()
        .map_err(|_| crate::error::url_invalid_uri(url.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn into_url_file_scheme() {
        let err = "file:///etc/hosts".into_url().unwrap_err();
        assert!(err.is_builder());
        assert_eq!(
            err.source().map(|e| e.to_string()),
            Some("URL scheme is not allowed".into())
        );
        assert_eq!(err.url().map(Url::as_str), Some("file:///etc/hosts"));
    }

    #[test]
    fn into_url_blob_scheme() {
        let err = "blob:https://example.com".into_url().unwrap_err();
        assert!(err.is_builder());
    }

    #[test]
    fn into_url_relative_is_rejected() {
        let err = "/hello".into_url().unwrap_err();
        assert!(err.is_builder());
        assert!(err.url().is_none());
    }

    #[test]
    fn into_url_http() {
        let url = String::from("http://127.0.0.1:8080/jump").into_url().unwrap();
        assert_eq!(url.path(), "/jump");
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn try_uri_with_corner_case() {
        let bad_url_string = "https://rust-lang.org\""; // trailing quote
        let bad_url = bad_url_string
            .into_url()
            .expect("bad url is a valid url (but not a valid uri)");
        let err = try_uri(&bad_url).unwrap_err();
        assert!(err.is_builder());
    }
}
