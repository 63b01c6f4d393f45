use url::Url;

/// Join a service base URL and a route path.
///
/// `Url::join` drops the last path segment of a base without a trailing
/// slash, so both sides are normalized first: `http://host/api` + `/render`
/// gives `http://host/api/render`.
pub fn endpoint_url(base: &str, path: &str) -> Result<Url, url::ParseError> {
    let base = base.trim();
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim().trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_without_trailing_slash() {
        let url = endpoint_url("http://localhost:5000", "generate_fig").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/generate_fig");
    }

    #[test]
    fn keeps_base_path() {
        let url = endpoint_url("http://render.internal/api", "/generate_fig").unwrap();
        assert_eq!(url.as_str(), "http://render.internal/api/generate_fig");

        let url = endpoint_url("http://render.internal/api/", "generate_fig").unwrap();
        assert_eq!(url.as_str(), "http://render.internal/api/generate_fig");
    }

    #[test]
    fn rejects_relative_base() {
        assert!(endpoint_url("localhost", "generate_fig").is_err());
    }
}
