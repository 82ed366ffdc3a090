//! Filename resolution helpers.

use reqwest::Url;

/// Extracts the filename announced by a `Content-Disposition` header value.
///
/// The extended `filename*=UTF-8''...` form wins over the plain `filename=`
/// parameter. Directory components are stripped.
///
/// ```rust
/// use haul::utils::filename_from_content_disposition;
///
/// assert_eq!(
///     filename_from_content_disposition(r#"attachment; filename="report.pdf""#),
///     Some("report.pdf".to_string())
/// );
/// ```
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for parameter in value.split(';').map(str::trim) {
        let Some((key, raw)) = parameter.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = raw.trim().rsplit("''").next().unwrap_or_default();
                extended = Some(percent_decode(encoded));
            }
            "filename" => plain = Some(raw.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }
    extended.or(plain).and_then(|name| sanitize(&name))
}

/// Derives a filename from the last path segment of `url`.
///
/// ```rust
/// use haul::utils::filename_from_url;
/// use reqwest::Url;
///
/// let url = Url::parse("https://example.com/files/my%20file.zip").unwrap();
/// assert_eq!(filename_from_url(&url), Some("my file.zip".to_string()));
/// ```
pub fn filename_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    sanitize(&percent_decode(segment))
}

fn percent_decode(value: &str) -> String {
    // `+` is literal in paths and header parameters.
    let escaped = value.replace('+', "%2B");
    form_urlencoded::parse(escaped.as_bytes())
        .map(|(key, val)| {
            if val.is_empty() {
                key.into_owned()
            } else {
                [key, val].join("=")
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn sanitize(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next()?.trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_plain() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=a.zip"),
            Some("a.zip".to_string())
        );
        assert_eq!(
            filename_from_content_disposition(r#"inline; FILENAME="b c.txt""#),
            Some("b c.txt".to_string())
        );
    }

    #[test]
    fn test_content_disposition_extended_wins() {
        let value = r#"attachment; filename="fallback.txt"; filename*=UTF-8''na%C3%AFve.txt"#;
        assert_eq!(
            filename_from_content_disposition(value),
            Some("naïve.txt".to_string())
        );
    }

    #[test]
    fn test_content_disposition_strips_directories() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="../../etc/passwd""#),
            Some("passwd".to_string())
        );
        assert_eq!(filename_from_content_disposition("attachment"), None);
        assert_eq!(filename_from_content_disposition(r#"attachment; filename="""#), None);
    }

    #[test]
    fn test_filename_from_url() {
        let url = Url::parse("https://example.com/file-0.1.2.zip").unwrap();
        assert_eq!(filename_from_url(&url), Some("file-0.1.2.zip".to_string()));

        let url = Url::parse("https://example.com/a+b%26c.tar.gz?x=1").unwrap();
        assert_eq!(filename_from_url(&url), Some("a+b&c.tar.gz".to_string()));

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(filename_from_url(&url), None);
    }
}
