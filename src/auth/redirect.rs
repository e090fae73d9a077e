use url::{Position, Url};

pub const FALLBACK: &str = "/feed";

/// Stand-in origin for resolving relative targets when the request carried
/// no `Host` header.
const NO_HOST: &str = "chrpi.invalid";

/// Where to send the user after an action, given the page they came from.
///
/// Every target is resolved against the request's origin the way a browser
/// would resolve a `Location` header, and kept only when it stays on that
/// origin. Relative targets come back as their normalized path; anything
/// else lands on the feed.
pub fn safe_redirect(target: Option<&str>, host: Option<&str>) -> String {
    let Some(target) = target.map(str::trim).filter(|t| !t.is_empty()) else {
        return FALLBACK.to_string();
    };

    // Browsers drop tabs and newlines before resolving, which turns
    // `/\t/evil.test` into `//evil.test`.
    if target.chars().any(|c| c.is_ascii_control()) {
        return FALLBACK.to_string();
    }

    let absolute = Url::parse(target).is_ok();
    if absolute && host.is_none() {
        return FALLBACK.to_string();
    }

    let Ok(base) = Url::parse(&format!("http://{}/", host.unwrap_or(NO_HOST))) else {
        return FALLBACK.to_string();
    };
    let Ok(resolved) = base.join(target) else {
        return FALLBACK.to_string();
    };

    if !matches!(resolved.scheme(), "http" | "https") || netloc(&resolved) != netloc(&base) {
        return FALLBACK.to_string();
    }

    if absolute {
        resolved.to_string()
    } else {
        resolved[Position::BeforePath..].to_string()
    }
}

fn netloc(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
