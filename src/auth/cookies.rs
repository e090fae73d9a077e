use axum::http::{header, HeaderMap};

pub const FLASH_COOKIE: &str = "chrpi_flash";
pub const CAPTCHA_COOKIE: &str = "chrpi_captcha";

pub fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

pub fn clear_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

pub fn captcha_cookie(id: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/register; Max-Age=600",
        CAPTCHA_COOKIE, id
    )
}

/// Notice shown once on the next rendered page.
pub fn flash_cookie(message: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(message.as_bytes()).collect();
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age=60",
        FLASH_COOKIE, encoded
    )
}

pub fn decode_flash(raw: &str) -> String {
    url::form_urlencoded::parse(format!("m={}", raw).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

pub fn get_cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_named_cookie_among_many() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("a=1; chrpi_session=abc; b=2"),
        );
        assert_eq!(get_cookie_value(&headers, "chrpi_session"), Some("abc"));
        assert_eq!(get_cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_value_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("chrpi_flash="));
        assert_eq!(get_cookie_value(&headers, FLASH_COOKIE), None);
    }

    #[test]
    fn flash_round_trips_unicode_and_separators() {
        let message = "Registered. Please log in; thanks! 😊";
        let cookie = flash_cookie(message);
        let value = cookie
            .strip_prefix("chrpi_flash=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        assert!(!value.contains(';') && !value.contains(' '));
        assert_eq!(decode_flash(value), message);
    }
}
