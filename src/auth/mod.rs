pub mod captcha;
pub mod cookies;
pub mod redirect;
pub mod session;
