pub mod handlers;
pub mod oauth;
pub mod session;
pub mod validation;
