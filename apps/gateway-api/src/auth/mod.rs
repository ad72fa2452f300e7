pub mod session;

pub use session::{AuthedUser, CookieSessionValidator, SessionClaims, SessionValidator};
