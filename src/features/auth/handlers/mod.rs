pub mod session_handler;

pub use session_handler::{get_session, sign_out, SignOutResponseDto};
