//! Use-case services exposed to the GUI boundary.

mod session;

pub use session::{EditorSession, SessionError, SessionResult};
