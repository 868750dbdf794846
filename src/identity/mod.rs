//! Client-side identity: bearer token decoding, the session snapshot and the manager that owns it.
//! Keep the public surface thin and split implementation across sub-modules.

mod claims;
mod clock;
mod session;
mod storage;

pub use claims::{decode_claims, Claims, TokenError};
pub use clock::{Clock, FixedClock, SystemClock};
pub use session::{is_token_expired, Session, SessionManager};
pub use storage::{FileStorage, MemoryStorage, TokenStorage, ACCESS_TOKEN_KEY};
