/// Number of persisted messages replayed to a newly joined connection
pub const HISTORY_LIMIT: u32 = 50;

/// Credential token validity window in days
pub const TOKEN_VALIDITY_DAYS: i64 = 7;

/// Idle time after the last keystroke before a stop-typing signal fires
pub const TYPING_IDLE: std::time::Duration = std::time::Duration::from_secs(1);

/// Default relay listen port
pub const DEFAULT_PORT: u16 = 3001;

/// Default allowed browser origin (Next.js dev server)
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Capacity of the fan-out broadcast channel
pub const EVENT_BUFFER: usize = 256;

/// Single rejection message covering every handshake failure mode
pub const AUTH_ERROR_MESSAGE: &str = "Authentication error";
