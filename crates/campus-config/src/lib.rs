//! # Campus Config
//!
//! Configuration types for the Campus rules service, loaded from environment
//! variables (after `dotenvy::dotenv()` in the binaries):
//!
//! - [`server`]: bind address and repository backend
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`calendar`]: academic year boundary and calendar regeneration schedule
//!
//! # Example
//!
//! ```ignore
//! use campus_config::{CalendarConfig, CorsConfig, ServerConfig};
//!
//! let server = ServerConfig::from_env();
//! let cors = CorsConfig::from_env();
//! let calendar = CalendarConfig::from_env();
//! ```

pub mod calendar;
pub mod cors;
pub mod server;

// Re-export commonly used types at crate root
pub use calendar::CalendarConfig;
pub use cors::CorsConfig;
pub use server::{RepositoryBackend, ServerConfig};
