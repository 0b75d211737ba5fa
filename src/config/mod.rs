pub mod params;
pub mod schema;

pub use params::{ParamDef, Params};
pub use schema::{ApiConfig, BrowserConfig, Config, HttpAuth, TestUser, Timeouts, Viewport};
