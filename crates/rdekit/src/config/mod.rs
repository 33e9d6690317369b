pub mod loader;
pub mod schema;

pub use loader::{load_config, parse_config_file};
pub use schema::{
    Config, ExtendedMode, MultiDataTileSettings, SmartTableSettings, SystemSettings,
    TracebackFormat, TracebackSettings,
};
