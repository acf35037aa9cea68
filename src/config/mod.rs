//! Configuration layering: builtin defaults → host config → repo config
//! → CLI overrides, merged over `serde_json::Value` with provenance.

mod defaults;
mod effective;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{deep_merge, merge_layers};
