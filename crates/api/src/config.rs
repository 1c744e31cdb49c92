//! Types for use when configuring shardkv modules.

use crate::*;

/// helper transcode function
fn tc<S: serde::Serialize, D: serde::de::DeserializeOwned>(
    s: &S,
) -> SkResult<D> {
    serde_json::from_str(
        &serde_json::to_string(s)
            .map_err(|e| SkError::other_src("encode", e))?,
    )
    .map_err(|e| SkError::other_src("decode", e))
}

/// Denotes a type used to configure a specific shardkv module.
///
/// A module config is a struct with a single camelCase field named after
/// the module, wrapping the actual parameters. Multiple module configs
/// are flattened side by side into one [Config] object.
///
/// Note, the types defined in this struct are specifically for
/// configuration that cannot be changed at runtime, the likes of which
/// might be found in a configuration file.
pub trait ModConfig:
    'static
    + Sized
    + Default
    + std::fmt::Debug
    + serde::Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
{
}

/// Shardkv configuration.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config(serde_json::Map<String, serde_json::Value>);

impl Config {
    /// When shardkv is generating a default or example configuration
    /// file, it will pass a mutable reference of this config struct to
    /// the module factories that are configured to be used. Those factories
    /// should call this function to add their default parameters.
    ///
    /// Refuses to overwrite a module key that is already present.
    pub fn set_module_config<M: ModConfig>(&mut self, m: &M) -> SkResult<()> {
        let map: serde_json::Map<String, serde_json::Value> = tc(m)?;
        for (key, value) in map {
            if self.0.contains_key(&key) {
                return Err(SkError::other(format!(
                    "Refusing to overwrite conflicting module name: {key}"
                )));
            }
            self.0.insert(key, value);
        }
        Ok(())
    }

    /// Extract a module config. Note that this config may be loaded from
    /// disk and edited by humans, so module configs should be tolerant to
    /// missing properties (`#[serde(default)]`), and extraneous properties
    /// belonging to other modules are ignored.
    pub fn get_module_config<M: ModConfig>(&self) -> SkResult<M> {
        tc(&self.0)
    }
}
