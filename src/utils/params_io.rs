use anyhow::Context;
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::{env, path::Path};

/// Get the command-line argument at position `pos`
pub fn take_from_args(pos: usize) -> Option<String> {
    env::args().nth(pos)
}

/// Load a config merged from files and environment variables.
/// If a file does not exist, it is skipped.
/// Environment keys use `__` as the nesting separator, e.g. `STATE_HELPER__LOGGER__LEVEL`.
pub fn load_cfg_merge<T, P>(
    paths: impl IntoIterator<Item = P>,
    env_prefix: Option<&str>,
) -> anyhow::Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let mut builder = Config::builder();

    for p in paths {
        let pb = p.as_ref().to_path_buf();
        if pb.exists() {
            builder = builder.add_source(File::from(pb));
        } else {
            tracing::warn!("config loading: file {} does not exist", pb.display());
        }
    }

    builder = match env_prefix {
        Some(prefix) => builder.add_source(
            Environment::with_prefix(prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        ),
        None => builder.add_source(Environment::default().separator("__").try_parsing(true)),
    };

    let cfg = builder
        .build()
        .with_context(|| "failed to build configuration from provided sources")?;

    let des: T = cfg
        .try_deserialize()
        .with_context(|| "failed to deserialize merged configuration")?;

    Ok(des)
}
