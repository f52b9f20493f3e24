// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading.
//!
//! Lookup order, later layers winning: compiled defaults,
//! `/etc/chatwire/chatwire.toml`, `~/.config/chatwire/chatwire.toml`,
//! `./chatwire.toml`, then `CHATWIRE_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ChatwireConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/chatwire/chatwire.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "chatwire.toml";

/// Config sections that may be addressed from the environment.
const ENV_SECTIONS: &[&str] = &["server", "storage", "whatsapp", "ai", "pipeline", "webhook"];

/// Path of the per-user config file, if a config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chatwire").join(LOCAL_CONFIG_FILE))
}

/// Every file consulted by [`load_config`], lowest precedence first.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    paths.extend(user_config_path());
    paths.push(PathBuf::from(LOCAL_CONFIG_FILE));
    paths
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<ChatwireConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<ChatwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatwireConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file, still honouring env overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChatwireConfig, figment::Error> {
    tracing::debug!(path = %path.display(), "loading configuration file");
    Figment::new()
        .merge(Serialized::defaults(ChatwireConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The un-extracted figment behind [`load_config`].
pub fn build_figment() -> Figment {
    config_search_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(ChatwireConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// Environment provider mapping `CHATWIRE_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `CHATWIRE_WHATSAPP_APP_SECRET` lands on `whatsapp.app_secret`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("CHATWIRE_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section) {
            if let Some(field) = rest.strip_prefix('_') {
                return format!("{section}.{field}");
            }
        }
    }
    key.to_string()
}
