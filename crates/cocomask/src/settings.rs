// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Layered reader/writer settings.
//!
//! Settings are read from an optional TOML file and then overridden by
//! `COCOMASK_*` environment variables, with `__` separating nested keys:
//!
//! ```toml
//! [read]
//! validate = true
//! category_filter = ["banner", "blanket"]
//!
//! [write]
//! pretty = true
//! ```
//!
//! is equivalent to `COCOMASK_READ__VALIDATE=true`,
//! `COCOMASK_READ__CATEGORY_FILTER=banner,blanket` and
//! `COCOMASK_WRITE__PRETTY=true`.

use crate::{
    Error,
    coco::{CocoReadOptions, CocoWriteOptions},
};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "COCOMASK";
const FILE_NAME: &str = "cocomask.toml";

/// Reader and writer options shared by the library and the CLI.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub read: CocoReadOptions,
    pub write: CocoWriteOptions,
}

impl Settings {
    /// The per-user settings file.
    ///
    /// - Linux: `~/.config/cocomask/cocomask.toml`
    /// - macOS: `~/Library/Application Support/ai.au-zone.cocomask/cocomask.toml`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\au-zone\cocomask\config\cocomask.toml`
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("ai", "au-zone", "cocomask").map(|dirs| dirs.config_dir().join(FILE_NAME))
    }

    /// Load settings.
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// if present. Environment variables are applied on top in both cases.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                log::debug!("Loading settings from {}", path.display());
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(path) = Self::default_path() {
                    log::debug!("Loading settings from {} if present", path.display());
                    builder = builder.add_source(config::File::from(path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("read.category_filter"),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}
