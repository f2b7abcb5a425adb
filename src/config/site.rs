//! `[site]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[site]` section in fresco.toml - metadata exposed to templates as `site`.
///
/// # Example
/// ```toml
/// [site]
/// name = "Field Notes"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteMeta {
    /// Site name, available as `{{site.name}}`.
    #[serde(default = "defaults::site::name")]
    #[educe(Default = defaults::site::name())]
    pub name: String,
}
