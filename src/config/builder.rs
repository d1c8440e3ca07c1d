//! Builder that turns load options into a validated runtime configuration.
//!
//! Sources are ingested in a fixed order, later ones overriding earlier ones
//! field by field:
//! 1. **Default** - the caller's default fragment, if any
//! 2. **Files** - `config_files` in order, directory entries sorted by name
//! 3. **Overrides** - caller supplied sources, in order
//! 4. **Literal HCL** - `hcl` strings, in order
//! 5. **Flags** - fragment derived from command line flags

use super::decode::decode_source;
use super::files::resolve_sources;
use super::merge::deep_merge_all;
use super::probes::Probes;
use super::source::{Format, Source};
use super::types::{Config, RuntimeConfig};
use super::validate::validate;
use crate::error::{ConfigError, Result};
use std::path::PathBuf;
use tracing::{debug, info};

/// Options accepted by [`Builder::new`] and [`load`].
#[derive(Debug, Clone, Default)]
pub struct LoadOpts {
    /// Relax mandatory-field validation for ephemeral runs.
    pub dev_mode: bool,
    /// Lowest priority source.
    pub default_config: Option<Source>,
    /// Config files and directories.
    pub config_files: Vec<PathBuf>,
    /// Parse every config file with this format, whatever its extension.
    pub config_format: Option<Format>,
    pub overrides: Vec<Source>,
    /// Literal HCL fragments, typically from repeated `--hcl` flags.
    pub hcl: Vec<String>,
    /// Values set by command line flags. Unset fields never override.
    pub flag_values: Config,
    /// Environment lookups used during validation.
    pub probes: Probes,
}

/// Result of a successful [`load`].
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub runtime_config: RuntimeConfig,
    /// Advisory warnings in the order they were raised.
    pub warnings: Vec<String>,
}

/// Ordered sources plus the warnings raised while collecting them.
#[derive(Debug)]
pub struct Builder {
    dev_mode: bool,
    probes: Probes,
    sources: Vec<Source>,
    warnings: Vec<String>,
}

impl Builder {
    /// Collect every source named by `opts`.
    ///
    /// Config paths are read here; a missing or unreadable path fails before
    /// anything is decoded.
    pub fn new(opts: LoadOpts) -> Result<Self> {
        let (files, warnings) = resolve_sources(&opts.config_files, opts.config_format)?;

        let mut sources = Vec::new();
        sources.extend(opts.default_config);
        sources.extend(files);
        sources.extend(opts.overrides);
        sources.extend(
            opts.hcl
                .into_iter()
                .enumerate()
                .map(|(i, data)| Source::text(format!("flags-{}.hcl", i), Format::Hcl, data)),
        );
        if !opts.flag_values.is_empty() {
            sources.push(Source::fragment("flags", opts.flag_values));
        }

        debug!("Collected {} config sources", sources.len());

        Ok(Self {
            dev_mode: opts.dev_mode,
            probes: opts.probes,
            sources,
            warnings,
        })
    }

    /// Sources in ingestion order.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Replace the environment probes before validation runs.
    pub fn set_probes(&mut self, probes: Probes) {
        self.probes = probes;
    }

    /// Decode and merge every source.
    ///
    /// Returns the merged fragment and one warning per unknown key. Does not
    /// touch the builder, so calling it twice yields the same result.
    pub fn merge(&self) -> Result<(Config, Vec<String>)> {
        let mut fragments = Vec::with_capacity(self.sources.len());
        let mut warnings = Vec::new();

        for source in &self.sources {
            debug!("Decoding config source {}", source.name());
            let mut config = decode_source(source)?;
            for key in config.unknown_keys() {
                warnings.push(format!(
                    "{}: unknown configuration key \"{}\"",
                    source.name(),
                    key
                ));
            }
            config.clear_unknown();
            let value = serde_json::to_value(&config)
                .map_err(|e| ConfigError::decode(source.name(), None, e))?;
            fragments.push(value);
        }

        let merged = serde_json::from_value(deep_merge_all(fragments))
            .map_err(|e| ConfigError::decode("merged configuration", None, e))?;
        Ok((merged, warnings))
    }

    /// Merge every source and validate the result.
    ///
    /// On success the merge and validation warnings are appended to
    /// [`Builder::warnings`] after the resolution warnings.
    pub fn build_and_validate(&mut self) -> Result<RuntimeConfig> {
        let (merged, merge_warnings) = self.merge()?;
        let (runtime, validation_warnings) = validate(merged, self.dev_mode, &self.probes)?;

        self.warnings.extend(merge_warnings);
        self.warnings.extend(validation_warnings);
        info!(
            "Configuration for node {} is valid ({} warnings)",
            runtime.node_name,
            self.warnings.len()
        );
        Ok(runtime)
    }
}

/// Build and validate a runtime configuration in one call.
pub fn load(opts: LoadOpts) -> Result<LoadResult> {
    let mut builder = Builder::new(opts)?;
    let runtime_config = builder.build_and_validate()?;
    Ok(LoadResult {
        runtime_config,
        warnings: builder.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Limits;

    fn fake_probes() -> Probes {
        Probes::system()
            .with_hostname(|| Ok("thehostname".to_string()))
            .with_private_ipv4(|| Ok(vec!["10.0.0.1".parse().unwrap()]))
            .with_public_ipv6(|| Ok(vec!["dead:beef::1".parse().unwrap()]))
            .with_resource_limit(|_| Ok(1 << 20))
    }

    #[test]
    fn test_source_order() {
        let opts = LoadOpts {
            default_config: Some(Source::text("default", Format::Hcl, "")),
            overrides: vec![
                Source::text("first", Format::Json, "{}"),
                Source::text("second", Format::Json, "{}"),
            ],
            hcl: vec!["a = 1".to_string()],
            flag_values: Config {
                node_name: Some("flag".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let builder = Builder::new(opts).unwrap();
        let names: Vec<&str> = builder.sources().iter().map(Source::name).collect();
        assert_eq!(
            names,
            vec!["default", "first", "second", "flags-0.hcl", "flags"]
        );
    }

    #[test]
    fn test_empty_flag_values_add_no_source() {
        let builder = Builder::new(LoadOpts::default()).unwrap();
        assert!(builder.sources().is_empty());
        assert!(builder.warnings().is_empty());
    }

    #[test]
    fn test_later_sources_override_per_field() {
        let opts = LoadOpts {
            default_config: Some(Source::text(
                "default",
                Format::Hcl,
                r#"
                node_name = "a"
                datacenter = "dc1"
                limits {
                    http_max_conns_per_client = 10
                    rpc_max_conns_per_client = 20
                }"#,
            )),
            overrides: vec![Source::text(
                "override",
                Format::Json,
                r#"{"node_name": "b", "limits": {"http_max_conns_per_client": 30}}"#,
            )],
            ..Default::default()
        };

        let builder = Builder::new(opts).unwrap();
        let (merged, warnings) = builder.merge().unwrap();

        assert!(warnings.is_empty());
        assert_eq!(merged.node_name.as_deref(), Some("b"));
        assert_eq!(merged.datacenter.as_deref(), Some("dc1"));
        assert_eq!(
            merged.limits,
            Some(Limits {
                http_max_conns_per_client: Some(30),
                rpc_max_conns_per_client: Some(20),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_merge_is_repeatable() {
        let opts = LoadOpts {
            overrides: vec![
                Source::text("one", Format::Json, r#"{"node_name": "x", "extra": 1}"#),
                Source::text("two", Format::Hcl, r#"datacenter = "dc9""#),
            ],
            ..Default::default()
        };
        let builder = Builder::new(opts).unwrap();
        assert_eq!(builder.merge().unwrap(), builder.merge().unwrap());
    }

    #[test]
    fn test_unknown_keys_warn_in_source_order() {
        let opts = LoadOpts {
            dev_mode: true,
            probes: fake_probes(),
            overrides: vec![
                Source::text("one.json", Format::Json, r#"{"zeta": 1, "alpha": 2}"#),
                Source::text("two.hcl", Format::Hcl, "limits {\n  burst = 5\n}"),
            ],
            ..Default::default()
        };

        let result = load(opts).unwrap();
        assert_eq!(
            result.warnings,
            vec![
                "one.json: unknown configuration key \"alpha\"".to_string(),
                "one.json: unknown configuration key \"zeta\"".to_string(),
                "two.hcl: unknown configuration key \"limits.burst\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_decode_error_stops_build() {
        let opts = LoadOpts {
            dev_mode: true,
            probes: fake_probes(),
            overrides: vec![Source::text("bad", Format::Json, "{")],
            ..Default::default()
        };
        let mut builder = Builder::new(opts).unwrap();
        let err = builder.build_and_validate().unwrap_err();
        assert!(matches!(err, ConfigError::Decode { ref name, .. } if name == "bad"));
        assert!(builder.warnings().is_empty());
    }

    #[test]
    fn test_dev_mode_does_not_change_merge() {
        let overrides = vec![Source::text("o", Format::Json, r#"{"server": false}"#)];
        let dev = Builder::new(LoadOpts {
            dev_mode: true,
            overrides: overrides.clone(),
            ..Default::default()
        })
        .unwrap();
        let prod = Builder::new(LoadOpts {
            overrides,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(dev.merge().unwrap(), prod.merge().unwrap());
    }

    #[test]
    fn test_set_probes_replaces_environment() {
        let opts = LoadOpts {
            flag_values: Config {
                data_dir: Some("dir".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut builder = Builder::new(opts).unwrap();
        builder.set_probes(fake_probes().with_hostname(|| Ok("patched".to_string())));

        let rt = builder.build_and_validate().unwrap();
        assert_eq!(rt.node_name, "patched");
        assert_eq!(rt.advertise_addr_lan, "10.0.0.1".parse::<std::net::IpAddr>().unwrap());
    }
}
