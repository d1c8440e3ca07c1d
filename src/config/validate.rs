//! Validation of the merged fragment into a [`RuntimeConfig`].
//!
//! A straight pipeline: structural defaults, address resolution, node name
//! checks, the resource limit cross-check, then mandatory fields and the
//! remaining consistency rules. The first fatal condition ends the run and
//! whatever warnings were collected so far are dropped with it.

use super::duration::parse_duration;
use super::merge::deep_merge;
use super::probes::{Probes, ResourceKind};
use super::types::{Config, Limits, Ports, RuntimeConfig, RuntimePorts};
use crate::error::{ConfigError, Result};
use regex_lite::Regex;
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Longest node name that DNS can still serve.
pub const MAX_NODE_NAME_LENGTH: usize = 64;

/// Descriptors the agent holds open on its own, on top of client connections.
pub const FILE_DESCRIPTOR_MARGIN: u64 = 20;

static INVALID_NODE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9-]+").expect("static regex is valid"));

static VALID_DATACENTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_-]+$").expect("static regex is valid"));

/// Hard-coded values underneath every merged fragment.
pub fn default_config(dev_mode: bool) -> Config {
    Config {
        datacenter: Some("dc1".to_string()),
        bind_addr: Some(if dev_mode { "127.0.0.1" } else { "0.0.0.0" }.to_string()),
        client_addr: Some("127.0.0.1".to_string()),
        server: dev_mode.then_some(true),
        log_level: Some("INFO".to_string()),
        ae_interval: Some("1m".to_string()),
        check_reap_interval: Some("30s".to_string()),
        limits: Some(Limits {
            http_max_conns_per_client: Some(200),
            rpc_max_conns_per_client: Some(100),
            ..Default::default()
        }),
        ports: Some(Ports {
            dns: Some(8600),
            http: Some(8500),
            server: Some(8300),
            serf_lan: Some(8301),
            serf_wan: Some(8302),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Validate a merged fragment against the environment.
///
/// Returns the runtime configuration and the advisory warnings raised while
/// producing it.
pub fn validate(
    merged: Config,
    dev_mode: bool,
    probes: &Probes,
) -> Result<(RuntimeConfig, Vec<String>)> {
    Validator {
        dev_mode,
        probes,
        warnings: Vec::new(),
    }
    .run(merged)
}

struct Validator<'a> {
    dev_mode: bool,
    probes: &'a Probes,
    warnings: Vec<String>,
}

impl Validator<'_> {
    fn warn(&mut self, msg: String) {
        warn!("{}", msg);
        self.warnings.push(msg);
    }

    fn run(mut self, merged: Config) -> Result<(RuntimeConfig, Vec<String>)> {
        let config = apply_defaults(merged, self.dev_mode)?;
        let limits = config.limits.clone().unwrap_or_default();
        let ports = config.ports.clone().unwrap_or_default();
        let ae_interval = duration_field("ae_interval", config.ae_interval.as_deref())?;
        let check_reap_interval =
            duration_field("check_reap_interval", config.check_reap_interval.as_deref())?;

        let bind_addr = ip_field("bind_addr", config.bind_addr.as_deref().unwrap_or_default())?;
        let advertise_addr_lan = match config.advertise_addr.as_deref() {
            Some(addr) => advertise_field("advertise_addr", addr)?,
            None => self.discover_advertise_addr(bind_addr)?,
        };
        let advertise_addr_wan = match config.advertise_addr_wan.as_deref() {
            Some(addr) => advertise_field("advertise_addr_wan", addr)?,
            None => advertise_addr_lan,
        };
        let client_addrs = config
            .client_addr
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(|addr| ip_field("client_addr", addr))
            .collect::<Result<Vec<_>>>()?;

        let node_name = self.node_name(config.node_name.as_deref())?;

        let http_max_conns_per_client = limits.http_max_conns_per_client.unwrap_or_default();
        self.check_open_files(
            "limits.http_max_conns_per_client",
            http_max_conns_per_client,
        )?;

        let data_dir = self.data_dir(config.data_dir.as_deref())?;
        let datacenter = datacenter_field(config.datacenter.as_deref().unwrap_or_default())?;
        let server_mode = config.server.unwrap_or(false);
        let bootstrap = config.bootstrap.unwrap_or(false);
        let bootstrap_expect = config.bootstrap_expect.unwrap_or(0);
        self.check_bootstrap(server_mode, bootstrap, bootstrap_expect)?;

        let ports = RuntimePorts {
            dns: port_field("dns", ports.dns, true)?,
            http: port_field("http", ports.http, true)?,
            server: port_field("server", ports.server, false)?,
            serf_lan: port_field("serf_lan", ports.serf_lan, false)?,
            serf_wan: port_field("serf_wan", ports.serf_wan, false)?,
        };

        let runtime = RuntimeConfig {
            node_name,
            node_id: config.node_id.filter(|id| !id.is_empty()),
            datacenter,
            data_dir,
            dev_mode: self.dev_mode,
            server_mode,
            bootstrap,
            bootstrap_expect,
            bind_addr,
            advertise_addr_lan,
            advertise_addr_wan,
            client_addrs,
            log_level: config.log_level.unwrap_or_default(),
            ae_interval,
            check_reap_interval,
            http_max_conns_per_client,
            rpc_max_conns_per_client: limits.rpc_max_conns_per_client.unwrap_or_default(),
            ports,
        };

        Ok((runtime, self.warnings))
    }

    fn discover_advertise_addr(&self, bind_addr: IpAddr) -> Result<IpAddr> {
        match bind_addr {
            IpAddr::V4(ip) if ip.is_unspecified() => {
                debug!("Bind address is unspecified, looking up private IPv4 addresses");
                single_addr("private IPv4", self.probes.private_ipv4())
            }
            IpAddr::V6(ip) if ip.is_unspecified() => {
                debug!("Bind address is unspecified, looking up public IPv6 addresses");
                single_addr("public IPv6", self.probes.public_ipv6())
            }
            addr => Ok(addr),
        }
    }

    fn node_name(&mut self, configured: Option<&str>) -> Result<String> {
        let name = match configured.filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => {
                debug!("node_name not set, using hostname");
                self.probes
                    .hostname()
                    .map_err(|e| ConfigError::validation(format!("node_name: {}", e)))?
            }
        };

        if name.is_empty() {
            return Err(ConfigError::validation("node_name cannot be empty"));
        }

        if INVALID_NODE_NAME.is_match(&name) {
            self.warn(format!(
                "Node name \"{}\" will not be discoverable via DNS due to invalid characters. \
                 Valid characters include all alpha-numerics and dashes.",
                name
            ));
        }
        if name.chars().count() > MAX_NODE_NAME_LENGTH {
            self.warn(format!(
                "Node name \"{}\" will not be discoverable via DNS due to it being too long. \
                 Valid lengths are between 1 and {} characters.",
                name, MAX_NODE_NAME_LENGTH
            ));
        }

        Ok(name)
    }

    fn check_open_files(&self, field: &str, conns: u32) -> Result<()> {
        if conns == 0 {
            return Ok(());
        }

        debug!("Looking up the open file descriptor limit for {}", field);
        let ceiling = match self.probes.resource_limit(ResourceKind::OpenFiles) {
            Ok(ceiling) => ceiling,
            Err(e) => {
                debug!("Skipping {} check, file descriptor limit unknown: {}", field, e);
                return Ok(());
            }
        };

        let required = u64::from(conns) + FILE_DESCRIPTOR_MARGIN;
        if ceiling < required {
            return Err(ConfigError::validation(format!(
                "system allows a max of {} file descriptors, but {}: {} needs at least {}",
                ceiling, field, conns, required
            )));
        }
        Ok(())
    }

    fn data_dir(&self, configured: Option<&str>) -> Result<Option<PathBuf>> {
        let Some(dir) = configured.filter(|d| !d.is_empty()) else {
            if self.dev_mode {
                return Ok(None);
            }
            return Err(ConfigError::validation("data_dir cannot be empty"));
        };

        let path = PathBuf::from(dir);
        if let Ok(meta) = std::fs::metadata(&path)
            && !meta.is_dir()
        {
            return Err(ConfigError::validation(format!(
                "data_dir \"{}\" is not a directory",
                dir
            )));
        }
        Ok(Some(path))
    }

    fn check_bootstrap(&mut self, server_mode: bool, bootstrap: bool, expect: u32) -> Result<()> {
        if bootstrap && !server_mode {
            return Err(ConfigError::validation(
                "'bootstrap = true' requires 'server = true'",
            ));
        }
        if expect > 0 && !server_mode {
            return Err(ConfigError::validation(
                "'bootstrap_expect > 0' requires 'server = true'",
            ));
        }
        if bootstrap && expect > 0 {
            return Err(ConfigError::validation(
                "'bootstrap_expect > 0' and 'bootstrap = true' are mutually exclusive",
            ));
        }

        if !self.dev_mode {
            if bootstrap {
                self.warn("bootstrap = true: do not enable unless necessary".to_string());
            }
            if expect == 1 {
                self.warn(
                    "bootstrap_expect = 1: A single server will never be able to recover from failure"
                        .to_string(),
                );
            }
        }
        Ok(())
    }
}

fn apply_defaults(merged: Config, dev_mode: bool) -> Result<Config> {
    let internal = |e: serde_json::Error| ConfigError::validation(format!("applying defaults: {}", e));
    let base = serde_json::to_value(default_config(dev_mode)).map_err(internal)?;
    let overlay = serde_json::to_value(merged).map_err(internal)?;
    serde_json::from_value(deep_merge(base, overlay)).map_err(internal)
}

fn duration_field(field: &str, value: Option<&str>) -> Result<std::time::Duration> {
    parse_duration(value.unwrap_or("0"))
        .map_err(|e| ConfigError::validation(format!("{}: {}", field, e)))
}

fn ip_field(field: &str, value: &str) -> Result<IpAddr> {
    value.parse().map_err(|_| {
        ConfigError::validation(format!("{}: invalid IP address \"{}\"", field, value))
    })
}

fn advertise_field(field: &str, value: &str) -> Result<IpAddr> {
    let ip = ip_field(field, value)?;
    if ip.is_unspecified() {
        return Err(ConfigError::validation(
            "Advertise address cannot be 0.0.0.0, :: or [::]",
        ));
    }
    Ok(ip)
}

fn single_addr(kind: &str, found: io::Result<Vec<IpAddr>>) -> Result<IpAddr> {
    let addrs = found.map_err(|e| {
        ConfigError::validation(format!("Error detecting {} address: {}", kind, e))
    })?;
    match addrs.as_slice() {
        [] => Err(ConfigError::validation(format!("No {} address found", kind))),
        [addr] => Ok(*addr),
        _ => Err(ConfigError::validation(format!(
            "Multiple {} addresses found. Please configure one with 'bind' and/or 'advertise'.",
            kind
        ))),
    }
}

fn datacenter_field(value: &str) -> Result<String> {
    let dc = value.to_lowercase();
    if dc.is_empty() {
        return Err(ConfigError::validation("datacenter cannot be empty"));
    }
    if !VALID_DATACENTER.is_match(&dc) {
        return Err(ConfigError::validation(format!(
            "datacenter: invalid datacenter \"{}\". Please use only [a-z0-9-_]",
            dc
        )));
    }
    Ok(dc)
}

fn port_field(name: &str, value: Option<i32>, may_disable: bool) -> Result<i32> {
    let port = value.unwrap_or_default();
    if (1..=65535).contains(&port) || (may_disable && port == -1) {
        Ok(port)
    } else {
        Err(ConfigError::validation(format!(
            "ports.{}: invalid port {}",
            name, port
        )))
    }
}
