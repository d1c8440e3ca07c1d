//! Configuration types.
//!
//! [`Config`] is the shape of one decoded fragment: every field is optional
//! so that merging can tell "not set" apart from "set". [`RuntimeConfig`] is
//! the validated result handed to the rest of the agent.

use super::duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// A single configuration fragment.
///
/// Keys the schema does not know are kept in `unknown` so they can be
/// reported as warnings. They are cleared before the fragment is merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Name of this node in the cluster. Defaults to the hostname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,

    /// Directory for persistent state. Required outside dev mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Address to bind cluster traffic to. `0.0.0.0` and `::` trigger
    /// advertise address discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_addr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertise_addr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertise_addr_wan: Option<String>,

    /// Space separated list of addresses client interfaces listen on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_addr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_expect: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Anti-entropy sync interval, as a duration string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ae_interval: Option<String>,

    /// Interval between reaps of critical checks, as a duration string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_reap_interval: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<Limits>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Ports>,

    #[serde(flatten)]
    pub unknown: BTreeMap<String, Value>,
}

/// Connection limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    /// Concurrent HTTP connections a single client IP may hold open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_max_conns_per_client: Option<u32>,

    /// Concurrent RPC connections a single client IP may hold open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_max_conns_per_client: Option<u32>,

    #[serde(flatten)]
    pub unknown: BTreeMap<String, Value>,
}

/// Listener ports. `-1` disables the DNS and HTTP listeners.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ports {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serf_lan: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serf_wan: Option<i32>,

    #[serde(flatten)]
    pub unknown: BTreeMap<String, Value>,
}

impl Config {
    /// True if this fragment sets nothing at all.
    pub fn is_empty(&self) -> bool {
        *self == Config::default()
    }

    /// Dotted paths of every key the schema did not recognize, sorted.
    pub fn unknown_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.unknown.keys().cloned().collect();
        if let Some(ref limits) = self.limits {
            keys.extend(limits.unknown.keys().map(|k| format!("limits.{}", k)));
        }
        if let Some(ref ports) = self.ports {
            keys.extend(ports.unknown.keys().map(|k| format!("ports.{}", k)));
        }
        keys.sort();
        keys
    }

    /// Drop every unrecognized key, at every level.
    pub fn clear_unknown(&mut self) {
        self.unknown.clear();
        if let Some(ref mut limits) = self.limits {
            limits.unknown.clear();
        }
        if let Some(ref mut ports) = self.ports {
            ports.unknown.clear();
        }
    }
}

/// Fully resolved and validated configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeConfig {
    pub node_name: String,
    pub node_id: Option<String>,
    pub datacenter: String,
    pub data_dir: Option<PathBuf>,
    pub dev_mode: bool,
    pub server_mode: bool,
    pub bootstrap: bool,
    pub bootstrap_expect: u32,
    pub bind_addr: IpAddr,
    pub advertise_addr_lan: IpAddr,
    pub advertise_addr_wan: IpAddr,
    pub client_addrs: Vec<IpAddr>,
    pub log_level: String,
    #[serde(serialize_with = "duration::serialize")]
    pub ae_interval: Duration,
    #[serde(serialize_with = "duration::serialize")]
    pub check_reap_interval: Duration,
    pub http_max_conns_per_client: u32,
    pub rpc_max_conns_per_client: u32,
    pub ports: RuntimePorts,
}

/// Resolved listener ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuntimePorts {
    pub dns: i32,
    pub http: i32,
    pub server: i32,
    pub serf_lan: i32,
    pub serf_wan: i32,
}
