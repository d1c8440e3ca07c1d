//! CLI definitions for agent-config
//!
//! This module defines the CLI structure using clap's derive macros.
//! Flags that describe the agent are turned into the flag-derived fragment,
//! which has the highest priority during merge.

use crate::config::{Config, Format, LoadOpts, Probes};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Build, validate and inspect agent configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file or directory to load (repeatable)
    #[arg(long = "config-file", value_name = "PATH", global = true)]
    pub config_files: Vec<PathBuf>,

    /// Config directory to load (repeatable, after --config-file)
    #[arg(long = "config-dir", value_name = "PATH", global = true)]
    pub config_dirs: Vec<PathBuf>,

    /// Parse every config file as this format (hcl or json)
    #[arg(long, global = true)]
    pub config_format: Option<Format>,

    /// Literal HCL fragment (repeatable)
    #[arg(long, value_name = "TEXT", global = true)]
    pub hcl: Vec<String>,

    /// Development mode: data_dir is not required
    #[arg(long, global = true)]
    pub dev: bool,

    /// Node name (defaults to the hostname)
    #[arg(long = "node", global = true)]
    pub node_name: Option<String>,

    /// Directory for persistent state
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[arg(long, global = true)]
    pub datacenter: Option<String>,

    /// Address to bind cluster traffic to
    #[arg(long, global = true)]
    pub bind: Option<String>,

    /// Address advertised to the rest of the cluster
    #[arg(long, global = true)]
    pub advertise: Option<String>,

    /// Run in server mode
    #[arg(long, global = true)]
    pub server: bool,

    #[arg(long, global = true)]
    pub bootstrap: bool,

    #[arg(long, global = true)]
    pub bootstrap_expect: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Load and validate the configuration (default if no subcommand given)
    Validate,

    /// Load the configuration and print it as JSON
    Show,
}

impl Cli {
    /// Fragment holding only the values set on the command line.
    pub fn flag_values(&self) -> Config {
        Config {
            node_name: self.node_name.clone(),
            data_dir: self.data_dir.clone(),
            datacenter: self.datacenter.clone(),
            bind_addr: self.bind.clone(),
            advertise_addr: self.advertise.clone(),
            server: self.server.then_some(true),
            bootstrap: self.bootstrap.then_some(true),
            bootstrap_expect: self.bootstrap_expect,
            ..Default::default()
        }
    }

    /// Load options for this invocation, using the real environment.
    pub fn load_opts(&self) -> LoadOpts {
        LoadOpts {
            dev_mode: self.dev,
            default_config: None,
            config_files: self
                .config_files
                .iter()
                .chain(&self.config_dirs)
                .cloned()
                .collect(),
            config_format: self.config_format,
            overrides: Vec::new(),
            hcl: self.hcl.clone(),
            flag_values: self.flag_values(),
            probes: Probes::system(),
        }
    }
}
