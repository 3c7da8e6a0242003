//! Resolves a partially specified Kubernetes cluster model into a complete
//! one.
//!
//! The entry point is [`defaults::set_properties_defaults`], which runs the
//! defaulting pipeline over a [`model::ClusterModel`] in a fixed order:
//!
//! 1. custom cloud profile resolution (see [`cloud`])
//! 2. orchestrator version and network defaults (see [`orchestrator`])
//! 3. version catalog lookup (see [`catalog`])
//! 4. addon and component reconciliation (see [`addons`] and [`components`])
//! 5. kubelet and control plane flag maps (see [`kubelet`] and [`control_plane`])
//! 6. certificate bootstrap (see [`certs`])
//!
//! Every reconciliation step is a total function: malformed user input is
//! replaced by a safe default instead of producing an error. The only fallible
//! steps are the custom cloud metadata lookup, static IP parsing and the
//! calls into the PKI helper.
pub mod addons;
pub mod catalog;
pub mod certs;
pub mod cloud;
pub mod components;
pub mod constants;
pub mod control_plane;
pub mod defaults;
pub mod feature_gates;
pub mod flag_map;
pub mod kubelet;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod sysctld;
pub mod version;

pub use defaults::{DefaultsParams, set_properties_defaults};
