//! Command line flags of the control plane processes.
//!
//! Every builder follows the same recipe: the user's flags are filled with
//! the defaults of the process, then its static flags are applied on top, so
//! that user input can never change them. Blank user values count as unset,
//! and blank results are dropped.
use tracing::{debug, instrument};

use crate::{
    flag_map::{FlagMap, drop_empty, fill_absent, overlay},
    model::ClusterModel,
};

mod apiserver;
mod cloud_controller_manager;
mod controller_manager;
mod scheduler;

pub use apiserver::apiserver_flags;
pub use cloud_controller_manager::cloud_controller_manager_flags;
pub use controller_manager::controller_manager_flags;
pub use scheduler::scheduler_flags;

/// Resolves the flags of all control plane processes in place.
#[instrument(name = "set_control_plane_config", skip_all, fields(location = %model.location))]
pub fn set_control_plane_config(model: &mut ClusterModel) {
    let properties = &model.properties;

    let controller_manager = controller_manager_flags(properties);
    let cloud_controller_manager = cloud_controller_manager_flags(properties);
    let apiserver = apiserver_flags(properties, &model.location);
    let scheduler = scheduler_flags(properties);

    debug!(
        control_plane.apiserver_flags = apiserver.len(),
        control_plane.controller_manager_flags = controller_manager.len(),
        control_plane.cloud_controller_manager_flags = cloud_controller_manager.len(),
        control_plane.scheduler_flags = scheduler.len(),
        "resolved control plane flags"
    );

    let config = &mut model.properties.orchestrator_profile.kubernetes_config;
    config.controller_manager_config = controller_manager;
    config.cloud_controller_manager_config = cloud_controller_manager;
    config.apiserver_config = apiserver;
    config.scheduler_config = scheduler;
}

/// Fills `user` from `defaults` and applies `statics` on top.
fn merge(user: &FlagMap, defaults: &FlagMap, statics: &FlagMap) -> FlagMap {
    overlay(&fill_absent(&drop_empty(user), defaults), statics)
}
