//! Idempotent env-var and volume-mount merges
//!
//! Both take the collection by value and return it, so a caller cannot drop
//! the merged result by accident.

use crate::api::{Delivery, InjectableValue};
use crate::graph::{Container, EnvVar, VolumeMount};

/// Append `ev` unless an env var of the same name exists
#[must_use]
pub fn add_env_var(mut vars: Vec<EnvVar>, ev: EnvVar) -> Vec<EnvVar> {
    if !vars.iter().any(|existing| existing.name == ev.name) {
        vars.push(ev);
    }
    vars
}

/// Append `vm` unless something is already mounted at the same path
#[must_use]
pub fn add_volume_mount(mut mounts: Vec<VolumeMount>, vm: VolumeMount) -> Vec<VolumeMount> {
    if !mounts.iter().any(|existing| existing.mount_path == vm.mount_path) {
        mounts.push(vm);
    }
    mounts
}

/// Bind every value to `container` through the secret/volume named `artifact`
pub(super) fn inject_container(container: &mut Container, artifact: &str, values: &[&InjectableValue]) {
    for value in values {
        match &value.delivery {
            Delivery::Env { env_name } => {
                let ev = EnvVar::from_secret(env_name.as_str(), artifact, value.name.as_str());
                container.env = add_env_var(std::mem::take(&mut container.env), ev);
            }
            Delivery::File { mount_path } => {
                let vm = VolumeMount {
                    name: artifact.to_string(),
                    mount_path: mount_path.clone(),
                    sub_path: Some(value.name.clone()),
                    read_only: Some(true),
                };
                container.volume_mounts = add_volume_mount(std::mem::take(&mut container.volume_mounts), vm);
            }
        }
    }
}
