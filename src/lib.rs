/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Bonding descriptors from Wannier functions.
//!
//! This crate only re-exports the workspace members.

pub use wanbond_structure as structure;
pub use wanbond_wannier as wannier;
pub use wanbond_tasks_config as config;
pub use wanbond_tasks as tasks;

pub use wanbond_tasks::{
    BondingReport, Diagnostics, GlobalLogger, Inputs, ModelInput, Session, Settings,
    ValidatedSettings, YamlRead,
};
