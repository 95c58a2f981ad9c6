/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! High-level code: one [`Session`] turns settings and a Wannier model into a
//! [`BondingReport`].

#[macro_use] extern crate log;
#[cfg(test)] #[macro_use] extern crate wanbond_assert_close;

pub type FailResult<T> = Result<T, failure::Error>;

mod logging;
mod report;
mod session;

pub use crate::logging::{GlobalLogger, ColorizedLevel};
pub use crate::report::{BondingReport, BwdfReport, Diagnostics};
pub use crate::session::{Inputs, ModelInput, Session};

pub use wanbond_tasks_config::{Settings, ValidatedSettings, YamlRead};
