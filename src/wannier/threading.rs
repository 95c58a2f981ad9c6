/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use serde::{Serialize, Deserialize};

/// A high-level control of how multiple cores are used.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Threading {
    /// Parallel loops run on the global rayon pool.
    Rayon,

    /// Everything runs on a single thread.
    Serial,
}

impl Default for Threading {
    fn default() -> Self { Threading::Rayon }
}

impl Threading {
    /// Run a closure that may contain rayon parallel iterators.
    ///
    /// Under `Serial`, the closure runs in a one-thread pool so that its
    /// parallel iterators execute sequentially.
    pub fn maybe_serial<R, F>(self, f: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self {
            Threading::Rayon => f(),
            Threading::Serial => match rayon::ThreadPoolBuilder::new().num_threads(1).build() {
                Ok(pool) => pool.install(f),
                Err(e) => {
                    warn!("could not build a serial thread pool ({}); using the global pool", e);
                    f()
                },
            },
        }
    }
}
