// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sizing of the rayon global thread pool.

use std::env;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Environment variable holding the number of worker threads.
pub const THREADS_ENV_VAR: &str = "STEREO_DEPTH_THREADS";

static THREAD_POOL_INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// Build the rayon global pool with `STEREO_DEPTH_THREADS` threads.
///
/// Only the first call has an effect. Without the variable,
/// rayon picks its default number of threads.
pub fn init_global_thread_pool() -> Result<()> {
    THREAD_POOL_INIT
        .get_or_init(|| {
            let Some(num_threads) = read_threads_from_env().map_err(|e| e.to_string())? else {
                return Ok(());
            };
            log::info!("Using {} worker threads", num_threads);
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .map_err(|e| {
                    format!(
                        "failed to initialize global thread pool with \
                         {THREADS_ENV_VAR}={num_threads}: {e}"
                    )
                })
        })
        .as_ref()
        .map_err(|e| Error::InvalidParameters(e.clone()))?;
    Ok(())
}

fn read_threads_from_env() -> Result<Option<usize>> {
    match env::var(THREADS_ENV_VAR) {
        Ok(raw) => parse_thread_count(&raw).map(Some),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::InvalidParameters(format!(
            "failed to read {THREADS_ENV_VAR}: {e}"
        ))),
    }
}

/// Parse a strictly positive number of threads.
pub fn parse_thread_count(raw: &str) -> Result<usize> {
    let parsed: usize = raw.trim().parse().map_err(|_| {
        Error::InvalidParameters(format!(
            "{THREADS_ENV_VAR} must be a positive integer, got '{raw}'"
        ))
    })?;
    if parsed == 0 {
        return Err(Error::InvalidParameters(format!(
            "{THREADS_ENV_VAR} must be >= 1"
        )));
    }
    Ok(parsed)
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn thread_count() {
        assert_eq!(parse_thread_count("4").unwrap(), 4);
        assert_eq!(parse_thread_count(" 2\n").unwrap(), 2);
        assert!(parse_thread_count("0").is_err());
        assert!(parse_thread_count("-1").is_err());
        assert!(parse_thread_count("many").is_err());
    }
}
