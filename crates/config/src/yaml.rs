// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{Context, Result};
use std::{fs, path::Path};

/// Read a yaml file and substitute `$VAR` / `${VAR}` references from the environment.
pub fn load_yaml_with_env(file_path: &Path) -> Result<String> {
    let content = fs::read_to_string(file_path)?;
    let expanded = shellexpand::env(&content)
        .with_context(|| format!("Could not expand environment in {:?}", file_path))?;
    Ok(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn substitutes_environment_variables() {
        Jail::expect_with(|jail| {
            jail.set_env("CYCLE_WINDOW", "3600");
            jail.create_file(
                "cycle.config.yaml",
                "submission_window_secs: ${CYCLE_WINDOW}\nseed: $CYCLE_WINDOW\n",
            )?;

            let processed = load_yaml_with_env(Path::new("cycle.config.yaml"))
                .map_err(|e| e.to_string())?;

            assert_eq!(processed, "submission_window_secs: 3600\nseed: 3600\n");
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_io_not_found() {
        let err = load_yaml_with_env(Path::new("/nope/cycle.config.yaml"))
            .expect_err("file should not exist");
        let io = err
            .downcast_ref::<std::io::Error>()
            .expect("io error expected");
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }
}
