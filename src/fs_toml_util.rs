use std::{fmt::Debug, path::PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Deserializes the TOML file at `path`; errors name the file and the target type.
pub fn read_toml<P: Into<PathBuf> + Debug, T: for<'de> Deserialize<'de>>(
    path: P,
) -> anyhow::Result<T> {
    let path = path.into();
    let context = || format!("While trying to parse {path:?} as {}", std::any::type_name::<T>());
    let text = fs_err::read_to_string(&path).with_context(context)?;
    toml::from_str(&text).with_context(context)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::read_toml;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
    }

    #[test]
    fn reads_and_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.toml");
        fs_err::write(&good, "name = \"drive\"\n").unwrap();
        let sample: Sample = read_toml(&good).unwrap();
        assert_eq!(sample.name, "drive");

        let missing = dir.path().join("missing.toml");
        let err = read_toml::<_, Sample>(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("missing.toml"));

        let broken = dir.path().join("broken.toml");
        fs_err::write(&broken, "name = \n").unwrap();
        let err = read_toml::<_, Sample>(&broken).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }
}
