//! Player profile persistence: one JSON file per player.

use std::path::PathBuf;

use ember_net::{Profile, ProfileError, ProfileStore};
use tracing::{debug, warn};

pub struct JsonProfileStore {
    dir: PathBuf,
}

impl JsonProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Names are matched case-insensitively, so files are keyed by the lowercased name.
    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name.to_lowercase()))
    }
}

impl ProfileStore for JsonProfileStore {
    fn load_profile(&self, name: &str) -> Result<Option<Profile>, ProfileError> {
        let path = self.path_for(name);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&data) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!("Failed to parse profile {}: {e}", path.display());
                Err(e.into())
            }
        }
    }

    fn save_profile(&self, profile: &Profile) -> Result<(), ProfileError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&profile.name);
        let json = serde_json::to_string_pretty(profile)?;
        // Write then rename; readers never see a partial file.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        debug!("Saved profile of {} to {}", profile.name, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_net::Identity;
    use ember_proto::types::Position;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("ember_profiles_{}", rand::random::<u64>()))
    }

    #[test]
    fn profile_roundtrip() {
        let dir = temp_dir();
        let store = JsonProfileStore::new(&dir);

        let identity = Identity::offline("Notch");
        let mut profile = Profile::new(&identity, "world", Position::new(10.5, 65.0, -3.5), 1);
        profile.touch_login();
        store.save_profile(&profile).unwrap();

        assert!(dir.join("notch.json").exists());
        let loaded = store.load_profile("NOTCH").unwrap().unwrap();
        assert_eq!(loaded, profile);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_profile_is_none() {
        let store = JsonProfileStore::new(temp_dir());
        assert!(store.load_profile("nobody").unwrap().is_none());
    }

    #[test]
    fn malformed_profile_is_an_error() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("broken.json"), "{ not json").unwrap();
        let store = JsonProfileStore::new(&dir);
        assert!(matches!(
            store.load_profile("Broken"),
            Err(ProfileError::Format(_))
        ));
        std::fs::remove_dir_all(&dir).ok();
    }
}
