use std::{
    collections::{BTreeMap, HashMap},
    hash::Hash,
    io,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{error, info};

use crate::errors::ServiceError;

/// JSON file holding a whole `HashMap<K, V>`.
///
/// Loading a missing file yields an empty map. Saving an empty map writes
/// nothing, so an empty store never clobbers an existing snapshot.
#[derive(Clone, Debug)]
pub struct JsonSnapshot {
    file_path: PathBuf,
}

impl JsonSnapshot {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { file_path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Read the snapshot. Any failure other than "file not found" is an error.
    pub async fn load<K, V>(&self) -> Result<HashMap<K, V>, ServiceError>
    where
        K: Eq + Hash + DeserializeOwned,
        V: DeserializeOwned,
    {
        let path = self.file_path.display().to_string();
        let bytes = match fs::read(&self.file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(op = "load", %path, "snapshot file not found, starting with an empty store");
                return Ok(HashMap::new());
            }
            Err(e) => {
                error!(op = "load", %path, error = %e, "cannot read snapshot file");
                return Err(ServiceError::persistence("load", &self.file_path, e));
            }
        };

        let map: HashMap<K, V> = serde_json::from_slice(&bytes).map_err(|e| {
            error!(op = "load", %path, bytes = bytes.len(), error = %e, "snapshot file is not a valid JSON map");
            ServiceError::persistence("load", &self.file_path, e)
        })?;

        info!(op = "load", %path, count = map.len(), "snapshot loaded");
        Ok(map)
    }

    /// Write the snapshot if `map` is non-empty. Returns whether a file was written.
    ///
    /// Output is pretty-printed with two-space indentation and sorted keys, then
    /// written to a sibling temp file which is renamed over the target.
    pub async fn save<K, V>(&self, map: &HashMap<K, V>) -> Result<bool, ServiceError>
    where
        K: Eq + Hash + Ord + Serialize,
        V: Serialize,
    {
        let path = self.file_path.display().to_string();
        if map.is_empty() {
            info!(op = "save", %path, "store is empty, snapshot not written");
            return Ok(false);
        }

        let ordered: BTreeMap<&K, &V> = map.iter().collect();
        let mut data = serde_json::to_vec_pretty(&ordered).map_err(|e| {
            error!(op = "save", %path, count = map.len(), error = %e, "cannot encode snapshot");
            ServiceError::persistence("save", &self.file_path, e)
        })?;
        data.push(b'\n');

        let tmp = self.temp_path();
        if let Err(e) = self.write_replace(&tmp, &data).await {
            let _ = fs::remove_file(&tmp).await;
            error!(op = "save", %path, count = map.len(), error = %e, "cannot write snapshot file");
            return Err(ServiceError::persistence("save", &self.file_path, e));
        }

        info!(op = "save", %path, count = map.len(), bytes = data.len(), "snapshot saved");
        Ok(true)
    }

    async fn write_replace(&self, tmp: &Path, data: &[u8]) -> io::Result<()> {
        // 残留的临时文件可能带着旧权限，mode 只在新建时生效
        match fs::remove_file(tmp).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(tmp).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(tmp, &self.file_path).await
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fruits::Fruit;

    fn temp_file(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fruits_snapshot_{tag}_{}.json", uuid::Uuid::new_v4()))
    }

    fn sample() -> HashMap<String, Fruit> {
        [
            Fruit::new("CvNlZ0F3", "apple", "red"),
            Fruit::new("h29Z90Oa", "apple", "Green"),
            Fruit::new("yJwk2_z", "watermelon", "green"),
        ]
        .into_iter()
        .map(|f| (f.id.clone(), f))
        .collect()
    }

    #[tokio::test]
    async fn save_then_load_reproduces_map() -> anyhow::Result<()> {
        let path = temp_file("roundtrip");
        let snapshot = JsonSnapshot::new(&path);
        let data = sample();

        assert!(snapshot.save(&data).await?);
        let loaded: HashMap<String, Fruit> = snapshot.load().await?;
        assert_eq!(loaded, data);

        let _ = fs::remove_file(&path).await;
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_file_is_private_even_over_a_stale_temp_file() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_file("mode");
        let snapshot = JsonSnapshot::new(&path);
        let tmp = snapshot.temp_path();
        fs::write(&tmp, b"leftover").await?;
        fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).await?;

        assert!(snapshot.save(&sample()).await?);
        let mode = fs::metadata(&path).await?.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert!(fs::metadata(&tmp).await.is_err());
        let loaded: HashMap<String, Fruit> = snapshot.load().await?;
        assert_eq!(loaded, sample());

        let _ = fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() -> anyhow::Result<()> {
        let snapshot = JsonSnapshot::new(temp_file("missing"));
        let loaded: HashMap<String, Fruit> = snapshot.load().await?;
        assert!(loaded.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn empty_save_leaves_existing_file_untouched() -> anyhow::Result<()> {
        let path = temp_file("guard");
        fs::write(&path, b"{\"keep\": {\"id\": \"keep\", \"fruit\": \"kiwi\", \"color\": \"brown\"}}").await?;
        let before = fs::read(&path).await?;

        let snapshot = JsonSnapshot::new(&path);
        let written = snapshot.save(&HashMap::<String, Fruit>::new()).await?;
        assert!(!written);
        assert_eq!(fs::read(&path).await?, before);

        let _ = fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn empty_save_does_not_create_file() -> anyhow::Result<()> {
        let path = temp_file("nocreate");
        let snapshot = JsonSnapshot::new(&path);
        assert!(!snapshot.save(&HashMap::<String, Fruit>::new()).await?);
        assert!(fs::metadata(&path).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_file_is_a_persistence_error() -> anyhow::Result<()> {
        let path = temp_file("malformed");
        fs::write(&path, b"[not a map").await?;

        let snapshot = JsonSnapshot::new(&path);
        let err = snapshot.load::<String, Fruit>().await.unwrap_err();
        assert!(matches!(err, ServiceError::Persistence { op: "load", .. }));

        let _ = fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn output_is_indented_sorted_and_unescaped() -> anyhow::Result<()> {
        let path = temp_file("format");
        let snapshot = JsonSnapshot::new(&path);
        let mut data = sample();
        data.insert("b<&>".into(), Fruit::new("b<&>", "berry & co", "<blue>"));
        snapshot.save(&data).await?;

        let text = fs::read_to_string(&path).await?;
        assert!(text.starts_with("{\n  \"CvNlZ0F3\": {\n    \"id\": \"CvNlZ0F3\",\n    \"fruit\": \"apple\","));
        assert!(text.contains("\"fruit\": \"berry & co\""));
        assert!(text.contains("\"color\": \"<blue>\""));
        assert!(text.ends_with("}\n"));
        assert!(text.find("CvNlZ0F3").unwrap() < text.find("yJwk2_z").unwrap());
        assert!(fs::metadata(snapshot.temp_path()).await.is_err());

        let _ = fs::remove_file(&path).await;
        Ok(())
    }
}
