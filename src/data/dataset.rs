//! Paired-sample dataset backed by a directory of `.npy` tensor files
//!
//! Each file holds one paired sample of shape `[S, S, C_in + C_out]`:
//! the source spectrogram in the leading channels, the target in the rest.
//! Files are discovered once at open; per-epoch ordering is reshuffled by
//! the caller via `shuffled_files`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use tch::{Kind, Tensor};

/// Dataset of paired source/target spectrogram tensors
pub struct PairedDataset {
    dir: PathBuf,
    files: Vec<PathBuf>,
    image_size: i64,
    input_c_dim: i64,
    output_c_dim: i64,
}

impl PairedDataset {
    /// Open the dataset at `{root}/{name}`.
    ///
    /// Fails when the directory is missing or contains no `.npy` files:
    /// no valid batch could ever be formed from it.
    pub fn open(
        root: &Path,
        name: &str,
        image_size: i64,
        input_c_dim: i64,
        output_c_dim: i64,
    ) -> Result<Self> {
        Self::from_dir(&root.join(name), image_size, input_c_dim, output_c_dim)
    }

    /// Open a dataset directly from a directory of `.npy` files.
    pub fn from_dir(
        dir: &Path,
        image_size: i64,
        input_c_dim: i64,
        output_c_dim: i64,
    ) -> Result<Self> {
        let dir = dir.to_path_buf();
        let files = list_npy_files(&dir)
            .with_context(|| format!("failed to read dataset directory {}", dir.display()))?;

        if files.is_empty() {
            bail!("dataset directory {} contains no .npy files", dir.display());
        }

        Ok(Self {
            dir,
            files,
            image_size,
            input_c_dim,
            output_c_dim,
        })
    }

    /// Number of paired samples.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when the dataset holds no samples (never after `open` succeeds).
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Dataset directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Channels expected per sample file.
    pub fn pair_channels(&self) -> i64 {
        self.input_c_dim + self.output_c_dim
    }

    /// Freshly shuffled file ordering for one epoch.
    pub fn shuffled_files(&self) -> Vec<PathBuf> {
        let mut files = self.files.clone();
        files.shuffle(&mut rand::thread_rng());
        files
    }

    /// Full batches per epoch, truncating the remainder.
    pub fn num_batches(&self, batch_size: usize, train_size: usize) -> usize {
        self.len().min(train_size) / batch_size
    }

    /// Load one paired sample, validating its shape against the
    /// configured resolution and channel split.
    pub fn load_sample(&self, path: &Path) -> Result<Tensor> {
        let tensor = Tensor::read_npy(path)
            .with_context(|| format!("failed to read tensor file {}", path.display()))?
            .to_kind(Kind::Float);

        let expected = [self.image_size, self.image_size, self.pair_channels()];
        let size = tensor.size();
        if size != expected {
            bail!(
                "sample {} has shape {:?}, expected {:?} \
                 ([output_size, output_size, input_c_dim + output_c_dim])",
                path.display(),
                size,
                expected
            );
        }

        Ok(tensor)
    }

    /// Load and stack a batch of paired samples along a new leading axis.
    pub fn load_batch(&self, files: &[PathBuf]) -> Result<Tensor> {
        if files.is_empty() {
            bail!("cannot assemble a batch from zero files");
        }

        let samples = files
            .iter()
            .map(|f| self.load_sample(f))
            .collect::<Result<Vec<_>>>()?;

        Ok(Tensor::stack(&samples, 0))
    }

    /// Randomly chosen batch, used by the sampler during training.
    pub fn random_batch(&self, batch_size: usize) -> Result<Tensor> {
        let mut rng = rand::thread_rng();
        let picks: Vec<PathBuf> = (0..batch_size)
            .filter_map(|_| self.files.choose(&mut rng).cloned())
            .collect();
        self.load_batch(&picks)
    }
}

/// List `.npy` files in a directory, sorted by name for determinism.
pub fn list_npy_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "npy").unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

/// Test-set ordering: files named `{n}.npy`, sorted by the integer `n`.
///
/// Files whose stem is not an integer are skipped with a warning.
pub fn numeric_sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut indexed: Vec<(i64, PathBuf)> = list_npy_files(dir)?
        .into_iter()
        .filter_map(|p| {
            let stem = p.file_stem()?.to_str()?.to_string();
            match stem.parse::<i64>() {
                Ok(n) => Some((n, p)),
                Err(_) => {
                    tracing::warn!("skipping non-numeric test file {}", p.display());
                    None
                }
            }
        })
        .collect();
    indexed.sort_by_key(|(n, _)| *n);
    Ok(indexed.into_iter().map(|(_, p)| p).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;
    use tempfile::TempDir;

    fn write_sample(dir: &Path, name: &str, size: i64, channels: i64) {
        let t = Tensor::randn([size, size, channels], (Kind::Float, Device::Cpu));
        t.write_npy(dir.join(name)).unwrap();
    }

    fn make_dataset(tmp: &TempDir, count: usize) -> PairedDataset {
        let dir = tmp.path().join("mix");
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..count {
            write_sample(&dir, &format!("pair_{i}.npy"), 16, 2);
        }
        PairedDataset::open(tmp.path(), "mix", 16, 1, 1).unwrap()
    }

    #[test]
    fn test_empty_directory_is_fatal() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("mix")).unwrap();
        let result = PairedDataset::open(tmp.path(), "mix", 16, 1, 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let tmp = TempDir::new().unwrap();
        assert!(PairedDataset::open(tmp.path(), "nope", 16, 1, 1).is_err());
    }

    #[test]
    fn test_batch_shape() {
        let tmp = TempDir::new().unwrap();
        let dataset = make_dataset(&tmp, 3);

        let files = dataset.shuffled_files();
        let batch = dataset.load_batch(&files[..2]).unwrap();
        assert_eq!(batch.size(), vec![2, 16, 16, 2]);
    }

    #[test]
    fn test_shape_mismatch_fails_fast() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("mix");
        std::fs::create_dir_all(&dir).unwrap();
        write_sample(&dir, "bad.npy", 8, 2);

        let dataset = PairedDataset::open(tmp.path(), "mix", 16, 1, 1).unwrap();
        let err = dataset
            .load_batch(&dataset.shuffled_files())
            .unwrap_err()
            .to_string();
        assert!(err.contains("expected"), "unhelpful error: {err}");
    }

    #[test]
    fn test_num_batches_truncates() {
        let tmp = TempDir::new().unwrap();
        let dataset = make_dataset(&tmp, 7);

        assert_eq!(dataset.num_batches(2, usize::MAX), 3);
        // Train-size cap applies before batching.
        assert_eq!(dataset.num_batches(2, 4), 2);
        assert_eq!(dataset.num_batches(8, usize::MAX), 0);
    }

    #[test]
    fn test_random_batch() {
        let tmp = TempDir::new().unwrap();
        let dataset = make_dataset(&tmp, 3);

        let batch = dataset.random_batch(2).unwrap();
        assert_eq!(batch.size(), vec![2, 16, 16, 2]);
    }

    #[test]
    fn test_numeric_sorted_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        for name in ["10.npy", "2.npy", "1.npy", "notes.npy"] {
            write_sample(&dir, name, 4, 1);
        }

        let ordered = numeric_sorted_files(&dir).unwrap();
        let stems: Vec<String> = ordered
            .iter()
            .map(|p| p.file_stem().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(stems, vec!["1", "2", "10"]);
    }
}
