use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::models::GeoPoint;
use crate::trails::{TrailError, read_traces, read_traces_from_path};

const GPX_EXTENSION: &str = "gpx";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("trail directory error: {0}")]
    Io(#[from] io::Error),
    #[error("trail {name} is unreadable: {source}")]
    Trail {
        name: String,
        #[source]
        source: TrailError,
    },
    #[error("uploaded file is not a valid GPX document: {0}")]
    InvalidUpload(TrailError),
    #[error("invalid trail name: {0}")]
    InvalidName(String),
    #[error("trail not found: {0}")]
    NotFound(String),
}

/// A directory of GPX recordings.
#[derive(Debug, Clone)]
pub struct TrailStore {
    dir: PathBuf,
}

impl TrailStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// GPX files in the directory, sorted by file name.
    pub fn trail_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_gpx_extension(path))
            .collect();
        files.sort();
        Ok(files)
    }

    pub fn trail_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .trail_files()?
            .iter()
            .filter_map(|path| path.file_name()?.to_str().map(str::to_owned))
            .collect())
    }

    /// Every track segment of every stored trail, file by file.
    pub fn load_traces(&self) -> Result<Vec<Vec<GeoPoint>>, StoreError> {
        let mut traces = Vec::new();
        for path in self.trail_files()? {
            let file_traces = read_traces_from_path(&path).map_err(|source| StoreError::Trail {
                name: path.display().to_string(),
                source,
            })?;
            tracing::debug!("loaded {} trace(s) from {}", file_traces.len(), path.display());
            traces.extend(file_traces);
        }
        Ok(traces)
    }

    /// Store an uploaded GPX document as `trail{N}.gpx` and return its name.
    ///
    /// N starts at the number of stored trails plus one and moves up until
    /// the name is free.
    pub fn save_gpx(&self, bytes: &[u8]) -> Result<String, StoreError> {
        read_traces(bytes).map_err(StoreError::InvalidUpload)?;

        let mut n = self.trail_files()?.len() + 1;
        loop {
            let name = format!("trail{n}.{GPX_EXTENSION}");
            let path = self.dir.join(&name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    write_or_remove(&path, file, bytes)?;
                    tracing::info!("saved uploaded trail as {}", path.display());
                    return Ok(name);
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Raw bytes of a stored trail.
    pub fn read_gpx(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let valid = !name.is_empty()
            && !name.contains(['/', '\\'])
            && !name.starts_with('.')
            && has_gpx_extension(Path::new(name));
        if !valid {
            return Err(StoreError::InvalidName(name.to_owned()));
        }

        match fs::read(self.dir.join(name)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_owned()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Write a freshly created file in full, or take it off disk again so a
/// partial upload is never listed as a trail.
fn write_or_remove(path: &Path, mut file: impl Write, bytes: &[u8]) -> io::Result<()> {
    let written = file.write_all(bytes).and_then(|()| file.flush());
    drop(file);
    if let Err(err) = written {
        if let Err(cleanup) = fs::remove_file(path) {
            tracing::warn!("could not remove partial upload {}: {cleanup}", path.display());
        }
        return Err(err);
    }
    Ok(())
}

fn has_gpx_extension(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(GPX_EXTENSION)
}
