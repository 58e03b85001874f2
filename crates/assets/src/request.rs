use crate::model::{load_model, ModelData};
use crate::AssetError;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};

type LoadResult = Result<ModelData, AssetError>;

/// One-shot background model load.
///
/// The worker thread sends exactly one result. [`ModelRequest::poll`] hands
/// it out once and returns `None` afterwards.
#[derive(Debug)]
pub struct ModelRequest {
    path: PathBuf,
    rx: Option<Receiver<LoadResult>>,
}

impl ModelRequest {
    /// Start loading `path` on a worker thread.
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::channel();
        let worker_path = path.clone();
        let spawned = std::thread::Builder::new()
            .name("model-loader".into())
            .spawn(move || {
                let result = load_model(&worker_path);
                // The receiver may already be gone if the stage was disposed.
                let _ = tx.send(result);
            });
        match spawned {
            Ok(_) => {
                tracing::debug!(path = %path.display(), "model load started");
                Self { path, rx: Some(rx) }
            }
            Err(e) => Self::resolved(path, Err(AssetError::Spawn(e))),
        }
    }

    /// A request whose result is already known.
    pub fn resolved(path: impl Into<PathBuf>, result: LoadResult) -> Self {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(result);
        Self {
            path: path.into(),
            rx: Some(rx),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the result has not been handed out yet.
    pub fn is_pending(&self) -> bool {
        self.rx.is_some()
    }

    /// Non-blocking check for the result.
    pub fn poll(&mut self) -> Option<LoadResult> {
        let rx = self.rx.as_ref()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(AssetError::LoaderDisconnected),
        };
        self.rx = None;
        Some(result)
    }

    /// Block until the result arrives.
    pub fn wait(&mut self) -> Option<LoadResult> {
        let rx = self.rx.take()?;
        Some(rx.recv().unwrap_or(Err(AssetError::LoaderDisconnected)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_hands_out_once() {
        let mut req = ModelRequest::resolved("x.glb", Err(AssetError::LoaderDisconnected));
        assert!(req.is_pending());
        assert!(matches!(req.poll(), Some(Err(AssetError::LoaderDisconnected))));
        assert!(!req.is_pending());
        assert!(req.poll().is_none());
        assert!(req.wait().is_none());
    }

    #[test]
    fn spawned_missing_file_fails() {
        let mut req = ModelRequest::spawn("/nonexistent/monkey.glb");
        assert_eq!(req.path(), Path::new("/nonexistent/monkey.glb"));
        match req.wait() {
            Some(Err(AssetError::Gltf { path, .. })) => {
                assert_eq!(path, PathBuf::from("/nonexistent/monkey.glb"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(req.poll().is_none());
    }

    #[test]
    fn poll_eventually_yields() {
        let mut req = ModelRequest::spawn("/nonexistent/monkey.glb");
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        let result = loop {
            if let Some(r) = req.poll() {
                break r;
            }
            assert!(std::time::Instant::now() < deadline, "loader never finished");
            std::thread::sleep(std::time::Duration::from_millis(5));
        };
        assert!(result.is_err());
    }
}
