use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use headcount_core::detection::infrastructure::model_resolver;
use headcount_core::detection::infrastructure::onnx_yolo_detector::{load_session, SharedSession};
use headcount_core::shared::constants::{MODEL_URL_ENV, YOLO_MODEL_NAME};

/// A model session loaded once and shared by every detection session.
#[derive(Clone)]
pub struct LoadedModel {
    pub session: SharedSession,
    pub input_size: u32,
    pub path: PathBuf,
}

#[derive(Clone)]
pub enum ModelState {
    Loading { downloaded: u64, total: u64 },
    Ready(LoadedModel),
    Failed(String),
}

/// Resolves and loads the detection model on a background thread at
/// startup. The UI polls [`ModelCache::state`]; workers block in
/// [`ModelCache::wait`].
pub struct ModelCache {
    result: Mutex<Option<Result<LoadedModel, String>>>,
    ready: Condvar,
    progress: Mutex<(u64, u64)>,
}

impl ModelCache {
    pub fn new() -> Arc<Self> {
        let cache = Arc::new(Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
            progress: Mutex::new((0, 0)),
        });

        let worker = cache.clone();
        thread::spawn(move || {
            let loaded = worker.load();
            if let Err(e) = &loaded {
                log::error!("Model unavailable: {e}");
            }
            if let Ok(mut slot) = worker.result.lock() {
                *slot = Some(loaded);
            }
            worker.ready.notify_all();
        });

        cache
    }

    fn load(self: &Arc<Self>) -> Result<LoadedModel, String> {
        let url = std::env::var(MODEL_URL_ENV).ok();
        let progress_target = self.clone();
        let path = model_resolver::resolve(
            YOLO_MODEL_NAME,
            url.as_deref(),
            model_resolver::bundled_model_dir().as_deref(),
            Some(Box::new(move |downloaded, total| {
                if let Ok(mut p) = progress_target.progress.lock() {
                    *p = (downloaded, total);
                }
            })),
        )
        .map_err(|e| e.to_string())?;

        let (session, input_size) = load_session(&path).map_err(|e| e.to_string())?;
        Ok(LoadedModel {
            session,
            input_size,
            path,
        })
    }

    /// Non-blocking snapshot for the UI.
    pub fn state(&self) -> ModelState {
        let result = self.result.lock().ok().and_then(|r| r.clone());
        match result {
            Some(Ok(model)) => ModelState::Ready(model),
            Some(Err(e)) => ModelState::Failed(e),
            None => {
                let (downloaded, total) = self.progress.lock().map(|p| *p).unwrap_or((0, 0));
                ModelState::Loading { downloaded, total }
            }
        }
    }

    /// Blocks until loading finishes. Returns early if `cancelled` is set.
    pub fn wait(&self, cancelled: &AtomicBool) -> Result<LoadedModel, String> {
        let mut guard = self.result.lock().map_err(|e| e.to_string())?;
        loop {
            if cancelled.load(Ordering::Relaxed) {
                return Err("Cancelled".into());
            }
            if let Some(ref result) = *guard {
                return result.clone();
            }
            let (next, _) = self
                .ready
                .wait_timeout(guard, Duration::from_millis(100))
                .map_err(|e| e.to_string())?;
            guard = next;
        }
    }
}
