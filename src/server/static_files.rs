//! Serve a built frontend (SPA) from `static_dir` when one is present.
//! Unknown paths fall back to its `index.html`; `/api` is routed before this.

use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};
use tracing::info;

/// `None` when the directory has no `index.html`, in which case the bundled
/// console page is served instead.
pub fn frontend_service(dir: &Path) -> Option<ServeDir<ServeFile>> {
    let index = dir.join("index.html");
    if !index.is_file() {
        return None;
    }
    info!(dir = %dir.display(), "serving frontend from static directory");
    Some(ServeDir::new(dir).fallback(ServeFile::new(index)))
}
