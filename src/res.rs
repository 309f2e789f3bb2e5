//! Pre-built client assets, served in production.

use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};

/// Files under `dist`, with `index.html` for every path that is not a file
/// so client-side routes survive a reload.
pub fn client_assets(dist: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(dist).fallback(ServeFile::new(dist.join("index.html")))
}
