#![allow(dead_code)]

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use image::{Rgb, RgbImage};
use tiny_http::{Response, Server};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Scratch directory under the system temp dir, removed on drop
pub struct TestDir {
    pub path: PathBuf,
}

impl TestDir {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "deepfeatx-{}-{}-{}",
            name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.path.join(path)
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Write a small synthetic image, creating parent folders as needed
pub fn write_image(path: &Path, width: u32, height: u32, seed: u8) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x as u8).wrapping_mul(3).wrapping_add(seed),
            (y as u8).wrapping_mul(5).wrapping_add(seed),
            ((x + y) as u8).wrapping_add(seed.wrapping_mul(7)),
        ])
    });
    image.save(path).unwrap();
}

/// Serve `routes` (url path -> body) on a random local port, 404 for anything else.
/// Returns the base URL, e.g. `http://127.0.0.1:12345`.
pub fn serve(routes: HashMap<String, Vec<u8>>) -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    thread::spawn(move || {
        for request in server.incoming_requests() {
            let response = match routes.get(request.url()) {
                Some(body) => Response::from_data(body.clone()),
                None => Response::from_data(b"404 Not Found".to_vec()).with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });
    format!("http://127.0.0.1:{}", port)
}
