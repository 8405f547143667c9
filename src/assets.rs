use std::{
    path::PathBuf,
    sync::mpsc::{channel, Receiver},
    thread,
};

use image::RgbaImage;
use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    CardFront,
    CardBack,
    Sprite(usize),
}

/// One resolved request. `image` is None when decoding failed; the slot then
/// falls back to a blank texture, which is not an error.
pub struct LoadedAsset {
    pub slot: Slot,
    pub image: Option<RgbaImage>,
}

/// Decodes the configured images off the render thread and hands them back
/// through a channel polled once per frame.
pub struct AssetLoader {
    rx: Receiver<LoadedAsset>,
    pending: usize,
    loaded: Vec<LoadedAsset>,
}

impl AssetLoader {
    pub fn spawn(requests: Vec<(Slot, PathBuf)>) -> Self {
        let pending = requests.len();
        let (tx, rx) = channel();

        thread::spawn(move || {
            for (slot, path) in requests {
                let image = match image::open(&path) {
                    Ok(decoded) => {
                        info!("Loaded texture {:?}", path);
                        Some(decoded.to_rgba8())
                    }
                    Err(err) => {
                        warn!("Failed to load texture {:?}: {}", path, err);
                        None
                    }
                };
                if tx.send(LoadedAsset { slot, image }).is_err() {
                    return;
                }
            }
        });

        Self {
            rx,
            pending,
            loaded: Vec::new(),
        }
    }

    /// Non-blocking. Returns the full asset set exactly once, on the first
    /// poll after every request resolved.
    pub fn poll(&mut self) -> Option<Vec<LoadedAsset>> {
        while let Ok(asset) = self.rx.try_recv() {
            self.loaded.push(asset);
        }
        if self.loaded.len() == self.pending {
            Some(std::mem::take(&mut self.loaded))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn poll_until_done(loader: &mut AssetLoader) -> Vec<LoadedAsset> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(assets) = loader.poll() {
                return assets;
            }
            assert!(Instant::now() < deadline, "loader did not finish");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn missing_file_resolves_as_a_failed_slot() {
        let mut loader = AssetLoader::spawn(vec![
            (Slot::CardFront, "does/not/exist.png".into()),
            (Slot::Sprite(0), "also/missing.png".into()),
        ]);
        let assets = poll_until_done(&mut loader);
        assert_eq!(assets.len(), 2);
        assert!(assets.iter().all(|a| a.image.is_none()));
    }

    #[test]
    fn empty_request_set_completes_immediately() {
        let mut loader = AssetLoader::spawn(Vec::new());
        assert_eq!(loader.poll().map(|a| a.len()), Some(0));
    }
}
