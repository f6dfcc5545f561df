// ============================================================
// Layer 4 — Directory Batch Generator
// ============================================================
// Batch source over one fold directory laid out as
//
//   fold3/
//     air_conditioner/ 1001.png 1002.png ...
//     car_horn/        2001.png ...
//     ...
//
// Each immediate subdirectory is a class. The class → index
// mapping comes from a sorted class list shared by all folds
// (see discover_classes), so "car_horn" has the same index in
// fold1 and fold7 even if one of them happens to be missing a
// class.
//
// Per-image pipeline:
//   1. decode with the image crate (png, jpeg, bmp, ppm, tiff)
//   2. convert to 8-bit RGB
//   3. resize to (height, width) with nearest-neighbour
//   4. rescale to [0, 1] by dividing by 255
//   5. lay out as CHW: all red values, then green, then blue
//
// Reference: image crate documentation (imageops::resize)
//            walkdir crate documentation

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use image::imageops::FilterType;
use walkdir::WalkDir;

use crate::data::encoding::one_hot;
use crate::data::error::DataError;
use crate::data::generator::{EpochOrder, GeneratorConfig};
use crate::domain::sample::LabeledSample;
use crate::domain::traits::BatchSource;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "ppm", "tif", "tiff"];

#[derive(Debug, Clone)]
struct ImageEntry {
    path:  PathBuf,
    label: usize,
}

/// Batch source over the images of one fold directory.
#[derive(Debug)]
pub struct DirectoryBatchGenerator {
    entries: Vec<ImageEntry>,
    order:   EpochOrder,
    cfg:     GeneratorConfig,
}

impl DirectoryBatchGenerator {
    /// Walk `root/<class>/**` for every class in `classes`.
    pub fn new(
        root:    impl Into<PathBuf>,
        classes: &[String],
        cfg:     GeneratorConfig,
    ) -> Result<Self, DataError> {
        cfg.validate()?;
        let root = root.into();

        let mut entries = Vec::new();
        for (label, class) in classes.iter().enumerate() {
            let class_dir = root.join(class);
            if !class_dir.is_dir() {
                tracing::debug!("'{}' has no '{}' directory", root.display(), class);
                continue;
            }
            if label >= cfg.n_classes {
                return Err(DataError::LabelOutOfRange { label, n_classes: cfg.n_classes });
            }

            for entry in WalkDir::new(&class_dir).sort_by_file_name() {
                let entry = entry.map_err(|e| DataError::Io {
                    path:   class_dir.clone(),
                    source: e.into(),
                })?;
                if entry.file_type().is_file() && is_image(entry.path()) {
                    entries.push(ImageEntry {
                        path: entry.into_path(),
                        label,
                    });
                }
            }
        }

        if entries.is_empty() {
            return Err(DataError::InvalidConfig(format!(
                "no images found under '{}'",
                root.display()
            )));
        }

        let order = EpochOrder::new(entries.len(), &cfg)?;
        tracing::info!(
            "Found {} images belonging to {} classes in '{}'",
            entries.len(),
            classes.len(),
            root.display()
        );

        Ok(Self { entries, order, cfg })
    }

    fn load_sample(&self, entry: &ImageEntry) -> Result<LabeledSample, DataError> {
        let (h, w) = self.cfg.dims;
        Ok(LabeledSample {
            id:      entry.path.display().to_string(),
            values:  load_image(&entry.path, (h, w))?,
            shape:   [3, h, w],
            label:   entry.label,
            one_hot: one_hot(entry.label, self.cfg.n_classes)?,
        })
    }
}

impl BatchSource for DirectoryBatchGenerator {
    fn batches_per_epoch(&self) -> usize {
        self.order.batches_per_epoch()
    }

    fn sample_count(&self) -> usize {
        self.entries.len()
    }

    fn next_batch(&mut self) -> Result<Option<Vec<LabeledSample>>> {
        let Some(indices) = self.order.next_indices() else {
            return Ok(None);
        };
        let batch = indices
            .iter()
            .map(|&i| self.load_sample(&self.entries[i]))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(batch))
    }

    fn on_epoch_end(&mut self) {
        self.order.next_epoch();
    }
}

/// Sorted union of the class subdirectory names across `dirs`.
pub fn discover_classes(dirs: &[PathBuf]) -> Result<Vec<String>, DataError> {
    let mut classes = BTreeSet::new();
    for dir in dirs {
        let read = fs::read_dir(dir).map_err(|source| DataError::Io {
            path: dir.clone(),
            source,
        })?;
        for entry in read {
            let entry = entry.map_err(|source| DataError::Io {
                path: dir.clone(),
                source,
            })?;
            if entry.path().is_dir() {
                classes.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
    }
    Ok(classes.into_iter().collect())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode, resize and rescale one image into CHW floats.
pub fn load_image(path: &Path, dims: (usize, usize)) -> Result<Vec<f32>, DataError> {
    let side = |d: usize| {
        u32::try_from(d).map_err(|_| {
            DataError::InvalidConfig(format!("image side {d} does not fit in u32"))
        })
    };
    let (h, w) = (side(dims.0)?, side(dims.1)?);
    let img = image::open(path)
        .map_err(|source| DataError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();

    let img = if img.dimensions() == (w, h) {
        img
    } else {
        image::imageops::resize(&img, w, h, FilterType::Nearest)
    };

    let mut values = Vec::with_capacity(3 * dims.0 * dims.1);
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                values.push(img.get_pixel(x, y)[c] as f32 / 255.0);
            }
        }
    }
    Ok(values)
}
