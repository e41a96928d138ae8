use std::collections::HashSet;

use log::debug;

use super::grid::{self, Candidate, Placement};
use crate::error::{MosaicError, Result};
use crate::sprite::ImageDescriptor;

/// Placement result for one atlas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedLayout {
    /// Smallest power of two covering every placement
    pub side: u32,
    /// Placements whose `image` indexes the slice given to [`pack`]
    pub placements: Vec<Placement>,
}

/// Packs `images` into as few square power-of-two atlases of at most
/// `max_size` pixels as their priorities allow.
///
/// Images are sorted by priority and packed together when possible. A run
/// that does not fit one atlas is cut where consecutive priorities differ
/// most, so the images in every layout have neighbouring priorities.
pub fn pack(images: &[ImageDescriptor], max_size: u32, border: u32) -> Result<Vec<PackedLayout>> {
    if images.is_empty() {
        return Err(MosaicError::NoImages);
    }
    let mut keys = HashSet::with_capacity(images.len());
    for image in images {
        if image.width() == 0 || image.height() == 0 {
            return Err(MosaicError::EmptyImage(image.key.clone()));
        }
        if !keys.insert(image.key.as_str()) {
            return Err(MosaicError::DuplicateKey(image.key.clone()));
        }
    }

    let mut order: Vec<usize> = (0..images.len()).collect();
    order.sort_by_key(|&i| images[i].priority);

    let mut layouts = Vec::new();
    split_and_pack(images, &order, max_size, border, &mut layouts)?;
    Ok(layouts)
}

fn split_and_pack(
    images: &[ImageDescriptor],
    run: &[usize],
    max_size: u32,
    border: u32,
    layouts: &mut Vec<PackedLayout>,
) -> Result<()> {
    if let Some(layout) = pack_run(images, run, max_size, border) {
        layouts.push(layout);
        return Ok(());
    }

    match run {
        [] => Ok(()),
        [single] => {
            let image = &images[*single];
            Err(MosaicError::UnpackableImage {
                key: image.key.clone(),
                width: image.width(),
                height: image.height(),
                max_size,
            })
        }
        [first, second] => {
            debug!(
                "Splitting '{}' and '{}' into separate atlases",
                images[*first].key, images[*second].key
            );
            split_and_pack(images, &[*first], max_size, border, layouts)?;
            split_and_pack(images, &[*second], max_size, border, layouts)
        }
        _ => {
            let deltas: Vec<i64> = run
                .windows(2)
                .map(|pair| {
                    i64::from(images[pair[1]].priority) - i64::from(images[pair[0]].priority)
                })
                .collect();
            let max_delta = deltas.iter().copied().max().unwrap_or(0);
            let min_delta = deltas.iter().copied().min().unwrap_or(0);
            if max_delta == min_delta {
                return Err(MosaicError::IndivisibleGroup {
                    first_key: images[run[0]].key.clone(),
                    last_key: images[run[run.len() - 1]].key.clone(),
                    count: run.len(),
                });
            }

            let mut from = 0;
            for (i, &delta) in deltas.iter().enumerate() {
                if delta == max_delta {
                    debug!(
                        "Splitting run of {} images at priority gap {} (after '{}')",
                        run.len(),
                        max_delta,
                        images[run[i]].key
                    );
                    split_and_pack(images, &run[from..=i], max_size, border, layouts)?;
                    from = i + 1;
                }
            }
            split_and_pack(images, &run[from..], max_size, border, layouts)
        }
    }
}

/// Tries to fit a whole run in one atlas, doubling the side from the
/// smallest square that could hold its area.
fn pack_run(
    images: &[ImageDescriptor],
    run: &[usize],
    max_size: u32,
    border: u32,
) -> Option<PackedLayout> {
    let mut candidates = Vec::with_capacity(run.len() * 2);
    for (local, &index) in run.iter().enumerate() {
        let image = &images[index];
        candidates.push(Candidate::natural(local, image.width(), image.height()));
        if image.width() != image.height() {
            candidates.push(Candidate::rotated(local, image.width(), image.height()));
        }
    }
    candidates.sort_by(|a, b| b.height.cmp(&a.height));

    let area: u64 = run.iter().map(|&i| images[i].area()).sum();
    let mut side = initial_side(area)?;

    while side <= max_size {
        debug!("Trying {}x{} atlas for {} images", side, side, run.len());
        if let Some(placements) = grid::place(side, border, &candidates, run.len()) {
            let extent = placements
                .iter()
                .map(|p| p.rect.right().max(p.rect.bottom()))
                .max()
                .unwrap_or(1);
            let placements = placements
                .into_iter()
                .map(|p| Placement {
                    image: run[p.image],
                    ..p
                })
                .collect();
            return Some(PackedLayout {
                side: extent.next_power_of_two(),
                placements,
            });
        }
        side = side.checked_mul(2)?;
    }

    None
}

/// Smallest power of two whose square is at least `area`
fn initial_side(area: u64) -> Option<u32> {
    let mut root = (area as f64).sqrt() as u64;
    while root * root < area {
        root += 1;
    }
    u32::try_from(root.max(1).next_power_of_two()).ok()
}
