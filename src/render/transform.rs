use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Affine2, Vec2};
use serde::{Deserialize, Serialize};

use crate::error::{MosaicError, Result};

/// Translation, rotation and scale in world units.
///
/// `rotation` is in degrees; positive values turn clockwise. Scale is
/// applied first, translation last.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec2::ZERO,
        rotation: 0.0,
        scale: Vec2::ONE,
    };

    pub fn from_translation(translation: Vec2) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn reset(&mut self) {
        *self = Self::IDENTITY;
    }

    pub fn to_affine(&self) -> Affine2 {
        Affine2::from_scale_angle_translation(
            self.scale,
            -self.rotation.to_radians(),
            self.translation,
        )
    }
}

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a node of the [`TransformTree`] that issued it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransformId {
    tree: u64,
    index: usize,
}

#[derive(Debug, Clone)]
struct Node {
    local: Transform,
    parent: Option<TransformId>,
}

/// Arena of transforms that may be parented to one another.
///
/// Ids from another tree are rejected with
/// [`MosaicError::UnknownTransform`].
#[derive(Debug, Clone)]
pub struct TransformTree {
    id: u64,
    nodes: Vec<Node>,
}

impl Default for TransformTree {
    fn default() -> Self {
        Self {
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
        }
    }
}

impl TransformTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn insert(&mut self, local: Transform) -> TransformId {
        self.nodes.push(Node {
            local,
            parent: None,
        });
        TransformId {
            tree: self.id,
            index: self.nodes.len() - 1,
        }
    }

    fn node(&self, id: TransformId) -> Result<&Node> {
        if id.tree != self.id {
            return Err(MosaicError::UnknownTransform(id.index));
        }
        self.nodes
            .get(id.index)
            .ok_or(MosaicError::UnknownTransform(id.index))
    }

    fn node_mut(&mut self, id: TransformId) -> Result<&mut Node> {
        if id.tree != self.id {
            return Err(MosaicError::UnknownTransform(id.index));
        }
        self.nodes
            .get_mut(id.index)
            .ok_or(MosaicError::UnknownTransform(id.index))
    }

    pub fn get(&self, id: TransformId) -> Result<&Transform> {
        self.node(id).map(|node| &node.local)
    }

    pub fn get_mut(&mut self, id: TransformId) -> Result<&mut Transform> {
        self.node_mut(id).map(|node| &mut node.local)
    }

    pub fn parent(&self, id: TransformId) -> Result<Option<TransformId>> {
        self.node(id).map(|node| node.parent)
    }

    /// Attach `child` to `parent`, or detach it with `None`.
    ///
    /// Fails with [`MosaicError::TransformCycle`] if `parent` is `child` or
    /// one of its descendants.
    pub fn set_parent(&mut self, child: TransformId, parent: Option<TransformId>) -> Result<()> {
        self.node(child)?;
        if let Some(parent) = parent {
            let mut ancestor = Some(parent);
            while let Some(id) = ancestor {
                if id == child {
                    return Err(MosaicError::TransformCycle {
                        child: child.index,
                        parent: parent.index,
                    });
                }
                ancestor = self.node(id)?.parent;
            }
        }
        self.node_mut(child)?.parent = parent;
        Ok(())
    }

    /// World transform: the local transform, then each ancestor's outward.
    pub fn world(&self, id: TransformId) -> Result<Affine2> {
        let node = self.node(id)?;
        let mut world = node.local.to_affine();
        let mut ancestor = node.parent;
        while let Some(parent) = ancestor {
            let node = self.node(parent)?;
            world = node.local.to_affine() * world;
            ancestor = node.parent;
        }
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec2, b: Vec2) {
        assert!((a - b).length() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn test_positive_rotation_is_clockwise() {
        let t = Transform::IDENTITY.with_rotation(90.0);
        assert_close(t.to_affine().transform_point2(Vec2::X), Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_scale_then_translate() {
        let t = Transform::from_translation(Vec2::new(10.0, 0.0)).with_scale(Vec2::splat(2.0));
        assert_close(t.to_affine().transform_point2(Vec2::ONE), Vec2::new(12.0, 2.0));
    }

    #[test]
    fn test_world_applies_local_first() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(Transform::from_translation(Vec2::new(5.0, 0.0)));
        let child = tree.insert(Transform::IDENTITY.with_scale(Vec2::splat(3.0)));
        tree.set_parent(child, Some(parent)).unwrap();

        assert_close(tree.world(child).unwrap().transform_point2(Vec2::ONE), Vec2::new(8.0, 3.0));

        tree.get_mut(parent).unwrap().translation = Vec2::ZERO;
        assert_close(tree.world(child).unwrap().transform_point2(Vec2::ONE), Vec2::splat(3.0));
    }

    #[test]
    fn test_rejects_cycles() {
        let mut tree = TransformTree::new();
        let a = tree.insert(Transform::IDENTITY);
        let b = tree.insert(Transform::IDENTITY);
        let c = tree.insert(Transform::IDENTITY);
        tree.set_parent(b, Some(a)).unwrap();
        tree.set_parent(c, Some(b)).unwrap();

        assert!(matches!(
            tree.set_parent(a, Some(c)),
            Err(MosaicError::TransformCycle { child: 0, parent: 2 })
        ));
        assert!(tree.set_parent(a, Some(a)).is_err());
        assert_eq!(tree.parent(a).unwrap(), None);

        tree.set_parent(c, None).unwrap();
        tree.set_parent(a, Some(c)).unwrap();
        assert_eq!(tree.parent(a).unwrap(), Some(c));
    }

    #[test]
    fn test_ids_from_another_tree_are_rejected() {
        let mut first = TransformTree::new();
        let mut second = TransformTree::new();
        let foreign = first.insert(Transform::IDENTITY);
        let own = second.insert(Transform::IDENTITY);

        assert!(matches!(second.get(foreign), Err(MosaicError::UnknownTransform(0))));
        assert!(second.get_mut(foreign).is_err());
        assert!(second.parent(foreign).is_err());
        assert!(second.world(foreign).is_err());
        assert!(second.set_parent(own, Some(foreign)).is_err());
        assert!(second.set_parent(foreign, None).is_err());
        assert_eq!(second.parent(own).unwrap(), None);
        assert_eq!(second.len(), 1);
    }
}
