//! Screen-space placement of the planet's content labels.
//!
//! Each frame every anchor is rotated with the planet, tested for whether it faces the
//! camera, and projected to pixel coordinates for the overlay.

use glam::{Quat, Vec2, Vec3};

use crate::camera::Camera;
use crate::content::ContentRecord;

/// A content label pinned to a point on the planet.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelAnchor {
    /// Position in the planet's rest frame.
    pub position: Vec3,
    /// Index of the content record this label opens.
    pub item: usize,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    /// On the visible hemisphere; drawn full size and clickable.
    Camera,
    /// Turned away; drawn shrunk and ignores clicks.
    Away,
}

/// Where and how to draw one label this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelPlacement {
    pub item: usize,
    pub facing: Facing,
    /// Pixel position, origin top-left.
    pub screen: Vec2,
    /// NDC depth in `[0, 1]`, usable for sorting.
    pub depth: f32,
    /// Facing test value; larger means turned further away.
    pub dot: f32,
}

impl LabelPlacement {
    pub fn is_facing(&self) -> bool {
        self.facing == Facing::Camera
    }
}

/// Projects label anchors through the camera every frame.
#[derive(Clone, Debug)]
pub struct LabelProjector {
    anchors: Vec<LabelAnchor>,
    /// Anchors with a facing dot above this are treated as turned away.
    pub facing_threshold: f32,
}

impl LabelProjector {
    pub fn new(anchors: Vec<LabelAnchor>) -> Self {
        Self {
            anchors,
            facing_threshold: 0.2,
        }
    }

    /// One anchor per content record, in list order.
    pub fn from_content(records: &[ContentRecord]) -> Self {
        Self::new(
            records
                .iter()
                .enumerate()
                .map(|(item, record)| LabelAnchor {
                    position: record.position,
                    item,
                    name: record.name.clone(),
                })
                .collect(),
        )
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.facing_threshold = threshold;
        self
    }

    pub fn anchors(&self) -> &[LabelAnchor] {
        &self.anchors
    }

    /// Place every anchor for a `width` x `height` viewport.
    ///
    /// `parent_rotation` is the planet's current world rotation; anchors are rotated
    /// by it before the facing test and projection.
    pub fn project(
        &self,
        camera: &Camera,
        parent_rotation: Quat,
        width: u32,
        height: u32,
    ) -> Vec<LabelPlacement> {
        let view = camera.view_matrix();
        let normal_matrix = camera.normal_matrix();
        let view_projection = camera.view_projection();
        let (w, h) = (width as f32, height as f32);

        self.anchors
            .iter()
            .map(|anchor| {
                let p = parent_rotation * anchor.position;

                // Surface direction in view space against the view ray to the point.
                // Positive means the point's outward direction points away from us.
                let surface = normal_matrix * p;
                let view_ray = view.transform_point3(p).normalize_or_zero();
                let dot = surface.dot(view_ray);

                let ndc = view_projection.project_point3(p);
                let screen = Vec2::new((ndc.x * 0.5 + 0.5) * w, (-ndc.y * 0.5 + 0.5) * h);

                LabelPlacement {
                    item: anchor.item,
                    facing: if dot > self.facing_threshold {
                        Facing::Away
                    } else {
                        Facing::Camera
                    },
                    screen,
                    depth: ndc.z,
                    dot,
                }
            })
            .collect()
    }
}

/// The camera-facing label nearest to `point`, within `radius` pixels.
pub fn hit_test(placements: &[LabelPlacement], point: Vec2, radius: f32) -> Option<usize> {
    placements
        .iter()
        .filter(|p| p.is_facing())
        .map(|p| (p.item, p.screen.distance(point)))
        .filter(|&(_, distance)| distance <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn camera() -> Camera {
        let mut camera = Camera::new().at(Vec3::new(0.0, 0.0, 5.0));
        camera.set_viewport(800, 600);
        camera
    }

    fn anchor(position: Vec3, item: usize) -> LabelAnchor {
        LabelAnchor {
            position,
            item,
            name: format!("label {item}"),
        }
    }

    #[test]
    fn anchor_toward_camera_faces_camera() {
        let projector = LabelProjector::new(vec![anchor(Vec3::Z, 0)]);
        let placements = projector.project(&camera(), Quat::IDENTITY, 800, 600);
        assert_eq!(placements[0].facing, Facing::Camera);
        assert!((placements[0].dot + 1.0).abs() < 1e-5);
    }

    #[test]
    fn parent_rotation_turns_anchor_away() {
        let projector = LabelProjector::new(vec![anchor(Vec3::Z, 0)]);
        let rotation = Quat::from_rotation_y(PI);
        let placements = projector.project(&camera(), rotation, 800, 600);
        assert_eq!(placements[0].facing, Facing::Away);
    }

    #[test]
    fn origin_projects_to_viewport_center() {
        let projector = LabelProjector::new(vec![anchor(Vec3::ZERO, 3)]);
        let placements = projector.project(&camera(), Quat::IDENTITY, 800, 600);
        assert!(placements[0].screen.abs_diff_eq(Vec2::new(400.0, 300.0), 1e-3));
        assert_eq!(placements[0].item, 3);
    }

    #[test]
    fn screen_y_grows_downward() {
        let projector = LabelProjector::new(vec![anchor(Vec3::new(0.0, 0.5, 0.9), 0)]);
        let placements = projector.project(&camera(), Quat::IDENTITY, 800, 600);
        assert!(placements[0].screen.y < 300.0);
    }

    #[test]
    fn hit_test_ignores_labels_facing_away() {
        let placements = [
            LabelPlacement {
                item: 0,
                facing: Facing::Away,
                screen: Vec2::new(100.0, 100.0),
                depth: 0.5,
                dot: 0.9,
            },
            LabelPlacement {
                item: 1,
                facing: Facing::Camera,
                screen: Vec2::new(130.0, 100.0),
                depth: 0.5,
                dot: -0.9,
            },
        ];
        assert_eq!(hit_test(&placements, Vec2::new(100.0, 100.0), 40.0), Some(1));
        assert_eq!(hit_test(&placements, Vec2::new(100.0, 100.0), 20.0), None);
    }

    #[test]
    fn content_records_become_anchors() {
        let records = crate::content::load_content(None).unwrap();
        let projector = LabelProjector::from_content(&records).with_threshold(0.3);
        assert_eq!(projector.anchors().len(), records.len());
        assert_eq!(projector.anchors()[1].name, "Coral");
        assert_eq!(projector.facing_threshold, 0.3);
    }
}
