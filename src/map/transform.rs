use bevy::math::Vec2;

use super::layer::{MapLayer, RobotMap};
use crate::api::types::MapPoint;

/// Extent of all map content in map units. `min <= max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BoundingBox {
    fn around(point: MapPoint) -> Self {
        Self {
            min_x: point.x,
            min_y: point.y,
            max_x: point.x,
            max_y: point.y,
        }
    }

    fn include(&mut self, point: MapPoint) {
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }

    pub fn contains(&self, point: MapPoint) -> bool {
        (self.min_x..=self.max_x).contains(&point.x) && (self.min_y..=self.max_y).contains(&point.y)
    }
}

/// `None` is the explicit "no content" state: no layer carries a single point.
pub fn compute_bounding_box(layers: &[MapLayer]) -> Option<BoundingBox> {
    let mut points = layers.iter().flat_map(|layer| layer.points.iter().copied());
    let first = points.next()?;
    let mut bbox = BoundingBox::around(first);
    for point in points {
        bbox.include(point);
    }
    Some(bbox)
}

/// Uniform map → screen mapping: `screen = map * scale + offset`.
///
/// The same value must be used both to draw the map and to convert a gesture
/// back into map units, otherwise a drawn cut line lands somewhere else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub offset: Vec2,
}

impl ViewTransform {
    /// Fit `bbox` into `view` minus `padding` on every side, centered, without
    /// distorting the aspect ratio. `None` when there is no room or no content.
    pub fn compute(
        bbox: Option<BoundingBox>,
        pixel_size: i32,
        view: Vec2,
        padding: f32,
    ) -> Option<Self> {
        let bbox = bbox?;
        let available = view - Vec2::splat(2.0 * padding);
        if available.x <= 0.0 || available.y <= 0.0 {
            return None;
        }

        let content = Vec2::new(
            (bbox.max_x - bbox.min_x + pixel_size) as f32,
            (bbox.max_y - bbox.min_y + pixel_size) as f32,
        );
        if content.x <= 0.0 || content.y <= 0.0 {
            return None;
        }

        let scale = (available.x / content.x).min(available.y / content.y);
        let min = Vec2::new(bbox.min_x as f32, bbox.min_y as f32);
        let offset = Vec2::splat(padding) + (available - content * scale) / 2.0 - min * scale;

        Some(Self { scale, offset })
    }

    pub fn for_map(map: &RobotMap, view: Vec2, padding: f32) -> Option<Self> {
        Self::compute(
            compute_bounding_box(&map.layers),
            map.pixel_size,
            view,
            padding,
        )
    }

    pub fn map_to_screen(&self, point: MapPoint) -> Vec2 {
        Vec2::new(point.x as f32, point.y as f32) * self.scale + self.offset
    }

    /// Algebraic inverse of [`Self::map_to_screen`], truncated to map units.
    pub fn screen_to_map(&self, screen: Vec2) -> MapPoint {
        let map = (screen - self.offset) / self.scale;
        MapPoint::new(map.x as i32, map.y as i32)
    }

    /// Screen edge length of one map cell.
    pub fn cell_size(&self, pixel_size: i32) -> f32 {
        self.scale * pixel_size as f32
    }
}
