use bevy::math::{UVec2, Vec2};

use super::layer::{EntityKind, LayerKind, MapLayer, RobotMap};
use super::transform::ViewTransform;

pub type Rgba = [u8; 4];

pub const COLOR_BACKGROUND: Rgba = [0, 0, 0, 0];
pub const COLOR_FLOOR: Rgba = [0x2e, 0x34, 0x40, 0xff];
pub const COLOR_WALL: Rgba = [0xd8, 0xde, 0xe9, 0xff];
pub const COLOR_SELECTED: Rgba = [0xff, 0xb3, 0x00, 0xff];
pub const COLOR_ROBOT: Rgba = [0x4c, 0xc9, 0xf0, 0xff];
pub const COLOR_CHARGER: Rgba = [0x57, 0xcc, 0x99, 0xff];
pub const COLOR_OVERLAY: Rgba = [0xef, 0x47, 0x6f, 0xff];

const SEGMENT_PALETTE: [Rgba; 6] = [
    [0x19, 0x76, 0xd2, 0xff],
    [0x38, 0x8e, 0x3c, 0xff],
    [0x7b, 0x1f, 0xa2, 0xff],
    [0x00, 0x83, 0x8f, 0xff],
    [0xc2, 0x18, 0x5b, 0xff],
    [0x5d, 0x40, 0x37, 0xff],
];

const MARKER_RADIUS: f32 = 5.0;
const OVERLAY_THICKNESS: f32 = 2.0;

/// Interactive drawing that sits above every map layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overlay {
    /// In-progress cut line, in screen coordinates.
    SplitLine { from: Vec2, to: Vec2 },
}

/// RGBA8 surface, row-major, origin top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    size: UVec2,
    data: Vec<u8>,
}

impl Canvas {
    pub fn new(size: UVec2) -> Self {
        let mut canvas = Self {
            size,
            data: vec![0; (size.x * size.y * 4) as usize],
        };
        canvas.clear(COLOR_BACKGROUND);
        canvas
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.size.x || y >= self.size.y {
            return None;
        }
        let i = ((y * self.size.x + x) * 4) as usize;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    pub fn clear(&mut self, color: Rgba) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    /// Fill `[min, max)` clipped to the surface. Both edges round to the
    /// nearest pixel, so cells sharing an edge meet without a seam and no
    /// cell grows by more than one pixel. Anything non-empty covers at
    /// least one pixel per axis.
    pub fn fill_rect(&mut self, min: Vec2, max: Vec2, color: Rgba) {
        let clip = |v: f32, limit: u32| v.clamp(0.0, limit as f32) as u32;
        let span = |lo: f32, hi: f32, limit: u32| {
            let start = lo.round();
            let end = hi.round().max(start + 1.0);
            (clip(start, limit), clip(end, limit))
        };
        if max.x <= min.x || max.y <= min.y {
            return;
        }
        let (x0, x1) = span(min.x, max.x, self.size.x);
        let (y0, y1) = span(min.y, max.y, self.size.y);

        for y in y0..y1 {
            let row = (y * self.size.x) as usize;
            for x in x0..x1 {
                let i = (row + x as usize) * 4;
                self.data[i..i + 4].copy_from_slice(&color);
            }
        }
    }

    pub fn fill_disc(&mut self, center: Vec2, radius: f32, color: Rgba) {
        let min = (center - Vec2::splat(radius)).max(Vec2::ZERO);
        let max = center + Vec2::splat(radius);
        let (x0, y0) = (min.x.floor() as u32, min.y.floor() as u32);
        let x1 = (max.x.ceil().max(0.0) as u32).min(self.size.x);
        let y1 = (max.y.ceil().max(0.0) as u32).min(self.size.y);

        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if p.distance_squared(center) <= radius * radius {
                    let i = ((y * self.size.x + x) * 4) as usize;
                    self.data[i..i + 4].copy_from_slice(&color);
                }
            }
        }
    }

    pub fn draw_line(&mut self, from: Vec2, to: Vec2, thickness: f32, color: Rgba) {
        let steps = (to - from).abs().max_element().ceil().max(1.0) as u32;
        let half = Vec2::splat(thickness / 2.0);
        for i in 0..=steps {
            let p = from.lerp(to, i as f32 / steps as f32);
            self.fill_rect(p - half, p + half, color);
        }
    }
}

fn draw_rank(kind: &LayerKind) -> Option<u8> {
    match kind {
        LayerKind::Floor => Some(0),
        LayerKind::Segment => Some(1),
        LayerKind::Wall => Some(2),
        LayerKind::Other(_) => None,
    }
}

/// Drawable layers in paint order `floor → segment → wall`, stable within a kind.
pub fn draw_order(layers: &[MapLayer]) -> Vec<&MapLayer> {
    let mut ordered: Vec<_> = layers
        .iter()
        .filter_map(|layer| draw_rank(&layer.kind).map(|rank| (rank, layer)))
        .collect();
    ordered.sort_by_key(|(rank, _)| *rank);
    ordered.into_iter().map(|(_, layer)| layer).collect()
}

/// Everything the compositor needs for one frame.
pub struct Scene<'a> {
    pub map: &'a RobotMap,
    pub transform: Option<&'a ViewTransform>,
    pub selected: &'a [String],
    pub overlay: Option<Overlay>,
}

/// Paint a scene onto a fresh canvas. With no transform the canvas stays blank.
pub fn render(scene: &Scene<'_>, size: UVec2) -> Canvas {
    let mut canvas = Canvas::new(size);
    let Some(transform) = scene.transform else {
        return canvas;
    };

    let cell = Vec2::splat(transform.cell_size(scene.map.pixel_size));
    let mut segment_index = 0usize;

    for layer in draw_order(&scene.map.layers) {
        let color = match layer.kind {
            LayerKind::Floor => COLOR_FLOOR,
            LayerKind::Wall => COLOR_WALL,
            LayerKind::Segment => {
                let tint = segment_tint(layer, segment_index, scene.selected);
                segment_index += 1;
                tint
            }
            LayerKind::Other(_) => continue,
        };
        for point in &layer.points {
            let origin = transform.map_to_screen(*point);
            canvas.fill_rect(origin, origin + cell, color);
        }
    }

    for entity in &scene.map.entities {
        let color = match entity.kind {
            EntityKind::RobotPosition => COLOR_ROBOT,
            EntityKind::ChargerLocation => COLOR_CHARGER,
        };
        let center = transform.map_to_screen(entity.point);
        canvas.fill_disc(center, MARKER_RADIUS.max(cell.x), color);
    }

    if let Some(Overlay::SplitLine { from, to }) = scene.overlay {
        canvas.draw_line(from, to, OVERLAY_THICKNESS, COLOR_OVERLAY);
    }

    canvas
}

fn segment_tint(layer: &MapLayer, index: usize, selected: &[String]) -> Rgba {
    let is_selected = layer
        .segment_id
        .as_ref()
        .is_some_and(|id| selected.contains(id));
    if is_selected {
        COLOR_SELECTED
    } else {
        SEGMENT_PALETTE[index % SEGMENT_PALETTE.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::MapPoint;
    use crate::map::layer::MapEntity;

    fn layer(kind: LayerKind, id: Option<&str>, points: &[(i32, i32)]) -> MapLayer {
        MapLayer {
            kind,
            points: points.iter().map(|&(x, y)| MapPoint::new(x, y)).collect(),
            segment_id: id.map(str::to_string),
        }
    }

    /// 0..20 map units on a 100x100 view without padding: scale 5, one cell = 25px.
    fn fixture() -> (RobotMap, ViewTransform) {
        let map = RobotMap {
            pixel_size: 5,
            layers: vec![
                layer(LayerKind::Wall, None, &[(0, 0)]),
                layer(LayerKind::Segment, Some("7"), &[(0, 0), (5, 0)]),
                layer(LayerKind::Floor, None, &[(0, 0), (5, 0), (10, 0), (15, 15)]),
            ],
            entities: vec![],
        };
        let transform = ViewTransform::for_map(&map, Vec2::new(100.0, 100.0), 0.0).unwrap();
        (map, transform)
    }

    #[test]
    fn draw_order_ignores_input_order() {
        let (map, _) = fixture();
        let kinds: Vec<_> = draw_order(&map.layers).iter().map(|l| l.kind.clone()).collect();
        assert_eq!(kinds, vec![LayerKind::Floor, LayerKind::Segment, LayerKind::Wall]);
    }

    #[test]
    fn walls_paint_over_segments_over_floor() {
        let (map, transform) = fixture();
        let scene = Scene {
            map: &map,
            transform: Some(&transform),
            selected: &[],
            overlay: None,
        };
        let canvas = render(&scene, UVec2::new(100, 100));
        assert_eq!(canvas.pixel(10, 10), Some(COLOR_WALL));
        assert_eq!(canvas.pixel(30, 10), Some(SEGMENT_PALETTE[0]));
        assert_eq!(canvas.pixel(60, 10), Some(COLOR_FLOOR));
        assert_eq!(canvas.pixel(90, 50), Some(COLOR_BACKGROUND));
    }

    #[test]
    fn selected_segment_gets_the_highlight_tint() {
        let (map, transform) = fixture();
        let selected = vec!["7".to_string()];
        let scene = Scene {
            map: &map,
            transform: Some(&transform),
            selected: &selected,
            overlay: None,
        };
        let canvas = render(&scene, UVec2::new(100, 100));
        assert_eq!(canvas.pixel(30, 10), Some(COLOR_SELECTED));
    }

    #[test]
    fn overlay_sits_above_walls() {
        let (map, transform) = fixture();
        let scene = Scene {
            map: &map,
            transform: Some(&transform),
            selected: &[],
            overlay: Some(Overlay::SplitLine {
                from: Vec2::new(0.0, 10.0),
                to: Vec2::new(99.0, 10.0),
            }),
        };
        let canvas = render(&scene, UVec2::new(100, 100));
        assert_eq!(canvas.pixel(10, 10), Some(COLOR_OVERLAY));
    }

    #[test]
    fn entities_draw_markers() {
        let (mut map, transform) = fixture();
        map.entities.push(MapEntity {
            kind: EntityKind::RobotPosition,
            point: MapPoint::new(15, 15),
        });
        let scene = Scene {
            map: &map,
            transform: Some(&transform),
            selected: &[],
            overlay: None,
        };
        let canvas = render(&scene, UVec2::new(100, 100));
        assert_eq!(canvas.pixel(60, 60), Some(COLOR_ROBOT));
    }

    #[test]
    fn rendering_without_transform_is_blank() {
        let (map, _) = fixture();
        let scene = Scene {
            map: &map,
            transform: None,
            selected: &[],
            overlay: None,
        };
        let canvas = render(&scene, UVec2::new(8, 8));
        assert!(canvas.data().chunks_exact(4).all(|px| px == COLOR_BACKGROUND));
    }

    #[test]
    fn rendering_is_idempotent() {
        let (map, transform) = fixture();
        let scene = Scene {
            map: &map,
            transform: Some(&transform),
            selected: &[],
            overlay: None,
        };
        assert_eq!(
            render(&scene, UVec2::new(100, 100)),
            render(&scene, UVec2::new(100, 100))
        );
    }

    #[test]
    fn rects_are_clipped_to_the_surface() {
        let mut canvas = Canvas::new(UVec2::new(4, 4));
        canvas.fill_rect(Vec2::new(-10.0, -10.0), Vec2::new(2.0, 2.0), COLOR_WALL);
        assert_eq!(canvas.pixel(1, 1), Some(COLOR_WALL));
        assert_eq!(canvas.pixel(2, 2), Some(COLOR_BACKGROUND));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn fractional_cells_tile_without_seams_or_overgrowth() {
        let cell = 2.6;
        let origin = 0.45;
        let mut canvas = Canvas::new(UVec2::new(40, 1));
        for i in 0..10 {
            let min = Vec2::new(origin + i as f32 * cell, 0.0);
            let color = if i % 2 == 0 { COLOR_WALL } else { COLOR_FLOOR };
            let mut single = Canvas::new(UVec2::new(40, 1));
            single.fill_rect(min, min + Vec2::new(cell, 1.0), color);
            let width = (0..40)
                .filter(|&x| single.pixel(x, 0) == Some(color))
                .count();
            assert!(width as f32 <= cell + 1.0, "cell {i} is {width}px wide");
            canvas.fill_rect(min, min + Vec2::new(cell, 1.0), color);
        }
        let covered = (0..40)
            .take_while(|&x| canvas.pixel(x, 0) != Some(COLOR_BACKGROUND))
            .count();
        // 0.45 + 26.0 rounds to 26; every pixel before that is painted
        assert_eq!(covered, 26);
    }

    #[test]
    fn tiny_rects_still_cover_a_pixel() {
        let mut canvas = Canvas::new(UVec2::new(4, 4));
        canvas.fill_rect(Vec2::new(1.1, 1.1), Vec2::new(1.3, 1.3), COLOR_WALL);
        assert_eq!(canvas.pixel(1, 1), Some(COLOR_WALL));
        assert_eq!(canvas.pixel(2, 2), Some(COLOR_BACKGROUND));
    }
}
