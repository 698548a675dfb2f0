use crate::api::types::{EntityPayload, LayerPayload, MapPayload, MapPoint};

/// Edge length of one map point when the robot does not report one.
pub const DEFAULT_PIXEL_SIZE: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Floor,
    Segment,
    Wall,
    Other(String),
}

impl LayerKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "floor" => Self::Floor,
            "segment" => Self::Segment,
            "wall" => Self::Wall,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One decoded layer. Immutable once built; dropped with the map that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct MapLayer {
    pub kind: LayerKind,
    pub points: Vec<MapPoint>,
    pub segment_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    RobotPosition,
    ChargerLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntity {
    pub kind: EntityKind,
    pub point: MapPoint,
}

/// A decoded robot map. Layer order is the robot's order, not draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotMap {
    pub pixel_size: i32,
    pub layers: Vec<MapLayer>,
    pub entities: Vec<MapEntity>,
}

impl RobotMap {
    /// Id of the segment whose cell covers `point`. Later layers win.
    pub fn segment_at(&self, point: MapPoint) -> Option<&str> {
        let size = self.pixel_size;
        self.layers
            .iter()
            .rev()
            .filter(|layer| layer.kind == LayerKind::Segment)
            .find(|layer| {
                layer.points.iter().any(|cell| {
                    (cell.x..cell.x + size).contains(&point.x)
                        && (cell.y..cell.y + size).contains(&point.y)
                })
            })
            .and_then(|layer| layer.segment_id.as_deref())
    }
}

/// Consecutive `(x, y)` pairs. A trailing odd element is ignored.
pub fn decode_pixels(raw: &[i32]) -> impl Iterator<Item = MapPoint> + '_ {
    raw.chunks_exact(2).map(|pair| MapPoint::new(pair[0], pair[1]))
}

/// `(x, y, count)` runs along +x, one `pixel_size` per cell. An incomplete
/// trailing run is ignored, as are non-positive counts.
pub fn expand_runs(raw: &[i32], pixel_size: i32) -> impl Iterator<Item = MapPoint> + '_ {
    raw.chunks_exact(3).flat_map(move |run| {
        let (x, y, count) = (run[0], run[1], run[2].max(0));
        (0..count).map(move |i| MapPoint::new(x + i * pixel_size, y))
    })
}

pub fn decode_layer(payload: &LayerPayload, pixel_size: i32) -> MapLayer {
    let mut points: Vec<MapPoint> = decode_pixels(&payload.pixels).collect();
    points.extend(expand_runs(&payload.compressed_pixels, pixel_size));

    MapLayer {
        kind: LayerKind::parse(&payload.kind),
        points,
        segment_id: payload
            .meta_data
            .as_ref()
            .and_then(|meta| meta.segment_id.clone()),
    }
}

fn decode_entity(payload: &EntityPayload) -> Option<MapEntity> {
    let kind = match payload.kind.as_str() {
        "robot_position" => EntityKind::RobotPosition,
        "charger_location" => EntityKind::ChargerLocation,
        _ => return None,
    };
    let point = decode_pixels(&payload.points).next()?;
    Some(MapEntity { kind, point })
}

pub fn decode_map(payload: &MapPayload) -> RobotMap {
    let pixel_size = payload
        .pixel_size
        .filter(|size| *size > 0)
        .unwrap_or(DEFAULT_PIXEL_SIZE);

    RobotMap {
        pixel_size,
        layers: payload
            .layers
            .iter()
            .map(|layer| decode_layer(layer, pixel_size))
            .collect(),
        entities: payload.entities.iter().filter_map(decode_entity).collect(),
    }
}
