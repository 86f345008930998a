use bytemuck::{Pod, Zeroable};
use nalgebra::Vector3;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::error::{Result, TrackError};

pub const GLB_CONTENT_TYPE: &str = "model/gltf-binary";

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A; // "JSON"
const CHUNK_BIN: u32 = 0x004E_4942; // "BIN\0"

const COMPONENT_FLOAT: u32 = 5126;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const MODE_POINTS: u32 = 0;

const GENERATOR: &str = concat!("track_geometry_core ", env!("CARGO_PKG_VERSION"));

// Binary container layout shared by header and chunk descriptors
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GlbHeader {
    magic: u32,
    version: u32,
    length: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ChunkHeader {
    length: u32,
    kind: u32,
}

#[derive(Serialize)]
struct Gltf {
    asset: Asset,
    scene: u32,
    scenes: Vec<Scene>,
    nodes: Vec<Node>,
    meshes: Vec<Mesh>,
    accessors: Vec<Accessor>,
    #[serde(rename = "bufferViews")]
    buffer_views: Vec<BufferView>,
    buffers: Vec<Buffer>,
}

#[derive(Serialize)]
struct Asset {
    version: &'static str,
    generator: &'static str,
}

#[derive(Serialize)]
struct Scene {
    nodes: Vec<u32>,
}

#[derive(Serialize)]
struct Node {
    mesh: u32,
    name: &'static str,
}

#[derive(Serialize)]
struct Mesh {
    primitives: Vec<Primitive>,
}

#[derive(Serialize)]
struct Primitive {
    attributes: Attributes,
    mode: u32,
}

#[derive(Serialize)]
struct Attributes {
    #[serde(rename = "POSITION")]
    position: u32,
}

#[derive(Serialize)]
struct Accessor {
    #[serde(rename = "bufferView")]
    buffer_view: u32,
    #[serde(rename = "componentType")]
    component_type: u32,
    count: u32,
    #[serde(rename = "type")]
    kind: &'static str,
    min: [f32; 3],
    max: [f32; 3],
}

#[derive(Serialize)]
struct BufferView {
    buffer: u32,
    #[serde(rename = "byteOffset")]
    byte_offset: u32,
    #[serde(rename = "byteLength")]
    byte_length: u32,
    target: u32,
}

#[derive(Serialize)]
struct Buffer {
    #[serde(rename = "byteLength")]
    byte_length: u32,
}

/// Serialize a point cloud as a single-mesh GLB with `POINTS` topology.
pub fn point_cloud_to_glb(points: &[Vector3<f64>]) -> Result<Vec<u8>> {
    if points.is_empty() {
        return Err(TrackError::validation("Cannot export an empty point cloud"));
    }

    let positions: Vec<[f32; 3]> = points
        .iter()
        .map(|p| [p.x as f32, p.y as f32, p.z as f32])
        .collect();

    let (min, max) = position_bounds(&positions);
    let bin: &[u8] = bytemuck::cast_slice(&positions);
    let bin_length = to_u32(bin.len(), "position buffer")?;
    let count = to_u32(positions.len(), "point count")?;

    let document = Gltf {
        asset: Asset {
            version: "2.0",
            generator: GENERATOR,
        },
        scene: 0,
        scenes: vec![Scene { nodes: vec![0] }],
        nodes: vec![Node {
            mesh: 0,
            name: "track_point_cloud",
        }],
        meshes: vec![Mesh {
            primitives: vec![Primitive {
                attributes: Attributes { position: 0 },
                mode: MODE_POINTS,
            }],
        }],
        accessors: vec![Accessor {
            buffer_view: 0,
            component_type: COMPONENT_FLOAT,
            count,
            kind: "VEC3",
            min,
            max,
        }],
        buffer_views: vec![BufferView {
            buffer: 0,
            byte_offset: 0,
            byte_length: bin_length,
            target: TARGET_ARRAY_BUFFER,
        }],
        buffers: vec![Buffer {
            byte_length: bin_length,
        }],
    };

    let mut json = serde_json::to_vec(&document)
        .map_err(|e| TrackError::validation(format!("Failed to serialize glTF JSON: {}", e)))?;
    pad_to_four(&mut json, b' ');

    let mut bin = bin.to_vec();
    pad_to_four(&mut bin, 0);

    let header_len = std::mem::size_of::<GlbHeader>() + 2 * std::mem::size_of::<ChunkHeader>();
    let total = header_len + json.len() + bin.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(bytemuck::bytes_of(&GlbHeader {
        magic: GLB_MAGIC,
        version: GLB_VERSION,
        length: to_u32(total, "GLB")?,
    }));
    out.extend_from_slice(bytemuck::bytes_of(&ChunkHeader {
        length: to_u32(json.len(), "JSON chunk")?,
        kind: CHUNK_JSON,
    }));
    out.extend_from_slice(&json);
    out.extend_from_slice(bytemuck::bytes_of(&ChunkHeader {
        length: to_u32(bin.len(), "BIN chunk")?,
        kind: CHUNK_BIN,
    }));
    out.extend_from_slice(&bin);

    Ok(out)
}

/// Content type hosts should send GLB responses with
#[wasm_bindgen]
pub fn glb_content_type() -> String {
    GLB_CONTENT_TYPE.to_string()
}

fn position_bounds(positions: &[[f32; 3]]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for p in positions {
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }
    (min, max)
}

fn pad_to_four(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
}

fn to_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| TrackError::validation(format!("{} exceeds the 4 GiB GLB limit", what)))
}
