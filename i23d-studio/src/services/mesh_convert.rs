//! Mesh format conversion
//!
//! Loads the generated binary glTF into an in-memory triangle mesh and
//! re-serializes it as Wavefront OBJ, ASCII PLY, or binary STL. Conversion
//! is stateless and idempotent: nothing time- or run-dependent is embedded,
//! so equal input and target format produce byte-identical output.

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

/// Conversion errors
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Input bytes are not a valid binary glTF asset
    #[error("Not a valid binary glTF asset: {0}")]
    InvalidAsset(String),

    /// Asset parsed but contains no usable triangle geometry
    #[error("Asset contains no mesh geometry")]
    EmptyMesh,

    /// Requested target format is not in the supported set
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// Serialization failed
    #[error("Export serialization failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Wavefront OBJ (triangle-mesh text format)
    Obj,
    /// ASCII PLY (polygon format)
    Ply,
    /// Binary STL
    Stl,
}

impl ExportFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Obj => "obj",
            ExportFormat::Ply => "ply",
            ExportFormat::Stl => "stl",
        }
    }

    /// Content type used when serving the exported bytes
    pub fn content_type(&self) -> &'static str {
        "application/octet-stream"
    }
}

impl FromStr for ExportFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "obj" => Ok(ExportFormat::Obj),
            "ply" => Ok(ExportFormat::Ply),
            "stl" => Ok(ExportFormat::Stl),
            other => Err(ConvertError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// In-memory triangle mesh
///
/// Normals and uvs are either empty or exactly one entry per position;
/// `load_glb` maintains that invariant when merging primitives.
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl TriMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }
}

/// Load a binary glTF asset into a triangle mesh
///
/// Merges every primitive of every mesh in the document, offsetting indices
/// per primitive. Attribute streams that are not present on all primitives
/// are dropped so the per-vertex arrays stay aligned.
pub fn load_glb(bytes: &[u8]) -> Result<TriMesh, ConvertError> {
    let (doc, buffers, _images) =
        gltf::import_slice(bytes).map_err(|e| ConvertError::InvalidAsset(e.to_string()))?;

    let mut mesh = TriMesh::default();
    for gltf_mesh in doc.meshes() {
        for primitive in gltf_mesh.primitives() {
            let reader = primitive.reader(|buffer| {
                buffers.get(buffer.index()).map(|data| data.0.as_slice())
            });

            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let base = mesh.positions.len() as u32;
            let before = mesh.positions.len();
            mesh.positions.extend(positions);
            let added = mesh.positions.len() - before;

            if let Some(normals) = reader.read_normals() {
                mesh.normals.extend(normals);
            }
            if let Some(uvs) = reader.read_tex_coords(0) {
                mesh.uvs.extend(uvs.into_f32());
            }

            if let Some(indices) = reader.read_indices() {
                mesh.indices.extend(indices.into_u32().map(|i| i + base));
            } else if added % 3 == 0 {
                // Unindexed primitive: emit a trivial triangle list
                mesh.indices.extend(base..base + added as u32);
            }
        }
    }

    // Drop attribute streams that did not cover every vertex
    if mesh.normals.len() != mesh.positions.len() {
        mesh.normals.clear();
    }
    if mesh.uvs.len() != mesh.positions.len() {
        mesh.uvs.clear();
    }

    if mesh.is_empty() {
        return Err(ConvertError::EmptyMesh);
    }
    Ok(mesh)
}

/// Serialize a triangle mesh into the target format's byte representation
pub fn export(mesh: &TriMesh, format: ExportFormat) -> Result<Vec<u8>, ConvertError> {
    if mesh.is_empty() {
        return Err(ConvertError::EmptyMesh);
    }
    match format {
        ExportFormat::Obj => write_obj(mesh),
        ExportFormat::Ply => write_ply(mesh),
        ExportFormat::Stl => write_stl(mesh),
    }
}

/// Wavefront OBJ: v/vt/vn records followed by 1-based face references
fn write_obj(mesh: &TriMesh) -> Result<Vec<u8>, ConvertError> {
    let mut w = Vec::new();

    for p in &mesh.positions {
        writeln!(w, "v {} {} {}", p[0], p[1], p[2])?;
    }
    for t in &mesh.uvs {
        writeln!(w, "vt {} {}", t[0], t[1])?;
    }
    for n in &mesh.normals {
        writeln!(w, "vn {} {} {}", n[0], n[1], n[2])?;
    }

    let has_uv = !mesh.uvs.is_empty();
    let has_n = !mesh.normals.is_empty();
    for tri in mesh.indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] + 1, tri[1] + 1, tri[2] + 1);
        match (has_uv, has_n) {
            (true, true) => writeln!(w, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?,
            (true, false) => writeln!(w, "f {a}/{a} {b}/{b} {c}/{c}")?,
            (false, true) => writeln!(w, "f {a}//{a} {b}//{b} {c}//{c}")?,
            (false, false) => writeln!(w, "f {a} {b} {c}")?,
        }
    }

    Ok(w)
}

/// ASCII PLY 1.0: vertex element with optional normal/uv properties, face
/// element with vertex index lists
fn write_ply(mesh: &TriMesh) -> Result<Vec<u8>, ConvertError> {
    let mut w = Vec::new();
    let has_uv = !mesh.uvs.is_empty();
    let has_n = !mesh.normals.is_empty();

    writeln!(w, "ply")?;
    writeln!(w, "format ascii 1.0")?;
    writeln!(w, "element vertex {}", mesh.vertex_count())?;
    writeln!(w, "property float x")?;
    writeln!(w, "property float y")?;
    writeln!(w, "property float z")?;
    if has_n {
        writeln!(w, "property float nx")?;
        writeln!(w, "property float ny")?;
        writeln!(w, "property float nz")?;
    }
    if has_uv {
        writeln!(w, "property float s")?;
        writeln!(w, "property float t")?;
    }
    writeln!(w, "element face {}", mesh.triangle_count())?;
    writeln!(w, "property list uchar int vertex_indices")?;
    writeln!(w, "end_header")?;

    for (i, p) in mesh.positions.iter().enumerate() {
        write!(w, "{} {} {}", p[0], p[1], p[2])?;
        if has_n {
            let n = mesh.normals[i];
            write!(w, " {} {} {}", n[0], n[1], n[2])?;
        }
        if has_uv {
            let t = mesh.uvs[i];
            write!(w, " {} {}", t[0], t[1])?;
        }
        writeln!(w)?;
    }
    for tri in mesh.indices.chunks_exact(3) {
        writeln!(w, "3 {} {} {}", tri[0], tri[1], tri[2])?;
    }

    Ok(w)
}

/// Binary STL: 80-byte header, u32 triangle count, then per-face computed
/// normal + vertices + attribute count
fn write_stl(mesh: &TriMesh) -> Result<Vec<u8>, ConvertError> {
    let tri_count = mesh.triangle_count();
    let mut w = Vec::with_capacity(84 + tri_count * 50);

    let mut header = [0u8; 80];
    let tag = b"i23d stl export";
    header[..tag.len()].copy_from_slice(tag);
    w.write_all(&header)?;
    w.write_all(&(tri_count as u32).to_le_bytes())?;

    for tri in mesh.indices.chunks_exact(3) {
        let a = mesh.positions[tri[0] as usize];
        let b = mesh.positions[tri[1] as usize];
        let c = mesh.positions[tri[2] as usize];
        let n = face_normal(a, b, c);
        for v in [n, a, b, c] {
            for comp in v {
                w.write_all(&comp.to_le_bytes())?;
            }
        }
        w.write_all(&0u16.to_le_bytes())?;
    }

    Ok(w)
}

fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 0.0 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 0.0, 0.0]
    }
}
