mod cursor;
mod header;
mod reader;

pub use cursor::*;
pub use header::*;
pub use reader::*;

#[derive(Clone, PartialEq, Debug)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub bones: [Option<usize>; 2],
    /// Influence of `bones[0]` in percent (0-100).
    pub weight: u8,
    pub edge: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Face {
    pub vertices: [usize; 3],
}

#[derive(Clone, PartialEq, Debug)]
pub struct Material {
    pub diffuse: [f32; 4],
    pub specular: [f32; 3],
    pub specularity: f32,
    pub ambient: [f32; 3],
    /// 1-based selector into [`Model::toon_textures`].
    pub toon: Option<u8>,
    pub edge: bool,
    /// Number of triangles, taken contiguously from the face list.
    pub face_count: usize,
    pub texture: Option<String>,
    pub sphere: Option<String>,
}

impl Material {
    pub fn toon_texture_name<'a>(&self, toon_textures: &'a [String]) -> Option<&'a str> {
        let toon = self.toon? as usize;
        toon_textures.get(toon.checked_sub(1)?).map(String::as_str)
    }
}

/// Type-dependent payload of a bone.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum BoneKind {
    /// Type 4.
    IkInfluenced { ik_target: Option<usize> },
    /// Type 9.
    RotationLinked { coefficient: i16 },
    Other(u8),
}

#[derive(Clone, PartialEq, Debug)]
pub struct Bone {
    pub name: String,
    pub name_en: Option<String>,
    pub parent: Option<usize>,
    pub child: Option<usize>,
    pub kind: BoneKind,
    pub position: [f32; 3],
}

impl Bone {
    pub const IK_INFLUENCED: u8 = 4;
    pub const ROTATION_LINKED: u8 = 9;

    pub fn type_code(&self) -> u8 {
        match self.kind {
            BoneKind::IkInfluenced { .. } => Self::IK_INFLUENCED,
            BoneKind::RotationLinked { .. } => Self::ROTATION_LINKED,
            BoneKind::Other(code) => code,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct IkChain {
    pub target_bone: Option<usize>,
    pub effector_bone: Option<usize>,
    pub chain: Vec<Option<usize>>,
    pub max_iterations: i16,
    /// Radians.
    pub max_angle: f32,
}

pub mod morph {
    #[derive(Clone, PartialEq, Debug)]
    pub struct Vertex {
        pub vertex: usize,
        pub offset: [f32; 3],
    }
}

/// Blend shape. The first morph of a model is the base (neutral) morph.
#[derive(Clone, PartialEq, Debug)]
pub struct FaceMorph {
    pub name: String,
    pub name_en: Option<String>,
    pub type_code: u8,
    pub selectable: bool,
    pub vertices: Vec<morph::Vertex>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct BoneGroup {
    pub name: String,
    pub name_en: Option<String>,
    pub bones: Vec<usize>,
}

pub mod rigid {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub enum Shape {
        Sphere,
        Box,
        Capsule,
    }

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub enum Method {
        Static,
        Dynamic,
        DynamicWithBone,
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct RigidBody {
    pub name: String,
    pub bone: Option<usize>,
    pub group: u8,
    pub group_mask: u16,
    pub shape: rigid::Shape,
    pub size: [f32; 3],
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub recoil: f32,
    pub friction: f32,
    pub method: rigid::Method,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Limit {
    pub lower: [f32; 3],
    pub upper: [f32; 3],
}

/// Physics constraint between two rigid bodies.
#[derive(Clone, PartialEq, Debug)]
pub struct Joint {
    pub name: String,
    pub rigid_bodies: [usize; 2],
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub limit_translation: Limit,
    pub limit_rotation: Limit,
    pub spring_translation: [f32; 3],
    pub spring_rotation: [f32; 3],
}

/// A fully decoded model document.
#[derive(Clone, PartialEq, Debug)]
pub struct Model {
    pub header: Header,
    pub vertices: Vec<Vertex>,
    pub faces: Vec<Face>,
    pub materials: Vec<Material>,
    pub toon_textures: Vec<String>,
    pub bones: Vec<Bone>,
    pub bone_groups: Vec<BoneGroup>,
    pub ik_chains: Vec<IkChain>,
    pub face_morphs: Vec<FaceMorph>,
    pub rigid_bodies: Vec<RigidBody>,
    pub joints: Vec<Joint>,
}

impl Model {
    pub fn base_morph(&self) -> Option<&FaceMorph> {
        self.face_morphs.first()
    }

    /// Pairs each material with the faces it covers.
    pub fn material_faces(&self) -> impl Iterator<Item = (&Material, &[Face])> + '_ {
        let mut first = 0;
        self.materials.iter().map(move |material| {
            let start = first.min(self.faces.len());
            let end = first.saturating_add(material.face_count).min(self.faces.len());
            first = first.saturating_add(material.face_count);
            (material, &self.faces[start..end])
        })
    }
}
