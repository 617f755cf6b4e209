use super::*;
use std::io::Read;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid format: {0}")]
    Format(String),
    #[error("buffer underrun at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    BufferUnderrun {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("corrupt data: {0}")]
    CorruptData(String),
    #[error("io error: {0}")]
    Io(std::io::Error),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptData(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// What to do when an optional trailing section runs out of bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Truncation {
    /// Fail with [`Error::BufferUnderrun`].
    #[default]
    Strict,
    /// Drop the partial section and return the model decoded so far.
    Lenient,
}

#[derive(Clone, Debug)]
pub struct DecodeOptions {
    pub truncation: Truncation,
    /// Reject cross-section indices that point past the end of their list.
    ///
    /// Indices the decoder must follow itself (selectable morphs, bone group
    /// numbers) are always checked.
    pub validate_indices: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            truncation: Truncation::Strict,
            validate_indices: true,
        }
    }
}

impl DecodeOptions {
    pub fn with_truncation(mut self, truncation: Truncation) -> Self {
        self.truncation = truncation;
        self
    }

    pub fn with_validate_indices(mut self, validate_indices: bool) -> Self {
        self.validate_indices = validate_indices;
        self
    }
}

/// Decodes a complete model file held in memory.
pub fn decode(data: &[u8]) -> Result<Model, Error> {
    decode_with_options(data, &DecodeOptions::default())
}

pub fn decode_with_options(data: &[u8], options: &DecodeOptions) -> Result<Model, Error> {
    let mut decoder = Decoder::new(data, options);
    let mut model = decoder.mandatory_sections()?;
    decoder.optional_sections(&mut model)?;
    Ok(model)
}

/// Buffers `reader` to the end, then decodes it.
pub fn read<T: Read>(mut reader: T) -> Result<Model, Error> {
    let mut data = vec![];
    reader.read_to_end(&mut data)?;
    decode(&data)
}

const VERTEX_SIZE: usize = 4 * 8 + 2 * 2 + 2;
const FACE_SIZE: usize = 2 * 3;
const MATERIAL_SIZE: usize = 4 * 11 + 2 + 4 + NAME_LEN;
const BONE_SIZE: usize = NAME_LEN + 2 * 2 + 1 + 2 + 4 * 3;
const IK_CHAIN_MIN_SIZE: usize = 2 * 2 + 1 + 2 + 4;
const FACE_MORPH_MIN_SIZE: usize = NAME_LEN + 4 + 1;
const MORPH_VERTEX_SIZE: usize = 4 + 4 * 3;
const BONE_GROUP_ENTRY_SIZE: usize = 2 + 1;
const RIGID_BODY_SIZE: usize = NAME_LEN + 2 + 1 + 2 + 1 + 4 * 14 + 1;
const JOINT_SIZE: usize = NAME_LEN + 4 * 2 + 4 * 24;

/// English names from the localized-names section.
struct LocalizedNames {
    name: String,
    description: String,
    bones: Vec<String>,
    face_morphs: Vec<String>,
    bone_groups: Vec<String>,
}

impl LocalizedNames {
    fn apply(self, model: &mut Model) {
        model.header.name_en = Some(self.name);
        model.header.description_en = Some(self.description);
        for (bone, name) in model.bones.iter_mut().zip(self.bones) {
            bone.name_en = Some(name);
        }
        // the base morph has no English name
        for (morph, name) in model.face_morphs.iter_mut().skip(1).zip(self.face_morphs) {
            morph.name_en = Some(name);
        }
        for (group, name) in model.bone_groups.iter_mut().zip(self.bone_groups) {
            group.name_en = Some(name);
        }
    }
}

fn to_index(v: u16) -> Option<usize> {
    (v != NONE_INDEX).then_some(v as usize)
}

struct Decoder<'a> {
    cursor: ByteCursor<'a>,
    options: &'a DecodeOptions,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8], options: &'a DecodeOptions) -> Self {
        Self {
            cursor: ByteCursor::new(data),
            options,
        }
    }

    fn legacy_string(&mut self, len: usize) -> Result<String, Error> {
        self.cursor.read_zero_terminated_string(len, Encoding::ShiftJis)
    }

    /// Signed and unsigned index fields share one representation; -1 and
    /// 0xFFFF both decode to `None`.
    fn read_index(&mut self) -> Result<Option<usize>, Error> {
        Ok(to_index(self.cursor.read_u16()?))
    }

    fn checked_count(&self, what: &str, count: usize, record_size: usize) -> Result<usize, Error> {
        let remaining = self.cursor.remaining();
        match count.checked_mul(record_size) {
            Some(size) if size <= remaining => Ok(count),
            _ => Err(Error::corrupt(format!(
                "{} count {} exceeds remaining {} bytes at offset {}",
                what,
                count,
                remaining,
                self.cursor.position()
            ))),
        }
    }

    fn check_index(&self, what: &str, index: Option<usize>, len: usize) -> Result<(), Error> {
        match index {
            Some(i) if self.options.validate_indices && i >= len => Err(Error::corrupt(format!(
                "{} index {} out of range ({})",
                what, i, len
            ))),
            _ => Ok(()),
        }
    }

    fn mandatory_sections(&mut self) -> Result<Model, Error> {
        let header = self.header()?;
        let vertices = self.vertices()?;
        let faces = self.faces(vertices.len())?;
        let materials = self.materials(faces.len())?;
        let bones = self.bones()?;
        let ik_chains = self.ik_chains()?;
        let face_morphs = self.face_morphs(vertices.len())?;
        let bone_groups = self.bone_groups()?;
        let model = Model {
            header,
            vertices,
            faces,
            materials,
            toon_textures: DEFAULT_TOON_TEXTURES.iter().map(|s| s.to_string()).collect(),
            bones,
            bone_groups,
            ik_chains,
            face_morphs,
            rigid_bodies: vec![],
            joints: vec![],
        };
        self.check_bone_references(&model)?;
        Ok(model)
    }

    fn optional_sections(&mut self, model: &mut Model) -> Result<(), Error> {
        let counts = (
            model.bones.len(),
            model.face_morphs.len(),
            model.bone_groups.len(),
        );
        let Some(names) = self.optional("localized names", |d| d.localized_names(counts))? else {
            return Ok(());
        };
        if let Some(names) = names {
            names.apply(model);
        }
        let Some(toon_textures) = self.optional("toon textures", |d| d.toon_textures())? else {
            return Ok(());
        };
        model.toon_textures = toon_textures;
        let Some(rigid_bodies) =
            self.optional("rigid bodies", |d| d.rigid_bodies(model.bones.len()))?
        else {
            return Ok(());
        };
        model.rigid_bodies = rigid_bodies;
        let Some(joints) = self.optional("joints", |d| d.joints(model.rigid_bodies.len()))? else {
            return Ok(());
        };
        model.joints = joints;
        Ok(())
    }

    /// Runs `f` unless the buffer is exhausted. `None` means decoding stops here.
    fn optional<T>(
        &mut self,
        section: &str,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<Option<T>, Error> {
        if self.cursor.at_end() {
            log::trace!("end of buffer before {} section", section);
            return Ok(None);
        }
        let start = self.cursor.position();
        match f(self) {
            Ok(v) => Ok(Some(v)),
            Err(e @ Error::BufferUnderrun { .. }) if self.options.truncation == Truncation::Lenient => {
                log::warn!("discarding truncated {} section at offset {}: {}", section, start, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn header(&mut self) -> Result<Header, Error> {
        let signature = self.cursor.read_fixed_string(SIGNATURE.len())?;
        if signature.as_bytes() != SIGNATURE {
            return Err(Error::format(format!("signature {:?}", signature)));
        }
        let version = self.cursor.read_f32()?;
        let name = self.legacy_string(NAME_LEN)?;
        let description = self.legacy_string(DESCRIPTION_LEN)?;
        log::debug!("model {:?} version {}", name, version);
        Ok(Header {
            signature,
            version,
            name,
            description,
            name_en: None,
            description_en: None,
        })
    }

    fn vertices(&mut self) -> Result<Vec<Vertex>, Error> {
        let len = self.cursor.read_u32()? as usize;
        let len = self.checked_count("vertex", len, VERTEX_SIZE)?;
        log::debug!("{} vertices at offset {}", len, self.cursor.position());
        (0..len)
            .map(|_| {
                let position = self.cursor.read_vec3()?;
                let normal = self.cursor.read_vec3()?;
                let uv = self.cursor.read_vec2()?;
                let bones = [self.read_index()?, self.read_index()?];
                let weight = self.cursor.read_u8()?;
                let edge = self.cursor.read_u8()? != 0;
                Ok(Vertex {
                    position,
                    normal,
                    uv,
                    bones,
                    weight,
                    edge,
                })
            })
            .collect()
    }

    fn faces(&mut self, vertices_len: usize) -> Result<Vec<Face>, Error> {
        let indices_len = self.cursor.read_u32()? as usize;
        if indices_len % 3 != 0 {
            return Err(Error::corrupt(format!("face index count {}", indices_len)));
        }
        let len = self.checked_count("face", indices_len / 3, FACE_SIZE)?;
        log::debug!("{} faces at offset {}", len, self.cursor.position());
        (0..len)
            .map(|_| {
                let mut vertices = [0usize; 3];
                for v in vertices.iter_mut() {
                    *v = self.cursor.read_u16()? as usize;
                    self.check_index("face vertex", Some(*v), vertices_len)?;
                }
                Ok(Face { vertices })
            })
            .collect()
    }

    fn materials(&mut self, faces_len: usize) -> Result<Vec<Material>, Error> {
        let len = self.cursor.read_u32()? as usize;
        let len = self.checked_count("material", len, MATERIAL_SIZE)?;
        log::debug!("{} materials at offset {}", len, self.cursor.position());
        let materials = (0..len)
            .map(|_| {
                let diffuse = self.cursor.read_vec4()?;
                let specularity = self.cursor.read_f32()?;
                let specular = self.cursor.read_vec3()?;
                let ambient = self.cursor.read_vec3()?;
                let toon = self.cursor.read_u8()?;
                let edge = self.cursor.read_u8()? != 0;
                let indices_len = self.cursor.read_u32()? as usize;
                if indices_len % 3 != 0 {
                    return Err(Error::corrupt(format!(
                        "material face index count {}",
                        indices_len
                    )));
                }
                let textures = self.legacy_string(NAME_LEN)?;
                let mut textures = textures.split('*').map(|s| (!s.is_empty()).then(|| s.to_string()));
                Ok(Material {
                    diffuse,
                    specular,
                    specularity,
                    ambient,
                    toon: (toon != 0).then_some(toon),
                    edge,
                    face_count: indices_len / 3,
                    texture: textures.next().flatten(),
                    sphere: textures.next().flatten(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if self.options.validate_indices {
            let total = materials
                .iter()
                .try_fold(0usize, |total, m| total.checked_add(m.face_count));
            if total != Some(faces_len) {
                return Err(Error::corrupt(format!(
                    "materials cover {:?} faces, model has {}",
                    total, faces_len
                )));
            }
        }
        Ok(materials)
    }

    fn bones(&mut self) -> Result<Vec<Bone>, Error> {
        let len = self.cursor.read_u16()? as usize;
        let len = self.checked_count("bone", len, BONE_SIZE)?;
        log::debug!("{} bones at offset {}", len, self.cursor.position());
        (0..len)
            .map(|_| {
                let name = self.legacy_string(NAME_LEN)?;
                let parent = self.read_index()?;
                let child = self.read_index()?;
                let ty = self.cursor.read_u8()?;
                let extra = self.cursor.read_i16()?;
                let position = self.cursor.read_vec3()?;
                let kind = match ty {
                    Bone::IK_INFLUENCED => BoneKind::IkInfluenced {
                        ik_target: to_index(extra as u16),
                    },
                    Bone::ROTATION_LINKED => BoneKind::RotationLinked { coefficient: extra },
                    code => BoneKind::Other(code),
                };
                Ok(Bone {
                    name,
                    name_en: None,
                    parent,
                    child,
                    kind,
                    position,
                })
            })
            .collect()
    }

    fn ik_chains(&mut self) -> Result<Vec<IkChain>, Error> {
        let len = self.cursor.read_u16()? as usize;
        let len = self.checked_count("ik chain", len, IK_CHAIN_MIN_SIZE)?;
        log::debug!("{} ik chains at offset {}", len, self.cursor.position());
        (0..len)
            .map(|_| {
                let target_bone = self.read_index()?;
                let effector_bone = self.read_index()?;
                let chain_len = self.cursor.read_u8()? as usize;
                let max_iterations = self.cursor.read_i16()?;
                let max_angle = self.cursor.read_f32()?;
                let chain_len = self.checked_count("ik chain bone", chain_len, 2)?;
                let chain = self
                    .cursor
                    .read_u16_array(chain_len)?
                    .into_iter()
                    .map(to_index)
                    .collect::<Vec<_>>();
                Ok(IkChain {
                    target_bone,
                    effector_bone,
                    chain,
                    max_iterations,
                    max_angle,
                })
            })
            .collect()
    }

    fn face_morphs(&mut self, vertices_len: usize) -> Result<Vec<FaceMorph>, Error> {
        let len = self.cursor.read_u16()? as usize;
        let len = self.checked_count("face morph", len, FACE_MORPH_MIN_SIZE)?;
        log::debug!("{} face morphs at offset {}", len, self.cursor.position());
        let mut morphs = (0..len)
            .map(|_| {
                let name = self.legacy_string(NAME_LEN)?;
                let vertices_len = self.cursor.read_u32()? as usize;
                let type_code = self.cursor.read_u8()?;
                let vertices_len =
                    self.checked_count("face morph vertex", vertices_len, MORPH_VERTEX_SIZE)?;
                let vertices = (0..vertices_len)
                    .map(|_| {
                        Ok(morph::Vertex {
                            vertex: self.cursor.read_u32()? as usize,
                            offset: self.cursor.read_vec3()?,
                        })
                    })
                    .collect::<Result<Vec<_>, Error>>()?;
                Ok(FaceMorph {
                    name,
                    name_en: None,
                    type_code,
                    selectable: false,
                    vertices,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        // the base morph indexes model vertices, the others index the base morph
        if let Some((base, rest)) = morphs.split_first() {
            for v in &base.vertices {
                self.check_index("base morph vertex", Some(v.vertex), vertices_len)?;
            }
            for morph in rest {
                for v in &morph.vertices {
                    self.check_index("face morph vertex", Some(v.vertex), base.vertices.len())?;
                }
            }
        }

        let selectable_len = self.cursor.read_u8()? as usize;
        let selectable_len = self.checked_count("selectable morph", selectable_len, 2)?;
        for i in self.cursor.read_u16_array(selectable_len)? {
            let morph = morphs.get_mut(i as usize).ok_or_else(|| {
                Error::corrupt(format!("selectable morph index {} out of range ({})", i, len))
            })?;
            morph.selectable = true;
        }
        Ok(morphs)
    }

    fn bone_groups(&mut self) -> Result<Vec<BoneGroup>, Error> {
        let len = self.cursor.read_u8()? as usize;
        let len = self.checked_count("bone group", len, BONE_GROUP_NAME_LEN)?;
        log::debug!("{} bone groups at offset {}", len, self.cursor.position());
        let mut groups = (0..len)
            .map(|_| {
                Ok(BoneGroup {
                    name: self.legacy_string(BONE_GROUP_NAME_LEN)?,
                    name_en: None,
                    bones: vec![],
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let entries_len = self.cursor.read_u32()? as usize;
        let entries_len = self.checked_count("bone group entry", entries_len, BONE_GROUP_ENTRY_SIZE)?;
        for _ in 0..entries_len {
            let bone = self.cursor.read_u16()? as usize;
            let group = self.cursor.read_u8()? as usize;
            // group numbers are 1-based
            let group = group
                .checked_sub(1)
                .and_then(|i| groups.get_mut(i))
                .ok_or_else(|| {
                    Error::corrupt(format!("bone group number {} out of range ({})", group, len))
                })?;
            group.bones.push(bone);
        }
        Ok(groups)
    }

    fn check_bone_references(&self, model: &Model) -> Result<(), Error> {
        let len = model.bones.len();
        for vertex in &model.vertices {
            for &bone in &vertex.bones {
                self.check_index("vertex bone", bone, len)?;
            }
        }
        for bone in &model.bones {
            self.check_index("parent bone", bone.parent, len)?;
            self.check_index("child bone", bone.child, len)?;
            if let BoneKind::IkInfluenced { ik_target } = bone.kind {
                self.check_index("ik target bone", ik_target, len)?;
            }
        }
        for ik in &model.ik_chains {
            self.check_index("ik target bone", ik.target_bone, len)?;
            self.check_index("ik effector bone", ik.effector_bone, len)?;
            for &bone in &ik.chain {
                self.check_index("ik chain bone", bone, len)?;
            }
        }
        for group in &model.bone_groups {
            for &bone in &group.bones {
                self.check_index("bone group bone", Some(bone), len)?;
            }
        }
        Ok(())
    }

    fn localized_names(
        &mut self,
        (bones_len, face_morphs_len, bone_groups_len): (usize, usize, usize),
    ) -> Result<Option<LocalizedNames>, Error> {
        if self.cursor.read_u8()? == 0 {
            log::trace!("localized names absent");
            return Ok(None);
        }
        let name = self.legacy_string(NAME_LEN)?;
        let description = self.legacy_string(DESCRIPTION_LEN)?;
        let bones = (0..bones_len)
            .map(|_| self.legacy_string(NAME_LEN))
            .collect::<Result<Vec<_>, _>>()?;
        let face_morphs = (1..face_morphs_len)
            .map(|_| self.legacy_string(NAME_LEN))
            .collect::<Result<Vec<_>, _>>()?;
        let bone_groups = (0..bone_groups_len)
            .map(|_| self.legacy_string(BONE_GROUP_NAME_LEN))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(LocalizedNames {
            name,
            description,
            bones,
            face_morphs,
            bone_groups,
        }))
    }

    fn toon_textures(&mut self) -> Result<Vec<String>, Error> {
        log::debug!("toon texture names at offset {}", self.cursor.position());
        (0..DEFAULT_TOON_TEXTURES.len())
            .map(|_| self.legacy_string(TOON_TEXTURE_NAME_LEN))
            .collect()
    }

    fn rigid_bodies(&mut self, bones_len: usize) -> Result<Vec<RigidBody>, Error> {
        let len = self.cursor.read_u32()? as usize;
        let len = self.checked_count("rigid body", len, RIGID_BODY_SIZE)?;
        log::debug!("{} rigid bodies at offset {}", len, self.cursor.position());
        (0..len)
            .map(|_| {
                let name = self.legacy_string(NAME_LEN)?;
                let bone = self.read_index()?;
                self.check_index("rigid body bone", bone, bones_len)?;
                let group = self.cursor.read_u8()?;
                let group_mask = self.cursor.read_u16()?;
                let shape = match self.cursor.read_u8()? {
                    0 => rigid::Shape::Sphere,
                    1 => rigid::Shape::Box,
                    2 => rigid::Shape::Capsule,
                    v => return Err(Error::corrupt(format!("rigid body shape {}", v))),
                };
                let size = self.cursor.read_vec3()?;
                let position = self.cursor.read_vec3()?;
                let rotation = self.cursor.read_vec3()?;
                let mass = self.cursor.read_f32()?;
                let linear_damping = self.cursor.read_f32()?;
                let angular_damping = self.cursor.read_f32()?;
                let recoil = self.cursor.read_f32()?;
                let friction = self.cursor.read_f32()?;
                let method = match self.cursor.read_u8()? {
                    0 => rigid::Method::Static,
                    1 => rigid::Method::Dynamic,
                    2 => rigid::Method::DynamicWithBone,
                    v => return Err(Error::corrupt(format!("rigid body method {}", v))),
                };
                Ok(RigidBody {
                    name,
                    bone,
                    group,
                    group_mask,
                    shape,
                    size,
                    position,
                    rotation,
                    mass,
                    linear_damping,
                    angular_damping,
                    recoil,
                    friction,
                    method,
                })
            })
            .collect()
    }

    fn joints(&mut self, rigid_bodies_len: usize) -> Result<Vec<Joint>, Error> {
        let len = self.cursor.read_u32()? as usize;
        let len = self.checked_count("joint", len, JOINT_SIZE)?;
        log::debug!("{} joints at offset {}", len, self.cursor.position());
        (0..len)
            .map(|_| {
                let name = self.legacy_string(NAME_LEN)?;
                let rigid_bodies = [
                    self.cursor.read_u32()? as usize,
                    self.cursor.read_u32()? as usize,
                ];
                for &rigid_body in &rigid_bodies {
                    self.check_index("joint rigid body", Some(rigid_body), rigid_bodies_len)?;
                }
                let position = self.cursor.read_vec3()?;
                let rotation = self.cursor.read_vec3()?;
                let limit_translation = Limit {
                    lower: self.cursor.read_vec3()?,
                    upper: self.cursor.read_vec3()?,
                };
                let limit_rotation = Limit {
                    lower: self.cursor.read_vec3()?,
                    upper: self.cursor.read_vec3()?,
                };
                let spring_translation = self.cursor.read_vec3()?;
                let spring_rotation = self.cursor.read_vec3()?;
                Ok(Joint {
                    name,
                    rigid_bodies,
                    position,
                    rotation,
                    limit_translation,
                    limit_rotation,
                    spring_translation,
                    spring_rotation,
                })
            })
            .collect()
    }
}
