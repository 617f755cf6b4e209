#![allow(dead_code)]

pub const NONE: u16 = 0xFFFF;

/// Little-endian byte sink for building model files in memory.
#[derive(Default)]
pub struct Writer {
    pub data: Vec<u8>,
}

impl Writer {
    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.data.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32s(&mut self, v: &[f32]) -> &mut Self {
        for f in v {
            self.data.extend_from_slice(&f.to_le_bytes());
        }
        self
    }

    /// Shift_JIS text zero-padded to `len` bytes.
    pub fn text(&mut self, s: &str, len: usize) -> &mut Self {
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode(s);
        assert!(bytes.len() <= len, "{:?} does not fit {} bytes", s, len);
        self.data.extend_from_slice(&bytes);
        self.data.resize(self.data.len() + len - bytes.len(), 0);
        self
    }
}

pub struct BoneDef {
    pub name: &'static str,
    pub parent: u16,
    pub child: u16,
    pub ty: u8,
    pub extra: i16,
}

pub struct MaterialDef {
    pub faces: u32,
    pub toon: u8,
    pub edge: u8,
    pub textures: &'static str,
}

pub struct MorphDef {
    pub name: &'static str,
    pub ty: u8,
    pub vertices: Vec<(u32, [f32; 3])>,
}

pub struct IkDef {
    pub target: u16,
    pub effector: u16,
    pub chain: Vec<u16>,
}

/// Describes the mandatory sections of a model file.
pub struct Fixture {
    pub name: &'static str,
    pub vertex_bones: Vec<[u16; 2]>,
    pub faces: Vec<[u16; 3]>,
    pub materials: Vec<MaterialDef>,
    pub bones: Vec<BoneDef>,
    pub ik_chains: Vec<IkDef>,
    pub morphs: Vec<MorphDef>,
    pub selectable: Vec<u16>,
    pub groups: Vec<&'static str>,
    pub group_entries: Vec<(u16, u8)>,
}

impl Fixture {
    pub fn empty() -> Self {
        Self {
            name: "",
            vertex_bones: vec![],
            faces: vec![],
            materials: vec![],
            bones: vec![],
            ik_chains: vec![],
            morphs: vec![],
            selectable: vec![],
            groups: vec![],
            group_entries: vec![],
        }
    }

    pub fn sample() -> Self {
        let bone = |name: &'static str, parent: u16, child: u16, ty: u8, extra: i16| BoneDef {
            name,
            parent,
            child,
            ty,
            extra,
        };
        Self {
            name: "テスト",
            vertex_bones: vec![[0, 1], [1, NONE], [2, 3], [5, 4]],
            faces: vec![[0, 1, 2], [1, 2, 3], [3, 2, 0]],
            materials: vec![
                MaterialDef {
                    faces: 2,
                    toon: 0,
                    edge: 1,
                    textures: "body.bmp*body.sph",
                },
                MaterialDef {
                    faces: 1,
                    toon: 3,
                    edge: 0,
                    textures: "*hair.spa",
                },
            ],
            bones: vec![
                bone("センター", NONE, 1, 0, 0),
                bone("上半身", 0, 2, 1, 0),
                bone("首", 1, NONE, 4, 5),
                bone("左目", 2, NONE, 9, 30),
                bone("左足", 0, 5, 2, 0),
                bone("左足ＩＫ", 0, NONE, 2, -1),
            ],
            ik_chains: vec![IkDef {
                target: 5,
                effector: 4,
                chain: vec![1, 0],
            }],
            morphs: vec![
                MorphDef {
                    name: "base",
                    ty: 0,
                    vertices: vec![(0, [0.0; 3]), (3, [0.0; 3])],
                },
                MorphDef {
                    name: "まばたき",
                    ty: 1,
                    vertices: vec![(1, [0.0, -0.1, 0.0])],
                },
                MorphDef {
                    name: "あ",
                    ty: 3,
                    vertices: vec![],
                },
            ],
            selectable: vec![0, 2],
            groups: vec!["体", "足"],
            group_entries: vec![(5, 1), (1, 1), (4, 2)],
        }
    }

    pub fn mandatory(&self) -> Writer {
        let mut w = Writer::default();
        w.data.extend_from_slice(b"Pmd");
        w.f32s(&[1.0]).text(self.name, 20).text("comment", 256);

        w.u32(self.vertex_bones.len() as u32);
        for (i, bones) in self.vertex_bones.iter().enumerate() {
            let i = i as f32;
            w.f32s(&[i, 0.0, 0.0, 0.0, 1.0, 0.0, 0.5, 0.5])
                .u16(bones[0])
                .u16(bones[1])
                .u8(100)
                .u8((i as u8) % 2);
        }

        w.u32(self.faces.len() as u32 * 3);
        for face in &self.faces {
            w.u16(face[0]).u16(face[1]).u16(face[2]);
        }

        w.u32(self.materials.len() as u32);
        for m in &self.materials {
            w.f32s(&[0.8, 0.7, 0.6, 1.0])
                .f32s(&[5.0])
                .f32s(&[0.1, 0.2, 0.3])
                .f32s(&[0.4, 0.5, 0.6])
                .u8(m.toon)
                .u8(m.edge)
                .u32(m.faces * 3)
                .text(m.textures, 20);
        }

        w.u16(self.bones.len() as u16);
        for b in &self.bones {
            w.text(b.name, 20)
                .u16(b.parent)
                .u16(b.child)
                .u8(b.ty)
                .i16(b.extra)
                .f32s(&[0.0, 1.0, 2.0]);
        }

        w.u16(self.ik_chains.len() as u16);
        for ik in &self.ik_chains {
            w.u16(ik.target)
                .u16(ik.effector)
                .u8(ik.chain.len() as u8)
                .i16(40)
                .f32s(&[0.5]);
            for &b in &ik.chain {
                w.u16(b);
            }
        }

        w.u16(self.morphs.len() as u16);
        for m in &self.morphs {
            w.text(m.name, 20).u32(m.vertices.len() as u32).u8(m.ty);
            for (id, offset) in &m.vertices {
                w.u32(*id).f32s(offset);
            }
        }
        w.u8(self.selectable.len() as u8);
        for &i in &self.selectable {
            w.u16(i);
        }

        w.u8(self.groups.len() as u8);
        for g in &self.groups {
            w.text(g, 50);
        }
        w.u32(self.group_entries.len() as u32);
        for &(bone, group) in &self.group_entries {
            w.u16(bone).u8(group);
        }
        w
    }

    pub fn localized_names(&self, w: &mut Writer) {
        w.u8(1).text("Test", 20).text("English comment", 256);
        for (i, _) in self.bones.iter().enumerate() {
            w.text(&format!("bone{}", i), 20);
        }
        for (i, _) in self.morphs.iter().enumerate().skip(1) {
            w.text(&format!("morph{}", i), 20);
        }
        for (i, _) in self.groups.iter().enumerate() {
            w.text(&format!("group{}", i), 50);
        }
    }
}

pub fn toon_textures(w: &mut Writer) {
    for i in 0..10 {
        w.text(&format!("custom{:02}.bmp", i), 100);
    }
}

pub fn rigid_body(w: &mut Writer, name: &str, bone: u16, shape: u8, method: u8) {
    w.text(name, 20)
        .u16(bone)
        .u8(2)
        .u16(0xFFFE)
        .u8(shape)
        .f32s(&[1.0, 2.0, 3.0])
        .f32s(&[0.0, 10.0, 0.0])
        .f32s(&[0.0, 0.0, 0.0])
        .f32s(&[1.5, 0.5, 0.6, 0.1, 0.9])
        .u8(method);
}

pub fn joint(w: &mut Writer, name: &str, a: u32, b: u32) {
    w.text(name, 20).u32(a).u32(b);
    let params = (0..24).map(|i| i as f32).collect::<Vec<_>>();
    w.f32s(&params);
}
