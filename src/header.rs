/// Signature at the start of every file.
pub const SIGNATURE: &[u8; 3] = b"Pmd";

/// Reserved index value meaning "no such reference".
///
/// Stored as `0xFFFF` in unsigned fields and as `-1` in signed ones. Decoded
/// indices carry it as `None`.
pub const NONE_INDEX: u16 = 0xFFFF;

/// Toon textures assigned when the file carries no override section.
pub const DEFAULT_TOON_TEXTURES: [&str; 10] = [
    "toon01.bmp",
    "toon02.bmp",
    "toon04.bmp",
    "toon05.bmp",
    "toon06.bmp",
    "toon07.bmp",
    "toon03.bmp",
    "toon08.bmp",
    "toon09.bmp",
    "toon10.bmp",
];

pub(crate) const NAME_LEN: usize = 20;
pub(crate) const DESCRIPTION_LEN: usize = 256;
pub(crate) const BONE_GROUP_NAME_LEN: usize = 50;
pub(crate) const TOON_TEXTURE_NAME_LEN: usize = 100;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Encoding {
    Ascii,
    ShiftJis,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Header {
    pub signature: String,
    pub version: f32,
    pub name: String,
    pub description: String,
    pub name_en: Option<String>,
    pub description_en: Option<String>,
}
