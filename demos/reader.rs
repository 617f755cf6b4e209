use std::fs::File;
use std::io::BufReader;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: reader <file.pmd>"))?;
    let model = pmd::read(BufReader::new(File::open(path)?))?;
    println!("[name] {}", model.header.name);
    if let Some(name_en) = &model.header.name_en {
        println!("[name EN] {}", name_en);
    }
    println!("[comment]\n{}", model.header.description);
    println!("[vertices : {}]", model.vertices.len());
    println!("[faces : {}]", model.faces.len());
    println!("[materials : {}]", model.materials.len());
    for (material, faces) in model.material_faces() {
        println!(
            "{} faces, texture {:?}, toon {:?}",
            faces.len(),
            material.texture,
            material.toon_texture_name(&model.toon_textures)
        );
    }
    println!("[bones : {}]", model.bones.len());
    for bone in &model.bones {
        println!("{}", bone.name);
    }
    println!("[face morphs : {}]", model.face_morphs.len());
    println!("[rigid bodies : {}]", model.rigid_bodies.len());
    println!("[joints : {}]", model.joints.len());
    Ok(())
}
