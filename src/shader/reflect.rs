//! Link-time uniform reflection.
//!
//! Programs are WGSL; their uniform tables are built exactly once when a
//! program is registered, by running naga's wgsl frontend over the
//! source and walking every `var<uniform>` struct. `set_uniform` never
//! re-queries the source.

use rustc_hash::FxHashMap;

use crate::errors::{AtelierError, Result};

/// Location of one reflected uniform member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    /// Index into the program's block list.
    pub block: usize,
    /// Byte offset inside the block.
    pub offset: u32,
    /// Size in bytes, per WGSL layout rules.
    pub size: u32,
}

/// One `var<uniform>` binding of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub group: u32,
    pub binding: u32,
    /// Struct span in bytes.
    pub size: u32,
}

/// The full reflected uniform surface of one program.
#[derive(Debug, Default)]
pub struct ReflectedUniforms {
    pub blocks: Vec<BlockInfo>,
    pub members: FxHashMap<String, UniformSlot>,
    /// The program declares a sampled texture binding.
    pub samples_texture: bool,
}

/// Parse `source` and reflect its uniform blocks.
pub fn reflect(label: &str, source: &str) -> Result<ReflectedUniforms> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| AtelierError::ShaderParse {
        label: label.to_string(),
        message: e.to_string(),
    })?;

    let mut reflected = ReflectedUniforms::default();

    for (_, var) in module.global_variables.iter() {
        if matches!(module.types[var.ty].inner, naga::TypeInner::Image { .. }) {
            reflected.samples_texture = true;
        }
        if var.space != naga::AddressSpace::Uniform {
            continue;
        }
        let Some(res) = var.binding.clone() else {
            continue;
        };
        let naga::TypeInner::Struct { members, span } = &module.types[var.ty].inner else {
            continue;
        };

        let block = reflected.blocks.len();
        for member in members {
            let Some(name) = member.name.clone() else {
                continue;
            };
            let size = module.types[member.ty].inner.size(module.to_ctx());
            reflected.members.insert(
                name,
                UniformSlot {
                    block,
                    offset: member.offset,
                    size,
                },
            );
        }
        reflected.blocks.push(BlockInfo {
            group: res.group,
            binding: res.binding,
            size: *span,
        });
    }

    Ok(reflected)
}
