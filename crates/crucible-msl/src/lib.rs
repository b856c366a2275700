//! Metal Shading Language backend for the crucible shader cross-compiler.
//!
//! Consumes a decoded HLSL-bytecode module ([`crucible_ir::ShaderData`])
//! and emits equivalent MSL source plus a reflection result record. The
//! compile is a pure function of its input: single-threaded, synchronous,
//! no I/O, and deterministic — translating the same module twice yields
//! byte-identical text.
//!
//! Pass order per compile: atomic-usage detection over the instruction
//! stream, declaration translation (which accumulates entry-point
//! parameters and wrapper-struct fields), type inference, entry-point
//! signature synthesis, then instruction translation in order.

use bitflags::bitflags;
use thiserror::Error;
use tracing::debug;

use crucible_ir::{Decl, Opcode, ShaderData, ShaderStage};

pub mod atomics;
pub mod binding_model;
pub mod context;
pub mod decl;
pub mod inst;
pub mod names;
pub mod operand;
pub mod types;

use context::{emitf, Ctx, Sink};

bitflags! {
    /// Configuration options recognized by the backend. These gate small,
    /// local emission choices; the pass structure never changes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CompileFlags: u32 {
        /// Omit explicit `[[ buffer/texture/sampler(n) ]]` annotations.
        const DISABLE_EXPLICIT_BINDINGS = 1 << 0;
        /// Append semantic names to input identifiers.
        const INOUT_SEMANTIC_NAMES = 1 << 1;
        /// Append semantic names to output identifiers.
        const INOUT_APPEND_SEMANTIC_NAMES = 1 << 2;
        /// Uniform-buffer-object style emission (member references are not
        /// prefixed with the buffer instance).
        const UNIFORM_BUFFER_OBJECT = 1 << 3;
        /// Flattened-globals emission.
        const DISABLE_GLOBALS_STRUCT = 1 << 4;
    }
}

/// Entry-point kind of the produced shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Vertex,
    Fragment,
    Compute,
}

/// Resolved target-language dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MslDialect {
    Msl2_0,
    /// Required when framebuffer-fetch inputs are used.
    Msl2_1,
}

/// A texture/sampler register pair observed by a sampling instruction,
/// with the combined name the generated code sampled through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSamplerPair {
    pub texture_slot: u32,
    pub sampler_slot: u32,
    pub compare: bool,
    pub sampler_name: String,
}

/// The result of one compile: the shader text plus the annotated
/// reflection copy the engine binds against.
#[derive(Debug, Clone)]
pub struct Translation {
    pub msl: String,
    pub entry_kind: EntryKind,
    pub dialect: MslDialect,
    pub reflection: crucible_ir::ShaderInfo,
    pub texture_samplers: Vec<TextureSamplerPair>,
}

/// Translation failures are internal-contract violations: malformed IR or
/// a construct the target genuinely cannot express. Missing reflection
/// information is NOT an error — the translator falls back to synthesized
/// `UnknownResourceN` names so best-effort output stays available.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("shader stage {0} is not supported by this backend")]
    UnsupportedStage(ShaderStage),
    #[error("unsupported instruction {opcode:?} at index {index}")]
    UnsupportedInstruction { index: usize, opcode: Opcode },
    #[error("atomic operation targets texture-backed UAV u{slot}; the target cannot express it")]
    AtomicOnTextureUav { slot: u32 },
    #[error("UAV u{slot} was never classified as buffer- or texture-backed")]
    UnresolvedUavBinding { slot: u32 },
    #[error("more than one UAV binding matches u{slot}")]
    AmbiguousUavBinding { slot: u32 },
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),
}

/// Translate one decoded shader stage to MSL.
///
/// The module is borrowed mutably because derived metadata is annotated in
/// place: inferred per-component types on operands, UAV bind areas and
/// bool-to-int normalization in the reflection tables.
pub fn translate_shader(
    shader: &mut ShaderData,
    flags: CompileFlags,
) -> Result<Translation, TranslateError> {
    let stage = shader.stage;
    let entry_kind = match stage {
        ShaderStage::Vertex => EntryKind::Vertex,
        ShaderStage::Pixel => EntryKind::Fragment,
        ShaderStage::Compute => EntryKind::Compute,
        other => return Err(TranslateError::UnsupportedStage(other)),
    };
    debug!(%stage, "translating shader");

    crucible_ir::mark_input_usage(shader);

    let mut ctx = Ctx::new(stage, flags);
    for inst in &shader.instructions {
        ctx.opcodes_used.insert(inst.opcode);
    }
    ctx.uses_rep_counter = ctx.opcodes_used.contains(&Opcode::Rep);
    ctx.uses_dx9_loop_counter = shader
        .instructions
        .iter()
        .any(|i| i.opcode == Opcode::Loop && i.operands.len() == 2);

    // Index ranges must be on the books before the inputs they cover are
    // declared; the decoder does not guarantee declaration order.
    let decls = shader.decls.clone();
    for d in &decls {
        if let Decl::IndexRange { operand, count } = d {
            let base = operand.register;
            ctx.regs.indexed_input.insert(base, *count as i32);
            ctx.regs.indexed_input_parent.insert(base, base);
            for reg in base + 1..base + count {
                ctx.regs.indexed_input.insert(reg, -1);
                ctx.regs.indexed_input_parent.insert(reg, base);
            }
        }
    }

    let atomic_list = atomics::detect_atomic_usage(&ctx, shader);

    for d in &decls {
        decl::translate_declaration(&mut ctx, shader, d, &atomic_list)?;
    }

    types::set_data_types(shader);
    types::mark_integer_immediates(shader);

    begin_entry_point(&mut ctx);

    // The body is emitted at one indentation level inside the entry point.
    ctx.indent = 1;
    let instructions = std::mem::take(&mut shader.instructions);
    let mut result = Ok(());
    for (index, inst) in instructions.iter().enumerate() {
        result = ctx.with_sink(Sink::Main, |ctx| {
            inst::translate_instruction(ctx, shader, inst, index)
        });
        if result.is_err() {
            break;
        }
    }
    shader.instructions = instructions;
    result?;

    ctx.with_sink(Sink::Main, |ctx| ctx.push("}\n"));

    let dialect = if ctx.regs.gmem_elements.is_empty() {
        MslDialect::Msl2_0
    } else {
        MslDialect::Msl2_1
    };
    let texture_samplers = ctx
        .texture_samplers
        .iter()
        .map(|&(texture_slot, sampler_slot, compare)| TextureSamplerPair {
            texture_slot,
            sampler_slot,
            compare,
            sampler_name: names::texture_sampler_name(
                &shader.info,
                texture_slot,
                sampler_slot,
                compare,
            ),
        })
        .collect();

    let msl = assemble(&ctx);
    Ok(Translation {
        msl,
        entry_kind,
        dialect,
        reflection: shader.info.clone(),
        texture_samplers,
    })
}

/// Write the wrapper structs and the entry-point opening into the main
/// buffer. Declarations already populated the parameter/field buffers, so
/// whether the stage-in and output structs exist is known here.
fn begin_entry_point(ctx: &mut Ctx) {
    let (qualifier, in_name, out_name) = match ctx.stage {
        ShaderStage::Vertex => ("vertex", "VertexInput", "VertexOutput"),
        ShaderStage::Pixel => ("fragment", "FragmentInput", "FragmentOutput"),
        _ => ("kernel", "", ""),
    };
    let has_stage_in = !ctx.buf(Sink::StagedInputs).is_empty();
    let has_output = !ctx.buf(Sink::DeclaredOutputs).is_empty();

    let staged = ctx.buf(Sink::StagedInputs).to_owned();
    let outputs = ctx.buf(Sink::DeclaredOutputs).to_owned();
    let mut params = ctx.buf(Sink::ParamDecls).to_owned();
    if has_stage_in {
        params.push_str(&format!("\t{in_name} stageIn [[ stage_in ]]"));
    } else if params.ends_with(",\n") {
        params.truncate(params.len() - 2);
    }

    let early_main = ctx.buf(Sink::EarlyMain).to_owned();
    let num_imm_consts = ctx.regs.num_dx9_imm_consts;

    ctx.with_sink(Sink::Main, |ctx| {
        if has_stage_in {
            emitf!(ctx, "struct {in_name} {{\n{staged}}};\n");
        }
        if has_output {
            emitf!(ctx, "struct {out_name} {{\n{outputs}}};\n");
        }

        if ctx.needs_early_depth_test && ctx.stage == ShaderStage::Pixel {
            ctx.push("[[early_fragment_tests]]\n");
        }

        let return_type = if has_output { out_name } else { "void" };
        if params.is_empty() {
            emitf!(ctx, "{qualifier} {return_type} shader_main()\n{{\n");
        } else {
            emitf!(
                ctx,
                "{qualifier} {return_type} shader_main(\n{params})\n{{\n"
            );
        }

        if has_output {
            emitf!(ctx, "    {out_name} output;\n");
        }
        if num_imm_consts > 0 {
            emitf!(ctx, "    float4 ImmConstArray[{num_imm_consts}];\n");
        }
        if ctx.uses_rep_counter {
            ctx.push("    int RepCounter;\n");
        }
        if ctx.uses_dx9_loop_counter {
            ctx.push("    int LoopCounter;\n    int ZeroBasedCounter;\n");
        }
        ctx.push(&early_main);
    });
}

fn assemble(ctx: &Ctx) -> String {
    let mut out = String::with_capacity(ctx.buf(Sink::Main).len() + 64);
    out.push_str("#include <metal_stdlib>\n#include <simd/simd.h>\nusing namespace metal;\n\n");
    out.push_str(ctx.buf(Sink::Main));
    out
}
