//! Emission context: the named output buffers, the redirectable current
//! sink, and the per-compile scratch tables every component reads and
//! writes.
//!
//! Nothing here is shared between compiles; a [`Ctx`] is built per shader
//! stage and dropped with the result.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crucible_ir::decl::ResourceDimension;
use crucible_ir::reflect::ShaderVarType;
use crucible_ir::{Opcode, ShaderStage};

use crate::CompileFlags;

/// Which buffer formatted output currently lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    /// Type and struct declarations first, later the entry-point body.
    Main,
    /// Statements that run before the first translated instruction
    /// (input unpacking, temp declarations, constant-buffer aliases).
    EarlyMain,
    /// Entry-point parameter list, one `\t... ,\n` entry per parameter.
    ParamDecls,
    /// Fields of the synthesized output wrapper struct.
    DeclaredOutputs,
    /// Fields of the synthesized stage-in wrapper struct.
    StagedInputs,
    /// Statements spliced in just before `return`.
    PostShader,
}

/// Per-register bookkeeping discovered while translating declarations.
///
/// `input_declared_size`: 0 = undeclared, -1 = declared non-array,
/// n > 0 = declared as an n-element array.
#[derive(Debug, Default)]
pub struct RegisterTables {
    pub input_declared_size: BTreeMap<u32, i32>,
    pub scalar_input: BTreeMap<u32, i32>,
    /// 0 = plain register, n > 0 = head of an n-register indexed range,
    /// -1 = member of a range (declared through its parent).
    pub indexed_input: BTreeMap<u32, i32>,
    pub indexed_input_parent: BTreeMap<u32, u32>,
    /// Keyed dedup marker: `((phase + 1) << 3) | stream`.
    pub output_declared: BTreeMap<u32, u32>,
    pub resource_dims: BTreeMap<u32, ResourceDimension>,
    /// Element count per framebuffer-fetch color attachment slot.
    pub gmem_elements: BTreeMap<u32, u32>,
    /// Element layout of structured thread-group shared memory blocks.
    pub tgsm_types: BTreeMap<u32, ShaderVarType>,
    pub dx9_imm_const_remap: BTreeMap<u32, u32>,
    pub num_dx9_imm_consts: u32,
}

/// The emission context for one compile of one shader stage.
pub struct Ctx {
    pub stage: ShaderStage,
    pub flags: CompileFlags,
    pub phase: u32,
    pub stream: u32,
    pub indent: usize,
    pub regs: RegisterTables,
    /// Opcodes present in the instruction stream; some declarations vary
    /// their access qualifiers on this.
    pub opcodes_used: BTreeSet<Opcode>,
    /// Texture/sampler register pairs observed by sampling instructions,
    /// with the depth-compare flag.
    pub texture_samplers: BTreeSet<(u32, u32, bool)>,
    pub have_post_shader: bool,
    pub needs_early_depth_test: bool,
    pub uses_rep_counter: bool,
    pub uses_dx9_loop_counter: bool,

    sink: Sink,
    main: String,
    early_main: String,
    param_decls: String,
    declared_outputs: String,
    staged_inputs: String,
    post_shader: String,
}

impl Ctx {
    pub fn new(stage: ShaderStage, flags: CompileFlags) -> Self {
        Self {
            stage,
            flags,
            phase: 0,
            stream: 0,
            indent: 0,
            regs: RegisterTables::default(),
            opcodes_used: BTreeSet::new(),
            texture_samplers: BTreeSet::new(),
            have_post_shader: false,
            needs_early_depth_test: false,
            uses_rep_counter: false,
            uses_dx9_loop_counter: false,
            sink: Sink::Main,
            main: String::new(),
            early_main: String::new(),
            param_decls: String::new(),
            declared_outputs: String::new(),
            staged_inputs: String::new(),
            post_shader: String::new(),
        }
    }

    fn buf_mut(&mut self) -> &mut String {
        match self.sink {
            Sink::Main => &mut self.main,
            Sink::EarlyMain => &mut self.early_main,
            Sink::ParamDecls => &mut self.param_decls,
            Sink::DeclaredOutputs => &mut self.declared_outputs,
            Sink::StagedInputs => &mut self.staged_inputs,
            Sink::PostShader => &mut self.post_shader,
        }
    }

    pub fn buf(&self, sink: Sink) -> &str {
        match sink {
            Sink::Main => &self.main,
            Sink::EarlyMain => &self.early_main,
            Sink::ParamDecls => &self.param_decls,
            Sink::DeclaredOutputs => &self.declared_outputs,
            Sink::StagedInputs => &self.staged_inputs,
            Sink::PostShader => &self.post_shader,
        }
    }

    /// Redirect output to `sink` for the duration of `f`. The previous sink
    /// is restored on every exit path; components must never leave their
    /// caller's sink changed.
    pub fn with_sink<R>(&mut self, sink: Sink, f: impl FnOnce(&mut Ctx) -> R) -> R {
        let prev = std::mem::replace(&mut self.sink, sink);
        let out = f(self);
        self.sink = prev;
        out
    }

    pub fn push(&mut self, text: &str) {
        self.buf_mut().push_str(text);
    }

    pub fn pushf(&mut self, args: fmt::Arguments<'_>) {
        use fmt::Write;
        let _ = self.buf_mut().write_fmt(args);
    }

    /// Write the current indentation prefix; every statement line starts
    /// with this.
    pub fn add_indentation(&mut self) {
        for _ in 0..self.indent {
            self.buf_mut().push_str("    ");
        }
    }

    /// Remove the last `n` bytes from the current sink; used to trim
    /// trailing separators before closing a list.
    pub fn trim_trailing(&mut self, n: usize) {
        let buf = self.buf_mut();
        let keep = buf.len().saturating_sub(n);
        buf.truncate(keep);
    }
}

/// `ctx.emitf(...)` — formatted append to the current sink.
macro_rules! emitf {
    ($ctx:expr, $($arg:tt)*) => {
        $ctx.pushf(format_args!($($arg)*))
    };
}
pub(crate) use emitf;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_sink_restores_previous_sink_on_exit() {
        let mut ctx = Ctx::new(ShaderStage::Pixel, CompileFlags::empty());
        ctx.push("a");
        ctx.with_sink(Sink::EarlyMain, |ctx| {
            ctx.push("b");
            ctx.with_sink(Sink::ParamDecls, |ctx| ctx.push("c"));
            ctx.push("b2");
        });
        ctx.push("a2");
        assert_eq!(ctx.buf(Sink::Main), "aa2");
        assert_eq!(ctx.buf(Sink::EarlyMain), "bb2");
        assert_eq!(ctx.buf(Sink::ParamDecls), "c");
    }

    #[test]
    fn trim_trailing_removes_separator() {
        let mut ctx = Ctx::new(ShaderStage::Vertex, CompileFlags::empty());
        ctx.with_sink(Sink::ParamDecls, |ctx| ctx.push("\tfloat4 a,\n"));
        ctx.with_sink(Sink::ParamDecls, |ctx| ctx.trim_trailing(2));
        assert_eq!(ctx.buf(Sink::ParamDecls), "\tfloat4 a");
    }
}
